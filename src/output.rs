//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.
//!
//! # Output Format
//!
//! ## Process
//!
//! ```text
//! sofa.png → jpeg 800x533 (412.3 KiB)
//!     Original: 3000x2000
//!     Stage: first pass
//!     SHA-256: 9f86d081...
//! ```
//!
//! ## Upload
//!
//! ```text
//! sofa.png → jpeg 800x533 (412.3 KiB)
//!     Stable id: 6f1c...
//!     Remote id: 1AbC...
//!     URL: https://drive.google.com/uc?id=1AbC...
//! ```
//!
//! ## Batch
//!
//! ```text
//! 001 sofa.png → jpeg 800x533 (412.3 KiB)
//! 002 broken.jpg: Invalid image: ...
//!
//! Processed 1 image, 1 failed
//! ```

use crate::imaging::ProcessedImage;
use crate::ingest::Ingested;
use serde::Serialize;

/// Machine-readable summary of one processed image (`--json`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessSummary {
    pub file: String,
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub original_width: u32,
    pub original_height: u32,
    pub bytes: usize,
    pub stage: String,
    pub sha256: String,
}

impl ProcessSummary {
    pub fn new(file: &str, image: &ProcessedImage) -> Self {
        Self {
            file: file.to_string(),
            format: image.format.to_string(),
            width: image.width,
            height: image.height,
            original_width: image.original_width,
            original_height: image.original_height,
            bytes: image.len(),
            stage: image.stage.to_string(),
            sha256: image.digest(),
        }
    }
}

/// One line per file in a batch run.
pub type BatchEntry = (String, Result<ProcessedImage, String>);

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Human-readable byte count: `512 B`, `412.3 KiB`, `1.0 MiB`.
pub fn format_size(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KIB {
        format!("{bytes} B")
    } else if b < KIB * KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{:.1} MiB", b / (KIB * KIB))
    }
}

/// `name → format WxH (size)`
fn result_header(name: &str, image: &ProcessedImage) -> String {
    format!(
        "{} → {} {}x{} ({})",
        name,
        image.format,
        image.width,
        image.height,
        format_size(image.len())
    )
}

// ============================================================================
// Process
// ============================================================================

pub fn format_process_output(name: &str, image: &ProcessedImage, budget: usize) -> Vec<String> {
    let mut lines = vec![result_header(name, image)];
    lines.push(format!(
        "    Original: {}x{}",
        image.original_width, image.original_height
    ));
    lines.push(format!("    Stage: {}", image.stage));
    if !image.within_budget(budget) {
        lines.push(format!(
            "    Warning: over the {} budget",
            format_size(budget)
        ));
    }
    lines.push(format!("    SHA-256: {}", image.digest()));
    lines
}

pub fn print_process_output(name: &str, image: &ProcessedImage, budget: usize) {
    for line in format_process_output(name, image, budget) {
        println!("{}", line);
    }
}

// ============================================================================
// Upload
// ============================================================================

pub fn format_upload_output(name: &str, ingested: &Ingested) -> Vec<String> {
    vec![
        result_header(name, &ingested.image),
        format!("    Stable id: {}", ingested.stored.stable_id),
        format!("    Remote id: {}", ingested.stored.remote_id),
        format!("    URL: {}", ingested.stored.url),
    ]
}

pub fn print_upload_output(name: &str, ingested: &Ingested) {
    for line in format_upload_output(name, ingested) {
        println!("{}", line);
    }
}

// ============================================================================
// Batch
// ============================================================================

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

pub fn format_batch_output(entries: &[BatchEntry], budget: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut failed = 0;
    let mut over_budget = 0;

    for (i, (name, outcome)) in entries.iter().enumerate() {
        let index = format_index(i + 1);
        match outcome {
            Ok(image) => {
                lines.push(format!("{} {}", index, result_header(name, image)));
                if !image.within_budget(budget) {
                    over_budget += 1;
                    lines.push(format!("    Best effort: {}", image.stage));
                }
            }
            Err(message) => {
                failed += 1;
                lines.push(format!("{} {}: {}", index, name, message));
            }
        }
    }

    let processed = entries.len() - failed;
    let mut summary = format!("Processed {}, {} failed", plural(processed, "image"), failed);
    if over_budget > 0 {
        summary.push_str(&format!(", {over_budget} over budget"));
    }
    lines.push(String::new());
    lines.push(summary);
    lines
}

pub fn print_batch_output(entries: &[BatchEntry], budget: usize) {
    for line in format_batch_output(entries, budget) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check_output(name: &str, container: &str, dims: (u32, u32), size: usize) -> Vec<String> {
    vec![
        format!("{}: valid {} {}x{} ({})", name, container, dims.0, dims.1, format_size(size)),
    ]
}

pub fn print_check_output(name: &str, container: &str, dims: (u32, u32), size: usize) {
    for line in format_check_output(name, container, dims, size) {
        println!("{}", line);
    }
}
