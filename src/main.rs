use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use storefront_media::catalog::{ContextSettings, ImageContext};
use storefront_media::imaging::{
    CompressionTier, FormatChoice, ImageBackend, OutputFormat, ProcessedImage, RustBackend,
    SourceImage,
};
use storefront_media::ingest::{self, IngestOptions};
use storefront_media::output::{self, BatchEntry, ProcessSummary};
use storefront_media::validation::{ValidationError, extension_of, validate_upload};
use storefront_media::{config, logging, store};

/// Shared flags for commands that run the pipeline.
#[derive(clap::Args, Clone)]
struct ProfileArgs {
    /// Record type the image is attached to (sets box, upload limit, defaults)
    #[arg(long, value_enum, default_value_t = ImageContext::Product)]
    context: ImageContext,

    /// Output format: original, jpg, png or webp [default: from config]
    #[arg(long)]
    format: Option<FormatChoice>,

    /// Compression tier: none, high, auto, medium or low [default: from config]
    #[arg(long)]
    tier: Option<CompressionTier>,
}

impl ProfileArgs {
    fn options(&self) -> IngestOptions {
        IngestOptions {
            format: self.format,
            tier: self.tier,
        }
    }
}

#[derive(Parser)]
#[command(name = "storefront-media")]
#[command(about = "Image ingestion for storefront catalog records")]
#[command(long_about = "\
Image ingestion for storefront catalog records

Every image attached to a category, product or banner is validated, color
normalized, shrunk into the record's bounding box and encoded under a 1 MiB
budget. Over-budget encodes fall back to lower quality, then smaller
dimensions, then a last-resort floor.

Call sites:
  category   800x800    uploads up to 5 MiB
  product    1200x1200  uploads up to 10 MiB
  banner     1600x600   uploads up to 5 MiB

Run 'storefront-media gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file [default: ./storefront-media.toml if present]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process one image and write the result to disk
    Process {
        file: PathBuf,
        #[command(flatten)]
        profile: ProfileArgs,
        /// Output path [default: <stem>.processed.<ext> next to the input]
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Process one image and upload it to the configured store
    Upload {
        file: PathBuf,
        #[command(flatten)]
        profile: ProfileArgs,
    },
    /// Process every image under a directory in parallel
    Batch {
        dir: PathBuf,
        #[command(flatten)]
        profile: ProfileArgs,
        /// Write results here, mirroring the input tree (omit for a dry run)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Validate an upload without encoding it
    Check {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = ImageContext::Product)]
        context: ImageContext,
    },
    /// Print a stock config file with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(cli.config.as_deref())?;
    logging::init(&config.logging).map_err(|e| e.to_string())?;
    let backend = RustBackend::new();

    match cli.command {
        Command::Process {
            file,
            profile,
            output,
        } => {
            let settings = config.context(profile.context);
            let source = SourceImage::from_path(&file)?;
            let image = ingest::prepare(&backend, &source, settings, profile.options())?;

            let out_path = output.unwrap_or_else(|| default_output_path(&file, &image));
            std::fs::write(&out_path, &image.bytes)?;

            let name = display_name(&file);
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&ProcessSummary::new(&name, &image))?
                );
            } else {
                output::print_process_output(&name, &image, settings.budget_bytes);
                println!("Wrote {}", out_path.display());
            }
        }
        Command::Upload { file, profile } => {
            let settings = config.context(profile.context);
            let source = SourceImage::from_path(&file)?;
            let object_store = store::from_config(&config.store)?;
            let ingested = ingest::ingest(
                &backend,
                object_store.as_ref(),
                &source,
                settings,
                profile.options(),
                config.store.upload_attempts,
            )?;

            let name = display_name(&file);
            if cli.json {
                let value = serde_json::json!({
                    "image": ProcessSummary::new(&name, &ingested.image),
                    "stored": ingested.stored,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                output::print_upload_output(&name, &ingested);
            }
        }
        Command::Batch {
            dir,
            profile,
            out_dir,
        } => {
            let settings = config.context(profile.context);
            if let Some(out) = &out_dir {
                std::fs::create_dir_all(out)?;
            }
            init_thread_pool(&config.processing);

            let files = collect_images(&dir);
            let mut entries: Vec<BatchEntry> = files
                .par_iter()
                .map(|path| {
                    let name = path
                        .strip_prefix(&dir)
                        .unwrap_or(path)
                        .display()
                        .to_string();
                    let outcome = batch_one(&backend, path, settings, profile.options());
                    (name, outcome)
                })
                .collect();
            if let Some(out) = &out_dir {
                write_batch(&mut entries, out);
            }

            let failed = entries.iter().filter(|(_, r)| r.is_err()).count();
            if cli.json {
                let summaries: Vec<_> = entries
                    .iter()
                    .map(|(name, outcome)| match outcome {
                        Ok(image) => serde_json::to_value(ProcessSummary::new(name, image)),
                        Err(message) => Ok(serde_json::json!({"file": name, "error": message})),
                    })
                    .collect::<Result<_, _>>()?;
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                output::print_batch_output(&entries, settings.budget_bytes);
            }
            if failed > 0 {
                return Err(format!("{failed} of {} images failed", entries.len()).into());
            }
        }
        Command::Check { file, context } => {
            let settings = config.context(context);
            let source = SourceImage::from_path(&file)?;
            let name = display_name(&file);
            validate_upload(&name, &source.bytes, settings.limits())?;
            let decoded = backend
                .decode(&source)
                .map_err(|e| ValidationError::InvalidImage(e.to_string()))?;

            let container = image::guess_format(&source.bytes)
                .map(|f| format!("{f:?}").to_lowercase())
                .unwrap_or_else(|_| "image".to_string());
            let dims = (decoded.width(), decoded.height());
            if cli.json {
                let value = serde_json::json!({
                    "file": name,
                    "container": container,
                    "width": dims.0,
                    "height": dims.1,
                    "bytes": source.len(),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                output::print_check_output(&name, &container, dims, source.len());
            }
        }
        // Handled before config loading
        Command::GenConfig => {}
    }

    Ok(())
}

/// Process one batch file; nothing is written here.
fn batch_one(
    backend: &RustBackend,
    path: &Path,
    settings: &ContextSettings,
    options: IngestOptions,
) -> Result<ProcessedImage, String> {
    let source = SourceImage::from_path(path).map_err(|e| e.to_string())?;
    ingest::prepare(backend, &source, settings, options).map_err(|e| e.to_string())
}

/// `<out_dir>/<relative dir>/<stem>.<ext>`, mirroring the input tree.
fn batch_target(out_dir: &Path, relative: &Path, format: OutputFormat) -> PathBuf {
    out_dir.join(relative).with_extension(format.extension())
}

/// Write successful batch results under `out_dir`, in entry order.
///
/// An entry whose target was already written by an earlier one (`x.jpg`
/// and `x.png` both becoming `x.jpg`) is turned into a failure instead of
/// overwriting it.
fn write_batch(entries: &mut [BatchEntry], out_dir: &Path) {
    let mut claimed: HashMap<PathBuf, String> = HashMap::new();
    for (name, outcome) in entries.iter_mut() {
        let (target, written) = match outcome {
            Ok(image) => {
                let target = batch_target(out_dir, Path::new(name.as_str()), image.format);
                if let Some(first) = claimed.get(&target) {
                    let message = format!(
                        "Output {} already written for {first}",
                        target.display()
                    );
                    (target, Err(message))
                } else {
                    let written = write_output(&target, &image.bytes);
                    (target, written)
                }
            }
            Err(_) => continue,
        };
        match written {
            Ok(()) => {
                claimed.insert(target, name.clone());
            }
            Err(message) => *outcome = Err(message),
        }
    }
}

fn write_output(target: &Path, bytes: &[u8]) -> Result<(), String> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    std::fs::write(target, bytes).map_err(|e| e.to_string())
}

/// Every file under `dir` with an accepted image extension, sorted.
fn collect_images(dir: &Path) -> Vec<PathBuf> {
    let accepted = storefront_media::imaging::rust_backend::supported_input_extensions();
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.file_name()
                .to_str()
                .and_then(extension_of)
                .is_some_and(|ext| accepted.contains(&ext.as_str()))
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `<stem>.processed.<ext>` beside the input.
fn default_output_path(input: &Path, image: &ProcessedImage) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    input.with_file_name(format!("{stem}.processed.{}", image.format.extension()))
}

/// Initialize the rayon thread pool based on processing config.
///
/// Never more threads than available cores; config can only lower the count.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
