//! # storefront-media
//!
//! Image ingestion for a storefront catalog. Administrators attach images to
//! three kinds of records (categories, products, banners); every upload goes
//! through one stateless pipeline before it is handed to an object store.
//!
//! # Architecture
//!
//! ```text
//! upload ─▶ validate ─▶ decode/verify ─▶ normalize color ─▶ fit ─▶ encode
//!                                                                   │
//!                       ┌─── over budget? ◀─────────────────────────┘
//!                       ▼
//!        quality ladder ─▶ dimension ladder ─▶ floor
//!                       │
//!                       ▼
//!                publish (retry) ─▶ StoredObject { remote id, stable uuid }
//! ```
//!
//! The pipeline is a pure function of (bytes, profile): no I/O, no shared
//! state, byte-identical output for identical input. The three call sites
//! differ only in the [`EncodingProfile`](imaging::EncodingProfile) they
//! build, and storage sits behind the [`ObjectStore`](store::ObjectStore)
//! trait so a failed upload never triggers a second encode.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | The pipeline: formats, tiers, dimension math, fallback ladders, codec backend |
//! | [`validation`] | Upload checks that run before decoding (emptiness, extension, raw size) |
//! | [`catalog`] | Category / product / banner call sites and their profiles |
//! | [`store`] | Object store boundary, local directory and Google Drive clients |
//! | [`ingest`] | Orchestration: prepare (validate + process), publish with retries |
//! | [`config`] | Layered TOML configuration over stock defaults |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Size Budget Over Quality
//!
//! The remote store rejects objects over 1 MiB, so every tier except `none`
//! degrades until the encode fits: first quality, then dimensions. A
//! low-quality floor at the fitted size ends the search. If even that is
//! over budget it is returned anyway, with a warning, since a slightly large
//! image beats a failed upload. Tier `none` is the opt-out: the caller asked for original
//! quality, so an over-budget result is an error instead.
//!
//! ## Explicit Ladders
//!
//! The fallback parameters are constant slices in [`imaging::ladder`] walked
//! in order. The number of encodes per request is bounded and visible, and
//! tests can assert the exact sequence with a mock backend.

pub mod catalog;
pub mod config;
pub mod imaging;
pub mod ingest;
pub mod logging;
pub mod output;
pub mod store;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_helpers;
