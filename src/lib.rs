//! Repix image transform library
//!
//! Takes a source image, validated transform options (dimensions,
//! crop-vs-fit, output format, compression bounds, optional byte budget),
//! and produces a transformed blob plus the HTTP caching headers needed
//! to serve it. The compression quality is chosen by an adaptive search
//! that trades fidelity for file size under the byte budget.

pub mod allowlist;
pub mod config;
pub mod engine;
pub mod error;
pub mod headers;
pub mod logging;
pub mod options;
pub mod pipeline;
pub mod source;

// Re-export commonly used types
pub use allowlist::HostAllowlistGuard;
pub use config::{Environment, RepixConfig};
pub use engine::{CodecEngine, ImageRsEngine};
pub use error::{ErrorResponse, RepixError};
pub use headers::{CacheHeaderPolicy, CacheHeaders};
pub use options::{CompressionPreset, OutputFormat, Quality, TransformOptions};
pub use pipeline::{select_quality, TransformPipeline, TransformResult};
pub use source::SourceFile;
