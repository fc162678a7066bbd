use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Utc;
use clap::Parser;

use repix::{
    CacheHeaderPolicy, ErrorResponse, HostAllowlistGuard, ImageRsEngine, RepixConfig, RepixError,
    SourceFile, TransformPipeline,
};

/// Repix - resize and recompress an image under an optional byte budget
#[derive(Parser, Debug)]
#[command(name = "repix")]
#[command(version, about, long_about = None)]
struct Args {
    /// Source image: local path, or URL checked against ALLOWED_HOSTS
    source: String,

    /// Output file path
    #[arg(short, long)]
    out: PathBuf,

    /// Target width in pixels
    #[arg(long)]
    width: u32,

    /// Target height in pixels
    #[arg(long)]
    height: u32,

    /// Output format (jpeg, png, webp); defaults to the source format
    #[arg(long)]
    format: Option<String>,

    /// Crop to fill the target dimensions exactly
    #[arg(long)]
    crop: bool,

    /// Quality floor (1-100 or preset name)
    #[arg(long)]
    min_quality: Option<String>,

    /// Quality ceiling (1-100 or preset name)
    #[arg(long)]
    max_quality: Option<String>,

    /// Byte budget for the output; 0 disables the quality search
    #[arg(long)]
    max_file_size_bytes: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print the caching headers that would accompany the response
    #[arg(long)]
    print_headers: bool,
}

fn raw_options(args: &Args) -> HashMap<String, String> {
    let mut raw = HashMap::new();
    raw.insert("width".to_string(), args.width.to_string());
    raw.insert("height".to_string(), args.height.to_string());
    if let Some(format) = &args.format {
        raw.insert("format".to_string(), format.clone());
    }
    if args.crop {
        raw.insert("crop".to_string(), "true".to_string());
    }
    if let Some(min) = &args.min_quality {
        raw.insert("min_quality".to_string(), min.clone());
    }
    if let Some(max) = &args.max_quality {
        raw.insert("max_quality".to_string(), max.clone());
    }
    if let Some(bytes) = args.max_file_size_bytes {
        raw.insert("max_file_size_bytes".to_string(), bytes.to_string());
    }
    raw
}

fn load_source(source: &str, guard: &HostAllowlistGuard) -> Result<SourceFile, RepixError> {
    if source.contains("://") {
        guard.check(source)?;
        // Fetching remote sources is the transport layer's job; the CLI
        // only accepts hosts it would be allowed to fetch from
        return Err(RepixError::Io {
            message: format!("remote fetch not supported by the CLI: {}", source),
        });
    }
    SourceFile::from_path(source)
}

fn run(args: &Args, config: &RepixConfig) -> Result<(), RepixError> {
    let guard = HostAllowlistGuard::from_config(config);
    let source = load_source(&args.source, &guard)?;

    let mut pipeline = TransformPipeline::new(ImageRsEngine::new());
    let result = pipeline.transform(&source, &raw_options(args))?;

    if args.print_headers {
        let policy = CacheHeaderPolicy::from_config(config);
        let headers = policy.headers(result.content_type(), result.data.len(), Utc::now());
        for (name, value) in headers.to_pairs() {
            println!("{}: {}", name, value);
        }
    }

    std::fs::write(&args.out, &result.data)?;
    tracing::info!(
        out = %args.out.display(),
        bytes = result.data.len(),
        quality = result.quality,
        width = result.width,
        height = result.height,
        "wrote transformed image"
    );
    Ok(())
}

fn main() {
    let args = Args::parse();

    if let Err(e) = repix::logging::init_subscriber(args.json_logs) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let config = match RepixConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&args, &config) {
        let body = ErrorResponse::from_error(&e, config.environment);
        let rendered = serde_json::to_string(&body)
            .unwrap_or_else(|_| format!("{{\"error\":\"unknown\",\"message\":\"{}\"}}", body.message));
        eprintln!("{}", rendered);
        std::process::exit(1);
    }
}
