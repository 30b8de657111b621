use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod codec;
mod config;
mod engine;
mod error;
mod preprocessing;
mod server;

#[derive(Parser, Debug)]
#[command(name = "page-enhancer-server")]
#[command(about = "Document-image enhancement server for handwritten and printed pages")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "ENHANCE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "ENHANCE_PORT", default_value = "9393")]
    pub port: u16,

    /// Maximum upload size per page in bytes (default: 50MB)
    #[arg(long, env = "ENHANCE_MAX_FILE_SIZE", default_value = "52428800")]
    pub max_file_size: usize,

    /// Long-edge cap applied before enhancement, in pixels
    #[arg(long, env = "ENHANCE_MAX_LONG_EDGE", default_value = "1024")]
    pub max_long_edge: u32,

    /// Gamma used by tone normalization (exponent is 1/gamma)
    #[arg(long, env = "ENHANCE_GAMMA", default_value = "0.8")]
    pub gamma: f32,

    /// Adaptive threshold window is max(min_window, width / window_divisor)
    #[arg(long, env = "ENHANCE_WINDOW_DIVISOR", default_value = "40")]
    pub window_divisor: u32,

    /// Smallest adaptive threshold half-window, in pixels
    #[arg(long, env = "ENHANCE_MIN_WINDOW", default_value = "10")]
    pub min_window: u32,

    /// Constant subtracted from the local mean before the ink decision
    #[arg(long, env = "ENHANCE_THRESHOLD_BIAS", default_value = "8")]
    pub threshold_bias: f32,

    /// Skew search covers -N..=N degrees in 1 degree steps
    #[arg(long, env = "ENHANCE_SKEW_MAX_DEGREES", default_value = "5")]
    pub skew_max_degrees: i32,

    /// Also evaluate 0 degrees during the skew search
    #[arg(long, env = "ENHANCE_SKEW_INCLUDE_ZERO")]
    pub skew_include_zero: bool,

    /// Skew search samples every n-th pixel in both axes
    #[arg(long, env = "ENHANCE_SKEW_SAMPLE_STRIDE", default_value = "4")]
    pub skew_sample_stride: usize,

    /// JPEG quality (1-100) of the enhanced output
    #[arg(long, env = "ENHANCE_JPEG_QUALITY", default_value = "90")]
    pub jpeg_quality: u8,

    /// Abort a page that takes longer than this many seconds
    #[arg(long, env = "ENHANCE_PAGE_TIMEOUT_SECS")]
    pub page_timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::try_from(args)?;

    tracing::info!(
        "Starting page-enhancer-server v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!("Binding to {}:{}", config.host, config.port);

    server::run(config).await
}
