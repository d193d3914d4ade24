use anyhow::Result;
use clap::Parser;
use derma_diagnosis::{
    config::{ClassifierConfig, Config},
    web::serve,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "derma-diagnosis")]
#[command(about = "ONNX-powered skin condition classification service")]
struct Args {
    /// Server bind address
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:5000")]
    bind: String,

    /// ONNX model file
    #[arg(long, env = "MODEL_PATH", default_value = "models/skin_model.onnx")]
    model_path: String,

    /// Directory for uploaded images
    #[arg(long, env = "UPLOAD_FOLDER", default_value = "uploads")]
    upload_dir: String,

    /// Comma separated class labels, in model output order
    #[arg(long, env = "CLASS_LABELS", default_value = "Eczema,Melanoma,Psoriasis")]
    labels: String,

    /// Pixel normalization: unit | mobilenet_v2
    #[arg(long, default_value = "unit")]
    normalization: String,

    /// Input tensor layout: nhwc | nchw
    #[arg(long, default_value = "nhwc")]
    layout: String,

    /// Output activation: auto | softmax | identity
    #[arg(long, default_value = "auto")]
    activation: String,

    /// Model input edge length in pixels
    #[arg(long, default_value_t = 224)]
    image_size: u32,

    /// Number of worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Enable development mode
    #[arg(long)]
    dev: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志系统
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_target(false)
        .init();

    tracing::info!("Starting derma diagnosis service...");
    tracing::info!("Bind address: {}", args.bind);
    tracing::info!("Model path: {}", args.model_path);
    tracing::info!("Upload directory: {}", args.upload_dir);

    let classifier_config = ClassifierConfig {
        labels: ClassifierConfig::parse_labels(&args.labels)?,
        image_size: args.image_size,
        normalization: args.normalization.parse()?,
        layout: args.layout.parse()?,
        activation: args.activation.parse()?,
    };

    let config = Config::new(
        args.bind,
        args.model_path,
        args.upload_dir,
        args.workers,
        args.dev,
        classifier_config,
    )?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers.max(1))
        .enable_all()
        .build()?;

    runtime.block_on(serve(config))?;

    Ok(())
}
