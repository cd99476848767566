use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use viewfinder::{
    CameraProvider, HeadlessSurface, StaticPermissions, StdoutDisplay, ViewfinderApp,
    ViewfinderConfig,
};

#[derive(Parser, Debug)]
#[command(name = "viewfinder")]
#[command(about = "Permission-gated live camera preview with per-frame analysis")]
#[command(version)]
#[command(long_about = "Captures a live camera stream, keeps the preview output upright \
across the four fixed display orientations, and runs a per-frame analysis probe whose \
latest value is rendered to a text display.")]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "viewfinder.toml",
        help = "Path to TOML configuration file"
    )]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - construct the pipeline but don't start it
    #[arg(long, help = "Perform dry run - wire components but don't start them")]
    dry_run: bool,

    /// Use the synthetic camera provider instead of real hardware
    #[arg(long, help = "Use the synthetic frame generator instead of a device camera")]
    mock_camera: bool,

    /// Override log format (json, pretty, compact)
    #[arg(
        long,
        value_name = "FORMAT",
        help = "Log output format: json, pretty, or compact"
    )]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        println!("{}", ViewfinderConfig::default_toml()?);
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting viewfinder v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match ViewfinderConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let provider = build_provider(&args, &config)?;
    let permissions = Arc::new(StaticPermissions::new(
        config.permission.pre_granted.clone(),
    ));
    let surface = Arc::new(HeadlessSurface::new(config.preview.surface_size));

    let mut app = ViewfinderApp::new(
        config,
        provider,
        permissions,
        surface,
        Arc::new(StdoutDisplay),
    )?;

    if args.dry_run {
        info!("Dry run mode - components wired but not started");
        println!("✓ Dry run completed successfully");
        return Ok(());
    }

    app.run().await.map_err(|e| {
        error!("Viewfinder exited with error: {}", e);
        e
    })?;

    Ok(())
}

#[cfg(all(target_os = "linux", feature = "camera"))]
fn build_provider(args: &Args, config: &ViewfinderConfig) -> Result<Arc<dyn CameraProvider>> {
    if args.mock_camera {
        info!("Using synthetic camera provider");
        return Ok(Arc::new(viewfinder::MockCameraProvider::new()));
    }
    let provider = viewfinder::GstCameraProvider::new(config.camera.clone())?;
    Ok(Arc::new(provider))
}

#[cfg(not(all(target_os = "linux", feature = "camera")))]
fn build_provider(args: &Args, _config: &ViewfinderConfig) -> Result<Arc<dyn CameraProvider>> {
    if !args.mock_camera {
        info!("Device camera backend unavailable on this build; using synthetic provider");
    }
    Ok(Arc::new(viewfinder::MockCameraProvider::new()))
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("viewfinder={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}
