mod cli;
mod run;

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_DIRECTIVE: &str = "spatial=info";

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        eprintln!("\n--- spatial-safari crashed ---");
        eprintln!("Windows keep their current positions; restart to resume arranging.");
        eprintln!("------------------------------\n");

        default_hook(info);
    }));
}

fn init_logging(directive: &str) {
    let directive = directive.parse().unwrap_or_else(|_| {
        eprintln!("invalid log directive '{directive}', using {DEFAULT_LOG_DIRECTIVE}");
        DEFAULT_LOG_DIRECTIVE
            .parse()
            .unwrap_or_else(|_| tracing_subscriber::filter::LevelFilter::INFO.into())
    });
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .init();
}

fn main() -> ExitCode {
    install_panic_hook();

    let args = cli::parse();

    // Load config before logging so its level can seed the filter.
    let loaded = spatial_config::load_config(args.config.as_deref());
    let config_directive = loaded
        .as_ref()
        .map(|config| config.logging.level.directive())
        .unwrap_or(DEFAULT_LOG_DIRECTIVE);
    init_logging(args.log_level.as_deref().unwrap_or(config_directive));

    tracing::info!("spatial-safari v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Some(ref path) = args.config {
        tracing::info!("Using config override: {}", path.display());
    }
    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        spatial_config::SpatialConfig::default()
    });
    tracing::info!(
        "Config loaded (application: {}, policy: {})",
        config.target.application,
        config.layout.policy
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let code = runtime.block_on(run::run(args, config));
    tracing::info!("Shutdown complete");
    code
}
