//! easyauth dev server entry point.

use std::path::PathBuf;

use anyhow::Context;
use tracing::{error, info};

use easyauth_devserver::config::LoggingSettings;
use easyauth_devserver::{init_logging, DevServer, DevServerConfig, DevServerError};

/// Command-line arguments.
struct Args {
    /// Path to configuration file.
    config: Option<PathBuf>,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    config = args.next().map(PathBuf::from);
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("easyauth-devserver {}", easyauth_devserver::VERSION);
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
            }
        }

        Self { config }
    }
}

fn print_help() {
    println!(
        r"easyauth dev server - local gatekeeper for App Service authentication

USAGE:
    easyauth-devserver [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file (TOML or JSON)
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT VARIABLES:
    EASYAUTH_LISTEN_ADDR        Address to bind (default: 127.0.0.1)
    EASYAUTH_LISTEN_PORT        Port to listen on (default: 3000)
    EASYAUTH_BACKEND_URL        Local app receiving pass-through requests
    EASYAUTH_BACKEND_TIMEOUT    Backend timeout in seconds (default: 30)
    EASYAUTH_REMOTE_HOST        Deployed site host name (required)
    EASYAUTH_ALLOW_ORIGIN       CORS origin (default: http://localhost:<port>)
    EASYAUTH_UPSTREAM_TIMEOUT   Session call timeout in seconds (default: 30)
    EASYAUTH_LOG_LEVEL          Log filter (default: info, RUST_LOG wins)
    EASYAUTH_LOG_JSON           Emit JSON logs (default: false)

EXAMPLES:
    # Run with configuration file
    easyauth-devserver --config easyauth.toml

    # Run with environment variables
    EASYAUTH_REMOTE_HOST=myapp.azurewebsites.net easyauth-devserver
"
    );
}

fn load_config(args: &Args) -> Result<DevServerConfig, DevServerError> {
    let config = match &args.config {
        Some(path) => DevServerConfig::from_file(path)?,
        None => DevServerConfig::default(),
    };
    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

async fn run(config: DevServerConfig) -> anyhow::Result<()> {
    info!(
        version = easyauth_devserver::VERSION,
        listen_addr = %config.server.listen_addr,
        listen_port = config.server.listen_port,
        "starting easyauth dev server"
    );

    let server = DevServer::new(config).context("failed to create server")?;
    server.run().await.context("server error")?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let loaded = load_config(&args);

    let logging = loaded
        .as_ref()
        .map_or_else(|_| LoggingSettings::default(), |c| c.logging.clone());
    if let Err(e) = init_logging(&logging) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!(category = e.category(), error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        let message = format!("{e:#}");
        error!(error = %message, "dev server stopped");
        std::process::exit(1);
    }
}
