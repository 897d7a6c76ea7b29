//! ringbus - in-process multi-service runtime
//!
//! Thin CLI wrapper around [`ringbus::startup::start`]: `ringbus
//! [config_path]`, defaulting to `"config"`.

use clap::Parser;

/// In-process multi-service runtime driven by a Lua config script.
#[derive(Debug, Parser)]
#[command(name = "ringbus")]
struct Cli {
    /// Path to the config script to evaluate at startup.
    #[arg(default_value = "config")]
    config_path: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let code = ringbus::startup::start(&cli.config_path).await;
    std::process::exit(code);
}
