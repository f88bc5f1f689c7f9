//! mlog: decode a MongoDB server log into JSON lines.
//!
//! Usage: `mlog [INPUT]`, where INPUT defaults to `-` (stdin). Settings come
//! from the TOML file named by `MLOG_CONFIG`, if set.

use tracing_subscriber::EnvFilter;

use mlog_cli::config::CliConfig;
use mlog_cli::pipeline;
use mlog_parse::{FileLineSource, STDIN_PATH};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the records; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "mlog starting");

    // ── Load config ─────────────────────────────────────────────
    let config = CliConfig::from_env()?;
    let input = std::env::args()
        .nth(1)
        .unwrap_or_else(|| STDIN_PATH.to_string());
    tracing::info!(
        input = %input,
        mode = ?config.output.mode,
        "config loaded"
    );

    // ── Decode ──────────────────────────────────────────────────
    let source = FileLineSource;
    let mut stdout = tokio::io::stdout();

    tokio::select! {
        result = pipeline::run(&source, &input, &config, &mut stdout) => {
            let stats = result?;
            tracing::info!(
                decoded_lines = stats.decoded_lines,
                header_mismatches = stats.header_mismatches,
                "mlog finished"
            );
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, stopping");
        }
    }

    Ok(())
}
