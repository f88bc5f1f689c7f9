//! CLI configuration, loadable from a TOML file named by `MLOG_CONFIG`.

use serde::Deserialize;

use mlog_parse::ParserConfig;

/// Environment variable holding the config file path.
pub const CONFIG_ENV: &str = "MLOG_CONFIG";

/// Top-level configuration for the `mlog` binary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CliConfig {
    /// Connection table settings.
    #[serde(default)]
    pub parser: ParserConfig,
    /// What gets written to stdout.
    #[serde(default)]
    pub output: OutputConfig,
}

/// What the pipeline writes to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// One JSON record per line.
    #[default]
    Entries,
    /// Only the statistics summary at the end.
    Summary,
    /// Only records of lines that failed to decode.
    Errors,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub mode: OutputMode,
    /// Emit lines that are neither NETWORK events nor decoded commands.
    #[serde(default = "default_include_passthrough")]
    pub include_passthrough: bool,
}

fn default_include_passthrough() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::default(),
            include_passthrough: default_include_passthrough(),
        }
    }
}

impl CliConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from the file named by `MLOG_CONFIG`, or defaults when unset.
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }
}
