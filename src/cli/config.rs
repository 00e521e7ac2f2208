//! Config CLI command.

use super::write_json;
use crate::config::ConduitConfig;
use clap::Subcommand;
use std::io::Write;

/// Configuration operations.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration, with secrets masked.
    Show,

    /// Print the default config file location.
    Path,
}

impl ConfigCommand {
    /// Runs the command.
    ///
    /// # Errors
    ///
    /// Returns an error if output cannot be written.
    pub fn run(self, config: &ConduitConfig, out: &mut impl Write) -> anyhow::Result<()> {
        match self {
            Self::Show => write_json(out, &config.redacted()),
            Self::Path => {
                match ConduitConfig::default_path() {
                    Some(path) => writeln!(out, "{}", path.display())?,
                    None => writeln!(out, "(no home directory)")?,
                }
                Ok(())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_prints_redacted_json() {
        let mut out = Vec::new();
        ConfigCommand::Show
            .run(&ConduitConfig::default(), &mut out)
            .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["vector"]["port"], 6333);
        assert_eq!(value["llm"]["api_key"], serde_json::Value::Null);
    }
}
