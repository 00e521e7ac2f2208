//! LLM CLI command.

use super::write_json;
use crate::config::ConduitConfig;
use crate::llm::{GenerationOptions, LlmClient, decode_structured};
use clap::{Args, Subcommand};
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;

/// Arguments of `conduit llm`.
#[derive(Debug, Args)]
pub struct LlmArgs {
    /// Use the local OpenAI-compatible server instead of the hosted API.
    #[arg(long)]
    pub local: bool,

    /// Model name (overrides configuration).
    #[arg(short, long)]
    pub model: Option<String>,

    /// Maximum tokens to generate.
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    #[arg(short, long)]
    pub temperature: Option<f32>,

    /// System prompt.
    #[arg(short, long)]
    pub system: Option<String>,

    #[command(subcommand)]
    pub command: LlmCommand,
}

/// Chat completion operations.
#[derive(Debug, Subcommand)]
pub enum LlmCommand {
    /// Generate text.
    Generate {
        /// Prompt text.
        prompt: String,
    },

    /// Generate a JSON document and print it.
    Json {
        /// Prompt text.
        prompt: String,
    },

    /// Describe one or more images.
    Images {
        /// Prompt text.
        prompt: String,

        /// Image files, sent in order.
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
}

impl LlmArgs {
    /// Builds the selected client and runs the command.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion fails.
    pub fn run(self, config: &ConduitConfig, out: &mut impl Write) -> anyhow::Result<()> {
        let mut settings = config.llm.clone();
        if let Some(model) = &self.model {
            settings.model.clone_from(model);
        }
        let client = super::clients::build_llm_client(&settings, config.http, self.local);
        self.execute(client.as_ref(), out)
    }

    /// Generation options for the selected command.
    #[must_use]
    pub fn options(&self) -> GenerationOptions {
        let mut options = match self.command {
            LlmCommand::Images { .. } => GenerationOptions::for_images(),
            LlmCommand::Generate { .. } | LlmCommand::Json { .. } => GenerationOptions::default(),
        };
        if let Some(max_tokens) = self.max_tokens {
            options.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            options.temperature = temperature;
        }
        options.system_prompt.clone_from(&self.system);
        options
    }

    /// Runs the command with `client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion fails.
    pub fn execute(self, client: &dyn LlmClient, out: &mut impl Write) -> anyhow::Result<()> {
        let options = self.options();
        match self.command {
            LlmCommand::Generate { prompt } => {
                writeln!(out, "{}", client.generate(&prompt, &options)?)?;
                Ok(())
            },
            LlmCommand::Json { prompt } => {
                let text = client.generate_json_text(&prompt, &options)?;
                let value: Value = decode_structured(&text)?;
                write_json(out, &value)
            },
            LlmCommand::Images { prompt, images } => {
                writeln!(
                    out,
                    "{}",
                    client.generate_with_images(&prompt, &images, &options)?
                )?;
                Ok(())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(command: LlmCommand) -> LlmArgs {
        LlmArgs {
            local: true,
            model: None,
            max_tokens: None,
            temperature: None,
            system: None,
            command,
        }
    }

    #[test]
    fn test_image_options_default_to_warmer_sampling() {
        let options = args(LlmCommand::Images {
            prompt: "describe".to_string(),
            images: vec![PathBuf::from("a.jpg")],
        })
        .options();
        assert_eq!(options, GenerationOptions::for_images());
    }

    #[test]
    fn test_flags_override_options() {
        let mut a = args(LlmCommand::Generate {
            prompt: "hi".to_string(),
        });
        a.max_tokens = Some(10);
        a.system = Some("be terse".to_string());

        let options = a.options();
        assert_eq!(options.max_tokens, 10);
        assert_eq!(options.system_prompt.as_deref(), Some("be terse"));
        assert!(options.temperature.abs() < f32::EPSILON);
    }
}
