//! CLI command definitions.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use vasari::LogFormat;

/// Vasari - rate-limited, cost-accounted LLM completions
#[derive(Parser, Debug)]
#[command(name = "vasari")]
#[command(about = "Rate-limited, cost-accounted LLM completions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log line format
    #[arg(long, global = true, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one completion and print the answer and its cost
    Complete(CompleteArgs),

    /// Show the per-token price of a model
    Pricing {
        /// Model id, e.g. openai/gpt-4o
        #[arg(long)]
        model: String,

        /// Where prices come from
        #[arg(long, value_enum, default_value = "openrouter")]
        provider: Provider,
    },
}

/// Arguments of the `complete` command.
#[derive(Args, Debug)]
pub struct CompleteArgs {
    /// Model id, e.g. openai/gpt-4o
    #[arg(long)]
    pub model: String,

    /// Prompt text
    #[arg(long)]
    pub prompt: String,

    /// Image to attach; may be repeated
    #[arg(long = "image")]
    pub images: Vec<PathBuf>,

    /// JSON schema file the answer must match
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Completion token budget
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Answer identical requests from the completion cache
    #[arg(long)]
    pub cached: bool,

    /// API endpoint family
    #[arg(long, value_enum, default_value = "openrouter")]
    pub provider: Provider,
}

/// API endpoint family.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    /// OpenRouter, priced from its model table
    #[value(name = "openrouter")]
    OpenRouter,
    /// OpenAI, priced from the built-in list prices
    #[value(name = "openai")]
    OpenAi,
}

impl Provider {
    /// Name of the `[providers.<name>]` rate-limit table.
    pub fn config_name(self) -> &'static str {
        match self {
            Provider::OpenRouter => "openrouter",
            Provider::OpenAi => "openai",
        }
    }

    /// Environment variable holding the API key.
    pub fn key_var(self) -> &'static str {
        match self {
            Provider::OpenRouter => "OPENROUTER_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
        }
    }

    /// Base URL to use instead of the configured one, if any.
    pub fn base_url_override(self) -> Option<&'static str> {
        match self {
            Provider::OpenRouter => None,
            Provider::OpenAi => Some("https://api.openai.com/v1"),
        }
    }
}
