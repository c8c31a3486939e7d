// src/cli.rs

use crate::models::EnvMap;
use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand};

/// ccr: runs Claude Code against the local model router.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch `claude` with router settings. Unrecognized flags are passed through.
    Code(CodeArgs),
}

#[derive(Args, Debug, Default, Clone)]
pub struct CodeArgs {
    /// Name of an installed preset (`~/.claude-code-router/presets/<name>`).
    #[arg(long)]
    pub preset: Option<String>,

    /// Extra environment for the child's settings (e.g., "KEY=VALUE").
    #[arg(long = "env", value_name = "KEY=VALUE", value_delimiter = ',')]
    pub env: Vec<String>,

    /// Arguments for `claude`, e.g. `--model opus -p "explain this"`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl CodeArgs {
    /// Parses the `--env` pairs. `None` when no pair was given.
    pub fn env_overrides(&self) -> Result<Option<EnvMap>> {
        if self.env.is_empty() {
            return Ok(None);
        }
        self.env
            .iter()
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
                _ => Err(anyhow!(t!("cli.error.invalid_env"), value = pair)),
            })
            .collect::<Result<EnvMap>>()
            .map(Some)
    }
}
