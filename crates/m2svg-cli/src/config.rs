use anyhow::Context;
use clap::Args;
use m2svg_render::{NamingPolicy, OutputFormat, OutputMode};
use m2svg_scan::{RecoveryPolicy, ScanOptions};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings of a `convert` run.
///
/// Loaded from a JSON file with `--config`; every field is optional there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    pub mode: OutputMode,
    pub naming: NamingPolicy,
    /// Artifact directory, relative to the output document.
    pub images_dir: PathBuf,
    /// Renderer program; defaults to `tex2svg` or `tex2mml` by mode.
    pub renderer: Option<String>,
    pub renderer_args: Vec<String>,
    pub recovery: RecoveryPolicy,
    pub inline_errors: bool,
    /// `None` means on in image mode.
    pub nowrap: Option<bool>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::Image,
            naming: NamingPolicy::Serial,
            images_dir: PathBuf::from("images"),
            renderer: None,
            renderer_args: Vec::new(),
            recovery: RecoveryPolicy::Discard,
            inline_errors: false,
            nowrap: None,
        }
    }
}

impl ConvertConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn format(&self) -> OutputFormat {
        match self.mode {
            OutputMode::MathMl => OutputFormat::MathMl,
            OutputMode::Image | OutputMode::Svg => OutputFormat::Svg,
        }
    }

    /// The nowrap pass only applies to `<img>` placeholders.
    pub fn nowrap_enabled(&self) -> bool {
        self.mode == OutputMode::Image && self.nowrap.unwrap_or(true)
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            policy: self.recovery,
            inline_faults: self.inline_errors,
        }
    }
}

/// Parses a lowercase enum value the same way the config file does.
fn parse_value<T: DeserializeOwned>(value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| format!("invalid value `{}`", value))
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Document to convert
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Where to write the converted document
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// JSON file with default settings
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// image, svg or mathml
    #[arg(long, value_parser = parse_value::<OutputMode>)]
    pub mode: Option<OutputMode>,

    /// serial or hash
    #[arg(long, value_parser = parse_value::<NamingPolicy>)]
    pub naming: Option<NamingPolicy>,

    #[arg(long, value_name = "DIR")]
    pub images_dir: Option<PathBuf>,

    /// Renderer program to run instead of tex2svg/tex2mml
    #[arg(long, value_name = "PROGRAM")]
    pub renderer: Option<String>,

    /// Extra argument passed to the renderer (repeatable)
    #[arg(long = "renderer-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub renderer_args: Vec<String>,

    /// discard or literal
    #[arg(long, value_parser = parse_value::<RecoveryPolicy>)]
    pub recovery: Option<RecoveryPolicy>,

    /// Write error markers into the output document
    #[arg(long)]
    pub inline_errors: bool,

    /// Keep inline images together with adjacent punctuation
    #[arg(long, overrides_with = "no_nowrap")]
    pub nowrap: bool,

    /// Leave inline images free to wrap
    #[arg(long, overrides_with = "nowrap")]
    pub no_nowrap: bool,

    /// Write diagnostics as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub diagnostics: Option<PathBuf>,

    /// Suppress progress output
    #[arg(long, short)]
    pub quiet: bool,
}

impl ConvertArgs {
    /// Loads `--config` if given and applies the explicit flags on top.
    pub fn resolve(&self) -> anyhow::Result<ConvertConfig> {
        let mut config = match &self.config {
            Some(path) => ConvertConfig::load(path)?,
            None => ConvertConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut ConvertConfig) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(naming) = self.naming {
            config.naming = naming;
        }
        if let Some(dir) = &self.images_dir {
            config.images_dir = dir.clone();
        }
        if let Some(renderer) = &self.renderer {
            config.renderer = Some(renderer.clone());
        }
        if !self.renderer_args.is_empty() {
            config.renderer_args = self.renderer_args.clone();
        }
        if let Some(recovery) = self.recovery {
            config.recovery = recovery;
        }
        if self.inline_errors {
            config.inline_errors = true;
        }
        if self.nowrap {
            config.nowrap = Some(true);
        } else if self.no_nowrap {
            config.nowrap = Some(false);
        }
    }
}
