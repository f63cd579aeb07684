//! Configuration for TTK applications
//!
//! Precedence: CLI > environment variables > config file > defaults.
//! The config file lives at `<config dir>/ttk/config.toml`.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ttk_core::InitOptions;

use crate::BackendKind;

/// CLI arguments for the TTK demo
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "ttk-demo")]
#[command(version)]
#[command(about = "Character-grid demo running on the terminal, CPU or GPU backend", long_about = None)]
pub struct CliArgs {
    /// Path to custom config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Backend to use (auto, terminal, cpu, gpu)
    #[arg(short, long, value_name = "BACKEND")]
    pub backend: Option<String>,

    /// Window title
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Font family name
    #[arg(long, value_name = "FONT")]
    pub font: Option<String>,

    /// Font size in points
    #[arg(long, value_name = "SIZE")]
    pub font_size: Option<f32>,

    /// Grid rows (window backends size the window to fit)
    #[arg(long, value_name = "ROWS")]
    pub rows: Option<usize>,

    /// Grid columns
    #[arg(long, value_name = "COLS")]
    pub cols: Option<usize>,

    /// Use exact RGB colors in the terminal
    #[arg(long)]
    pub fullcolor: bool,

    /// Do not report mouse events
    #[arg(long)]
    pub no_mouse: bool,
}

/// Backend requested by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    /// Pick the recommended backend for the platform
    #[default]
    Auto,
    Terminal,
    Cpu,
    Gpu,
}

impl BackendChoice {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(BackendChoice::Auto),
            "terminal" | "tui" => Some(BackendChoice::Terminal),
            "cpu" | "native" => Some(BackendChoice::Cpu),
            "gpu" => Some(BackendChoice::Gpu),
            _ => None,
        }
    }

    pub fn resolve(self) -> BackendKind {
        match self {
            BackendChoice::Auto => crate::recommended_backend(),
            BackendChoice::Terminal => BackendKind::Terminal,
            BackendChoice::Cpu => BackendKind::Cpu,
            BackendChoice::Gpu => BackendKind::Gpu,
        }
    }
}

/// Font configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontConfig {
    /// Font family name; must be monospace
    #[serde(default = "default_font_family")]
    pub family: String,
    /// Font size in points
    #[serde(default = "default_font_size")]
    pub size: f32,
}

fn default_font_family() -> String {
    InitOptions::default().font_name
}
fn default_font_size() -> f32 {
    InitOptions::default().font_size
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            family: default_font_family(),
            size: default_font_size(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendChoice,

    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default)]
    pub font: FontConfig,

    /// Explicit grid rows (None = derive from the window)
    #[serde(default)]
    pub rows: Option<usize>,

    /// Explicit grid columns (None = derive from the window)
    #[serde(default)]
    pub cols: Option<usize>,

    /// Exact RGB colors on terminals that support them
    #[serde(default = "default_true")]
    pub fullcolor: bool,

    /// Report mouse events
    #[serde(default = "default_true")]
    pub mouse: bool,
}

fn default_title() -> String {
    "TTK Demo".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendChoice::Auto,
            title: default_title(),
            font: FontConfig::default(),
            rows: None,
            cols: None,
            fullcolor: true,
            mouse: true,
        }
    }
}

/// Configuration error
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub message: String,
    pub field: Option<String>,
}

impl ConfigError {
    fn field(field: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(field) = &self.field {
            write!(f, "Config error in '{}': {}", field, self.message)
        } else {
            write!(f, "Config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load configuration with full precedence:
    /// CLI args > environment variables > config file > defaults
    pub fn load_with_args(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        let config_path = args.config.clone().or_else(Self::default_config_path);
        if let Some(path) = &config_path {
            if path.exists() {
                match Self::load_from_file(path) {
                    Ok(file_config) => config = file_config,
                    Err(e) => {
                        log::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        config.apply_env_vars();
        config.apply_cli_args(args)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            message: format!("Failed to read config file: {}", e),
            field: None,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError {
            message: format!("Failed to parse config file: {}", e),
            field: None,
        })
    }

    fn apply_env_vars(&mut self) {
        self.apply_env_from(|key| env::var(key).ok());
    }

    /// Apply `TTK_*` variables read through `lookup`; unparsable values are ignored
    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("TTK_BACKEND") {
            match BackendChoice::from_str(&val) {
                Some(choice) => self.backend = choice,
                None => log::warn!("ignoring unknown TTK_BACKEND '{}'", val),
            }
        }
        if let Some(val) = lookup("TTK_FONT") {
            self.font.family = val;
        }
        if let Some(val) = lookup("TTK_FONT_SIZE") {
            if let Ok(size) = val.parse() {
                self.font.size = size;
            }
        }
    }

    fn apply_cli_args(&mut self, args: &CliArgs) -> Result<(), ConfigError> {
        if let Some(backend) = &args.backend {
            self.backend = BackendChoice::from_str(backend).ok_or_else(|| {
                ConfigError::field(
                    "backend",
                    format!("Unknown backend '{}'. Expected auto, terminal, cpu or gpu", backend),
                )
            })?;
        }
        if let Some(title) = &args.title {
            self.title = title.clone();
        }
        if let Some(family) = &args.font {
            self.font.family = family.clone();
        }
        if let Some(size) = args.font_size {
            self.font.size = size;
        }
        if let Some(rows) = args.rows {
            self.rows = Some(rows);
        }
        if let Some(cols) = args.cols {
            self.cols = Some(cols);
        }
        if args.fullcolor {
            self.fullcolor = true;
        }
        if args.no_mouse {
            self.mouse = false;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(4.0..=200.0).contains(&self.font.size) {
            return Err(ConfigError::field(
                "font.size",
                "Font size must be between 4.0 and 200.0",
            ));
        }
        if self.font.family.trim().is_empty() {
            return Err(ConfigError::field("font.family", "Font family must not be empty"));
        }
        if let Some(rows) = self.rows {
            if !(1..=1000).contains(&rows) {
                return Err(ConfigError::field("rows", "Rows must be between 1 and 1000"));
            }
        }
        if let Some(cols) = self.cols {
            if !(1..=1000).contains(&cols) {
                return Err(ConfigError::field("cols", "Columns must be between 1 and 1000"));
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ttk").join("config.toml"))
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = Self::default_config_path().ok_or("Could not determine config path")?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Renderer parameters for this configuration
    pub fn init_options(&self) -> InitOptions {
        InitOptions {
            title: self.title.clone(),
            font_name: self.font.family.clone(),
            font_size: self.font.size,
            rows: self.rows,
            cols: self.cols,
            ..InitOptions::default()
        }
    }
}
