//! Configuration management for cityio-kpi.
//!
//! This module handles the layered configuration system with the following precedence:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. JSON config file
//! 4. Default values (lowest priority)
//!
//! The JSON file accepts the flat `input_url` / `output_url` keys of the
//! classic `config.json` next to the nested `processing` and `server` sections.

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::crs::Crs;
use crate::error::{KpiError, Result};
use crate::features::GeometryMode;

/// Command-line arguments for cityio-kpi
#[derive(Parser, Debug)]
#[command(name = "cityio-kpi")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to JSON configuration file
    #[arg(short, long, global = true, env = "CITYIO_KPI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base URL of the table; `header`, `grid` and `meta/hashes/grid` are appended
    #[arg(long, global = true, env = "CITYIO_KPI_INPUT_URL")]
    pub input_url: Option<String>,

    /// URL the KPI result is posted to
    #[arg(long, global = true, env = "CITYIO_KPI_OUTPUT_URL")]
    pub output_url: Option<String>,

    /// File holding a bearer token (first line; empty file means no token)
    #[arg(long, global = true, env = "CITYIO_KPI_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Path to the category catalog
    #[arg(long, global = true, env = "CITYIO_KPI_TYPEDEFS")]
    pub typedefs: Option<PathBuf>,

    /// CRS of the header's latitude/longitude
    #[arg(long, global = true, env = "CITYIO_KPI_INPUT_CRS")]
    pub input_crs: Option<String>,

    /// Metric CRS the grid is laid out in
    #[arg(long, global = true, env = "CITYIO_KPI_COMPUTE_CRS")]
    pub compute_crs: Option<String>,

    /// CRS of the emitted GeoJSON
    #[arg(long, global = true, env = "CITYIO_KPI_OUTPUT_CRS")]
    pub output_crs: Option<String>,

    /// Geometry to emit next to the totals
    #[arg(long, global = true, env = "CITYIO_KPI_GEOMETRY", value_enum)]
    pub geometry: Option<GeometryMode>,

    /// Emit a bare feature array or a full FeatureCollection
    #[arg(long, global = true, env = "CITYIO_KPI_OUTPUT_FORM", value_enum)]
    pub output_form: Option<OutputForm>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "CITYIO_KPI_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// What the binary does
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch the table once, evaluate it and post the result
    Run,
    /// Serve POST /evaluate and GET /heartbeat
    Serve {
        /// Host address to bind to
        #[arg(short = 'H', long, env = "CITYIO_KPI_HOST")]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long, env = "CITYIO_KPI_PORT")]
        port: Option<u16>,
    },
}

/// How features are placed in the result record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputForm {
    /// `features`: a bare array of features
    Features,
    /// `geojson`: a full FeatureCollection
    #[default]
    Geojson,
}

/// cityIO endpoints and credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CityIoConfig {
    /// Base URL for reads
    #[serde(default)]
    pub input_url: String,

    /// URL for the result post
    #[serde(default)]
    pub output_url: String,

    /// Bearer token
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// File to read the bearer token from when `token` is unset
    #[serde(default)]
    pub token_file: Option<PathBuf>,
}

/// Evaluation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Category catalog, reloaded every cycle
    #[serde(default = "default_typedefs_path")]
    pub typedefs_path: PathBuf,

    #[serde(default = "default_input_crs")]
    pub input_crs: String,

    #[serde(default = "default_compute_crs")]
    pub compute_crs: String,

    #[serde(default = "default_output_crs")]
    pub output_crs: String,

    #[serde(default)]
    pub geometry: GeometryMode,

    #[serde(default)]
    pub output_form: OutputForm,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Complete configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// cityIO endpoints (flat keys in the file)
    #[serde(flatten)]
    pub cityio: CityIoConfig,

    /// Evaluation settings
    #[serde(default)]
    pub processing: ProcessingConfig,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with proper precedence
    pub fn load() -> Result<(Self, Command)> {
        let args = Args::parse();

        // Start with defaults
        let mut config = Config::default();

        // Load from JSON file if provided
        if let Some(config_path) = &args.config {
            let json_config = Self::load_from_file(config_path)?;
            config.merge(json_config);
        }

        config.apply_args(&args);

        Ok((config, args.command))
    }

    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if !other.cityio.input_url.is_empty() {
            self.cityio.input_url = other.cityio.input_url;
        }
        if !other.cityio.output_url.is_empty() {
            self.cityio.output_url = other.cityio.output_url;
        }
        if other.cityio.token.is_some() {
            self.cityio.token = other.cityio.token;
        }
        if other.cityio.token_file.is_some() {
            self.cityio.token_file = other.cityio.token_file;
        }
        self.processing = other.processing;
        self.server = other.server;
        self.log_level = other.log_level;
    }

    /// Override with command-line arguments and environment variables
    fn apply_args(&mut self, args: &Args) {
        if let Some(url) = &args.input_url {
            self.cityio.input_url = url.clone();
        }
        if let Some(url) = &args.output_url {
            self.cityio.output_url = url.clone();
        }
        if args.token_file.is_some() {
            self.cityio.token_file = args.token_file.clone();
        }
        if let Some(path) = &args.typedefs {
            self.processing.typedefs_path = path.clone();
        }
        if let Some(crs) = &args.input_crs {
            self.processing.input_crs = crs.clone();
        }
        if let Some(crs) = &args.compute_crs {
            self.processing.compute_crs = crs.clone();
        }
        if let Some(crs) = &args.output_crs {
            self.processing.output_crs = crs.clone();
        }
        if let Some(geometry) = args.geometry {
            self.processing.geometry = geometry;
        }
        if let Some(form) = args.output_form {
            self.processing.output_form = form;
        }
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
        if let Command::Serve { host, port } = &args.command {
            if let Some(host) = host {
                self.server.host = host.clone();
            }
            if let Some(port) = port {
                self.server.port = *port;
            }
        }
    }

    /// Validate the settings shared by every command
    pub fn validate(&self) -> Result<()> {
        // Validate log level
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(KpiError::Config {
                    message: format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        self.log_level
                    ),
                });
            }
        }

        self.processing.crs_chain().map_err(|e| KpiError::Config {
            message: e.to_string(),
        })?;

        Ok(())
    }

    /// Validate the settings a single fetch/post cycle needs
    pub fn validate_for_run(&self) -> Result<()> {
        self.validate()?;

        if self.cityio.input_url.is_empty() {
            return Err(KpiError::Config {
                message: "input_url cannot be empty".to_string(),
            });
        }
        if self.cityio.output_url.is_empty() {
            return Err(KpiError::Config {
                message: "output_url cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Validate the settings the HTTP server needs
    pub fn validate_for_serve(&self) -> Result<()> {
        self.validate()?;

        if self.server.host.is_empty() {
            return Err(KpiError::Config {
                message: "Server host cannot be empty".to_string(),
            });
        }

        // Validate port (0 is not a valid port for users)
        if self.server.port == 0 {
            return Err(KpiError::Config {
                message: "Server port cannot be 0".to_string(),
            });
        }

        Ok(())
    }
}

impl CityIoConfig {
    /// The bearer token, read from `token_file` when not set directly
    pub fn resolve_token(&self) -> Result<Option<String>> {
        if let Some(token) = &self.token {
            return Ok(Some(token.clone()).filter(|t| !t.is_empty()));
        }

        let Some(path) = &self.token_file else {
            return Ok(None);
        };

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(content
            .lines()
            .next()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty()))
    }
}

impl ProcessingConfig {
    /// Parse the input, compute and output CRSs
    pub fn crs_chain(&self) -> Result<(Crs, Crs, Crs)> {
        Ok((
            Crs::parse(&self.input_crs)?,
            Crs::parse(&self.compute_crs)?,
            Crs::parse(&self.output_crs)?,
        ))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cityio: CityIoConfig::default(),
            processing: ProcessingConfig::default(),
            server: ServerConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            typedefs_path: default_typedefs_path(),
            input_crs: default_input_crs(),
            compute_crs: default_compute_crs(),
            output_crs: default_output_crs(),
            geometry: GeometryMode::default(),
            output_form: OutputForm::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

// Default value functions for serde
fn default_typedefs_path() -> PathBuf {
    PathBuf::from("typedefs.json")
}

fn default_input_crs() -> String {
    "EPSG:4326".to_string()
}

fn default_compute_crs() -> String {
    "EPSG:25832".to_string()
}

fn default_output_crs() -> String {
    "EPSG:4326".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}
