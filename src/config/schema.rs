//! Configuration schema types for `sitepipe.toml`
//!
//! Defines the structure and validation rules for sitepipe project configuration.
//! Every section is optional; a missing file yields the same values as an empty one.

use serde::{Deserialize, Serialize};
use super::loader::resolve_path;
use std::path::{Path, PathBuf};

/// Project layout section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Source tree root (images/, fonts/, styles/, scripts/, views/)
    #[serde(default = "default_src")]
    pub src: PathBuf,
    /// Output directory, wiped on every full build
    #[serde(default = "default_out")]
    pub out: PathBuf,
}

fn default_src() -> PathBuf {
    PathBuf::from("src")
}

fn default_out() -> PathBuf {
    PathBuf::from("public")
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self { src: default_src(), out: default_out() }
    }
}

/// Dev server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host name to bind and advertise
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    9000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

impl ServerConfig {
    /// `host:port` pair used for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL pages are rendered with in development mode.
    pub fn dev_base_url(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }
}

/// Watch mode settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
    /// Clear terminal between rebuilds
    #[serde(default)]
    pub clear_screen: bool,
}

fn default_debounce_ms() -> u32 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms(), clear_screen: false }
    }
}

/// Script bundle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptsConfig {
    /// Concatenation priority, as globs relative to the source root.
    /// Files matching an earlier pattern come first; unmatched files go last.
    #[serde(default = "default_order")]
    pub order: Vec<String>,
}

fn default_order() -> Vec<String> {
    vec!["scripts/data/*.js".to_string(), "scripts/*.js".to_string()]
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self { order: default_order() }
    }
}

/// Complete sitepipe.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Source and output directories
    #[serde(default)]
    pub project: ProjectConfig,
    /// Dev server
    #[serde(default)]
    pub server: ServerConfig,
    /// Watch mode
    #[serde(default)]
    pub watch: WatchConfig,
    /// Script bundling
    #[serde(default)]
    pub scripts: ScriptsConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "server.port")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sitepipe.toml: '{}' {}", self.field, self.message)
    }
}

impl SiteConfig {
    /// Validate the configuration and return any errors
    ///
    /// `project.src` and `project.out` are compared after resolving both
    /// against `project_root`, so `out = "."` or `out = "./src"` are caught.
    pub fn validate(&self, project_root: &Path) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.project.src.as_os_str().is_empty() {
            errors.push(ConfigValidationError {
                field: "project.src".to_string(),
                message: "must be a non-empty path".to_string(),
            });
        }

        if self.project.out.as_os_str().is_empty() {
            errors.push(ConfigValidationError {
                field: "project.out".to_string(),
                message: "must be a non-empty path".to_string(),
            });
        } else if !self.project.src.as_os_str().is_empty() {
            if let Some(message) = self.output_layout_error(project_root) {
                errors.push(ConfigValidationError {
                    field: "project.out".to_string(),
                    message: message.to_string(),
                });
            }
        }

        if self.server.host.is_empty() {
            errors.push(ConfigValidationError {
                field: "server.host".to_string(),
                message: "must be a non-empty string".to_string(),
            });
        }

        if self.server.port == 0 {
            errors.push(ConfigValidationError {
                field: "server.port".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        if self.watch.debounce_ms == 0 {
            errors.push(ConfigValidationError {
                field: "watch.debounce_ms".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        for (i, pattern) in self.scripts.order.iter().enumerate() {
            if let Err(e) = glob::Pattern::new(pattern) {
                errors.push(ConfigValidationError {
                    field: format!("scripts.order[{}]", i),
                    message: format!("is not a valid glob: {}", e),
                });
            }
        }

        errors
    }

    /// `clean` removes the output tree, and writes into the sources would
    /// retrigger the watcher.
    fn output_layout_error(&self, project_root: &Path) -> Option<&'static str> {
        let src = resolve_path(project_root, &self.project.src);
        let out = resolve_path(project_root, &self.project.out);

        if out == src {
            Some("must differ from project.src")
        } else if src.starts_with(&out) {
            Some("must not contain project.src")
        } else if out.starts_with(&src) {
            Some("must not be inside project.src")
        } else {
            None
        }
    }
}
