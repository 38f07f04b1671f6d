//! Build context containing configuration and mode for a build.

use crate::config::{resolve_path, SiteConfig};
use crate::pug::Locals;
use rand::Rng;
use std::path::{Path, PathBuf};

/// Environment variable holding the production base URL.
pub const BASEURL_ENV: &str = "BASEURL";

/// Base URL used in production when `BASEURL` is unset.
pub const DEFAULT_PRODUCTION_BASE_URL: &str = "/";

/// Which flavor of site is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    /// Local dev server URLs, no cache busting
    #[default]
    Development,
    /// Deployed URLs with a cache-busting token
    Production,
}

impl BuildMode {
    /// Pick the mode from the `--production` flag.
    pub fn from_flag(production: bool) -> Self {
        if production {
            BuildMode::Production
        } else {
            BuildMode::Development
        }
    }

    /// Whether this is a production build.
    pub fn is_production(&self) -> bool {
        matches!(self, BuildMode::Production)
    }
}

impl std::fmt::Display for BuildMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildMode::Development => write!(f, "development"),
            BuildMode::Production => write!(f, "production"),
        }
    }
}

/// Values exposed to the entry view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
    /// Prefix for every asset and page URL
    pub baseurl: String,
    /// Query string appended to asset URLs; empty in development
    pub version: String,
}

impl RenderContext {
    /// The view locals `baseurl` and `version`.
    pub fn locals(&self) -> Locals {
        Locals::from([
            ("baseurl".to_string(), self.baseurl.clone()),
            ("version".to_string(), self.version.clone()),
        ])
    }
}

/// Generate a fresh `?v=` token of 13 lowercase hex digits.
pub fn cache_bust_token() -> String {
    let bits: u64 = rand::thread_rng().gen::<u64>() & ((1u64 << 52) - 1);
    format!("?v={:013x}", bits)
}

/// Build context containing configuration and paths for a build operation.
///
/// Constructed once at startup and shared by reference with every step.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// The loaded configuration
    config: SiteConfig,
    /// Project root directory (where sitepipe.toml is located)
    project_root: PathBuf,
    /// Development or production
    mode: BuildMode,
    /// Base URL for production renders
    production_base_url: String,
    /// Whether to run in verbose mode
    verbose: bool,
}

impl BuildContext {
    /// Create a new build context.
    ///
    /// In production mode the base URL is read from `BASEURL` here, once.
    pub fn new(config: SiteConfig, project_root: PathBuf, mode: BuildMode) -> Self {
        let production_base_url = std::env::var(BASEURL_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_PRODUCTION_BASE_URL.to_string());
        Self { config, project_root, mode, production_base_url, verbose: false }
    }

    /// Get the configuration.
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Get the build mode.
    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Get the source directory (resolved to absolute path).
    pub fn src_dir(&self) -> PathBuf {
        resolve_path(&self.project_root, &self.config.project.src)
    }

    /// Get the output directory (resolved to absolute path).
    pub fn out_dir(&self) -> PathBuf {
        resolve_path(&self.project_root, &self.config.project.out)
    }

    /// Whether verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Override the production base URL instead of reading `BASEURL`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.production_base_url = base_url.into();
        self
    }

    /// Render context for one markup build.
    ///
    /// Production renders get a new cache-busting token on every call.
    pub fn render_context(&self) -> RenderContext {
        match self.mode {
            BuildMode::Development => RenderContext {
                baseurl: self.config.server.dev_base_url(),
                version: String::new(),
            },
            BuildMode::Production => RenderContext {
                baseurl: self.production_base_url.clone(),
                version: cache_bust_token(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use serial_test::serial;

    #[test]
    fn test_build_context_paths() {
        let ctx =
            BuildContext::new(default_config(), PathBuf::from("/project"), BuildMode::Development);

        assert_eq!(ctx.project_root(), Path::new("/project"));
        assert_eq!(ctx.src_dir(), PathBuf::from("/project/src"));
        assert_eq!(ctx.out_dir(), PathBuf::from("/project/public"));
        assert!(!ctx.is_verbose());
    }

    #[test]
    fn test_development_render_context() {
        let ctx =
            BuildContext::new(default_config(), PathBuf::from("/project"), BuildMode::Development);
        let render = ctx.render_context();

        assert_eq!(render.baseurl, "http://localhost:9000/");
        assert_eq!(render.version, "");
    }

    #[test]
    fn test_production_render_context_token_changes() {
        let ctx = BuildContext::new(default_config(), PathBuf::from("/p"), BuildMode::Production)
            .with_base_url("https://example.com");

        let first = ctx.render_context();
        let second = ctx.render_context();

        assert_eq!(first.baseurl, "https://example.com");
        assert!(first.version.starts_with("?v="));
        assert_eq!(first.version.len(), 16);
        assert_ne!(first.version, second.version);
    }

    #[test]
    #[serial]
    fn test_production_base_url_from_env() {
        std::env::set_var(BASEURL_ENV, "https://cdn.example.org/site/");
        let ctx = BuildContext::new(default_config(), PathBuf::from("/p"), BuildMode::Production);
        std::env::remove_var(BASEURL_ENV);

        assert_eq!(ctx.render_context().baseurl, "https://cdn.example.org/site/");
    }

    #[test]
    #[serial]
    fn test_production_base_url_default() {
        std::env::remove_var(BASEURL_ENV);
        let ctx = BuildContext::new(default_config(), PathBuf::from("/p"), BuildMode::Production);

        assert_eq!(ctx.render_context().baseurl, "/");
    }

    #[test]
    fn test_cache_bust_token_shape() {
        let token = cache_bust_token();
        assert!(token.starts_with("?v="));
        assert!(token[3..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(token[3..].len(), 13);
    }

    #[test]
    fn test_build_mode_from_flag() {
        assert_eq!(BuildMode::from_flag(true), BuildMode::Production);
        assert_eq!(BuildMode::from_flag(false), BuildMode::Development);
        assert!(BuildMode::Production.is_production());
        assert_eq!(BuildMode::Development.to_string(), "development");
    }
}
