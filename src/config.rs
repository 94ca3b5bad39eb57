//! Run configuration with environment variable support.
//!
//! Every flag of the `run` command can also be supplied through an
//! environment variable, which makes the tool easy to drive from CI.
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `COMPARINATOR_CAPTURE_WAIT` | Settle delay after a page load (ms) | `1000` |
//! | `COMPARINATOR_ALPHA_BASE_URL` | Base URL of the alpha deployment | required |
//! | `COMPARINATOR_BETA_BASE_URL` | Base URL of the beta deployment | required |
//! | `COMPARINATOR_TEST_PATH` | Path to start discovery from | `/` |
//! | `COMPARINATOR_WEBDRIVER_URL` | WebDriver endpoint (including port) | required |
//! | `COMPARINATOR_OUTPUT_DIR` | Directory for screenshots and reports | `output` |
//! | `COMPARINATOR_RUN_TITLE` | Title of the run | formatted start time |
//! | `COMPARINATOR_VIEWPORT` | Viewport preset or `WxH` | `desktop` |
//! | `COMPARINATOR_BROWSER` | Browser name requested from WebDriver | `chrome` |

use std::path::PathBuf;

// ============================================================================
// Default Values
// ============================================================================

/// Default settle delay after loading a page (milliseconds)
pub const DEFAULT_CAPTURE_WAIT: u64 = 1000;

/// Default path to start discovery from
pub const DEFAULT_TEST_PATH: &str = "/";

/// Default output directory
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Default viewport preset
pub const DEFAULT_VIEWPORT: &str = "desktop";

/// Default viewport width (pixels)
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1920;

/// Default viewport height (pixels)
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 1280;

/// Default browser requested from the WebDriver endpoint
pub const DEFAULT_BROWSER: &str = "chrome";

// ============================================================================
// Environment Variable Names
// ============================================================================

pub const ENV_CAPTURE_WAIT: &str = "COMPARINATOR_CAPTURE_WAIT";
pub const ENV_ALPHA_BASE_URL: &str = "COMPARINATOR_ALPHA_BASE_URL";
pub const ENV_BETA_BASE_URL: &str = "COMPARINATOR_BETA_BASE_URL";
pub const ENV_TEST_PATH: &str = "COMPARINATOR_TEST_PATH";
pub const ENV_WEBDRIVER_URL: &str = "COMPARINATOR_WEBDRIVER_URL";
pub const ENV_OUTPUT_DIR: &str = "COMPARINATOR_OUTPUT_DIR";
pub const ENV_RUN_TITLE: &str = "COMPARINATOR_RUN_TITLE";
pub const ENV_VIEWPORT: &str = "COMPARINATOR_VIEWPORT";
pub const ENV_BROWSER: &str = "COMPARINATOR_BROWSER";

/// Error raised when the run configuration is unusable
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A required value was empty
    Missing(&'static str),
    /// A value could not be parsed
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(name) => write!(f, "Missing required setting: {}", name),
            ConfigError::Invalid(msg) => write!(f, "Invalid setting: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration for a single comparison run
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Milliseconds to wait after a page load before the screenshot
    pub capture_wait: u64,
    /// Base URL of the alpha deployment (no trailing slash once validated)
    pub alpha_base_url: String,
    /// Base URL of the beta deployment (no trailing slash once validated)
    pub beta_base_url: String,
    /// Path discovery starts from
    pub test_path: String,
    /// WebDriver endpoint
    pub webdriver_url: String,
    /// Root of all run output
    pub output_dir: PathBuf,
    /// Optional run title
    pub title: Option<String>,
    /// Fixed viewport used for every capture
    pub viewport: (u32, u32),
    /// Browser name requested from WebDriver
    pub browser: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            capture_wait: DEFAULT_CAPTURE_WAIT,
            alpha_base_url: String::new(),
            beta_base_url: String::new(),
            test_path: DEFAULT_TEST_PATH.to_string(),
            webdriver_url: String::new(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            title: None,
            viewport: (DEFAULT_VIEWPORT_WIDTH, DEFAULT_VIEWPORT_HEIGHT),
            browser: DEFAULT_BROWSER.to_string(),
        }
    }
}

impl RunConfig {
    pub fn new(alpha_base_url: impl Into<String>, beta_base_url: impl Into<String>) -> Self {
        Self {
            alpha_base_url: alpha_base_url.into(),
            beta_base_url: beta_base_url.into(),
            ..Default::default()
        }
    }

    pub fn capture_wait(mut self, millis: u64) -> Self {
        self.capture_wait = millis;
        self
    }

    pub fn test_path(mut self, path: impl Into<String>) -> Self {
        self.test_path = path.into();
        self
    }

    pub fn webdriver_url(mut self, url: impl Into<String>) -> Self {
        self.webdriver_url = url.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn title(mut self, title: Option<String>) -> Self {
        self.title = title.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = (width, height);
        self
    }

    pub fn browser(mut self, browser: impl Into<String>) -> Self {
        self.browser = browser.into();
        self
    }

    /// Check required settings and normalize the base URLs.
    ///
    /// A trailing `/` is trimmed from both base URLs so that
    /// `base + path` reproduces exactly the URL a path was derived from.
    /// The WebDriver endpoint is only required when `require_webdriver` is set;
    /// offline runs with a scripted browser do not need one.
    pub fn validate(mut self, require_webdriver: bool) -> Result<Self, ConfigError> {
        self.alpha_base_url = normalize_base_url(&self.alpha_base_url);
        self.beta_base_url = normalize_base_url(&self.beta_base_url);

        if self.alpha_base_url.is_empty() {
            return Err(ConfigError::Missing("alpha base URL"));
        }
        if self.beta_base_url.is_empty() {
            return Err(ConfigError::Missing("beta base URL"));
        }
        if require_webdriver && self.webdriver_url.trim().is_empty() {
            return Err(ConfigError::Missing("webdriver URL"));
        }
        if self.viewport.0 == 0 || self.viewport.1 == 0 {
            return Err(ConfigError::Invalid(format!(
                "viewport {}x{} has a zero dimension",
                self.viewport.0, self.viewport.1
            )));
        }
        if self.test_path.is_empty() {
            self.test_path = DEFAULT_TEST_PATH.to_string();
        }
        Ok(self)
    }
}

/// Trim whitespace and any trailing `/` from a base URL
pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Parse a viewport string into (width, height)
/// Supports: "desktop" (1920x1280), "laptop" (1366x768), "tablet" (768x1024),
/// "mobile" (375x812), or "WxH"
pub fn parse_viewport(size: &str) -> Option<(u32, u32)> {
    match size.trim().to_lowercase().as_str() {
        "desktop" => Some((DEFAULT_VIEWPORT_WIDTH, DEFAULT_VIEWPORT_HEIGHT)),
        "laptop" => Some((1366, 768)),
        "tablet" => Some((768, 1024)),
        "mobile" => Some((375, 812)),
        custom => {
            let (w, h) = custom.split_once('x')?;
            let w: u32 = w.parse().ok()?;
            let h: u32 = h.parse().ok()?;
            if w == 0 || h == 0 {
                None
            } else {
                Some((w, h))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_viewport_presets() {
        assert_eq!(parse_viewport("desktop"), Some((1920, 1280)));
        assert_eq!(parse_viewport("Laptop"), Some((1366, 768)));
        assert_eq!(parse_viewport("tablet"), Some((768, 1024)));
        assert_eq!(parse_viewport("mobile"), Some((375, 812)));
    }

    #[test]
    fn test_parse_viewport_custom() {
        assert_eq!(parse_viewport("1024x768"), Some((1024, 768)));
        assert_eq!(parse_viewport("0x768"), None);
        assert_eq!(parse_viewport("wide"), None);
        assert_eq!(parse_viewport("1024"), None);
    }

    #[test]
    fn test_validate_trims_base_urls() {
        let config = RunConfig::new("http://alpha.test/", " http://beta.test// ")
            .validate(false)
            .unwrap();
        assert_eq!(config.alpha_base_url, "http://alpha.test");
        assert_eq!(config.beta_base_url, "http://beta.test");
    }

    #[test]
    fn test_validate_requires_urls() {
        assert_eq!(
            RunConfig::new("", "http://beta.test").validate(false),
            Err(ConfigError::Missing("alpha base URL"))
        );
        assert_eq!(
            RunConfig::new("http://alpha.test", "http://beta.test").validate(true),
            Err(ConfigError::Missing("webdriver URL"))
        );
    }

    #[test]
    fn test_blank_title_is_dropped() {
        let config = RunConfig::new("a", "b").title(Some("  ".to_string()));
        assert_eq!(config.title, None);
    }

    #[test]
    fn test_config_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.capture_wait, DEFAULT_CAPTURE_WAIT);
        assert_eq!(config.test_path, "/");
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.viewport, (1920, 1280));
    }
}
