//! Comparinator - visual regression testing between two deployments.
//!
//! This crate provides:
//! - Link discovery from a start page on the alpha deployment
//! - Per-page capture on both deployments through a `BrowserDriver`
//!   (W3C WebDriver, or the scripted `MockBrowser` for tests)
//! - Content-addressed storage of screenshots and diff images
//! - Pixel similarity scoring and run-level aggregation
//! - JSON and HTML reports
//!
//! # Example
//!
//! ```rust,no_run
//! use comparinator::{PixelDiff, RunAggregator, RunConfig, WebDriverSession, write_reports};
//!
//! let config = RunConfig::new("https://www.example.com", "https://staging.example.com")
//!     .webdriver_url("http://localhost:4444")
//!     .validate(true)
//!     .unwrap();
//! let mut driver = WebDriverSession::connect(&config.webdriver_url, &config.browser).unwrap();
//! let result = RunAggregator::new(&config).run(&mut driver, &PixelDiff::default()).unwrap();
//! write_reports(&result, &config.output_dir);
//! ```

pub mod compare;
pub mod config;
pub mod registry;
pub mod report;
pub mod runner;
pub mod snapshot;

pub use compare::{CompareError, CompareResult, CompareStep, PageComparator, Side};
pub use config::{ConfigError, RunConfig};
pub use registry::{LinkRegistry, derive_path};
pub use report::{render_html, write_reports};
pub use runner::{PageRecord, RunAggregator, RunError, RunOutcome, RunResult, round2};
pub use snapshot::{
    ArtifactCategory, ArtifactRef, ArtifactStore, BrowserDriver, DiffOutcome, Framebuffer,
    ImageDiffer, MockBrowser, PixelDiff, SnapshotError, SnapshotResult, WebDriverSession,
};
