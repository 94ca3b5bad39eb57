//! Capture of one path on both deployments and its similarity record.

use std::io::Cursor;
use std::thread;
use std::time::Duration;
use tracing::debug;

use crate::config::RunConfig;
use crate::runner::PageRecord;
use crate::snapshot::{
    ArtifactCategory, ArtifactRef, ArtifactStore, BrowserDriver, ImageDiffer, SnapshotError,
};

/// Deployment a capture is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Alpha,
    Beta,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Alpha => write!(f, "alpha"),
            Side::Beta => write!(f, "beta"),
        }
    }
}

/// Step of a page comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareStep {
    ResizeViewport,
    LoadPage(Side),
    Screenshot(Side),
    StoreScreenshot(Side),
    Diff,
    EncodeDiff,
    StoreDiff,
}

impl std::fmt::Display for CompareStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareStep::ResizeViewport => write!(f, "resizing viewport"),
            CompareStep::LoadPage(side) => write!(f, "loading {} page", side),
            CompareStep::Screenshot(side) => write!(f, "taking {} screenshot", side),
            CompareStep::StoreScreenshot(side) => write!(f, "storing {} screenshot", side),
            CompareStep::Diff => write!(f, "comparing screenshots"),
            CompareStep::EncodeDiff => write!(f, "encoding diff image"),
            CompareStep::StoreDiff => write!(f, "storing diff image"),
        }
    }
}

/// Result type for page comparisons
pub type CompareResult<T> = Result<T, CompareError>;

/// Failure of a single page comparison
#[derive(Debug)]
pub struct CompareError {
    /// Path whose comparison failed
    pub path: String,
    /// Step that failed
    pub step: CompareStep,
    /// Underlying error
    pub source: SnapshotError,
}

impl std::fmt::Display for CompareError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed while {}: {}", self.path, self.step, self.source)
    }
}

impl std::error::Error for CompareError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Captures and diffs one path at a time on both deployments
pub struct PageComparator<'a> {
    driver: &'a mut dyn BrowserDriver,
    differ: &'a dyn ImageDiffer,
    store: &'a ArtifactStore,
    alpha_base_url: &'a str,
    beta_base_url: &'a str,
    capture_wait: Duration,
    viewport: (u32, u32),
}

impl<'a> PageComparator<'a> {
    pub fn new(
        config: &'a RunConfig,
        driver: &'a mut dyn BrowserDriver,
        differ: &'a dyn ImageDiffer,
        store: &'a ArtifactStore,
    ) -> Self {
        Self {
            driver,
            differ,
            store,
            alpha_base_url: &config.alpha_base_url,
            beta_base_url: &config.beta_base_url,
            capture_wait: Duration::from_millis(config.capture_wait),
            viewport: config.viewport,
        }
    }

    /// Compare `record.path` on both deployments.
    ///
    /// Returns the populated record; the input record is left untouched so a
    /// failed comparison leaves nothing half-written behind.
    pub fn compare(&mut self, record: &PageRecord) -> CompareResult<PageRecord> {
        let path = record.path.as_str();
        let fail = |step: CompareStep| {
            move |source: SnapshotError| CompareError {
                path: path.to_string(),
                step,
                source,
            }
        };

        let (width, height) = self.viewport;
        self.driver
            .resize_viewport(width, height)
            .map_err(fail(CompareStep::ResizeViewport))?;

        let (alpha_ref, alpha_bytes) = self.capture(Side::Alpha, path)?;
        let (beta_ref, beta_bytes) = self.capture(Side::Beta, path)?;

        let outcome = self
            .differ
            .compare(&alpha_bytes, &beta_bytes)
            .map_err(fail(CompareStep::Diff))?;

        let mut encoded = Vec::new();
        outcome
            .image
            .write_to(&mut Cursor::new(&mut encoded), image::ImageFormat::Png)
            .map_err(|e| fail(CompareStep::EncodeDiff)(e.into()))?;

        let diff_ref = self
            .store
            .put(ArtifactCategory::Diff, &encoded)
            .map_err(fail(CompareStep::StoreDiff))?;

        let similarity = (100.0 - outcome.dissimilarity).clamp(0.0, 100.0);
        debug!(%path, similarity, "page compared");

        let mut updated = record.clone();
        updated.captured = true;
        updated.alpha_screenshot_file = alpha_ref.path;
        updated.beta_screenshot_file = beta_ref.path;
        updated.similarity = similarity;
        updated.diff_file = diff_ref.path;
        Ok(updated)
    }

    /// Load `base + path`, let it settle, screenshot it and store the image
    fn capture(&mut self, side: Side, path: &str) -> CompareResult<(ArtifactRef, Vec<u8>)> {
        let base = match side {
            Side::Alpha => self.alpha_base_url,
            Side::Beta => self.beta_base_url,
        };
        let url = format!("{}{}", base, path);
        let fail = |step: CompareStep| {
            move |source: SnapshotError| CompareError {
                path: path.to_string(),
                step,
                source,
            }
        };

        self.driver
            .load_page(&url)
            .map_err(fail(CompareStep::LoadPage(side)))?;

        if !self.capture_wait.is_zero() {
            thread::sleep(self.capture_wait);
        }

        let bytes = self
            .driver
            .screenshot()
            .map_err(fail(CompareStep::Screenshot(side)))?;
        let stored = self
            .store
            .put(ArtifactCategory::Screenshot, &bytes)
            .map_err(fail(CompareStep::StoreScreenshot(side)))?;

        debug!(%url, file = %stored.path.display(), "captured page");
        Ok((stored, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Framebuffer, MockBrowser, PixelDiff};
    use tempfile::TempDir;

    const ALPHA: &str = "http://alpha.test";
    const BETA: &str = "http://beta.test";

    fn config() -> RunConfig {
        RunConfig::new(ALPHA, BETA).capture_wait(0).viewport(640, 480)
    }

    #[test]
    fn test_identical_pages_are_fully_similar() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let screen = Framebuffer::with_color(16, 16, [10, 20, 30]);
        let mut browser = MockBrowser::new()
            .page(format!("{}/", ALPHA), &screen, Vec::<String>::new())
            .unwrap()
            .page(format!("{}/", BETA), &screen, Vec::<String>::new())
            .unwrap();
        let config = config();
        let differ = PixelDiff::default();

        let record = PageRecord::pending("/");
        let updated = PageComparator::new(&config, &mut browser, &differ, &store)
            .compare(&record)
            .unwrap();

        assert!(updated.captured);
        assert_eq!(updated.similarity, 100.0);
        // Identical content shares a single stored screenshot
        assert_eq!(updated.alpha_screenshot_file, updated.beta_screenshot_file);
        assert!(updated.diff_file.exists());
        assert_eq!(browser.viewport(), Some((640, 480)));
    }

    #[test]
    fn test_partial_difference() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let alpha = Framebuffer::with_color(10, 10, [255, 255, 255]);
        let mut beta = alpha.clone();
        beta.draw_rect(0, 0, 10, 2, [0, 0, 0]);
        let mut browser = MockBrowser::new()
            .page(format!("{}/pricing", ALPHA), &alpha, Vec::<String>::new())
            .unwrap()
            .page(format!("{}/pricing", BETA), &beta, Vec::<String>::new())
            .unwrap();
        let config = config();
        let differ = PixelDiff::default();

        let updated = PageComparator::new(&config, &mut browser, &differ, &store)
            .compare(&PageRecord::pending("/pricing"))
            .unwrap();

        assert_eq!(updated.similarity, 80.0);
        assert_ne!(updated.alpha_screenshot_file, updated.beta_screenshot_file);
        assert_eq!(
            browser.loads(),
            &["http://alpha.test/pricing".to_string(), "http://beta.test/pricing".to_string()]
        );
    }

    #[test]
    fn test_beta_failure_names_path_and_step() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let screen = Framebuffer::new(4, 4);
        let mut browser = MockBrowser::new()
            .page(format!("{}/broken", ALPHA), &screen, Vec::<String>::new())
            .unwrap();
        let config = config();
        let differ = PixelDiff::default();

        let record = PageRecord::pending("/broken");
        let err = PageComparator::new(&config, &mut browser, &differ, &store)
            .compare(&record)
            .unwrap_err();

        assert_eq!(err.path, "/broken");
        assert_eq!(err.step, CompareStep::LoadPage(Side::Beta));
        assert!(err.to_string().contains("loading beta page"));
        assert!(!record.captured);
    }

    #[test]
    fn test_undecodable_screenshot_fails_at_diff() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let mut browser = MockBrowser::new()
            .raw_page(format!("{}/", ALPHA), b"garbage".to_vec())
            .raw_page(format!("{}/", BETA), b"garbage".to_vec());
        let config = config();
        let differ = PixelDiff::default();

        let err = PageComparator::new(&config, &mut browser, &differ, &store)
            .compare(&PageRecord::pending("/"))
            .unwrap_err();

        assert_eq!(err.step, CompareStep::Diff);
    }
}
