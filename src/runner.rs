//! Run orchestration and the report-ready result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::compare::PageComparator;
use crate::config::RunConfig;
use crate::registry::LinkRegistry;
use crate::snapshot::{ArtifactStore, BrowserDriver, ImageDiffer, SnapshotError};

/// Time format used in reports, e.g. `Monday, 02-Jan-06 15:04:05 UTC`
pub const REPORT_TIME_FORMAT: &str = "%A, %d-%b-%y %H:%M:%S %Z";

/// Comparison record of a single page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    /// Path relative to both base URLs
    pub path: String,

    #[serde(rename = "alphaBaseURL")]
    pub alpha_base_url: String,
    #[serde(rename = "betaBaseURL")]
    pub beta_base_url: String,

    /// Whether both screenshots were obtained
    pub captured: bool,

    /// Stored alpha screenshot (empty until captured)
    pub alpha_screenshot_file: PathBuf,

    /// Stored beta screenshot (empty until captured)
    pub beta_screenshot_file: PathBuf,

    /// 100 minus the pixel dissimilarity percentage
    pub similarity: f64,

    /// Stored diff image (empty until compared)
    pub diff_file: PathBuf,
}

impl PageRecord {
    /// A freshly discovered page that has not been captured yet
    pub fn pending(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            alpha_base_url: String::new(),
            beta_base_url: String::new(),
            captured: false,
            alpha_screenshot_file: PathBuf::new(),
            beta_screenshot_file: PathBuf::new(),
            similarity: 0.0,
            diff_file: PathBuf::new(),
        }
    }

    /// Whether the two deployments rendered this page differently
    pub fn differs(&self) -> bool {
        self.similarity < 100.0
    }
}

/// Result of a complete comparison run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    /// Every discovered page, keyed by path
    pub records: BTreeMap<String, PageRecord>,

    /// Mean similarity over all pages, failures counted as zero
    pub overall_similarity: f64,

    pub compare_start_time: DateTime<Utc>,
    pub compare_end_time: DateTime<Utc>,
    pub compare_start_time_formatted: String,
    pub compare_end_time_formatted: String,

    pub test_path: String,
    #[serde(rename = "alphaBaseURL")]
    pub alpha_base_url: String,
    #[serde(rename = "betaBaseURL")]
    pub beta_base_url: String,
    /// Settle delay in milliseconds
    pub capture_wait: u64,
    pub title: String,
}

impl RunResult {
    /// Aggregate the collected records into the final, report-ready result.
    ///
    /// Artifact paths are made relative to the output directory, similarities
    /// are rounded to two decimals and every record carries both base URLs.
    /// An empty record set is a fatal error.
    pub fn finalize(
        records: BTreeMap<String, PageRecord>,
        config: &RunConfig,
        started: DateTime<Utc>,
        finished: DateTime<Utc>,
    ) -> RunOutcome<Self> {
        let overall_similarity = overall_similarity(&records)?;

        let records = records
            .into_iter()
            .map(|(path, record)| (path, normalize_record(record, config)))
            .collect();

        let compare_start_time_formatted = started.format(REPORT_TIME_FORMAT).to_string();
        let title = config
            .title
            .clone()
            .unwrap_or_else(|| compare_start_time_formatted.clone());

        Ok(Self {
            records,
            overall_similarity,
            compare_start_time: started,
            compare_end_time: finished,
            compare_start_time_formatted,
            compare_end_time_formatted: finished.format(REPORT_TIME_FORMAT).to_string(),
            test_path: config.test_path.clone(),
            alpha_base_url: config.alpha_base_url.clone(),
            beta_base_url: config.beta_base_url.clone(),
            capture_wait: config.capture_wait,
            title,
        })
    }

    /// Pages whose screenshots differ, in path order
    pub fn differing(&self) -> impl Iterator<Item = &PageRecord> {
        self.records.values().filter(|r| r.differs())
    }

    /// Pages rendered identically, in path order
    pub fn matching(&self) -> impl Iterator<Item = &PageRecord> {
        self.records.values().filter(|r| !r.differs())
    }

    /// Number of pages that could not be captured
    pub fn failed_count(&self) -> usize {
        self.records.values().filter(|r| !r.captured).count()
    }
}

/// Round to two decimal places, halves away from zero
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rounded mean similarity of all records, uncaptured pages included as zero
pub fn overall_similarity(records: &BTreeMap<String, PageRecord>) -> RunOutcome<f64> {
    if records.is_empty() {
        return Err(RunError::NoPages);
    }
    let total: f64 = records.values().map(|r| r.similarity).sum();
    Ok(round2(total / records.len() as f64))
}

fn normalize_record(mut record: PageRecord, config: &RunConfig) -> PageRecord {
    let output_root = config.output_dir.as_path();
    record.alpha_base_url = config.alpha_base_url.clone();
    record.beta_base_url = config.beta_base_url.clone();
    record.alpha_screenshot_file = relative_to(&record.alpha_screenshot_file, output_root);
    record.beta_screenshot_file = relative_to(&record.beta_screenshot_file, output_root);
    record.diff_file = relative_to(&record.diff_file, output_root);
    record.similarity = round2(record.similarity);
    record
}

fn relative_to(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Result type for whole-run operations
pub type RunOutcome<T> = Result<T, RunError>;

/// Errors that abort the whole run
#[derive(Debug)]
pub enum RunError {
    /// Invalid configuration
    Config(crate::config::ConfigError),

    /// Output directories could not be prepared
    Setup(SnapshotError),

    /// The automation driver failed outside a page comparison
    Driver(SnapshotError),

    /// Nothing to compare
    NoPages,
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Config(err) => write!(f, "Configuration error: {}", err),
            RunError::Setup(err) => write!(f, "Could not prepare output directory: {}", err),
            RunError::Driver(err) => write!(f, "Browser automation failed: {}", err),
            RunError::NoPages => write!(f, "No pages were discovered to compare"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Config(err) => Some(err),
            RunError::Setup(err) | RunError::Driver(err) => Some(err),
            RunError::NoPages => None,
        }
    }
}

impl From<crate::config::ConfigError> for RunError {
    fn from(err: crate::config::ConfigError) -> Self {
        RunError::Config(err)
    }
}

/// Drives discovery, comparison and aggregation for one run
pub struct RunAggregator<'a> {
    config: &'a RunConfig,
}

impl<'a> RunAggregator<'a> {
    pub fn new(config: &'a RunConfig) -> Self {
        Self { config }
    }

    /// Execute the run.
    ///
    /// Setup failures are returned; a failed page is logged and keeps its
    /// uncaptured record, counting as zero in the overall similarity.
    pub fn run(
        &self,
        driver: &mut dyn BrowserDriver,
        differ: &dyn ImageDiffer,
    ) -> RunOutcome<RunResult> {
        let started = Utc::now();
        let config = self.config;

        let store = ArtifactStore::open(&config.output_dir).map_err(RunError::Setup)?;
        let registry = self.discover(driver)?;
        if registry.is_empty() {
            return Err(RunError::NoPages);
        }
        info!(pages = registry.len(), "discovery finished");

        let mut records = registry.into_records();
        let mut comparator = PageComparator::new(config, driver, differ, &store);
        for (path, record) in records.iter_mut() {
            info!(%path, "capturing from both sites and comparing");
            match comparator.compare(record) {
                Ok(updated) => *record = updated,
                Err(e) => {
                    error!(%path, step = %e.step, "error capturing and comparing: {}", e.source)
                }
            }
        }

        let result = RunResult::finalize(records, config, started, Utc::now())?;
        info!(
            overall_similarity = result.overall_similarity,
            failed = result.failed_count(),
            "run finished"
        );
        Ok(result)
    }

    /// Seed the registry with the test path and the alpha page's outbound links
    fn discover(&self, driver: &mut dyn BrowserDriver) -> RunOutcome<LinkRegistry> {
        let config = self.config;
        let mut registry = LinkRegistry::new();
        registry.add_seed(&config.test_path);

        let seed_url = format!("{}{}", config.alpha_base_url, config.test_path);
        info!(url = %seed_url, "scanning for links on alpha site");
        if let Err(e) = driver.load_page(&seed_url) {
            warn!(url = %seed_url, "error loading seed page: {}", e);
        }

        let hrefs = driver.find_anchor_hrefs().map_err(RunError::Driver)?;
        registry.discover(&config.alpha_base_url, &hrefs);
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(path: &str, similarity: f64, captured: bool) -> (String, PageRecord) {
        let mut r = PageRecord::pending(path);
        r.similarity = similarity;
        r.captured = captured;
        (path.to_string(), r)
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(83.4567), 83.46);
        assert_eq!(round2(59.995), 60.0);
        assert_eq!(round2(100.0), 100.0);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn test_overall_counts_failures_as_zero() {
        let records: BTreeMap<_, _> = [
            record("/", 100.0, true),
            record("/about", 80.0, true),
            record("/broken", 0.0, false),
        ]
        .into_iter()
        .collect();

        assert_eq!(overall_similarity(&records).unwrap(), 60.0);
    }

    #[test]
    fn test_overall_of_nothing_is_an_error() {
        assert!(matches!(overall_similarity(&BTreeMap::new()), Err(RunError::NoPages)));
    }

    #[test]
    fn test_finalize_normalizes_records() {
        let config = RunConfig::new("http://a.test", "http://b.test").output_dir("out");
        let mut page = PageRecord::pending("/");
        page.captured = true;
        page.similarity = 83.4567;
        page.alpha_screenshot_file = PathBuf::from("out").join("screenshots").join("aa.png");
        page.beta_screenshot_file = PathBuf::from("out").join("screenshots").join("bb.png");
        page.diff_file = PathBuf::from("out").join("diffs").join("cc.png");
        let records = BTreeMap::from([("/".to_string(), page)]);
        let now = Utc::now();

        let result = RunResult::finalize(records, &config, now, now).unwrap();
        let page = &result.records["/"];

        assert_eq!(page.similarity, 83.46);
        assert_eq!(result.overall_similarity, 83.46);
        assert_eq!(page.alpha_screenshot_file, PathBuf::from("screenshots").join("aa.png"));
        assert_eq!(page.diff_file, PathBuf::from("diffs").join("cc.png"));
    }

    #[test]
    fn test_title_defaults_to_start_time() {
        let config = RunConfig::new("http://a.test", "http://b.test");
        let records = BTreeMap::from([record("/", 100.0, true)]);
        let now = Utc::now();

        let result = RunResult::finalize(records.clone(), &config, now, now).unwrap();
        assert_eq!(result.title, result.compare_start_time_formatted);
        assert!(result.title.ends_with("UTC"));

        let titled = config.title(Some("Release 42".to_string()));
        let result = RunResult::finalize(records, &titled, now, now).unwrap();
        assert_eq!(result.title, "Release 42");
    }

    #[test]
    fn test_json_field_names() {
        let config = RunConfig::new("http://a.test", "http://b.test");
        let records = BTreeMap::from([record("/", 100.0, true)]);
        let now = Utc::now();
        let result = RunResult::finalize(records, &config, now, now).unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["alphaBaseURL"], "http://a.test");
        assert_eq!(json["overallSimilarity"], 100.0);
        assert_eq!(json["captureWait"], 1000);
        assert_eq!(json["records"]["/"]["alphaScreenshotFile"], "");
        assert_eq!(json["records"]["/"]["alphaBaseURL"], "http://a.test");
        assert_eq!(json["records"]["/"]["betaBaseURL"], "http://b.test");
    }

    #[test]
    fn test_partitions() {
        let config = RunConfig::new("http://a.test", "http://b.test");
        let records = BTreeMap::from([
            record("/same", 100.0, true),
            record("/changed", 97.5, true),
            record("/failed", 0.0, false),
        ]);
        let now = Utc::now();
        let result = RunResult::finalize(records, &config, now, now).unwrap();

        let differing: Vec<_> = result.differing().map(|r| r.path.as_str()).collect();
        let matching: Vec<_> = result.matching().map(|r| r.path.as_str()).collect();
        assert_eq!(differing, vec!["/changed", "/failed"]);
        assert_eq!(matching, vec!["/same"]);
        assert_eq!(result.failed_count(), 1);
    }
}
