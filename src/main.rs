use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use tracing::info;

use comparinator::config::{self, RunConfig, parse_viewport};
use comparinator::report::write_reports;
use comparinator::runner::RunAggregator;
use comparinator::snapshot::{ArtifactCategory, ArtifactStore, ImageDiffer, PixelDiff, WebDriverSession};

/// Comparinator - visual regression testing between two deployments
#[derive(Parser, Debug)]
#[command(
    name = "comparinator",
    about = "Screenshot every page reachable from a start path on two deployments and compare them",
    after_help = "ENVIRONMENT VARIABLES:\n\
        COMPARINATOR_ALPHA_BASE_URL   Base URL of the alpha site\n\
        COMPARINATOR_BETA_BASE_URL    Base URL of the beta site\n\
        COMPARINATOR_WEBDRIVER_URL    WebDriver endpoint\n\
        COMPARINATOR_OUTPUT_DIR       Output directory\n\
        RUST_LOG                      Log filter (e.g. comparinator=debug)"
)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Discover pages, capture them on both sites and write the reports
    Run {
        /// Milliseconds to wait after a page is loaded before taking the screenshot
        #[arg(long, env = config::ENV_CAPTURE_WAIT, default_value_t = config::DEFAULT_CAPTURE_WAIT)]
        capture_wait: u64,

        /// Base URL for the alpha site
        #[arg(long, env = config::ENV_ALPHA_BASE_URL)]
        alpha_base_url: String,

        /// Base URL for the beta site
        #[arg(long, env = config::ENV_BETA_BASE_URL)]
        beta_base_url: String,

        /// Path to test on both sites
        #[arg(long, env = config::ENV_TEST_PATH, default_value = config::DEFAULT_TEST_PATH)]
        test_path: String,

        /// Full URL (including port) of the WebDriver endpoint
        #[arg(long, env = config::ENV_WEBDRIVER_URL)]
        webdriver_url: String,

        /// Directory for screenshots, diffs and reports
        #[arg(short, long, env = config::ENV_OUTPUT_DIR, default_value = config::DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,

        /// Name of this test run (default: formatted start time)
        #[arg(long, env = config::ENV_RUN_TITLE)]
        run_title: Option<String>,

        /// Viewport: desktop (1920x1280), laptop, tablet, mobile, or WxH
        #[arg(long, env = config::ENV_VIEWPORT, default_value = config::DEFAULT_VIEWPORT)]
        viewport: String,

        /// Browser requested from the WebDriver endpoint
        #[arg(long, env = config::ENV_BROWSER, default_value = config::DEFAULT_BROWSER)]
        browser: String,
    },

    /// Compare two local screenshots and write the diff image
    Diff {
        /// First image
        alpha: PathBuf,

        /// Second image
        beta: PathBuf,

        /// Output directory for the diff image
        #[arg(short, long, default_value = config::DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,

        /// Per-channel tolerance before a pixel counts as different
        #[arg(long, default_value_t = 0)]
        tolerance: u8,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    match args.command {
        Commands::Run {
            capture_wait,
            alpha_base_url,
            beta_base_url,
            test_path,
            webdriver_url,
            output_dir,
            run_title,
            viewport,
            browser,
        } => {
            let (width, height) = parse_viewport(&viewport).ok_or_else(|| {
                format!("Invalid viewport '{}'. Use: desktop, laptop, tablet, mobile, or WxH", viewport)
            })?;

            let config = RunConfig::new(alpha_base_url, beta_base_url)
                .capture_wait(capture_wait)
                .test_path(test_path)
                .webdriver_url(webdriver_url)
                .output_dir(output_dir)
                .title(run_title)
                .viewport(width, height)
                .browser(browser)
                .validate(true)?;

            let mut driver = WebDriverSession::connect(&config.webdriver_url, &config.browser)
                .map_err(|e| format!("Could not create webdriver session: {}", e))?;

            let result = RunAggregator::new(&config).run(&mut driver, &PixelDiff::default())?;
            write_reports(&result, &config.output_dir);

            println!(
                "Compared {} pages ({} failed): overall similarity {}%",
                result.records.len(),
                result.failed_count(),
                result.overall_similarity
            );
            println!("Report: {}", config.output_dir.join(comparinator::report::HTML_REPORT).display());
        }

        Commands::Diff {
            alpha,
            beta,
            output_dir,
            tolerance,
        } => {
            let alpha_bytes = std::fs::read(&alpha)?;
            let beta_bytes = std::fs::read(&beta)?;

            let outcome = PixelDiff::new(tolerance).compare(&alpha_bytes, &beta_bytes)?;
            let mut encoded = Vec::new();
            outcome
                .image
                .write_to(&mut std::io::Cursor::new(&mut encoded), image::ImageFormat::Png)?;

            let store = ArtifactStore::open(&output_dir)?;
            let stored = store.put(ArtifactCategory::Diff, &encoded)?;
            let similarity = comparinator::runner::round2(100.0 - outcome.dissimilarity);
            info!(diff = %stored.path.display(), "wrote diff image");

            println!("Similarity: {}%", similarity);
            println!("Diff: {}", stored.path.display());
        }
    }

    Ok(())
}
