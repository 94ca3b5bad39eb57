//! `results.json` and `results.html` output.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::runner::{PageRecord, RunResult};
use crate::snapshot::SnapshotResult;

pub const JSON_REPORT: &str = "results.json";
pub const HTML_REPORT: &str = "results.html";

const STYLESHEET: &str = "https://cdn.jsdelivr.net/npm/semantic-ui@2.4.2/dist/semantic.min.css";

/// Write both reports, logging failures instead of returning them
pub fn write_reports(result: &RunResult, output_dir: &Path) {
    match write_json(result, output_dir) {
        Ok(path) => info!(path = %path.display(), "wrote JSON report"),
        Err(e) => warn!("could not write {}: {}", JSON_REPORT, e),
    }
    match write_html(result, output_dir) {
        Ok(path) => info!(path = %path.display(), "wrote HTML report"),
        Err(e) => warn!("could not write {}: {}", HTML_REPORT, e),
    }
}

/// Serialize the result as pretty JSON
pub fn write_json(result: &RunResult, output_dir: &Path) -> SnapshotResult<PathBuf> {
    let path = output_dir.join(JSON_REPORT);
    fs::write(&path, serde_json::to_string_pretty(result)?)?;
    Ok(path)
}

pub fn write_html(result: &RunResult, output_dir: &Path) -> SnapshotResult<PathBuf> {
    let path = output_dir.join(HTML_REPORT);
    fs::write(&path, render_html(result))?;
    Ok(path)
}

/// Render the HTML report: run information, then differing pages with their
/// diff image, then identical pages with the alpha screenshot.
pub fn render_html(result: &RunResult) -> String {
    let mut html = String::new();
    let title = escape_html(&result.title);

    let _ = write!(
        html,
        r#"<!doctype html>
<html>
	<head>
		<title>{title} | Comparinator</title>
		<link rel="stylesheet" href="{STYLESHEET}">
		<style>
			.horizontal.divider.header {{ margin-top: 40px; margin-bottom: 40px; }}
			img {{ max-width: 100%; }}
		</style>
	</head>
	<body>
		<div class="ui very padded segment container">
			<h1 class="ui header">{title}</h1>
"#
    );

    html.push_str(
        "\t\t\t<h4 id=\"info\" class=\"ui horizontal divider header\"><i class=\"blue info icon\"></i>Information</h4>\n",
    );
    html.push_str("\t\t\t<table class=\"ui definition table\"><tbody>\n");
    let alpha = escape_html(&result.alpha_base_url);
    let beta = escape_html(&result.beta_base_url);
    let rows = [
        ("Start time", escape_html(&result.compare_start_time_formatted)),
        ("End time", escape_html(&result.compare_end_time_formatted)),
        ("Alpha URL", format!(r#"<a href="{alpha}">{alpha}</a>"#)),
        ("Beta URL", format!(r#"<a href="{beta}">{beta}</a>"#)),
        ("Base path", escape_html(&result.test_path)),
        ("Pages compared", result.records.len().to_string()),
        ("Pages failed", result.failed_count().to_string()),
        (
            "Overall similarity",
            format!("<strong>{}%</strong>", result.overall_similarity),
        ),
    ];
    for (label, value) in rows {
        let _ = writeln!(html, "\t\t\t\t<tr><td class=\"three wide column\">{label}</td><td>{value}</td></tr>");
    }
    html.push_str("\t\t\t</tbody></table>\n");

    html.push_str(
        "\t\t\t<h4 id=\"differing\" class=\"ui horizontal divider header\"><i class=\"red search icon\"></i>Differing pages</h4>\n",
    );
    html.push_str("\t\t\t<div class=\"ui stackable two column grid container\">\n");
    for record in result.differing() {
        html.push_str(&differing_card(result, record));
    }
    html.push_str("\t\t\t</div>\n");

    html.push_str(
        "\t\t\t<h4 id=\"other\" class=\"ui horizontal divider header\"><i class=\"green check icon\"></i>Other pages</h4>\n",
    );
    html.push_str("\t\t\t<div class=\"ui stackable three column doubling grid container\">\n");
    for record in result.matching() {
        html.push_str(&card(
            &record.alpha_screenshot_file,
            &[("Path", escape_html(&record.path)), ("Similarity", similarity_cell(record))],
        ));
    }
    html.push_str("\t\t\t</div>\n\t\t</div>\n\t</body>\n</html>\n");
    html
}

fn differing_card(result: &RunResult, record: &PageRecord) -> String {
    let alpha = escape_html(&format!("{}{}", result.alpha_base_url, record.path));
    let beta = escape_html(&format!("{}{}", result.beta_base_url, record.path));
    let mut rows = vec![
        ("Path", escape_html(&record.path)),
        ("Similarity", similarity_cell(record)),
        ("Alpha link", format!(r#"<a href="{alpha}">{alpha}</a>"#)),
        ("Beta link", format!(r#"<a href="{beta}">{beta}</a>"#)),
    ];
    if !record.captured {
        rows.push(("Status", "Capture failed".to_string()));
    }
    card(&record.diff_file, &rows)
}

fn card(image: &Path, rows: &[(&str, String)]) -> String {
    let mut html = String::from("\t\t\t\t<div class=\"column\"><div class=\"ui fluid card\">\n");
    if !image.as_os_str().is_empty() {
        let src = escape_html(&image_src(image));
        let _ = writeln!(
            html,
            "\t\t\t\t\t<div class=\"image\"><a href=\"{src}\"><img src=\"{src}\"></a></div>"
        );
    }
    html.push_str("\t\t\t\t\t<div class=\"content\"><div class=\"description\"><table class=\"ui definition table\"><tbody>\n");
    for (label, value) in rows {
        let _ = writeln!(html, "\t\t\t\t\t\t<tr><td class=\"three wide column\">{label}</td><td>{value}</td></tr>");
    }
    html.push_str("\t\t\t\t\t</tbody></table></div></div>\n\t\t\t\t</div></div>\n");
    html
}

fn similarity_cell(record: &PageRecord) -> String {
    format!("<strong>{}%</strong>", record.similarity)
}

/// Artifact path as a URL path, always with forward slashes
fn image_src(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
