//! Extended HTML lint report.
//!
//! Written to `logs/<name>-report.html` when `--extended-report` is set and
//! the run produced messages, then handed to the platform viewer.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};

use super::{LintReport, Severity};
use crate::utils::html::escape;
use crate::utils::plural_count;
use crate::{debug, log};

/// Viewers tried in order.
const OPENERS: &[&str] = &["xdg-open", "open"];

/// Render `report` as a standalone HTML page.
pub fn render(name: &str, report: &LintReport) -> String {
    let mut html = String::with_capacity(1024);
    let title = format!("{} lint report", escape(name));

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{title}</title>");
    html.push_str(
        "<style>body{font-family:sans-serif;margin:2em}\
         td{padding:2px 8px;font-family:monospace}\
         .error{color:#c00}.warning{color:#b80}</style>\n",
    );
    html.push_str("</head>\n<body>\n");
    let _ = writeln!(html, "<h1>{title}</h1>");
    let _ = writeln!(
        html,
        "<p>{} in {}</p>",
        plural_count(report.total(), "message"),
        plural_count(report.file_count(), "file")
    );

    for (path, messages) in report.entries() {
        let _ = writeln!(html, "<h2>{}</h2>", escape(&path.display().to_string()));
        html.push_str("<table>\n");
        for msg in messages {
            let class = match msg.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            };
            let _ = writeln!(
                html,
                "<tr class=\"{class}\"><td>{}:{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                msg.line,
                msg.column,
                msg.severity.label(),
                escape(&msg.text),
                msg.rule
            );
        }
        html.push_str("</table>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

/// Write the report for `name` under `logs_dir`, returning its path.
pub fn write_report(logs_dir: &Path, name: &str, report: &LintReport) -> Result<PathBuf> {
    fs::create_dir_all(logs_dir)
        .with_context(|| format!("failed to create {}", logs_dir.display()))?;
    let path = logs_dir.join(format!("{name}-report.html"));
    fs::write(&path, render(name, report))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Open a report in the platform viewer without waiting for it.
pub fn open_report(path: &Path) {
    let Some(opener) = OPENERS.iter().find_map(|cmd| which::which(cmd).ok()) else {
        log!("lint"; "report written to {}", path.display());
        return;
    };

    let spawned = Command::new(&opener)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    match spawned {
        Ok(_) => debug!("lint"; "opened {} with {}", path.display(), opener.display()),
        Err(e) => log!("warn"; "could not open {}: {}", path.display(), e),
    }
}

/// Write and open the report when requested and there is something to show.
pub fn publish(logs_dir: &Path, name: &str, report: &LintReport) {
    if report.is_clean() {
        return;
    }
    match write_report(logs_dir, name, report) {
        Ok(path) => open_report(&path),
        Err(e) => log!("warn"; "{:#}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::LintMessage;
    use tempfile::TempDir;

    fn sample() -> LintReport {
        let mut report = LintReport::new();
        report.push(
            "templates/home.html",
            vec![LintMessage::error("tag-pair", (3, 5), "tag <div> is not closed")],
        );
        report
    }

    #[test]
    fn test_render_escapes_text() {
        let html = render("templates", &sample());
        assert!(html.contains("<title>templates lint report</title>"));
        assert!(html.contains("tag &lt;div&gt; is not closed"));
        assert!(html.contains("<td>3:5</td>"));
        assert!(html.contains("1 message in 1 file"));
    }

    #[test]
    fn test_write_report_path() {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("logs");
        let path = write_report(&logs, "scripts", &sample()).unwrap();
        assert_eq!(path, logs.join("scripts-report.html"));
        assert!(fs::read_to_string(path).unwrap().contains("tag-pair"));
    }
}
