//! Output formatting for CLI results

use colorful::Colorful;
use serde::Serialize;

use crate::config::ThreatProfile;
use crate::core::SessionSummary;

/// Result of streaming one file through a session
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: String,
    pub sample_rate: u32,
    pub duration_secs: f64,
    /// Seconds of audio per frame
    pub frame_secs: f64,
    pub summary: SessionSummary,
}

impl FileReport {
    pub fn threat_detected(&self) -> bool {
        self.summary.detections.values().any(|&n| n > 0)
    }
}

/// Format a file report for terminal output
pub fn format_report(report: &FileReport, verbose: bool) -> String {
    let mut output = String::new();

    let (symbol, status) = if report.threat_detected() {
        ("✗".red(), "THREAT DETECTED".red().bold())
    } else {
        ("✓".green(), "CLEAR".green().bold())
    };
    output.push_str(&format!("{} {} {}\n", symbol, report.file.clone().bold(), status));
    output.push_str(&format!(
        "  {} Hz, {:.2}s, {} frames ({} analysed), max score {}\n",
        report.sample_rate,
        report.duration_secs,
        report.summary.ticks,
        report.summary.analysed_ticks,
        report.summary.max_score
    ));

    for profile in ThreatProfile::all() {
        let count = report.summary.detection_count(profile);
        if count > 0 || verbose {
            let line = format!("    {:<22} {} detections", profile.name(), count);
            let line = if count > 0 { line.yellow().to_string() } else { line.dim().to_string() };
            output.push_str(&format!("{}\n", line));
        }
    }

    if report.summary.countermeasure_activations > 0 {
        output.push_str(&format!(
            "  Countermeasure engaged {} time(s)\n",
            report.summary.countermeasure_activations
        ));
    }

    if verbose && !report.summary.locks.is_empty() {
        output.push_str("\n  Locks:\n");
        for lock in &report.summary.locks {
            let held = lock
                .released_at
                .map(|r| format!("{:.3}s", (r - lock.locked_at).num_milliseconds() as f64 / 1000.0))
                .unwrap_or_else(|| "held".to_string());
            output.push_str(&format!(
                "    {} @ {:.1} Hz, strength {:.0}%, {}\n",
                lock.profile, lock.target_frequency_hz, lock.signal_strength, held
            ));
        }
    }

    output
}

/// Format reports as pretty JSON
pub fn format_json(reports: &[FileReport]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(reports)
}

/// Format a summary for multiple files
pub fn format_summary(reports: &[FileReport], failures: usize) -> String {
    let threats = reports.iter().filter(|r| r.threat_detected()).count();
    let clear = reports.len() - threats;

    let mut output = format!("\n{}\n", "Summary:".bold());
    output.push_str(&format!("  {} files analyzed\n", reports.len()));
    if clear > 0 {
        output.push_str(&format!("  {}\n", format!("✓ {} clear", clear).green()));
    }
    if threats > 0 {
        output.push_str(&format!("  {}\n", format!("✗ {} with threats", threats).red()));
    }
    if failures > 0 {
        output.push_str(&format!("  {}\n", format!("? {} failed to decode", failures).yellow()));
    }
    output
}
