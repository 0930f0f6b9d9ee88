//! Plain-text tables for terminal output.

use std::fmt::Write;

use sojourn_ai::{HomeWorkSite, LabelCounts, WindowReport};
use sojourn_core::CandidatePoi;

const MAX_ACTIVITY_ROWS: usize = 15;

pub fn sites_table(sites: &[HomeWorkSite]) -> String {
    if sites.is_empty() {
        return "No home or work locations identified.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10} {:<8} {:>6} {:>10} {:>10}  address",
        "location", "purpose", "visits", "lat", "lon"
    );
    for site in sites {
        let _ = writeln!(
            out,
            "{:<10} {:<8} {:>6} {:>10.5} {:>10.5}  {}",
            site.location_id,
            site.purpose.as_str(),
            site.visits,
            site.center.lat,
            site.center.lon,
            site.address.as_deref().unwrap_or("-"),
        );
    }
    out
}

pub fn windows_table(windows: &[WindowReport]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<8} {:>7} {:>6} {:>6}  accepted",
        "month", "samples", "home", "work"
    );
    for w in windows {
        let accepted = if !w.evaluated {
            "(too few stays)".to_string()
        } else if w.accepted.is_empty() {
            "-".to_string()
        } else {
            w.accepted
                .iter()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        let _ = writeln!(
            out,
            "{:<8} {:>7} {:>6.2} {:>6.2}  {}",
            w.window.to_string(),
            w.samples,
            w.home_rate,
            w.work_rate,
            accepted
        );
    }
    out
}

/// Totals, then the most frequent activity labels.
pub fn label_summary(counts: &LabelCounts) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "home        {}", counts.home);
    let _ = writeln!(out, "work        {}", counts.work);
    let _ = writeln!(
        out,
        "activity    {}",
        counts.activities.values().sum::<usize>()
    );
    let _ = writeln!(out, "unlabelled  {}", counts.unlabelled);

    let mut activities: Vec<(&String, &usize)> = counts.activities.iter().collect();
    activities.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (label, n) in activities.iter().take(MAX_ACTIVITY_ROWS) {
        let _ = writeln!(out, "  {n:>5}  {label}");
    }
    if activities.len() > MAX_ACTIVITY_ROWS {
        let _ = writeln!(out, "  ... {} more", activities.len() - MAX_ACTIVITY_ROWS);
    }
    out
}

pub fn candidates_table(candidates: &[CandidatePoi]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>6}  {:<30} {:<16} {:<24} hours",
        "dist", "name", "type", "details"
    );
    for c in candidates {
        let _ = writeln!(
            out,
            "{:>5}m  {:<30} {:<16} {:<24} {}",
            c.distance_m.round() as i64,
            c.name,
            c.category,
            c.details,
            c.opening_hours
        );
    }
    out
}
