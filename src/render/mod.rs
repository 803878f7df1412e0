//! Terminal rendering of the dashboard model.
//!
//! Renders the same information the web dashboard shows, as colored text:
//! worker summary and grid, transcription table, pagination bar. Labels
//! match the web UI (French status badges).

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;

use crate::model::{page_window, DashboardModel};
use crate::protocol::{Transcription, WorkerHealth, WorkerInfo, WorkerStats};

/// Maximum id width shown in the table.
const ID_WIDTH: usize = 12;

/// Localized status badge, as the web UI labels them.
#[must_use]
pub fn status_label(status: &str) -> &str {
    match status {
        "done" => "Terminé",
        "processing" => "En cours",
        "pending" => "En attente",
        "error" => "Erreur",
        "offline" => "Offline",
        other => other,
    }
}

/// Format a duration in seconds as `12s`, `2m 5s`, or `1h 3m 12s`.
#[must_use]
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "-".to_string();
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = seconds.round() as u64;
    if total < 60 {
        return format!("{total}s");
    }

    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;

    let mut out = String::new();
    if h > 0 {
        out.push_str(&format!("{h}h "));
    }
    if m > 0 {
        out.push_str(&format!("{m}m "));
    }
    if s > 0 || (h == 0 && m == 0) {
        out.push_str(&format!("{s}s"));
    }
    out.trim_end().to_string()
}

/// Format a timestamp for the table's date column.
#[must_use]
pub fn format_date(date: Option<&DateTime<Utc>>) -> String {
    date.map_or_else(
        || "-".to_string(),
        |d| d.format("%d/%m/%Y %H:%M").to_string(),
    )
}

/// Truncate an id for display. Counts chars, not bytes, so multibyte ids
/// cannot split mid-character.
fn short_id(id: &str) -> String {
    match id.char_indices().nth(ID_WIDTH) {
        Some((cut, _)) => format!("{}…", &id[..cut]),
        None => id.to_string(),
    }
}

/// Colorize a status badge.
fn colored_status(status: &str) -> String {
    let label = status_label(status);
    match status {
        "done" => label.green().to_string(),
        "processing" => label.yellow().to_string(),
        "pending" => label.dimmed().to_string(),
        "error" | "offline" => label.red().to_string(),
        _ => label.to_string(),
    }
}

/// One-line worker summary, as the dashboard header shows it.
#[must_use]
pub fn worker_summary(stats: &WorkerStats) -> String {
    let base = format!(
        "Workers: {} / {}",
        stats.active_tasks(),
        stats.max_workers()
    );
    let offline = stats.offline_count();
    let suffix = if offline > 0 {
        format!(" ({offline} offline)")
    } else {
        String::new()
    };
    match stats.health() {
        WorkerHealth::Ok => format!("{} {base}", "●".green()),
        WorkerHealth::Busy => format!("{} {base}", "●".yellow()),
        WorkerHealth::Error => format!("{} {base}{}", "●".red(), suffix.red()),
    }
}

/// One worker grid row.
#[must_use]
pub fn worker_row(worker: &WorkerInfo) -> String {
    if worker.is_offline() {
        let detail = worker.error.as_deref().unwrap_or("unreachable");
        return format!(
            "  {:<18} {:<10} {}",
            worker.instance_name,
            colored_status("offline"),
            detail.red()
        );
    }

    let uptime = worker
        .uptime_seconds
        .map_or_else(|| "N/A".to_string(), format_duration);
    let audio = worker
        .total_audio_processed_s
        .map_or_else(|| "0s".to_string(), format_duration);
    format!(
        "  {:<18} {:<10} {:>2}/{:<2} cpu {:>5.1}% ram {:>5.1}% up {:<8} jobs {:<5} audio {}",
        worker.instance_name,
        colored_status(&worker.status),
        worker.active_tasks,
        worker.max_workers,
        worker.cpu_usage_percent,
        worker.memory_usage_percent,
        uptime,
        worker.total_jobs_completed,
        audio
    )
}

/// One transcription table row.
#[must_use]
pub fn transcription_row(entry: &Transcription) -> String {
    format!(
        "  {:<12} {:<14} {:<16} {:<8} {:>7} {:>7}  {}",
        short_id(&entry.id),
        colored_status(entry.status_or_unknown()),
        entry.project_name.as_deref().unwrap_or("N/A"),
        entry.language.as_deref().unwrap_or("..."),
        entry.duration.map_or_else(|| "-".to_string(), format_duration),
        entry
            .processing_time
            .map_or_else(|| "-".to_string(), format_duration),
        format_date(entry.created_at.as_ref()).dimmed()
    )
}

/// Pagination bar: `« ‹ 1 [2] 3 4 › »` for the current window.
#[must_use]
pub fn pagination_bar(current: u32, total: u32) -> String {
    if total <= 1 {
        return String::new();
    }
    let mut parts = Vec::new();
    if current > 1 {
        parts.push("«".to_string());
        parts.push("‹".to_string());
    }
    for page in page_window(current, total) {
        if page == current {
            parts.push(format!("[{page}]"));
        } else {
            parts.push(page.to_string());
        }
    }
    if current < total {
        parts.push("›".to_string());
        parts.push("»".to_string());
    }
    parts.join(" ")
}

/// Render the whole dashboard view.
#[must_use]
pub fn render_dashboard(model: &DashboardModel) -> String {
    let mut out = String::new();

    out.push_str(&worker_summary(model.workers()));
    out.push('\n');
    for worker in &model.workers().workers {
        out.push_str(&worker_row(worker));
        out.push('\n');
    }

    out.push('\n');
    if model.transcriptions().is_empty() {
        out.push_str("  Aucune transcription trouvée.\n");
    } else {
        for entry in model.transcriptions() {
            out.push_str(&transcription_row(entry));
            out.push('\n');
        }
    }

    let bar = pagination_bar(model.page(), model.total_pages());
    if !bar.is_empty() {
        out.push('\n');
        out.push_str(&format!(
            "  page {} / {}   {bar}\n",
            model.page(),
            model.total_pages()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn status_labels_match_web_ui() {
        assert_eq!(status_label("done"), "Terminé");
        assert_eq!(status_label("processing"), "En cours");
        assert_eq!(status_label("pending"), "En attente");
        assert_eq!(status_label("error"), "Erreur");
        assert_eq!(status_label("weird"), "weird");
    }

    #[test]
    fn format_duration_cases() {
        assert_eq!(format_duration(12.3), "12s");
        assert_eq!(format_duration(0.0), "0s");
        assert_eq!(format_duration(60.0), "1m");
        assert_eq!(format_duration(125.0), "2m 5s");
        assert_eq!(format_duration(3792.0), "1h 3m 12s");
        assert_eq!(format_duration(3600.0), "1h");
        assert_eq!(format_duration(-1.0), "-");
        assert_eq!(format_duration(f64::NAN), "-");
    }

    #[test]
    fn format_date_handles_missing() {
        assert_eq!(format_date(None), "-");
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(format_date(Some(&date)), "01/01/2024 00:00");
    }

    #[test]
    fn pagination_bar_single_page_is_empty() {
        assert_eq!(pagination_bar(1, 1), "");
        assert_eq!(pagination_bar(1, 0), "");
    }

    #[test]
    fn pagination_bar_windows() {
        assert_eq!(pagination_bar(1, 4), "[1] 2 3 › »");
        assert_eq!(pagination_bar(4, 4), "« ‹ 2 3 [4]");
        assert_eq!(pagination_bar(5, 9), "« ‹ 3 4 [5] 6 7 › »");
    }

    #[test]
    fn transcription_row_contains_badge() {
        let entry = Transcription {
            id: "abc123".to_string(),
            status: Some("done".to_string()),
            project_name: Some("demo".to_string()),
            worker_id: None,
            language: None,
            duration: Some(12.3),
            processing_time: None,
            created_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        };
        let row = transcription_row(&entry);
        assert!(row.contains("abc123"));
        assert!(row.contains("Terminé"));
        assert!(row.contains("demo"));
        assert!(row.contains("12s"));
    }

    #[test]
    fn short_id_truncates_on_char_boundaries() {
        assert_eq!(short_id("abc123"), "abc123");
        assert_eq!(short_id("aaaabbbbcccc"), "aaaabbbbcccc");
        assert_eq!(short_id("aaaabbbbccccdddd"), "aaaabbbbcccc…");
        // Multibyte chars straddling the cutoff must not split.
        assert_eq!(short_id("aaaaaaaaaaaééé"), "aaaaaaaaaaaé…");
        assert_eq!(short_id("ééééééééééééé"), "éééééééééééé…");
    }

    #[test]
    fn transcription_row_with_multibyte_id() {
        let entry = Transcription {
            id: "aaaaaaaaaaaééé".to_string(),
            status: Some("done".to_string()),
            project_name: None,
            worker_id: None,
            language: None,
            duration: None,
            processing_time: None,
            created_at: None,
        };
        let row = transcription_row(&entry);
        assert!(row.contains("aaaaaaaaaaaé…"));
    }

    #[test]
    fn render_dashboard_empty_model() {
        let model = DashboardModel::new(1, 25);
        let out = render_dashboard(&model);
        assert!(out.contains("Workers: 0 / 0"));
        assert!(out.contains("Aucune transcription trouvée."));
    }
}
