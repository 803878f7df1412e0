//! Dashboard state payload types.
//!
//! These mirror the shapes the backend sends over the update channel: the
//! aggregate dashboard snapshot, individual transcription entries, and the
//! worker fleet status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate snapshot of everything the main dashboard view renders.
///
/// Every section is optional: a full-state frame may carry any subset, and
/// absent sections leave the previous rendering untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardState {
    /// Worker fleet status, if included in this frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_stats: Option<WorkerStats>,
    /// Transcription counts matching the active filters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription_count: Option<TranscriptionCount>,
    /// The page of transcriptions matching the active filters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcriptions: Option<Vec<Transcription>>,
}

/// Transcription counts for pagination.
///
/// Newer backends report `total_filtered` (count after filters); older ones
/// only report `total`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscriptionCount {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_filtered: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl TranscriptionCount {
    /// The count to paginate against, preferring the filtered total.
    #[must_use]
    pub fn effective_total(&self) -> u64 {
        self.total_filtered.or(self.total).unwrap_or(0)
    }
}

/// One transcription entry as shown in the dashboard grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transcription {
    /// Unique transcription identifier.
    pub id: String,
    /// Processing status (`pending`, `processing`, `done`, `error`).
    #[serde(default)]
    pub status: Option<String>,
    /// Owning project name.
    #[serde(default)]
    pub project_name: Option<String>,
    /// Worker instance that processed (or is processing) the job.
    #[serde(default)]
    pub worker_id: Option<String>,
    /// Detected audio language.
    #[serde(default)]
    pub language: Option<String>,
    /// Audio duration in seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    /// Wall-clock processing time in seconds.
    #[serde(default)]
    pub processing_time: Option<f64>,
    /// Submission timestamp.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Transcription {
    /// Status string, defaulting to `unknown` when the backend omitted it.
    #[must_use]
    pub fn status_or_unknown(&self) -> &str {
        self.status.as_deref().unwrap_or("unknown")
    }
}

/// Payload of a `transcription_updated` frame: a single-entity patch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptionPatch {
    pub transcription: Transcription,
}

/// Worker fleet status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkerStats {
    #[serde(default)]
    pub workers: Vec<WorkerInfo>,
}

/// Overall fleet health derived from the worker list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerHealth {
    /// Capacity available, nothing offline.
    Ok,
    /// Every slot busy.
    Busy,
    /// At least one worker offline.
    Error,
}

impl WorkerStats {
    /// Total active tasks across online workers.
    #[must_use]
    pub fn active_tasks(&self) -> u32 {
        self.online().map(|w| w.active_tasks).sum()
    }

    /// Total task capacity across online workers.
    #[must_use]
    pub fn max_workers(&self) -> u32 {
        self.online().map(|w| w.max_workers).sum()
    }

    /// Number of offline workers.
    #[must_use]
    pub fn offline_count(&self) -> usize {
        self.workers.iter().filter(|w| w.is_offline()).count()
    }

    /// Overall fleet health: offline workers dominate, then saturation.
    #[must_use]
    pub fn health(&self) -> WorkerHealth {
        if self.offline_count() > 0 {
            WorkerHealth::Error
        } else if self.max_workers() > 0 && self.active_tasks() == self.max_workers() {
            WorkerHealth::Busy
        } else {
            WorkerHealth::Ok
        }
    }

    fn online(&self) -> impl Iterator<Item = &WorkerInfo> {
        self.workers.iter().filter(|w| !w.is_offline())
    }
}

/// One worker instance as shown in the monitoring grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerInfo {
    /// Worker instance name.
    pub instance_name: String,
    /// Host machine name.
    #[serde(default)]
    pub machine_name: Option<String>,
    /// Worker status (`online`, `busy`, `offline`, ...).
    pub status: String,
    /// Currently running tasks.
    #[serde(default)]
    pub active_tasks: u32,
    /// Maximum concurrent tasks.
    #[serde(default)]
    pub max_workers: u32,
    /// Slot usage percentage.
    #[serde(default)]
    pub usage_percent: f64,
    /// CPU usage percentage.
    #[serde(default)]
    pub cpu_usage_percent: f64,
    /// Memory usage percentage.
    #[serde(default)]
    pub memory_usage_percent: f64,
    /// Uptime in seconds, if reported.
    #[serde(default)]
    pub uptime_seconds: Option<f64>,
    /// Lifetime completed job count.
    #[serde(default)]
    pub total_jobs_completed: u64,
    /// Lifetime audio seconds processed.
    #[serde(default)]
    pub total_audio_processed_s: Option<f64>,
    /// Error detail for offline workers.
    #[serde(default)]
    pub error: Option<String>,
}

impl WorkerInfo {
    /// Whether this worker is unreachable.
    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.status == "offline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn worker(name: &str, status: &str, active: u32, max: u32) -> WorkerInfo {
        WorkerInfo {
            instance_name: name.to_string(),
            machine_name: None,
            status: status.to_string(),
            active_tasks: active,
            max_workers: max,
            usage_percent: 0.0,
            cpu_usage_percent: 0.0,
            memory_usage_percent: 0.0,
            uptime_seconds: None,
            total_jobs_completed: 0,
            total_audio_processed_s: None,
            error: None,
        }
    }

    #[test]
    fn effective_total_prefers_filtered() {
        let count = TranscriptionCount {
            total_filtered: Some(7),
            total: Some(100),
        };
        assert_eq!(count.effective_total(), 7);
    }

    #[test]
    fn effective_total_falls_back_to_total() {
        let count = TranscriptionCount {
            total_filtered: None,
            total: Some(42),
        };
        assert_eq!(count.effective_total(), 42);

        let empty = TranscriptionCount::default();
        assert_eq!(empty.effective_total(), 0);
    }

    #[test]
    fn dashboard_state_parses_partial_frames() {
        let state: DashboardState = serde_json::from_value(json!({
            "transcription_count": { "total_filtered": 3 }
        }))
        .unwrap();
        assert!(state.worker_stats.is_none());
        assert!(state.transcriptions.is_none());
        assert_eq!(
            state.transcription_count.unwrap().effective_total(),
            3
        );
    }

    #[test]
    fn transcription_parses_sparse_entry() {
        let t: Transcription = serde_json::from_value(json!({ "id": "abc123" })).unwrap();
        assert_eq!(t.id, "abc123");
        assert_eq!(t.status_or_unknown(), "unknown");
        assert!(t.created_at.is_none());
    }

    #[test]
    fn transcription_parses_full_entry() {
        let t: Transcription = serde_json::from_value(json!({
            "id": "abc123",
            "status": "done",
            "project_name": "demo",
            "duration": 12.3,
            "created_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(t.status_or_unknown(), "done");
        assert_eq!(t.duration, Some(12.3));
        assert_eq!(
            t.created_at.unwrap().to_rfc3339(),
            "2024-01-01T00:00:00+00:00"
        );
    }

    #[test]
    fn worker_stats_aggregates_skip_offline() {
        let stats = WorkerStats {
            workers: vec![
                worker("w1", "online", 2, 4),
                worker("w2", "offline", 9, 9),
                worker("w3", "busy", 3, 4),
            ],
        };
        assert_eq!(stats.active_tasks(), 5);
        assert_eq!(stats.max_workers(), 8);
        assert_eq!(stats.offline_count(), 1);
        assert_eq!(stats.health(), WorkerHealth::Error);
    }

    #[test]
    fn worker_health_busy_when_saturated() {
        let stats = WorkerStats {
            workers: vec![worker("w1", "online", 4, 4)],
        };
        assert_eq!(stats.health(), WorkerHealth::Busy);
    }

    #[test]
    fn worker_health_ok_with_capacity() {
        let stats = WorkerStats {
            workers: vec![worker("w1", "online", 1, 4)],
        };
        assert_eq!(stats.health(), WorkerHealth::Ok);

        let empty = WorkerStats::default();
        assert_eq!(empty.health(), WorkerHealth::Ok);
    }
}
