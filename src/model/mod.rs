//! Client-side dashboard model.
//!
//! The snapshot a renderer draws from, kept in sync by applying inbound
//! frames. Full-state frames replace whole sections (re-applying the same
//! frame is a no-op), patches update one transcription in place.

use crate::protocol::{DashboardState, Transcription, WorkerStats};

/// Materialized dashboard state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardModel {
    transcriptions: Vec<Transcription>,
    total_filtered: u64,
    workers: WorkerStats,
    page: u32,
    limit: u32,
}

impl DashboardModel {
    /// Create an empty model with the given pagination settings.
    #[must_use]
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page,
            limit,
            ..Default::default()
        }
    }

    /// The transcription rows currently shown.
    #[must_use]
    pub fn transcriptions(&self) -> &[Transcription] {
        &self.transcriptions
    }

    /// Worker fleet status.
    #[must_use]
    pub fn workers(&self) -> &WorkerStats {
        &self.workers
    }

    /// Total transcriptions matching the active filters.
    #[must_use]
    pub fn total_filtered(&self) -> u64 {
        self.total_filtered
    }

    /// Current 1-based page.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Page size.
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Record which page the model currently shows.
    pub fn set_page(&mut self, page: u32) {
        self.page = page;
    }

    /// Total number of pages for the current count and page size.
    #[must_use]
    pub fn total_pages(&self) -> u32 {
        if self.limit == 0 {
            return 0;
        }
        let limit = u64::from(self.limit);
        u32::try_from(self.total_filtered.div_ceil(limit)).unwrap_or(u32::MAX)
    }

    /// Apply a full-state frame, replacing every section it carries.
    ///
    /// Sections absent from the frame keep their previous contents. The
    /// replacement is wholesale, so applying the same frame twice leaves
    /// the model identical (no duplicated rows).
    pub fn apply_full_state(&mut self, state: &DashboardState) {
        if let Some(transcriptions) = &state.transcriptions {
            self.transcriptions = transcriptions.clone();
        }
        if let Some(count) = &state.transcription_count {
            self.total_filtered = count.effective_total();
        }
        if let Some(workers) = &state.worker_stats {
            self.workers = workers.clone();
        }
    }

    /// Patch one transcription in place by id.
    ///
    /// Returns whether a row was updated. Unknown ids are ignored: they
    /// belong to another page or filter set, and the next full refresh will
    /// pick them up.
    pub fn apply_transcription(&mut self, transcription: &Transcription) -> bool {
        match self
            .transcriptions
            .iter_mut()
            .find(|t| t.id == transcription.id)
        {
            Some(row) => {
                *row = transcription.clone();
                true
            }
            None => false,
        }
    }

    /// Replace worker fleet status only.
    pub fn apply_worker_stats(&mut self, stats: &WorkerStats) {
        self.workers = stats.clone();
    }
}

/// Page-number window shown in the pagination bar: `current ± 2`, clamped
/// to `[1, total]`.
#[must_use]
pub fn page_window(current: u32, total: u32) -> std::ops::RangeInclusive<u32> {
    if total == 0 {
        #[allow(clippy::reversed_empty_ranges)]
        return 1..=0;
    }
    let start = current.saturating_sub(2).max(1);
    let end = current.saturating_add(2).min(total);
    start..=end
}
