//! Frame types exchanged over the update channel.

use serde::{Deserialize, Serialize};

use super::types::{DashboardState, TranscriptionPatch, WorkerStats};

/// Client-to-server frame, serialized as `{ "type": ..., "payload": ... }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Request a fresh full dashboard state for the given filters and page.
    GetDashboardState(StateRequest),
}

/// Parameters of a `get_dashboard_state` request.
///
/// Absent filters are serialized as explicit nulls, matching what the
/// backend expects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateRequest {
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub limit: u32,
    /// Status filter, if any.
    pub status: Option<String>,
    /// Project filter, if any.
    pub project: Option<String>,
    /// Free-text search filter, if any.
    pub search: Option<String>,
    /// Which dashboard view the request is for.
    #[serde(default = "default_view")]
    pub view: String,
}

fn default_view() -> String {
    "transcriptions".to_string()
}

impl StateRequest {
    /// Create an unfiltered request for the given page.
    #[must_use]
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page,
            limit,
            status: None,
            project: None,
            search: None,
            view: default_view(),
        }
    }

    /// Set the status filter.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Set the project filter.
    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Set the search filter.
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Set the target view.
    #[must_use]
    pub fn with_view(mut self, view: impl Into<String>) -> Self {
        self.view = view.into();
        self
    }
}

impl Default for StateRequest {
    fn default() -> Self {
        Self::new(1, 25)
    }
}

/// Server-to-client frame, tagged by `type`.
///
/// Aliases on the full-state and patch variants accept the type tags older
/// backend revisions emitted for the same frames.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full state sent right after the connection is established.
    #[serde(alias = "dashboard_state")]
    InitialDashboardState { data: DashboardState },
    /// Full state sent in response to a request or a backend-side change.
    #[serde(alias = "state_update")]
    DashboardStateUpdate { data: DashboardState },
    /// One transcription changed; patch it in place without a full refetch.
    #[serde(alias = "transcription_update")]
    TranscriptionUpdated { data: TranscriptionPatch },
    /// Something changed server-side; the client should re-request state.
    TranscriptionUpdateTrigger {
        #[serde(default)]
        data: Option<serde_json::Value>,
    },
    /// Worker fleet status only.
    WorkerStats { data: WorkerStats },
    /// Server-reported error; no state change implied.
    Error { message: String },
}

impl ServerMessage {
    /// The full dashboard state carried by this frame, if it is one of the
    /// two full-state variants.
    #[must_use]
    pub fn full_state(&self) -> Option<&DashboardState> {
        match self {
            Self::InitialDashboardState { data } | Self::DashboardStateUpdate { data } => {
                Some(data)
            }
            _ => None,
        }
    }
}
