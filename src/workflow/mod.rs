use crate::api::{ProductId, ProductSummary};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod persist;
pub mod tracker;

pub use tracker::{WorkflowPorts, WorkflowTracker};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WorkflowStatus {
    #[default]
    Idle,
    Uploading,
    FetchingMood,
    ProductsReady,
    Generating,
    Completed,
}

impl WorkflowStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::FetchingMood => "fetching_mood",
            Self::ProductsReady => "products_ready",
            Self::Generating => "generating",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "idle" => Some(Self::Idle),
            "uploading" => Some(Self::Uploading),
            "fetching_mood" => Some(Self::FetchingMood),
            "products_ready" => Some(Self::ProductsReady),
            "generating" => Some(Self::Generating),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Forward edges of the workflow. Rollbacks and resets are handled
    /// separately and never go through this check.
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Uploading)
                | (Self::Uploading, Self::FetchingMood)
                | (Self::FetchingMood, Self::ProductsReady)
                | (Self::ProductsReady, Self::Generating)
                | (Self::Generating, Self::Completed)
        )
    }

    pub const fn is_busy(self) -> bool {
        matches!(self, Self::Uploading | Self::Generating)
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

impl Progress {
    pub const fn starting(total: usize) -> Self {
        Self { current: 0, total }
    }

    pub fn advance(&mut self) {
        self.current = (self.current + 1).min(self.total);
    }

    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.current as f32 / self.total as f32
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedResult {
    pub product_id: ProductId,
    #[serde(default)]
    pub product_name: String,
    pub image_url: String,
}

impl GeneratedResult {
    pub fn display_name(&self) -> String {
        if self.product_name.trim().is_empty() {
            format!("Product {}", self.product_id)
        } else {
            self.product_name.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowState {
    pub status: WorkflowStatus,
    pub uploaded_photo: Option<String>,
    pub mood_query: Option<String>,
    pub mood_phrase: Option<String>,
    pub candidate_products: Vec<ProductSummary>,
    pub progress: Progress,
    pub generated_results: Vec<GeneratedResult>,
    pub notification_dismissed: bool,
}

impl WorkflowState {
    pub fn show_notification(&self) -> bool {
        !self.notification_dismissed && self.status != WorkflowStatus::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::{Progress, WorkflowStatus};

    const ALL: [WorkflowStatus; 6] = [
        WorkflowStatus::Idle,
        WorkflowStatus::Uploading,
        WorkflowStatus::FetchingMood,
        WorkflowStatus::ProductsReady,
        WorkflowStatus::Generating,
        WorkflowStatus::Completed,
    ];

    #[test]
    fn status_names_round_trip() {
        for status in ALL {
            assert_eq!(WorkflowStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(WorkflowStatus::parse("processing"), None);
    }

    #[test]
    fn forward_edges_never_skip_states_or_move_backwards() {
        for from in ALL {
            for to in ALL {
                if from.can_advance_to(to) {
                    assert!(to > from, "{from} -> {to} must move forward");
                }
            }
        }
        assert!(!WorkflowStatus::Idle.can_advance_to(WorkflowStatus::Generating));
        assert!(!WorkflowStatus::Idle.can_advance_to(WorkflowStatus::FetchingMood));
        assert!(!WorkflowStatus::FetchingMood.can_advance_to(WorkflowStatus::Generating));
        assert!(!WorkflowStatus::Completed.can_advance_to(WorkflowStatus::Generating));
    }

    #[test]
    fn progress_is_clamped_to_total() {
        let mut progress = Progress::starting(2);
        progress.advance();
        progress.advance();
        progress.advance();
        assert_eq!(progress.current, 2);
        assert!((progress.fraction() - 1.0).abs() < f32::EPSILON);
        assert_eq!(Progress::default().fraction(), 0.0);
    }
}
