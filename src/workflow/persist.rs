use crate::storage::KeyValueStore;
use crate::workflow::{GeneratedResult, Progress, WorkflowState, WorkflowStatus};
use tracing::{info, warn};

pub const STATUS_KEY: &str = "ai_status";
pub const PHOTO_UPLOADED_KEY: &str = "ai_photo_uploaded";
pub const COMPLETED_KEY: &str = "ai_completed";
pub const NOTIFICATION_DISMISSED_KEY: &str = "ai_notification_dismissed";
pub const HAS_RECOMMENDATIONS_KEY: &str = "ai_has_recommendations";
pub const GENERATED_RESULTS_KEY: &str = "ai_generated_results";

pub const ALL_KEYS: [&str; 6] = [
    STATUS_KEY,
    PHOTO_UPLOADED_KEY,
    COMPLETED_KEY,
    NOTIFICATION_DISMISSED_KEY,
    HAS_RECOMMENDATIONS_KEY,
    GENERATED_RESULTS_KEY,
];

const TRUE: &str = "true";

fn write(store: &dyn KeyValueStore, key: &str, value: &str) {
    if let Err(err) = store.set(key, value) {
        warn!(key, error = %err, "failed to persist workflow key");
    }
}

fn flag(store: &dyn KeyValueStore, key: &str) -> bool {
    store.get(key).as_deref() == Some(TRUE)
}

pub fn save_status(store: &dyn KeyValueStore, status: WorkflowStatus) {
    write(store, STATUS_KEY, status.as_str());
}

pub fn save_uploaded(store: &dyn KeyValueStore) {
    write(store, STATUS_KEY, WorkflowStatus::FetchingMood.as_str());
    write(store, PHOTO_UPLOADED_KEY, TRUE);
}

pub fn save_products_ready(store: &dyn KeyValueStore, has_recommendations: bool) {
    write(store, STATUS_KEY, WorkflowStatus::ProductsReady.as_str());
    if has_recommendations {
        write(store, HAS_RECOMMENDATIONS_KEY, TRUE);
    }
}

pub fn save_completed(store: &dyn KeyValueStore, results: &[GeneratedResult]) {
    let serialized = match serde_json::to_string(results) {
        Ok(serialized) => serialized,
        Err(err) => {
            warn!(error = %err, "failed to serialize generated results");
            return;
        }
    };
    write(store, STATUS_KEY, WorkflowStatus::Completed.as_str());
    write(store, COMPLETED_KEY, TRUE);
    write(store, GENERATED_RESULTS_KEY, &serialized);
}

pub fn save_dismissed(store: &dyn KeyValueStore) {
    write(store, NOTIFICATION_DISMISSED_KEY, TRUE);
}

pub fn clear(store: &dyn KeyValueStore) {
    for key in ALL_KEYS {
        if let Err(err) = store.delete(key) {
            warn!(key, error = %err, "failed to delete workflow key");
        }
    }
}

fn stored_results(store: &dyn KeyValueStore) -> Vec<GeneratedResult> {
    let Some(raw) = store.get(GENERATED_RESULTS_KEY) else {
        return Vec::new();
    };
    match serde_json::from_str(&raw) {
        Ok(results) => results,
        Err(err) => {
            warn!(error = %err, "stored generated results are unreadable");
            Vec::new()
        }
    }
}

/// Rebuilds the workflow from storage. Only the upload and a finished
/// batch survive a restart; anything in between resumes at mood fetching,
/// and any combination that cannot be explained falls back to idle with
/// the stored keys wiped.
pub fn restore(store: &dyn KeyValueStore) -> WorkflowState {
    let stored_status = store.get(STATUS_KEY);
    let status = stored_status.as_deref().and_then(WorkflowStatus::parse);
    let photo_uploaded = flag(store, PHOTO_UPLOADED_KEY);
    let completed = flag(store, COMPLETED_KEY) || status == Some(WorkflowStatus::Completed);
    let notification_dismissed = flag(store, NOTIFICATION_DISMISSED_KEY);

    let mut state = WorkflowState {
        notification_dismissed,
        ..WorkflowState::default()
    };

    if completed {
        let results = stored_results(store);
        if results.is_empty() {
            warn!("completed flag set without stored results, resetting workflow");
            clear(store);
            return WorkflowState::default();
        }
        state.status = WorkflowStatus::Completed;
        state.progress = Progress {
            current: results.len(),
            total: results.len(),
        };
        state.generated_results = results;
        info!(results = state.generated_results.len(), "restored completed workflow");
        return state;
    }

    match status {
        None if stored_status.is_some() => {
            warn!(status = ?stored_status, "unknown stored workflow status, resetting workflow");
            clear(store);
            WorkflowState::default()
        }
        None | Some(WorkflowStatus::Idle) => state,
        Some(WorkflowStatus::Uploading) => {
            clear(store);
            WorkflowState::default()
        }
        Some(
            WorkflowStatus::FetchingMood
            | WorkflowStatus::ProductsReady
            | WorkflowStatus::Generating,
        ) => {
            if !photo_uploaded {
                warn!(status = ?status, "stored status has no uploaded photo, resetting workflow");
                clear(store);
                return WorkflowState::default();
            }
            state.status = WorkflowStatus::FetchingMood;
            save_status(store, WorkflowStatus::FetchingMood);
            info!("restored uploaded photo, mood fetch pending");
            state
        }
        Some(WorkflowStatus::Completed) => state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn store_with(entries: &[(&str, &str)]) -> MemoryStore {
        let store = MemoryStore::new();
        for (key, value) in entries {
            store.set(key, value).expect("memory store set should succeed");
        }
        store
    }

    #[test]
    fn empty_store_restores_idle() {
        let store = MemoryStore::new();
        assert_eq!(restore(&store), WorkflowState::default());
    }

    #[test]
    fn completed_workflow_restores_results_and_progress() {
        let store = store_with(&[
            (STATUS_KEY, "completed"),
            (COMPLETED_KEY, "true"),
            (
                GENERATED_RESULTS_KEY,
                r#"[{"product_id": 1, "image_url": "a.png"}, {"product_id": 3, "image_url": "c.png"}]"#,
            ),
            (NOTIFICATION_DISMISSED_KEY, "true"),
        ]);

        let state = restore(&store);
        assert_eq!(state.status, WorkflowStatus::Completed);
        assert_eq!(state.generated_results.len(), 2);
        assert_eq!(state.progress, Progress { current: 2, total: 2 });
        assert!(state.notification_dismissed);
    }

    #[test]
    fn completed_flag_without_results_falls_back_to_idle() {
        let store = store_with(&[
            (STATUS_KEY, "completed"),
            (COMPLETED_KEY, "true"),
            (PHOTO_UPLOADED_KEY, "true"),
        ]);

        let state = restore(&store);
        assert_eq!(state.status, WorkflowStatus::Idle);
        assert!(store.keys().is_empty());
    }

    #[test]
    fn unreadable_results_count_as_missing() {
        let store = store_with(&[(COMPLETED_KEY, "true"), (GENERATED_RESULTS_KEY, "{oops")]);
        assert_eq!(restore(&store).status, WorkflowStatus::Idle);
        assert!(store.keys().is_empty());
    }

    #[test]
    fn in_flight_states_resume_at_mood_fetch_when_photo_was_uploaded() {
        for stored in ["fetching_mood", "products_ready", "generating"] {
            let store = store_with(&[
                (STATUS_KEY, stored),
                (PHOTO_UPLOADED_KEY, "true"),
                (HAS_RECOMMENDATIONS_KEY, "true"),
            ]);
            let state = restore(&store);
            assert_eq!(state.status, WorkflowStatus::FetchingMood, "from {stored}");
            assert!(state.candidate_products.is_empty());
            assert_eq!(store.get(STATUS_KEY).as_deref(), Some("fetching_mood"));
        }
    }

    #[test]
    fn in_flight_states_without_photo_fall_back_to_idle() {
        let store = store_with(&[(STATUS_KEY, "products_ready")]);
        assert_eq!(restore(&store).status, WorkflowStatus::Idle);
        assert!(store.keys().is_empty());
    }

    #[test]
    fn interrupted_upload_and_unknown_status_restore_idle() {
        let store = store_with(&[(STATUS_KEY, "uploading")]);
        assert_eq!(restore(&store).status, WorkflowStatus::Idle);
        assert!(store.get(STATUS_KEY).is_none());

        let store = store_with(&[(STATUS_KEY, "processing"), (PHOTO_UPLOADED_KEY, "true")]);
        assert_eq!(restore(&store).status, WorkflowStatus::Idle);
        assert!(store.keys().is_empty());
    }

    #[test]
    fn dismissed_flag_survives_an_idle_restore() {
        let store = store_with(&[(NOTIFICATION_DISMISSED_KEY, "true")]);
        let state = restore(&store);
        assert_eq!(state.status, WorkflowStatus::Idle);
        assert!(state.notification_dismissed);
    }

    #[test]
    fn clear_removes_every_workflow_key() {
        let store = store_with(&ALL_KEYS.map(|key| (key, "true")));
        store.set("cart", "[]").expect("unrelated key should set");
        clear(&store);
        for key in ALL_KEYS {
            assert!(store.get(key).is_none(), "{key} should be gone");
        }
        assert_eq!(store.get("cart").as_deref(), Some("[]"));
    }
}
