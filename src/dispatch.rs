use crate::api::http::AirisClient;
use crate::api::{CatalogApi, PhotoFile};
use crate::error::WorkflowError;
use crate::event::AppEvent;
use crate::session::{store, SessionHandle};
use crate::workflow::{WorkflowStatus, WorkflowTracker};
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use tokio::runtime::Handle;
use tracing::{info, warn};

/// Runs tracker and API calls on the tokio runtime on behalf of the UI
/// thread, reporting outcomes over the app event channel.
#[derive(Clone)]
pub struct WorkflowDispatcher {
    tracker: Arc<WorkflowTracker>,
    client: Arc<AirisClient>,
    session: SessionHandle,
    session_path: PathBuf,
    tx: mpsc::Sender<AppEvent>,
    runtime_handle: Handle,
}

fn report(
    tx: &mpsc::Sender<AppEvent>,
    operation: &'static str,
    tracker: &WorkflowTracker,
    outcome: Result<(), WorkflowError>,
) {
    let event = match outcome {
        Ok(()) => AppEvent::WorkflowAdvanced(tracker.status()),
        Err(err) => AppEvent::WorkflowFailed {
            operation,
            message: err.to_string(),
        },
    };
    let _ = tx.send(event);
}

async fn fetch_suggestions(tracker: &WorkflowTracker, tx: &mpsc::Sender<AppEvent>) {
    let outcome = tracker.fetch_mood_and_suggestions().await;
    report(tx, "fetch_mood", tracker, outcome);
}

impl WorkflowDispatcher {
    pub fn new(
        tracker: Arc<WorkflowTracker>,
        client: Arc<AirisClient>,
        session: SessionHandle,
        session_path: PathBuf,
        tx: mpsc::Sender<AppEvent>,
        runtime_handle: Handle,
    ) -> Self {
        Self {
            tracker,
            client,
            session,
            session_path,
            tx,
            runtime_handle,
        }
    }

    pub fn tracker(&self) -> &WorkflowTracker {
        &self.tracker
    }

    pub fn login(&self, email: String, password: String) {
        let client = Arc::clone(&self.client);
        let session = self.session.clone();
        let session_path = self.session_path.clone();
        let tx = self.tx.clone();

        self.runtime_handle.spawn(async move {
            match client.login(&email, &password).await {
                Ok(auth) => {
                    if let Err(err) = store::save(&session_path, &auth) {
                        warn!(error = %err, "failed to persist session");
                        let _ = tx.send(AppEvent::Diagnostic(format!(
                            "failed to persist session: {err}"
                        )));
                    }
                    session.replace(Some(auth.clone()));
                    info!(user_id = %auth.user_id, "logged in");
                    let _ = tx.send(AppEvent::LoggedIn(auth));
                }
                Err(err) => {
                    warn!(error = %err, "login failed");
                    let _ = tx.send(AppEvent::LoginFailed(err.to_string()));
                }
            }
        });
    }

    pub fn logout(&self) {
        self.session.replace(None);
        if let Err(err) = store::clear(&self.session_path) {
            let _ = self
                .tx
                .send(AppEvent::Diagnostic(format!("failed to clear session: {err}")));
        }
        self.tracker.reset();
        self.client.clear_cache();
        info!("logged out");
        let _ = self.tx.send(AppEvent::LoggedOut);
    }

    pub fn load_catalog(&self) {
        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        self.runtime_handle.spawn(async move {
            let event = match client.catalog_products().await {
                Ok(products) => AppEvent::CatalogLoaded(products),
                Err(err) => AppEvent::CatalogFailed(err.to_string()),
            };
            let _ = tx.send(event);
        });
    }

    /// Uploads the photo at `path` and, once accepted, resolves mood and
    /// suggestions without waiting for the user.
    pub fn upload_photo(&self, path: PathBuf) {
        let tracker = Arc::clone(&self.tracker);
        let tx = self.tx.clone();
        self.runtime_handle.spawn(async move {
            let photo = match PhotoFile::read(&path) {
                Ok(photo) => photo,
                Err(err) => {
                    report(&tx, "upload_photo", &tracker, Err(err.into()));
                    return;
                }
            };
            let outcome = tracker.upload_photo(&photo).await;
            let uploaded = outcome.is_ok();
            report(&tx, "upload_photo", &tracker, outcome);
            if uploaded {
                fetch_suggestions(&tracker, &tx).await;
            }
        });
    }

    pub fn fetch_mood(&self) {
        if self.tracker.status() != WorkflowStatus::FetchingMood {
            return;
        }
        let tracker = Arc::clone(&self.tracker);
        let tx = self.tx.clone();
        self.runtime_handle.spawn(async move {
            fetch_suggestions(&tracker, &tx).await;
        });
    }

    pub fn start_customization(&self) {
        let tracker = Arc::clone(&self.tracker);
        let tx = self.tx.clone();
        self.runtime_handle.spawn(async move {
            let outcome = tracker.start_customization().await.map(|_| ());
            report(&tx, "start_customization", &tracker, outcome);
        });
    }

    pub fn dismiss_notification(&self) {
        self.tracker.dismiss_notification();
    }

    pub fn reset(&self) {
        self.tracker.reset();
        let _ = self
            .tx
            .send(AppEvent::WorkflowAdvanced(WorkflowStatus::Idle));
    }
}
