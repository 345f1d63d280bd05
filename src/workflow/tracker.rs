use crate::api::{CatalogApi, CustomizeApi, MoodApi, PhotoFile, ProductSummary, UploadApi};
use crate::error::WorkflowError;
use crate::session::IdentityProvider;
use crate::storage::KeyValueStore;
use crate::workflow::persist;
use crate::workflow::{GeneratedResult, Progress, WorkflowState, WorkflowStatus};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct WorkflowPorts {
    pub identity: Arc<dyn IdentityProvider>,
    pub upload: Arc<dyn UploadApi>,
    pub mood: Arc<dyn MoodApi>,
    pub catalog: Arc<dyn CatalogApi>,
    pub customize: Arc<dyn CustomizeApi>,
}

#[derive(Debug, Default)]
struct Inner {
    state: WorkflowState,
    // Bumped by reset so operations that were awaiting the network can tell
    // their results are stale.
    epoch: u64,
    mood_fetch_in_flight: bool,
}

pub struct WorkflowTracker {
    inner: Mutex<Inner>,
    store: Arc<dyn KeyValueStore>,
    ports: WorkflowPorts,
    images_kind: String,
}

impl WorkflowTracker {
    pub fn new(
        ports: WorkflowPorts,
        store: Arc<dyn KeyValueStore>,
        images_kind: impl Into<String>,
    ) -> Self {
        Self::with_state(ports, store, images_kind.into(), WorkflowState::default())
    }

    /// Builds a tracker from whatever the store remembers of a previous run.
    pub fn restore(
        ports: WorkflowPorts,
        store: Arc<dyn KeyValueStore>,
        images_kind: impl Into<String>,
    ) -> Self {
        let state = persist::restore(store.as_ref());
        Self::with_state(ports, store, images_kind.into(), state)
    }

    fn with_state(
        ports: WorkflowPorts,
        store: Arc<dyn KeyValueStore>,
        images_kind: String,
        state: WorkflowState,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state,
                ..Inner::default()
            }),
            store,
            ports,
            images_kind,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> WorkflowState {
        self.lock().state.clone()
    }

    pub fn status(&self) -> WorkflowStatus {
        self.lock().state.status
    }

    pub async fn upload_photo(&self, photo: &PhotoFile) -> Result<(), WorkflowError> {
        let user_id = self
            .ports
            .identity
            .current_user_id()
            .ok_or(WorkflowError::Identity)?;

        let epoch = {
            let mut inner = self.lock();
            let status = inner.state.status;
            if !status.can_advance_to(WorkflowStatus::Uploading) {
                return Err(WorkflowError::Busy { status });
            }
            inner.state.status = WorkflowStatus::Uploading;
            inner.epoch
        };
        info!(%user_id, file = %photo.file_name, "workflow uploading photo");

        let outcome = self
            .ports
            .upload
            .upload_user_image(user_id, &self.images_kind, photo)
            .await;

        let mut inner = self.lock();
        if inner.epoch != epoch {
            return Err(WorkflowError::Reset);
        }
        match outcome {
            Ok(()) => {
                inner.state.status = WorkflowStatus::FetchingMood;
                inner.state.uploaded_photo = Some(photo.file_name.clone());
                persist::save_uploaded(self.store.as_ref());
                info!("photo uploaded, waiting for mood inference");
                Ok(())
            }
            Err(err) => {
                inner.state.status = WorkflowStatus::Idle;
                warn!(error = %err, "photo upload failed");
                Err(err.into())
            }
        }
    }

    pub async fn fetch_mood_and_suggestions(&self) -> Result<(), WorkflowError> {
        let epoch = {
            let mut inner = self.lock();
            let status = inner.state.status;
            if status != WorkflowStatus::FetchingMood || inner.mood_fetch_in_flight {
                return Err(WorkflowError::Busy { status });
            }
            inner.mood_fetch_in_flight = true;
            inner.epoch
        };

        let outcome = self.resolve_suggestions().await;

        let mut inner = self.lock();
        if inner.epoch != epoch {
            return Err(WorkflowError::Reset);
        }
        inner.mood_fetch_in_flight = false;
        let status = inner.state.status;
        if status != WorkflowStatus::FetchingMood {
            return Err(WorkflowError::Busy { status });
        }
        let (mood_phrase, query, products) = match outcome {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!(error = %err, "mood or suggestion lookup failed");
                return Err(err);
            }
        };

        let has_recommendations = !products.is_empty();
        info!(
            query = query.as_deref().unwrap_or("<catalog>"),
            products = products.len(),
            "suggestions ready"
        );
        inner.state.status = WorkflowStatus::ProductsReady;
        inner.state.mood_phrase = mood_phrase;
        inner.state.mood_query = query;
        inner.state.candidate_products = products;
        inner.state.progress = Progress::default();
        persist::save_products_ready(self.store.as_ref(), has_recommendations);
        Ok(())
    }

    async fn resolve_suggestions(
        &self,
    ) -> Result<(Option<String>, Option<String>, Vec<ProductSummary>), WorkflowError> {
        let mood = self.ports.mood.latest_user_mood().await?;
        let mood_phrase = mood
            .as_ref()
            .map(|mood| mood.mood_phrase.clone())
            .filter(|phrase| !phrase.is_empty());
        let query = mood
            .as_ref()
            .and_then(|mood| mood.usable_query())
            .map(str::to_string);

        let products = match query.as_deref() {
            Some(query) => self.ports.catalog.suggested_products(query).await?,
            None => {
                info!("mood produced no suggestion query, using the catalog");
                self.ports.catalog.catalog_products().await?
            }
        };
        Ok((mood_phrase, query, products))
    }

    /// Starts generation for the current candidates. Returns `None` when
    /// the workflow is not waiting on the user.
    pub async fn start_customization(
        &self,
    ) -> Result<Option<Vec<GeneratedResult>>, WorkflowError> {
        let candidates = {
            let inner = self.lock();
            if inner.state.status != WorkflowStatus::ProductsReady
                || inner.state.candidate_products.is_empty()
            {
                debug!(status = %inner.state.status, "start_customization ignored");
                return Ok(None);
            }
            inner.state.candidate_products.clone()
        };
        self.generate_recommendations(candidates).await.map(Some)
    }

    pub async fn generate_recommendations(
        &self,
        products: Vec<ProductSummary>,
    ) -> Result<Vec<GeneratedResult>, WorkflowError> {
        if products.is_empty() {
            return Err(WorkflowError::EmptyInput);
        }
        let user_id = self
            .ports
            .identity
            .current_user_id()
            .ok_or(WorkflowError::Identity)?;

        let (epoch, previous) = {
            let mut inner = self.lock();
            let status = inner.state.status;
            if !status.can_advance_to(WorkflowStatus::Generating) {
                return Err(WorkflowError::Busy { status });
            }
            inner.state.status = WorkflowStatus::Generating;
            inner.state.progress = Progress::starting(products.len());
            inner.state.generated_results.clear();
            (inner.epoch, status)
        };
        persist::save_status(self.store.as_ref(), WorkflowStatus::Generating);
        info!(products = products.len(), "generating customized images");

        for product in &products {
            let outcome = self
                .ports
                .customize
                .customize_product(product.product_id, user_id)
                .await;

            let mut inner = self.lock();
            if inner.epoch != epoch {
                return Err(WorkflowError::Reset);
            }
            match outcome.map(|customized| customized.image_urls.into_iter().next()) {
                Ok(Some(image_url)) => {
                    debug!(product_id = product.product_id, "product customized");
                    inner.state.generated_results.push(GeneratedResult {
                        product_id: product.product_id,
                        product_name: product.product_name.clone(),
                        image_url,
                    });
                }
                Ok(None) => {
                    warn!(product_id = product.product_id, "customization returned no image");
                }
                Err(err) => {
                    warn!(product_id = product.product_id, error = %err, "customization failed");
                }
            }
            inner.state.progress.advance();
        }

        let results = {
            let mut inner = self.lock();
            if inner.epoch != epoch {
                return Err(WorkflowError::Reset);
            }
            if inner.state.generated_results.is_empty() {
                inner.state.status = previous;
                inner.state.progress = Progress::default();
                persist::save_status(self.store.as_ref(), previous);
                warn!(restored = %previous, "every customization failed");
                return Err(WorkflowError::NoResults);
            }
            inner.state.generated_results.clone()
        };

        self.complete_processing(results.clone())?;
        Ok(results)
    }

    pub fn complete_processing(&self, results: Vec<GeneratedResult>) -> Result<(), WorkflowError> {
        let mut inner = self.lock();
        let status = inner.state.status;
        if !status.can_advance_to(WorkflowStatus::Completed) {
            return Err(WorkflowError::Busy { status });
        }
        let total = inner.state.progress.total.max(results.len());
        inner.state.status = WorkflowStatus::Completed;
        inner.state.progress = Progress {
            current: total,
            total,
        };
        persist::save_completed(self.store.as_ref(), &results);
        info!(results = results.len(), "customization completed");
        inner.state.generated_results = results;
        Ok(())
    }

    pub fn dismiss_notification(&self) {
        let mut inner = self.lock();
        if inner.state.notification_dismissed {
            return;
        }
        inner.state.notification_dismissed = true;
        persist::save_dismissed(self.store.as_ref());
    }

    pub fn reset(&self) {
        {
            let mut inner = self.lock();
            let epoch = inner.epoch.wrapping_add(1);
            *inner = Inner {
                epoch,
                ..Inner::default()
            };
            persist::clear(self.store.as_ref());
        }
        self.ports.mood.invalidate_cache();
        self.ports.catalog.invalidate_cache();
        info!("workflow reset");
    }
}
