use crate::api::ProductSummary;
use crate::session::AuthSession;
use crate::workflow::WorkflowStatus;

#[derive(Debug, Clone)]
pub enum AppEvent {
    LoggedIn(AuthSession),
    LoggedOut,
    LoginFailed(String),
    CatalogLoaded(Vec<ProductSummary>),
    CatalogFailed(String),
    WorkflowAdvanced(WorkflowStatus),
    WorkflowFailed {
        operation: &'static str,
        message: String,
    },
    Diagnostic(String),
}
