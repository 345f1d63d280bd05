mod api;
mod app;
mod cart;
mod checkout;
mod config;
mod dispatch;
mod error;
mod event;
mod session;
mod storage;
mod theme;
mod workflow;

use api::http::AirisClient;
use app::AirisApp;
use config::AppConfig;
use dispatch::WorkflowDispatcher;
use eframe::egui;
use session::{store, SessionHandle};
use std::sync::{mpsc, Arc};
use storage::{FileStore, MemoryStore};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use workflow::{WorkflowPorts, WorkflowTracker};

fn init_tracing(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("airis_studio=info"));
    if config.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();
    init_tracing(&config);
    info!(api = %config.api_url, data_dir = %config.data_dir.display(), "starting airis studio");

    let mut warnings = Vec::new();
    let (restored_session, session_warning) = store::load(&config.session_path());
    warnings.extend(session_warning);
    let session = SessionHandle::new(restored_session.clone());

    let (tx, rx) = mpsc::channel();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("airis-runtime")
        .build()?;

    let client = Arc::new(AirisClient::new(&config, session.clone())?);
    let ports = WorkflowPorts {
        identity: Arc::new(session.clone()),
        upload: client.clone(),
        mood: client.clone(),
        catalog: client.clone(),
        customize: client.clone(),
    };
    let tracker = if config.ephemeral {
        info!("workflow state kept in memory only");
        WorkflowTracker::new(ports, Arc::new(MemoryStore::new()), config.images_kind.clone())
    } else {
        let (workflow_store, store_warning) =
            FileStore::open_or_reset(config.workflow_store_path());
        if let Some(warning) = &store_warning {
            warn!(path = %workflow_store.path().display(), %warning, "workflow store reset");
        }
        warnings.extend(store_warning);
        WorkflowTracker::restore(ports, Arc::new(workflow_store), config.images_kind.clone())
    };
    let tracker = Arc::new(tracker);
    info!(status = %tracker.status(), "workflow restored");

    let dispatcher = WorkflowDispatcher::new(
        tracker,
        client,
        session,
        config.session_path(),
        tx,
        runtime.handle().clone(),
    );
    let app = AirisApp::new(rx, dispatcher, restored_session, warnings);
    let _runtime = runtime;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([1024.0, 640.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Airis Studio",
        native_options,
        Box::new(move |creation_context| {
            app.theme().apply_visuals(&creation_context.egui_ctx);
            Ok(Box::new(app))
        }),
    )?;

    Ok(())
}
