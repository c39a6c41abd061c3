use std::sync::Arc;

use crate::{analytics::ReportService, db::Database, settings::Settings, tracking::SessionController};

/// Shared application state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub sessions: SessionController,
    pub reports: ReportService,
}

impl AppState {
    pub fn new(settings: Settings, db: Database) -> Self {
        let sessions = SessionController::new(db.clone(), settings.telemetry_interval());
        let reports = ReportService::new(db);
        Self {
            settings: Arc::new(settings),
            sessions,
            reports,
        }
    }
}
