//! Router assembly and the listening server.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use deckfix_core::Corrector;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::ServerConfig;
use crate::handlers::{download, process_ppt};
use crate::state::AppState;

pub struct AppBuilder {
    app: Router,
}

impl AppBuilder {
    pub fn new(state: AppState) -> Self {
        let app = Router::new()
            .route("/api/process-ppt", post(process_ppt))
            .route("/api/download/{filename}", get(download))
            // Decks routinely exceed the default 2 MB.
            .layer(DefaultBodyLimit::disable())
            .with_state(state);
        Self { app }
    }

    /// Allow any origin, method and header.
    pub fn with_cors_layer(mut self) -> Self {
        self.app = self.app.layer(CorsLayer::permissive());
        self
    }

    pub fn build(self) -> Router {
        self.app
    }
}

/// The HTTP service: one corrector shared by every request.
pub struct Server {
    config: ServerConfig,
    corrector: Arc<dyn Corrector>,
}

impl Server {
    pub fn new(config: ServerConfig, corrector: Arc<dyn Corrector>) -> Self {
        Self { config, corrector }
    }

    pub async fn run(self) -> std::io::Result<()> {
        let state = AppState::new(self.corrector, &self.config);
        state.ensure_dirs().await?;

        let app = AppBuilder::new(state).with_cors_layer().build();
        let listener = tokio::net::TcpListener::bind(&self.config.address).await?;
        log::info!(
            "Listening on http://{} (uploads: {}, output: {})",
            listener.local_addr()?,
            self.config.upload_dir.display(),
            self.config.output_dir.display()
        );

        axum::serve(listener, app).await
    }
}
