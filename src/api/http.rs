use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::RegistryConfig;
use crate::logging::LogContext;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Server error: {0}")]
    Server(String),
}

impl From<ApiError> for StatusCode {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Append-only, de-duplicated list of watched wallet strings.
///
/// Entries are stored as given and returned in insertion order.
#[derive(Debug, Default)]
pub struct WatchlistRegistry {
    wallets: RwLock<Vec<String>>,
}

impl WatchlistRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wallets<I: IntoIterator<Item = String>>(wallets: I) -> Self {
        let mut initial = Vec::new();
        for wallet in wallets {
            if !initial.contains(&wallet) {
                initial.push(wallet);
            }
        }
        Self {
            wallets: RwLock::new(initial),
        }
    }

    pub async fn list(&self) -> Vec<String> {
        self.wallets.read().await.clone()
    }

    /// Append entries not yet present; returns the full list afterwards
    pub async fn append(&self, new_wallets: Vec<String>) -> Vec<String> {
        let mut wallets = self.wallets.write().await;
        for wallet in new_wallets {
            if !wallets.contains(&wallet) {
                wallets.push(wallet);
            }
        }
        wallets.clone()
    }
}

/// Body of `POST /wallets/new`
#[derive(Debug, Deserialize)]
pub struct AddWalletsRequest {
    #[serde(default)]
    pub wallets: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct WalletsUpdatedResponse {
    pub message: String,
    pub wallets: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct MessageResponse {
    pub message: String,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<WatchlistRegistry>,
}

/// HTTP front end for the watchlist registry
pub struct RegistryServer {
    registry: Arc<WatchlistRegistry>,
    pub host: String,
    pub port: u16,
}

impl RegistryServer {
    pub fn new(registry: Arc<WatchlistRegistry>, config: &RegistryConfig) -> Self {
        Self {
            registry,
            host: config.host.clone(),
            port: config.port,
        }
    }

    pub fn router(&self) -> Router {
        router(Arc::clone(&self.registry))
    }

    /// Bind and serve until the process exits
    pub async fn start(&self) -> Result<(), ApiError> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ApiError::Server(format!("Failed to bind to {}: {}", addr, e)))?;

        log::info!("Watchlist registry listening on {}", addr);

        axum::serve(listener, self.router())
            .await
            .map_err(|e| ApiError::Server(format!("Server error: {}", e)))?;

        Ok(())
    }
}

pub fn router(registry: Arc<WatchlistRegistry>) -> Router {
    Router::new()
        .route("/wallets", get(get_wallets))
        .route("/wallets/new", post(add_wallets))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(AppState { registry })
}

/// GET /wallets - current entries in insertion order
pub async fn get_wallets(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.registry.list().await)
}

/// POST /wallets/new - append entries, skipping ones already present
pub async fn add_wallets(
    State(state): State<AppState>,
    payload: Result<Json<AddWalletsRequest>, JsonRejection>,
) -> Result<Json<WalletsUpdatedResponse>, (StatusCode, Json<MessageResponse>)> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return Err(bad_request(&format!("Invalid request body: {}", rejection.body_text())));
        }
    };

    if request.wallets.is_empty() {
        return Err(bad_request("No wallets provided"));
    }

    let submitted = request.wallets.len();
    let wallets = state.registry.append(request.wallets).await;

    LogContext::new("registry", "add_wallets")
        .with_metadata("submitted", serde_json::json!(submitted))
        .with_metadata("total", serde_json::json!(wallets.len()))
        .info("Watchlist updated");

    Ok(Json(WalletsUpdatedResponse {
        message: "Wallets updated successfully".to_string(),
        wallets,
    }))
}

fn bad_request(message: &str) -> (StatusCode, Json<MessageResponse>) {
    let status = StatusCode::from(ApiError::InvalidRequest(message.to_string()));
    (
        status,
        Json(MessageResponse {
            message: message.to_string(),
        }),
    )
}
