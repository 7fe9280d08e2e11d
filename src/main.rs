use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use std::env;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use listing_scout::{resolve_bulk, types::*, AppState};

fn parse_port_from_args() -> Option<u16> {
    let mut args = std::env::args().peekable();
    while let Some(a) = args.next() {
        if a == "--port" {
            if let Some(v) = args.next() {
                if let Ok(p) = v.parse::<u16>() {
                    return Some(p);
                }
            }
        } else if let Some(rest) = a.strip_prefix("--port=") {
            if let Ok(p) = rest.parse::<u16>() {
                return Some(p);
            }
        }
    }
    None
}

fn port_from_env() -> Option<u16> {
    for k in ["LISTING_SCOUT_PORT", "PORT"] {
        if let Ok(v) = std::env::var(k) {
            if let Ok(p) = v.trim().parse::<u16>() {
                return Some(p);
            }
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!("Starting listing-scout");

    // Create HTTP client
    let http_timeout = env::var("HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(30);
    let connect_timeout = env::var("HTTP_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(10);
    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(http_timeout))
        .connect_timeout(std::time::Duration::from_secs(connect_timeout))
        .build()?;

    // Create application state
    let state = Arc::new(AppState::new(http_client));

    info!(
        "marketplace: {} | serp: {} | lookup model: {}",
        state.scout_config.marketplace.resolve_base_url(),
        state.scout_config.search_engine.resolve_base_url(),
        state.scout_config.lookup.resolve_model()
    );
    if state.scout_config.lookup.resolve_api_key().is_none() {
        warn!("No lookup API key configured. The ai_lookup source will be skipped.");
    }
    if state.scout_config.oracle.resolve_api_key().is_none() {
        warn!("No oracle API key configured. Category and subtype checks will reject candidates.");
    }

    // Build router
    let app = Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/search", get(resolve_handler))
        .route("/bulk_search", post(bulk_resolve_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    // Start server
    let port: u16 = parse_port_from_args()
        .or_else(port_from_env)
        .unwrap_or(8000);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "Address already in use: {}. Stop the existing process or run with --port {} (or set PORT/LISTING_SCOUT_PORT).",
                bind_addr,
                port.saturating_add(1)
            )
        }
        Err(e) => return Err(e.into()),
    };
    info!("listing-scout listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).ok();
        let mut sigint = signal(SignalKind::interrupt()).ok();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = async {
                if let Some(ref mut s) = sigterm {
                    s.recv().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => {},
            _ = async {
                if let Some(ref mut s) = sigint {
                    s.recv().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutdown signal received");
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "listing-scout",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// `GET /search?product_category=…&model_number=…&brand=…&factor=…`
///
/// Resolution itself never fails (sources that error contribute nothing),
/// so the only 500 here is a panicked resolution task.
async fn resolve_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ResolveResponse>, (StatusCode, Json<ErrorResponse>)> {
    info!(
        "resolving {} {} ({} {})",
        query.brand, query.model_number, query.factor, query.category
    );

    let resolver = Arc::clone(&state.resolver);
    let handle = tokio::spawn(async move {
        let (main_product, competitors) = resolver.resolve(&query).await;
        ResolveResponse {
            main_product,
            competitors,
        }
    });

    match handle.await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            error!("Resolution task failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

/// `POST /bulk_search` with a JSON array of product queries. Items resolve
/// concurrently; the response preserves input order and carries a per-item
/// error entry for anything that failed.
async fn bulk_resolve_handler(
    State(state): State<Arc<AppState>>,
    Json(queries): Json<Vec<ProductQuery>>,
) -> Json<BulkResolveResponse> {
    info!("bulk resolve: {} products", queries.len());
    Json(resolve_bulk(Arc::clone(&state.resolver), queries).await)
}
