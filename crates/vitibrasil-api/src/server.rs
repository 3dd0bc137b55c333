//! HTTP API: public info routes plus one authenticated route per category.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, Request, State};
use axum::http::HeaderMap;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, MethodRouter};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use vitibrasil::{AcquisitionPipeline, Category, YEAR_RANGE};

use crate::auth::{bearer_token, Authorizer, Identity};
use crate::error::ApiError;

/// Header naming where the returned records came from.
pub const ORIGIN_HEADER: &str = "x-data-origin";

/// Shared state passed to all handlers.
pub struct AppState {
    pub pipeline: AcquisitionPipeline,
    pub authorizer: Arc<dyn Authorizer>,
}

/// Query string accepted by every category route.
#[derive(Debug, Default, Deserialize)]
pub struct DataParams {
    /// Wider than a year needs so that out-of-range values reach the range
    /// check instead of failing to parse.
    pub year: Option<i64>,
    pub sub_table: Option<String>,
    #[serde(default)]
    pub force: bool,
}

/// Build the router. Category routes sit behind the bearer-token layer;
/// `/` and `/health` do not.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut protected = Router::new();
    for category in Category::ALL {
        protected = protected.route(&format!("/{}", category.slug()), category_route(category));
    }
    let protected = protected.layer(middleware::from_fn_with_state(state.clone(), auth_layer));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve `router(state)` on `addr` until ctrl-c.
pub async fn serve(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("API listening on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("failed to listen for ctrl-c: {e}");
            }
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}

/// Rejects requests without a valid bearer token; otherwise attaches the
/// caller's [`Identity`] for handlers.
async fn auth_layer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let identity = bearer_token(header).and_then(|token| state.authorizer.authorize(token));
    match identity {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(error = %e, path = %request.uri().path(), "rejected request");
            ApiError::from(e).into_response()
        }
    }
}

fn category_route(category: Category) -> MethodRouter<Arc<AppState>> {
    get(
        move |State(state): State<Arc<AppState>>,
              Extension(identity): Extension<Identity>,
              query: Result<Query<DataParams>, QueryRejection>| async move {
            fetch_category(category, &state, &identity, query).await
        },
    )
}

async fn fetch_category(
    category: Category,
    state: &AppState,
    identity: &Identity,
    query: Result<Query<DataParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = query.map_err(|e| ApiError::BadQuery(e.body_text()))?;
    let year = params
        .year
        .map(|year| {
            u16::try_from(year)
                .ok()
                .filter(|y| YEAR_RANGE.contains(y))
                .ok_or_else(|| ApiError::year_out_of_range(year))
        })
        .transpose()?;

    let acquisition = state
        .pipeline
        .acquire_detailed(category, params.sub_table.as_deref(), year, params.force)
        .await?;

    tracing::info!(
        %category,
        subject = %identity.subject,
        origin = acquisition.origin.as_str(),
        records = acquisition.records.len(),
        "served category"
    );

    Ok((
        [(ORIGIN_HEADER, acquisition.origin.as_str())],
        Json(acquisition.records),
    )
        .into_response())
}

async fn root() -> Json<Value> {
    let endpoints: serde_json::Map<String, Value> = Category::ALL
        .iter()
        .map(|c| (format!("/{}", c.slug()), Value::from(c.description())))
        .collect();

    Json(serde_json::json!({
        "nome": "API de Vitivinicultura - Embrapa",
        "descricao": "Acesso estruturado aos dados públicos da vitivinicultura brasileira, extraídos do site da Embrapa.",
        "versao": env!("CARGO_PKG_VERSION"),
        "endpoints_disponiveis": endpoints,
        "anos": { "min": YEAR_RANGE.start(), "max": YEAR_RANGE.end() },
    }))
}

async fn health() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
