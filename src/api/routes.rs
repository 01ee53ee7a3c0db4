//! HTTP routes: the HTML front end, report downloads and a small JSON API.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use tower_http::trace::TraceLayer;

use super::types::{
    DescriptionForm, DescriptionRequest, ErrorResponse, HealthResponse, ProfitForm, ProfitRequest,
    ResearchResponse,
};
use super::ui::{self, Notice, PageView, Tab, TabView};
use crate::config::Config;
use crate::research::{
    is_report_file_name, saved_report, ResearchRequest, ResearchService, Researcher,
};

/// Shared, read-only application state.
pub struct AppState {
    pub researcher: Arc<dyn Researcher>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/profit", post(submit_profit))
        .route("/descriptions", post(submit_descriptions))
        .route("/download/:file", get(download))
        .route("/api/health", get(health))
        .route("/api/profit", post(api_profit))
        .route("/api/descriptions", post(api_descriptions))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until the process exits.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState {
        researcher: Arc::new(ResearchService::new(config)),
    });

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Web UI listening on http://{}", addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn index() -> Html<String> {
    Html(ui::render_page(&PageView::default()))
}

async fn submit_profit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ProfitForm>,
) -> Html<String> {
    let request = ResearchRequest::profit(&form.product_name);
    let mut view = run_for_page(&state, &request, "Analysis Complete!", "Full report saved to").await;
    view.product_name = form.product_name;
    Html(ui::render_page(&PageView::with_tab(Tab::Profit, view)))
}

async fn submit_descriptions(
    State(state): State<Arc<AppState>>,
    Form(form): Form<DescriptionForm>,
) -> Html<String> {
    let request = ResearchRequest::descriptions(&form.product_name, Some(form.product_url.as_str()));
    let mut view = run_for_page(
        &state,
        &request,
        "Descriptions Generated!",
        "Full descriptions saved to",
    )
    .await;
    view.product_name = form.product_name;
    view.product_url = form.product_url;
    Html(ui::render_page(&PageView::with_tab(Tab::Descriptions, view)))
}

/// Run one request for the HTML page. Blank product names never reach the agent.
async fn run_for_page(
    state: &AppState,
    request: &ResearchRequest,
    success: &str,
    saved_prefix: &str,
) -> TabView {
    let mut view = TabView::default();

    if request.product.is_empty() {
        view.notices
            .push(Notice::Warning("Please enter a product name".to_string()));
        return view;
    }

    match state.researcher.research(request).await {
        Ok(outcome) => {
            view.notices.push(Notice::Success(success.to_string()));
            view.result = Some(outcome.text);

            let output_dir = state.researcher.output_dir();
            if let Some(path) = saved_report(output_dir, request).await {
                view.notices.push(Notice::Info(format!(
                    "{}: {}",
                    saved_prefix,
                    path.display()
                )));
                view.download = Some(request.report_file_name());
            }
        }
        Err(e) => {
            tracing::error!("Research for '{}' failed: {:#}", request.product, e);
            view.notices.push(Notice::Error(format!("Error: {:#}", e)));
        }
    }

    view
}

/// Serve a saved report verbatim as a markdown attachment.
async fn download(State(state): State<Arc<AppState>>, Path(file): Path<String>) -> Response {
    if !is_report_file_name(&file) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let path = state.researcher.output_dir().join(&file);
    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!("Failed to read {}: {}", path.display(), e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

type ApiResult = Result<Json<ResearchResponse>, (StatusCode, Json<ErrorResponse>)>;

async fn api_profit(State(state): State<Arc<AppState>>, Json(body): Json<ProfitRequest>) -> ApiResult {
    run_for_api(&state, ResearchRequest::profit(&body.product_name)).await
}

async fn api_descriptions(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DescriptionRequest>,
) -> ApiResult {
    let request = ResearchRequest::descriptions(&body.product_name, body.product_url.as_deref());
    run_for_api(&state, request).await
}

async fn run_for_api(state: &AppState, request: ResearchRequest) -> ApiResult {
    if request.product.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Please enter a product name".to_string()));
    }

    let outcome = state.researcher.research(&request).await.map_err(|e| {
        tracing::error!("Research for '{}' failed: {:#}", request.product, e);
        api_error(StatusCode::BAD_GATEWAY, format!("{:#}", e))
    })?;

    let report_file = saved_report(state.researcher.output_dir(), &request)
        .await
        .map(|_| request.report_file_name());

    Ok(Json(ResearchResponse {
        result: outcome.text,
        report_file,
        iterations: outcome.iterations,
        log: outcome.log,
    }))
}

fn api_error(status: StatusCode, error: String) -> (StatusCode, Json<ErrorResponse>) {
    (status, Json(ErrorResponse { error }))
}
