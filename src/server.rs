//! HTTP front end: serves the search page and handles form actions.
//!
//! Form posts follow post/redirect/get: each action runs to completion, then
//! the browser is sent back to `/`, which renders the current session.

use crate::error::{FetcherError, Result};
use crate::query::{FormField, PageSize};
use crate::render::{render_page, RenderOptions};
use crate::session::{Action, SearchController};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared server state
pub struct AppState {
    pub controller: SearchController,
    pub options: RenderOptions,
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/search", post(search_handler))
        .route("/page-size", post(page_size_handler))
        .route("/prev", post(prev_handler))
        .route("/next", post(next_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(listener: tokio::net::TcpListener, state: Arc<AppState>) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "Serving search form");
    }
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Raw form fields as posted by the browser.
///
/// Number inputs arrive as strings and may be empty.
#[derive(Debug, Default, Deserialize)]
pub struct FormInput {
    pub query: Option<String>,
    pub year_from: Option<String>,
    pub year_to: Option<String>,
    pub page_size: Option<String>,
}

impl FormInput {
    /// Field edits for everything except the page size
    fn field_edits(&self) -> Result<Vec<FormField>> {
        let mut edits = Vec::new();
        if let Some(query) = &self.query {
            edits.push(FormField::Query(query.clone()));
        }
        if let Some(year) = parse_number::<i32>("year_from", self.year_from.as_deref())? {
            edits.push(FormField::YearFrom(year));
        }
        if let Some(year) = parse_number::<i32>("year_to", self.year_to.as_deref())? {
            edits.push(FormField::YearTo(year));
        }
        Ok(edits)
    }

    fn page_size(&self) -> Result<Option<PageSize>> {
        parse_number::<u32>("page_size", self.page_size.as_deref())?
            .map(PageSize::try_from)
            .transpose()
    }

    /// All edits, page size included
    pub fn edits(&self) -> Result<Vec<FormField>> {
        let mut edits = self.field_edits()?;
        if let Some(size) = self.page_size()? {
            edits.push(FormField::PageSize(size));
        }
        Ok(edits)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: Option<&str>) -> Result<Option<T>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| FetcherError::Validation(format!("{} must be a number", name))),
    }
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_page(&state.controller.snapshot(), &state.options))
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

async fn search_handler(
    State(state): State<Arc<AppState>>,
    Form(input): Form<FormInput>,
) -> Response {
    match input.edits() {
        Ok(edits) => run_action(&state, edits, Action::Submit).await,
        Err(e) => bad_request(e),
    }
}

async fn page_size_handler(
    State(state): State<Arc<AppState>>,
    Form(input): Form<FormInput>,
) -> Response {
    let parsed = input.field_edits().and_then(|edits| {
        let size = input
            .page_size()?
            .ok_or_else(|| FetcherError::Validation("page_size is required".to_string()))?;
        Ok((edits, size))
    });
    match parsed {
        Ok((edits, size)) => run_action(&state, edits, Action::ChangePageSize(size)).await,
        Err(e) => bad_request(e),
    }
}

async fn prev_handler(
    State(state): State<Arc<AppState>>,
    Form(input): Form<FormInput>,
) -> Response {
    match input.edits() {
        Ok(edits) => run_action(&state, edits, Action::Previous).await,
        Err(e) => bad_request(e),
    }
}

async fn next_handler(
    State(state): State<Arc<AppState>>,
    Form(input): Form<FormInput>,
) -> Response {
    match input.edits() {
        Ok(edits) => run_action(&state, edits, Action::Next).await,
        Err(e) => bad_request(e),
    }
}

/// Run an action and send the browser back to the page.
///
/// Rejected input is already recorded on the session, so it is shown there.
async fn run_action(state: &AppState, edits: Vec<FormField>, action: Action) -> Response {
    if let Err(e) = state.controller.dispatch(edits, action).await {
        warn!(action = ?action, error = %e, "Action rejected");
    }
    Redirect::to("/").into_response()
}

fn bad_request(e: FetcherError) -> Response {
    warn!(error = %e, "Malformed form input");
    (StatusCode::BAD_REQUEST, e.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{sample_entry, SearchPage};
    use crate::query::QueryForm;
    use crate::render::PlaceholderPolicy;
    use crate::sciencedirect::SearchBackend;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<QueryForm>>,
        fail: bool,
    }

    impl RecordingBackend {
        fn calls(&self) -> Vec<QueryForm> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl SearchBackend for RecordingBackend {
        async fn search(&self, form: &QueryForm) -> Result<SearchPage> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(form.clone());
            }
            if self.fail {
                return Err(FetcherError::ResponseShape("not an envelope".into()));
            }
            Ok(SearchPage {
                total: 45,
                entries: vec![sample_entry("1", true), sample_entry("2", false)],
            })
        }
    }

    fn app(backend: Arc<RecordingBackend>) -> Router {
        router(Arc::new(AppState {
            controller: SearchController::new(backend),
            options: RenderOptions {
                placeholder: PlaceholderPolicy::BelowTwo,
                max_year: 2026,
            },
        }))
    }

    async fn post_form(app: &Router, path: &str, body: &str) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("request");
        app.clone().oneshot(request).await.expect("response")
    }

    async fn get_page(app: &Router, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .uri(path)
            .body(Body::empty())
            .expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(Arc::new(RecordingBackend::default()));
        let (status, body) = get_page(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_initial_page_shows_placeholder() {
        let app = app(Arc::new(RecordingBackend::default()));
        let (status, body) = get_page(&app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"class="placeholder""#));
        assert!(!body.contains(r#"class="pagination""#));
    }

    #[tokio::test]
    async fn test_submit_then_render() {
        let backend = Arc::new(RecordingBackend::default());
        let app = app(backend.clone());

        let response = post_form(
            &app,
            "/search",
            "query=graphene+oxide&year_from=2020&year_to=2023&page_size=20",
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].query, "graphene oxide");
        assert_eq!(calls[0].date_range(), "2020-2023");

        let (_, body) = get_page(&app, "/").await;
        assert!(body.contains(r#"class="row-open""#));
        assert!(body.contains(r#"class="row-closed""#));
        assert!(body.contains("Page: 1 of 3 | 0–20 of 45"));
    }

    #[tokio::test]
    async fn test_page_size_change_resets_to_first_page() {
        let backend = Arc::new(RecordingBackend::default());
        let app = app(backend.clone());
        let fields = "query=graphene&year_from=2022&year_to=2024&page_size=20";

        post_form(&app, "/search", fields).await;
        post_form(&app, "/next", fields).await;
        post_form(&app, "/page-size", "query=graphene&year_from=2022&year_to=2024&page_size=50").await;

        let calls: Vec<(u32, u32)> = backend
            .calls()
            .iter()
            .map(|f| (f.page, f.page_size.get()))
            .collect();
        assert_eq!(calls, vec![(1, 20), (2, 20), (1, 50)]);
    }

    #[tokio::test]
    async fn test_empty_query_is_reported_on_page() {
        let backend = Arc::new(RecordingBackend::default());
        let app = app(backend.clone());

        let response = post_form(&app, "/search", "query=&year_from=2022&year_to=2024").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(backend.calls().is_empty());

        let (_, body) = get_page(&app, "/").await;
        assert!(body.contains("query is required"));
    }

    #[tokio::test]
    async fn test_page_size_kept_when_query_is_empty() {
        let backend = Arc::new(RecordingBackend::default());
        let app = app(backend.clone());

        let response = post_form(&app, "/page-size", "query=&year_from=2022&year_to=2024&page_size=50").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(backend.calls().is_empty());

        let (_, body) = get_page(&app, "/").await;
        assert!(body.contains(r#"<option value="50" selected>"#));
        assert!(body.contains("query is required"));
    }

    #[tokio::test]
    async fn test_malformed_input_is_bad_request() {
        let backend = Arc::new(RecordingBackend::default());
        let app = app(backend.clone());

        let response = post_form(&app, "/search", "query=x&page_size=33").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = post_form(&app, "/search", "query=x&year_from=soon").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_renders_placeholder() {
        let backend = Arc::new(RecordingBackend {
            fail: true,
            ..Default::default()
        });
        let app = app(backend.clone());

        let response = post_form(&app, "/search", "query=graphene").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let (status, body) = get_page(&app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"class="placeholder""#));
        assert!(body.contains("Unexpected response shape"));
        assert!(!body.contains("Searching…"));
    }
}
