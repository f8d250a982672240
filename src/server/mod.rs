//! Upload form web server.
//!
//! `GET /` serves the form, `POST /analyze` runs one analysis pass over the
//! uploaded CSV and answers with the HTML report. The server keeps no state
//! between requests: the uploaded CSV travels back to the browser in a hidden
//! field so that changing the branch or colour reruns the pass without a new
//! upload.

use crate::analysis::build_report;
use crate::config::{is_valid_color, Config};
use crate::loader::{LoadOptions, SalesLoader};
use crate::models::BranchFilter;
use crate::report::chart::ChartStyle;
use crate::report::format::escape_html;
use crate::report::{generate_html_body, html_document};
use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Message shown before any file has been uploaded.
pub const UPLOAD_PROMPT: &str = "Upload a CSV file to start the analysis.";

/// Shared read-only state of the server.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
}

/// Fields of a submitted analysis form.
#[derive(Debug, Default)]
struct AnalysisForm {
    /// Name of the uploaded file.
    source: Option<String>,
    /// CSV text, from a new upload or the hidden field.
    data: Option<String>,
    branch: Option<String>,
    color: Option<String>,
}

/// Build the router.
pub fn create_app(config: Config) -> Router {
    let max_upload = config.server.max_upload_bytes;
    let state = AppState {
        config: Arc::new(config),
    };

    Router::new()
        .route("/", get(index))
        .route("/analyze", post(analyze))
        .route("/health", get(|| async { "ok" }))
        .layer(DefaultBodyLimit::max(max_upload))
        .with_state(state)
}

/// Run the server until Ctrl+C.
pub async fn serve(config: Config) -> Result<()> {
    let bind = config.server.bind.clone();
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;

    info!("Serving upload form on http://{}", bind);
    println!("🌐 Open http://{} in your browser (Ctrl+C to stop)", bind);

    axum::serve(listener, create_app(config))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
    }
}

/// GET /
async fn index(State(state): State<AppState>) -> Html<String> {
    let config = &state.config;
    let mut body = page_header();
    body.push_str(&form_html(
        config,
        &[],
        &BranchFilter::All,
        &config.chart.line_color,
        None,
    ));
    body.push_str(&format!("<p class=\"info\">{}</p>\n", UPLOAD_PROMPT));
    Html(html_document("Sales Analysis", &body))
}

/// POST /analyze
async fn analyze(State(state): State<AppState>, multipart: Multipart) -> Response {
    let config = &state.config;

    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(e) => {
            warn!("Rejected form submission: {:#}", e);
            return error_page(config, StatusCode::BAD_REQUEST, &format!("{:#}", e));
        }
    };

    let Some(data) = form.data.as_deref() else {
        return index(State(state.clone())).await.into_response();
    };

    let color = form
        .color
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(&config.chart.line_color)
        .to_string();
    if !is_valid_color(&color) {
        return error_page(
            config,
            StatusCode::BAD_REQUEST,
            &format!("Invalid color '{}'", color),
        );
    }

    let source = form.source.clone().unwrap_or_else(|| "upload.csv".to_string());
    let loader = SalesLoader::new(LoadOptions::from(&config.input));
    let records = match loader.load_str(data) {
        Ok(records) => records,
        Err(e) => {
            warn!("Failed to load {}: {}", source, e);
            return error_page(config, StatusCode::BAD_REQUEST, &e.to_string());
        }
    };

    let filter =
        BranchFilter::from_selection(form.branch.as_deref(), &config.input.all_branches_label);
    info!("Analyzing {} ({} records, {})", source, records.len(), filter);

    let report = build_report(&source, &records, filter);

    let style = ChartStyle {
        line_color: color.clone(),
        ..ChartStyle::from(&config.chart)
    };

    let mut body = page_header();
    body.push_str(&form_html(
        config,
        &report.branches,
        &report.metadata.branch,
        &color,
        Some((&source, data)),
    ));
    body.push_str(&generate_html_body(&report, &style));

    Html(html_document("Sales Analysis", &body)).into_response()
}

/// Collect the form fields. A non-empty file upload wins over the hidden field.
async fn read_form(mut multipart: Multipart) -> Result<AnalysisForm> {
    let mut form = AnalysisForm::default();
    let mut hidden: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .context("Malformed form data")?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.context("Failed to read the upload")?;
                if !bytes.is_empty() {
                    let text = String::from_utf8(bytes.to_vec())
                        .context("The uploaded file is not valid UTF-8")?;
                    form.data = Some(text);
                    form.source = file_name;
                }
            }
            "data" => {
                let text = field.text().await.context("Failed to read form data")?;
                if !text.trim().is_empty() {
                    hidden = Some(text);
                }
            }
            "source" => form.source = form.source.or(Some(field.text().await?)),
            "branch" => form.branch = Some(field.text().await?),
            "color" => form.color = Some(field.text().await?),
            _ => {}
        }
    }

    if form.data.is_none() {
        form.data = hidden;
    }

    Ok(form)
}

fn page_header() -> String {
    "<h1>Sales Analysis</h1>\n".to_string()
}

/// The upload / selection form.
fn form_html(
    config: &Config,
    branches: &[String],
    selected: &BranchFilter,
    color: &str,
    loaded: Option<(&str, &str)>,
) -> String {
    let all_label = &config.input.all_branches_label;
    let mut form = String::new();

    form.push_str(
        "<form class=\"controls\" method=\"post\" action=\"/analyze\" enctype=\"multipart/form-data\">\n",
    );
    form.push_str(
        "<label>Sales file<input type=\"file\" name=\"file\" accept=\".csv,text/csv\"></label>\n",
    );

    form.push_str("<label>Branch<select name=\"branch\">\n");
    form.push_str(&format!(
        "<option value=\"{0}\"{1}>{0}</option>\n",
        escape_html(all_label),
        if selected.selected().is_none() { " selected" } else { "" }
    ));
    for branch in branches {
        form.push_str(&format!(
            "<option value=\"{0}\"{1}>{0}</option>\n",
            escape_html(branch),
            if selected.selected() == Some(branch.as_str()) {
                " selected"
            } else {
                ""
            }
        ));
    }
    form.push_str("</select></label>\n");

    // The native picker only understands #rrggbb.
    let input_type = if color.len() == 7 && color.starts_with('#') {
        "color"
    } else {
        "text"
    };
    form.push_str(&format!(
        "<label>Line color<input type=\"{}\" name=\"color\" value=\"{}\"></label>\n",
        input_type,
        escape_html(color)
    ));

    if let Some((source, data)) = loaded {
        form.push_str(&format!(
            "<input type=\"hidden\" name=\"source\" value=\"{}\">\n",
            escape_html(source)
        ));
        form.push_str(&format!(
            "<textarea name=\"data\" hidden>{}</textarea>\n",
            escape_html(data)
        ));
    }

    form.push_str("<button type=\"submit\">Analyze</button>\n</form>\n");
    form
}

fn error_page(config: &Config, status: StatusCode, message: &str) -> Response {
    let mut body = page_header();
    body.push_str(&form_html(
        config,
        &[],
        &BranchFilter::All,
        &config.chart.line_color,
        None,
    ));
    body.push_str(&format!(
        "<p class=\"error\">Error: {}</p>\n",
        escape_html(message)
    ));
    (status, Html(html_document("Sales Analysis", &body))).into_response()
}
