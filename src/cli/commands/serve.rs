//! HTTP server with a small web page for running workflows.
//!
//! Every request runs one workflow to completion; executed steps are appended
//! to an in-memory history shared by all requests.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::AgentGraphError;
use crate::orchestrator::{Orchestrator, RunResult};
use crate::workflows::Workflow;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
    history: Mutex<Vec<HistoryEntry>>,
}

/// One executed node, as remembered by the server.
#[derive(Debug, Clone, Serialize)]
struct HistoryEntry {
    timestamp: DateTime<Utc>,
    workflow: Workflow,
    node: String,
    summary: String,
}

/// Run the HTTP server.
pub async fn run_serve(host: Option<&str>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or(&settings.serve.host).to_string();
    let port = port.unwrap_or(settings.serve.port);

    let orchestrator = Orchestrator::new(settings)?;
    let app = router(orchestrator);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("agentgraph server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Page", "GET  /");
    Output::kv("Health", "GET  /health");
    Output::kv("Workflows", "GET  /api/workflows");
    Output::kv("Run", "POST /api/run");
    Output::kv("History", "GET  /api/history");
    Output::kv("Graph", "GET  /api/graph/:workflow");
    Output::kv("Files", "GET  /files/:name");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(orchestrator: Orchestrator) -> Router {
    let state = Arc::new(AppState {
        orchestrator,
        history: Mutex::new(Vec::new()),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/workflows", get(list_workflows))
        .route("/api/run", post(run_workflow))
        .route("/api/history", get(history))
        .route("/api/graph/{workflow}", get(graph))
        .route("/files/{name}", get(file))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct RunRequest {
    workflow: String,
    /// Falls back to the workflow's default input.
    #[serde(default)]
    input: Option<String>,
}

#[derive(Serialize)]
struct WorkflowInfo {
    name: &'static str,
    description: &'static str,
    needs_model: bool,
    default_input: String,
}

#[derive(Serialize)]
struct WorkflowListResponse {
    workflows: Vec<WorkflowInfo>,
}

#[derive(Serialize)]
struct HistoryResponse {
    entries: Vec<HistoryEntry>,
    total: usize,
}

#[derive(Serialize)]
struct GraphResponse {
    workflow: Workflow,
    mermaid: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

fn status_for(err: &AgentGraphError) -> StatusCode {
    match err {
        AgentGraphError::InvalidInput(_) | AgentGraphError::Json(_) => StatusCode::BAD_REQUEST,
        AgentGraphError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// === Handlers ===

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_workflows(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(WorkflowListResponse {
        workflows: Workflow::ALL
            .iter()
            .map(|w| WorkflowInfo {
                name: w.name(),
                description: w.description(),
                needs_model: w.needs_model(),
                default_input: state.orchestrator.default_input(*w),
            })
            .collect(),
    })
}

async fn run_workflow(State(state): State<Arc<AppState>>, Json(req): Json<RunRequest>) -> Response {
    let workflow: Workflow = match req.workflow.parse() {
        Ok(w) => w,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    let input = req
        .input
        .filter(|i| !i.trim().is_empty())
        .unwrap_or_else(|| state.orchestrator.default_input(workflow));

    info!("HTTP run of {} workflow", workflow);

    match state.orchestrator.run(workflow, &input, |_| {}).await {
        Ok(result) => {
            record_history(&state, &result);
            Json(result).into_response()
        }
        Err(e) => {
            warn!("Workflow {} failed: {}", workflow, e);
            error_response(status_for(&e), e)
        }
    }
}

fn record_history(state: &AppState, result: &RunResult) {
    let Ok(mut history) = state.history.lock() else {
        warn!("History lock poisoned; dropping {} steps", result.steps.len());
        return;
    };

    history.extend(result.steps.iter().map(|step| HistoryEntry {
        timestamp: step.timestamp,
        workflow: result.workflow,
        node: step.node.clone(),
        summary: step.summary.clone(),
    }));
}

async fn history(State(state): State<Arc<AppState>>) -> Response {
    match state.history.lock() {
        Ok(history) => Json(HistoryResponse {
            total: history.len(),
            entries: history.clone(),
        })
        .into_response(),
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "history unavailable"),
    }
}

async fn graph(State(state): State<Arc<AppState>>, Path(workflow): Path<String>) -> Response {
    let workflow: Workflow = match workflow.parse() {
        Ok(w) => w,
        Err(e) => return error_response(StatusCode::NOT_FOUND, e),
    };

    match state.orchestrator.draw(workflow) {
        Ok(mermaid) => Json(GraphResponse { workflow, mermaid }).into_response(),
        Err(e) => error_response(status_for(&e), e),
    }
}

async fn file(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    if !is_safe_file_name(&name) {
        return error_response(StatusCode::BAD_REQUEST, format!("Invalid file name: {}", name));
    }

    let path = state.orchestrator.settings().sandbox_dir().join(&name);
    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type_for(&name))], bytes).into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            error_response(StatusCode::NOT_FOUND, format!("File not found: {}", name))
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

/// A bare file name inside the sandbox directory.
fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains("..")
}

fn content_type_for(name: &str) -> &'static str {
    let ext = std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" | "csv" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>agentgraph</title>
<style>
  body { font-family: system-ui, sans-serif; max-width: 960px; margin: 2rem auto; padding: 0 1rem; }
  textarea, select { width: 100%; font: inherit; margin: .25rem 0 .75rem; }
  pre { background: #f4f4f4; padding: .75rem; white-space: pre-wrap; word-break: break-word; }
  .error { color: #b00020; }
  .steps li { margin-bottom: .25rem; }
  img { max-width: 100%; border: 1px solid #ddd; margin: .5rem 0; }
  button { margin-right: .5rem; }
</style>
</head>
<body>
<h1>agentgraph</h1>
<p>Run a workflow once and inspect every step it took.</p>

<label for="workflow">Workflow</label>
<select id="workflow"></select>
<p id="description"></p>
<label for="input">Input</label>
<textarea id="input" rows="4"></textarea>
<button id="run">Run</button>
<button id="graph">Show graph</button>
<button id="history">Show history</button>

<div id="status"></div>
<h2>Answer</h2>
<pre id="answer"></pre>
<div id="files"></div>
<h2>Steps</h2>
<ol id="steps" class="steps"></ol>
<h2>Details</h2>
<pre id="details"></pre>

<script>
const $ = (id) => document.getElementById(id);
let workflows = [];

function setStatus(text, isError) {
  $("status").textContent = text;
  $("status").className = isError ? "error" : "";
}

async function fetchJson(url, options) {
  const res = await fetch(url, options);
  const body = await res.json();
  if (!res.ok) throw new Error(body.error || res.statusText);
  return body;
}

function selectWorkflow() {
  const wf = workflows.find((w) => w.name === $("workflow").value);
  if (!wf) return;
  $("description").textContent = wf.description;
  $("input").value = wf.default_input;
}

async function loadWorkflows() {
  try {
    workflows = (await fetchJson("/api/workflows")).workflows;
    for (const wf of workflows) {
      const opt = document.createElement("option");
      opt.value = wf.name;
      opt.textContent = wf.name;
      $("workflow").appendChild(opt);
    }
    selectWorkflow();
  } catch (e) {
    setStatus(e.message, true);
  }
}

$("workflow").addEventListener("change", selectWorkflow);

$("run").addEventListener("click", async () => {
  setStatus("Running...");
  $("answer").textContent = "";
  $("steps").innerHTML = "";
  $("files").innerHTML = "";
  try {
    const result = await fetchJson("/api/run", {
      method: "POST",
      headers: { "Content-Type": "application/json" },
      body: JSON.stringify({ workflow: $("workflow").value, input: $("input").value }),
    });
    setStatus(`Finished in ${result.steps.length} steps`);
    $("answer").textContent = result.answer;
    for (const step of result.steps) {
      const li = document.createElement("li");
      li.textContent = `${step.node}: ${step.summary}`;
      $("steps").appendChild(li);
    }
    for (const file of result.files) {
      const img = document.createElement("img");
      img.src = `/files/${encodeURIComponent(file)}`;
      img.alt = file;
      $("files").appendChild(img);
    }
    $("details").textContent = JSON.stringify(result.messages, null, 2);
  } catch (e) {
    setStatus(e.message, true);
  }
});

$("graph").addEventListener("click", async () => {
  try {
    const body = await fetchJson(`/api/graph/${$("workflow").value}`);
    $("details").textContent = body.mermaid;
  } catch (e) {
    setStatus(e.message, true);
  }
});

$("history").addEventListener("click", async () => {
  try {
    const body = await fetchJson("/api/history");
    $("details").textContent = body.total === 0
      ? "No executions yet. Run a workflow first."
      : body.entries.map((e, i) => `${i + 1}. [${e.timestamp}] ${e.workflow}/${e.node}: ${e.summary}`).join("\n");
  } catch (e) {
    setStatus(e.message, true);
  }
});

loadWorkflows();
</script>
</body>
</html>
"#;
