//! HTTP API for artifact rendering, heartbeat evaluation, health checks and
//! Prometheus metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use prometheus::{Encoder, TextEncoder};
use provision_lib::{
    branding::{BrandedDeployment, BrandingInjector, BrandingMode, PollPolicy},
    deploy::{
        generate_container_name, render_artifacts, ContainerName, DeploymentRequest,
        LaunchCommand, TemplateCatalog,
    },
    policy::{GpuSpec, Region, GPU_SPECS, REGIONS},
    telemetry::{determine_health, needs_attention_at, summarize_at, HeartbeatSummary},
    AttentionReport, BrandingContext, HealthVerdict, HeartbeatSample, ProvisionError,
    ProvisionMetrics, StructuredLogger, Template,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared application state
pub struct AppState {
    ready: AtomicBool,
    pub injector: BrandingInjector,
    pub catalog: Arc<dyn TemplateCatalog>,
    pub poll: PollPolicy,
    pub metrics: ProvisionMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        injector: BrandingInjector,
        catalog: Arc<dyn TemplateCatalog>,
        poll: PollPolicy,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            ready: AtomicBool::new(false),
            injector,
            catalog,
            poll,
            metrics: ProvisionMetrics::new(),
            logger,
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Error response body `{ "error": ... }`
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<ProvisionError> for ApiError {
    fn from(err: ProvisionError) -> Self {
        let status = if err.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Body of `POST /api/v1/deployments/render`
///
/// Either `request` or a catalog `template` id must be given; an explicit
/// request wins. `template_name` defaults to the catalog template's name.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    #[serde(default)]
    pub request: Option<DeploymentRequest>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub template_name: Option<String>,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub branding: Option<BrandingContext>,
    #[serde(default)]
    pub poll: Option<PollPolicy>,
    #[serde(default)]
    pub mode: Option<BrandingMode>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResponse {
    pub container_name: ContainerName,
    pub command: String,
    pub manifest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BrandingResponse {
    pub motd: String,
    pub script: String,
    pub oneliner: String,
}

/// Body of `POST /api/v1/heartbeats/evaluate`
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    #[serde(default)]
    pub resource: Option<String>,
    pub samples: Vec<HeartbeatSample>,
}

#[derive(Debug, Serialize)]
pub struct SampleEvaluation {
    pub health: HealthVerdict,
    pub attention: AttentionReport,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub samples: Vec<SampleEvaluation>,
    pub summary: HeartbeatSummary,
}

async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "healthy", "version": SERVICE_VERSION })),
    )
}

/// Readiness check - returns 200 once startup has finished, 503 before
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let ready = state.is_ready();
    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(json!({ "ready": ready })))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

fn render(state: &AppState, body: RenderRequest) -> provision_lib::Result<RenderResponse> {
    let template = body
        .template
        .as_deref()
        .map(|id| state.catalog.require(id))
        .transpose()?;

    let request = match (body.request, &template) {
        (Some(request), _) => request,
        (None, Some(template)) => DeploymentRequest::from_template(template),
        (None, None) => return Err(ProvisionError::EmptyImage),
    };
    let template_name = body
        .template_name
        .or_else(|| template.as_ref().map(|t| t.name.clone()))
        .unwrap_or_default();

    let name = generate_container_name(&template_name, &body.user_id)?;
    let config = request.build()?;
    let artifacts = render_artifacts(&config, &name)?;

    let script = body.branding.map(|ctx| {
        BrandedDeployment::new(LaunchCommand::new(&config, &name), ctx)
            .with_injector(state.injector.clone())
            .with_poll(body.poll.unwrap_or(state.poll))
            .with_mode(body.mode.unwrap_or_default())
            .script()
    });

    state
        .logger
        .log_render(name.as_str(), config.image(), config.gpu_count(), script.is_some());

    Ok(RenderResponse {
        container_name: artifacts.container_name,
        command: artifacts.command,
        manifest: artifacts.manifest,
        script,
    })
}

async fn render_deployment(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RenderRequest>,
) -> Result<Json<RenderResponse>, ApiError> {
    let started = Instant::now();
    match render(&state, body) {
        Ok(response) => {
            state
                .metrics
                .observe_render_latency(started.elapsed().as_secs_f64());
            state.metrics.inc_artifact("command");
            state.metrics.inc_artifact("manifest");
            if response.script.is_some() {
                state.metrics.inc_artifact("deployment_script");
            }
            Ok(Json(response))
        }
        Err(e) => {
            if e.is_validation() {
                state.metrics.inc_validation_errors();
                state.logger.log_validation_error(&e.to_string());
            }
            Err(e.into())
        }
    }
}

async fn branding_script(
    State(state): State<Arc<AppState>>,
    Json(ctx): Json<BrandingContext>,
) -> Json<BrandingResponse> {
    state.metrics.inc_artifact("branding_script");
    Json(BrandingResponse {
        motd: state.injector.motd(&ctx),
        script: state.injector.branding_script(&ctx),
        oneliner: state.injector.branding_oneliner(&ctx),
    })
}

async fn cleanup_script(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.metrics.inc_artifact("cleanup_script");
    Json(json!({ "script": state.injector.cleanup_script() }))
}

async fn evaluate_heartbeats(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EvaluateRequest>,
) -> Json<EvaluateResponse> {
    let now = Utc::now();
    let resource = body.resource.as_deref().unwrap_or("unknown");

    let samples = body
        .samples
        .iter()
        .map(|sample| {
            let health = determine_health(sample);
            let attention = needs_attention_at(sample, now);
            state.metrics.record_verdict(health);
            if attention.needs_attention {
                state.metrics.inc_attention_flags();
            }
            SampleEvaluation { health, attention }
        })
        .collect();

    let summary = summarize_at(&body.samples, now);
    if let Some(verdict) = summary.latest_health {
        state.logger.log_verdict(resource, verdict);
    }
    state.logger.log_attention(resource, &summary.attention);

    Json(EvaluateResponse { samples, summary })
}

async fn catalog_gpus() -> Json<&'static [GpuSpec]> {
    Json(GPU_SPECS)
}

async fn catalog_regions() -> Json<&'static [Region]> {
    Json(REGIONS)
}

async fn catalog_templates(State(state): State<Arc<AppState>>) -> Json<Vec<Template>> {
    Json(state.catalog.list())
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/deployments/render", post(render_deployment))
        .route("/api/v1/branding/script", post(branding_script))
        .route("/api/v1/branding/cleanup", get(cleanup_script))
        .route("/api/v1/heartbeats/evaluate", post(evaluate_heartbeats))
        .route("/api/v1/catalog/gpus", get(catalog_gpus))
        .route("/api/v1/catalog/regions", get(catalog_regions))
        .route("/api/v1/catalog/templates", get(catalog_templates))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
