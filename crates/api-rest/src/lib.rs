//! # API REST
//!
//! REST back end for the DEQM console.
//!
//! Handles:
//! - HTTP endpoints with axum for the gaps-in-care and evaluate-measure forms
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS)
//!
//! Form logic, request assembly and response classification live in `deqm-core`; handlers only
//! seed forms, run a fresh controller per request and return what a UI should render.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use deqm_core::{
    seed_evaluate_form, seed_form, CareGapsController, CoreConfig, Display,
    EvaluateMeasureController, EvaluateMeasureForm, FhirClient, FhirTransport, FieldProjection,
    FormState, InvocationResult, MeasureRequest, ReportFields, SeedReferences,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across REST API handlers.
///
/// Holds the resolved configuration and the transport used to reach the FHIR server. Each
/// request builds its own controller on top of these.
#[derive(Clone)]
pub struct AppState {
    cfg: Arc<CoreConfig>,
    transport: Arc<dyn FhirTransport>,
}

impl AppState {
    pub fn new(cfg: Arc<CoreConfig>, transport: Arc<dyn FhirTransport>) -> Self {
        Self { cfg, transport }
    }

    fn client(&self) -> FhirClient<Arc<dyn FhirTransport>> {
        FhirClient::new(self.transport.clone())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CareGapsFormQuery {
    /// Measure the form is opened for.
    pub measure_id: String,
    /// Pre-filled patient reference, e.g. `Patient/123`.
    pub patient: Option<String>,
    /// Pre-filled organization reference.
    pub organization: Option<String>,
    /// Pre-filled practitioner reference.
    pub practitioner: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EvaluateMeasureFormQuery {
    pub measure_id: String,
    pub subject: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CareGapsReq {
    #[schema(value_type = Object)]
    pub form: FormState,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EvaluateMeasureReq {
    #[schema(value_type = Object)]
    pub form: EvaluateMeasureForm,
}

/// A form together with everything derived from it.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CareGapsView {
    #[schema(value_type = Object)]
    pub form: FormState,
    #[schema(value_type = Object)]
    pub fields: FieldProjection,
    pub valid: bool,
    pub request: String,
}

impl From<FormState> for CareGapsView {
    fn from(form: FormState) -> Self {
        Self {
            fields: form.projection(),
            valid: form.valid_selection(),
            request: form.preview(),
            form,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EvaluateMeasureView {
    #[schema(value_type = Object)]
    pub form: EvaluateMeasureForm,
    #[schema(value_type = Object)]
    pub fields: ReportFields,
    pub valid: bool,
    pub request: String,
}

impl From<EvaluateMeasureForm> for EvaluateMeasureView {
    fn from(form: EvaluateMeasureForm) -> Self {
        Self {
            fields: form.fields(),
            valid: form.valid_selection(),
            request: form.request_path(),
            form,
        }
    }
}

/// Outcome of a Calculate action.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CalculateRes {
    pub request: String,
    #[schema(value_type = Object)]
    pub result: InvocationResult,
    #[schema(value_type = Object)]
    pub display: Display,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        care_gaps_form,
        care_gaps_preview,
        care_gaps_calculate,
        evaluate_measure_form,
        evaluate_measure_preview,
        evaluate_measure_calculate,
    ),
    components(schemas(
        HealthRes,
        CareGapsReq,
        CareGapsView,
        EvaluateMeasureReq,
        EvaluateMeasureView,
        CalculateRes,
    ))
)]
pub struct ApiDoc;

/// Build the console router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/care-gaps/form", get(care_gaps_form))
        .route("/care-gaps/preview", post(care_gaps_preview))
        .route("/care-gaps/calculate", post(care_gaps_calculate))
        .route("/evaluate-measure/form", get(evaluate_measure_form))
        .route("/evaluate-measure/preview", post(evaluate_measure_preview))
        .route("/evaluate-measure/calculate", post(evaluate_measure_calculate))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Reports the FHIR server base this console is configured against.
#[axum::debug_handler]
async fn health(State(state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: format!("DEQM console is alive (server {})", state.cfg.server_base()),
    })
}

#[utoipa::path(
    get,
    path = "/care-gaps/form",
    params(CareGapsFormQuery),
    responses(
        (status = 200, description = "Seeded gaps-in-care form", body = CareGapsView)
    )
)]
/// Open the gaps-in-care form for a Measure
///
/// Seeds the selection mode from the supplied references and the period from the Measure's
/// effective period. A failed Measure lookup leaves the current calendar year in place.
#[axum::debug_handler]
async fn care_gaps_form(
    State(state): State<AppState>,
    Query(query): Query<CareGapsFormQuery>,
) -> Json<CareGapsView> {
    let seed = SeedReferences {
        patient: query.patient,
        organization: query.organization,
        practitioner: query.practitioner,
    };
    let form = seed_form(&state.client(), &query.measure_id, &seed, today()).await;
    Json(CareGapsView::from(form))
}

#[utoipa::path(
    post,
    path = "/care-gaps/preview",
    request_body = CareGapsReq,
    responses(
        (status = 200, description = "Field states, validity and request preview", body = CareGapsView)
    )
)]
/// Recompute everything derived from a gaps-in-care form
#[axum::debug_handler]
async fn care_gaps_preview(Json(req): Json<CareGapsReq>) -> Json<CareGapsView> {
    Json(CareGapsView::from(req.form))
}

#[utoipa::path(
    post,
    path = "/care-gaps/calculate",
    request_body = CareGapsReq,
    responses(
        (status = 200, description = "Invocation result and display state", body = CalculateRes),
        (status = 400, description = "Selection is incomplete")
    )
)]
/// Run the gaps-in-care operation for a form
///
/// Server-side failures are not HTTP errors here: they come back as a domain or transport
/// error result with a negative notification.
///
/// # Errors
/// Returns `400 Bad Request` if the identifier required by the selection mode is missing.
#[axum::debug_handler]
async fn care_gaps_calculate(
    State(state): State<AppState>,
    Json(req): Json<CareGapsReq>,
) -> Result<Json<CalculateRes>, (StatusCode, &'static str)> {
    let mut controller = CareGapsController::new(state.client(), req.form);
    let request = controller.preview();
    match controller.calculate().await {
        Some(display) => Ok(Json(CalculateRes {
            request,
            result: controller.result().clone(),
            display,
        })),
        None => {
            tracing::info!("Rejected care-gaps calculation with incomplete selection");
            Err((StatusCode::BAD_REQUEST, "Selection is incomplete"))
        }
    }
}

#[utoipa::path(
    get,
    path = "/evaluate-measure/form",
    params(EvaluateMeasureFormQuery),
    responses(
        (status = 200, description = "Seeded evaluate-measure form", body = EvaluateMeasureView)
    )
)]
#[axum::debug_handler]
async fn evaluate_measure_form(
    State(state): State<AppState>,
    Query(query): Query<EvaluateMeasureFormQuery>,
) -> Json<EvaluateMeasureView> {
    let form = seed_evaluate_form(
        &state.client(),
        &query.measure_id,
        query.subject.as_deref(),
        today(),
    )
    .await;
    Json(EvaluateMeasureView::from(form))
}

#[utoipa::path(
    post,
    path = "/evaluate-measure/preview",
    request_body = EvaluateMeasureReq,
    responses(
        (status = 200, description = "Field states, validity and request preview", body = EvaluateMeasureView)
    )
)]
#[axum::debug_handler]
async fn evaluate_measure_preview(Json(req): Json<EvaluateMeasureReq>) -> Json<EvaluateMeasureView> {
    Json(EvaluateMeasureView::from(req.form))
}

#[utoipa::path(
    post,
    path = "/evaluate-measure/calculate",
    request_body = EvaluateMeasureReq,
    responses(
        (status = 200, description = "Invocation result and display state", body = CalculateRes),
        (status = 400, description = "Measure id is invalid or subject is missing for an individual report")
    )
)]
#[axum::debug_handler]
async fn evaluate_measure_calculate(
    State(state): State<AppState>,
    Json(req): Json<EvaluateMeasureReq>,
) -> Result<Json<CalculateRes>, (StatusCode, &'static str)> {
    let mut controller = EvaluateMeasureController::new(state.client(), req.form);
    let request = controller.preview();
    match controller.calculate().await {
        Some(display) => Ok(Json(CalculateRes {
            request,
            result: controller.result().clone(),
            display,
        })),
        None => {
            tracing::info!("Rejected evaluate-measure calculation with incomplete selection");
            Err((
                StatusCode::BAD_REQUEST,
                "Measure id is invalid or subject is missing for an individual report",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use deqm_core::{ConsoleError, ConsoleResult, FhirRequest, FhirResponse};
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use tower::ServiceExt;

    struct CannedTransport {
        response: Mutex<Option<ConsoleResult<FhirResponse>>>,
        sent: Mutex<Vec<String>>,
    }

    impl CannedTransport {
        fn new(response: ConsoleResult<FhirResponse>) -> Arc<Self> {
            Arc::new(Self {
                response: Mutex::new(Some(response)),
                sent: Mutex::new(Vec::new()),
            })
        }

        fn ok(status: u16, status_text: &str, body: Value) -> Arc<Self> {
            Self::new(Ok(FhirResponse {
                status,
                status_text: status_text.into(),
                body: body.to_string(),
            }))
        }
    }

    #[async_trait::async_trait]
    impl FhirTransport for CannedTransport {
        async fn send(&self, request: FhirRequest) -> ConsoleResult<FhirResponse> {
            self.sent.lock().unwrap().push(request.path);
            self.response
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(ConsoleError::Transport("no canned response".into())))
        }
    }

    fn app(transport: Arc<CannedTransport>) -> Router {
        let cfg = Arc::new(CoreConfig::new("http://localhost:3000/4_0_1").unwrap());
        router(AppState::new(cfg, transport))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn subject_form() -> Value {
        json!({
            "measureId": "M1",
            "periodStart": "2018-02-02",
            "periodEnd": "2020-11-13",
            "mode": "subject",
            "patientRef": "Patient/P1"
        })
    }

    #[tokio::test]
    async fn health_reports_server_base() {
        let transport = CannedTransport::new(Err(ConsoleError::Transport("unused".into())));
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(app(transport), request).await;
        assert_eq!(status, StatusCode::OK);
        let res: HealthRes = serde_json::from_slice(&body).unwrap();
        assert!(res.ok);
        assert!(res.message.contains("http://localhost:3000/4_0_1"));
    }

    #[tokio::test]
    async fn preview_returns_request_and_fields() {
        let transport = CannedTransport::new(Err(ConsoleError::Transport("unused".into())));
        let (status, body) = send(
            app(transport.clone()),
            post_json("/care-gaps/preview", json!({"form": subject_form()})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let view: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            view["request"],
            "/Measure/$care-gaps?measureId=M1&periodStart=2018-02-02&periodEnd=2020-11-13&status=open-gap&subject=Patient/P1"
        );
        assert_eq!(view["valid"], true);
        assert_eq!(view["fields"]["patient"], json!({"enabled": true, "required": true}));
        assert_eq!(view["fields"]["practitioner"], json!({"enabled": false, "required": false}));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn form_is_seeded_from_measure() {
        let transport = CannedTransport::ok(
            200,
            "OK",
            json!({"resourceType": "Measure", "effectivePeriod": {"start": "2019-01-01", "end": "2019-12-31"}}),
        );
        let request = Request::builder()
            .uri("/care-gaps/form?measureId=M1&organization=Organization/O1")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(transport.clone()), request).await;
        assert_eq!(status, StatusCode::OK);

        let view: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(view["form"]["mode"], "organization");
        assert_eq!(view["form"]["periodStart"], "2019-01-01");
        assert_eq!(view["form"]["periodEnd"], "2019-12-31");
        assert_eq!(view["valid"], true);
        assert_eq!(*transport.sent.lock().unwrap(), vec!["/Measure/M1".to_string()]);
    }

    #[tokio::test]
    async fn calculate_returns_success_display() {
        let transport = CannedTransport::ok(200, "OK", json!({"a": 1}));
        let (status, body) = send(
            app(transport.clone()),
            post_json("/care-gaps/calculate", json!({"form": subject_form()})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let res: CalculateRes = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            res.result,
            InvocationResult::Success {
                payload: json!({"a": 1})
            }
        );
        assert_eq!(res.display.result, Some(json!({"a": 1})));
        assert_eq!(*transport.sent.lock().unwrap(), vec![res.request]);
    }

    #[tokio::test]
    async fn calculate_surfaces_domain_error() {
        let transport = CannedTransport::ok(
            400,
            "Bad Request",
            json!({"resourceType": "OperationOutcome", "issue": [{"details": {"text": "bad"}}]}),
        );
        let (status, body) = send(
            app(transport),
            post_json("/care-gaps/calculate", json!({"form": subject_form()})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let res: CalculateRes = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            res.result,
            InvocationResult::DomainError {
                status: 400,
                status_text: "Bad Request".into(),
                detail: "bad".into(),
            }
        );
        assert_eq!(res.display.result, None);
    }

    #[tokio::test]
    async fn calculate_rejects_incomplete_selection() {
        let transport = CannedTransport::ok(200, "OK", json!({}));
        let mut form = subject_form();
        form["mode"] = json!("organization");

        let (status, _) = send(
            app(transport.clone()),
            post_json("/care-gaps/calculate", json!({"form": form})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn calculate_surfaces_transport_error() {
        let transport = CannedTransport::new(Err(ConsoleError::Transport("X".into())));
        let (status, body) = send(
            app(transport),
            post_json("/care-gaps/calculate", json!({"form": subject_form()})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let res: CalculateRes = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            res.result,
            InvocationResult::TransportError {
                message: "X".into()
            }
        );
        assert_eq!(res.display.result, None);
        let notification = res.display.notification.expect("notification");
        assert_eq!(notification.title, "Connection problem");
        assert_eq!(notification.message, "Problem connecting to server: X");
    }

    #[tokio::test]
    async fn evaluate_measure_form_is_seeded_from_measure() {
        let transport = CannedTransport::ok(
            200,
            "OK",
            json!({"resourceType": "Measure", "effectivePeriod": {"start": "2019-01-01", "end": "2019-12-31"}}),
        );
        let request = Request::builder()
            .uri("/evaluate-measure/form?measureId=M1&subject=Patient/P1")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(transport.clone()), request).await;
        assert_eq!(status, StatusCode::OK);

        let view: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(view["form"]["periodStart"], "2019-01-01");
        assert_eq!(view["form"]["periodEnd"], "2019-12-31");
        assert_eq!(view["form"]["reportType"], "individual");
        assert_eq!(view["form"]["subjectRef"], "Patient/P1");
        assert_eq!(view["valid"], true);
        assert_eq!(
            view["request"],
            "/Measure/M1/$evaluate-measure?periodStart=2019-01-01&periodEnd=2019-12-31&reportType=individual&subject=Patient/P1"
        );
        assert_eq!(*transport.sent.lock().unwrap(), vec!["/Measure/M1".to_string()]);
    }

    #[tokio::test]
    async fn evaluate_measure_calculate_rejects_invalid_measure_id() {
        let transport = CannedTransport::ok(200, "OK", json!({}));
        let form = json!({
            "measureId": "../../Patient/P1",
            "periodStart": "2019-01-01",
            "periodEnd": "2019-12-31",
            "reportType": "summary"
        });
        let (status, _) = send(
            app(transport.clone()),
            post_json("/evaluate-measure/calculate", json!({"form": form})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn evaluate_measure_calculate_sends_report_request() {
        let transport = CannedTransport::ok(200, "OK", json!({"resourceType": "MeasureReport"}));
        let form = json!({
            "measureId": "M1",
            "periodStart": "2019-01-01",
            "periodEnd": "2019-12-31",
            "reportType": "summary"
        });
        let (status, body) = send(
            app(transport.clone()),
            post_json("/evaluate-measure/calculate", json!({"form": form})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let res: CalculateRes = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            res.request,
            "/Measure/M1/$evaluate-measure?periodStart=2019-01-01&periodEnd=2019-12-31&reportType=summary"
        );
        assert!(matches!(res.result, InvocationResult::Success { .. }));
    }
}
