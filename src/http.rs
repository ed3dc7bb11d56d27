use crate::{
    backend::BookingBackend,
    error::{BookingError, ErrorKind, FieldError},
    session::{BookingSession, Confirmed, SessionSnapshot},
    types::{CalendarDate, MonthGrid},
    validation::GarageForm,
    verification::CodeSent,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio_stream::wrappers::WatchStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct AppState<B: BookingBackend> {
    session: Arc<Mutex<BookingSession<B>>>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmailRequest {
    email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CodeRequest {
    code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToggleDateRequest {
    date: CalendarDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TimeSlotRequest {
    slot: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TermsRequest {
    accepted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PaymentLinkResponse {
    payment_link: String,
}

#[derive(Debug, Clone, Serialize)]
struct ErrorResponse {
    kind: ErrorKind,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<FieldError>,
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = match kind {
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::ServiceFailure => StatusCode::BAD_GATEWAY,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::IntegrityViolation => StatusCode::CONFLICT,
        };
        debug!(?kind, error = %self, "Request rejected");
        let body = ErrorResponse {
            kind,
            message: self.to_string(),
            fields: self.fields().to_vec(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn create_app<B: BookingBackend>(session: BookingSession<B>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = AppState {
        snapshots: session.subscribe(),
        session: Arc::new(Mutex::new(session)),
    };

    let session_routes = Router::new()
        .route("/session", get(get_session::<B>))
        .route("/session/stream", get(session_stream::<B>))
        .route("/session/restart", post(restart::<B>));

    let step1 = Router::new()
        .route("/email", post(update_email::<B>))
        .route("/email/send-code", post(send_code::<B>))
        .route("/email/verify", post(verify_code::<B>))
        .route("/steps/1/next", post(submit_garage_info::<B>));

    let step2 = Router::new()
        .route("/calendar", get(get_calendar::<B>))
        .route("/calendar/previous", post(previous_month::<B>))
        .route("/calendar/next", post(next_month::<B>))
        .route("/calendar/toggle", post(toggle_date::<B>))
        .route("/calendar/time", post(select_time_slot::<B>))
        .route("/steps/2/next", post(submit_schedule::<B>));

    let step3 = Router::new()
        .route("/steps/back", post(go_back::<B>))
        .route("/terms", post(set_terms::<B>))
        .route("/confirm", post(confirm::<B>))
        .route("/confirmation/resend-email", post(resend_confirmation_email::<B>))
        .route("/confirmation/copy-payment-link", post(copy_payment_link::<B>));

    Router::new()
        .merge(session_routes)
        .merge(step1)
        .merge(step2)
        .merge(step3)
        .with_state(state)
        .layer(cors)
}

async fn get_session<B: BookingBackend>(State(state): State<AppState<B>>) -> Json<SessionSnapshot> {
    Json(state.session.lock().await.snapshot())
}

async fn session_stream<B: BookingBackend>(
    State(state): State<AppState<B>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = WatchStream::new(state.snapshots.clone()).map(|snapshot| {
        Event::default().json_data(snapshot).map_err(|err| {
            warn!(%err, "Failed to serialize session snapshot");
            err
        })
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn restart<B: BookingBackend>(State(state): State<AppState<B>>) -> Json<SessionSnapshot> {
    let mut session = state.session.lock().await;
    session.restart();
    Json(session.snapshot())
}

async fn update_email<B: BookingBackend>(
    State(state): State<AppState<B>>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<SessionSnapshot>, BookingError> {
    let mut session = state.session.lock().await;
    session.update_email(&request.email)?;
    Ok(Json(session.snapshot()))
}

async fn send_code<B: BookingBackend>(
    State(state): State<AppState<B>>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<CodeSent>, BookingError> {
    let pending = state
        .session
        .lock()
        .await
        .begin_code_request(&request.email)?;
    let delivery = pending.send().await;
    Ok(Json(state.session.lock().await.finish_code_request(delivery)?))
}

async fn verify_code<B: BookingBackend>(
    State(state): State<AppState<B>>,
    Json(request): Json<CodeRequest>,
) -> Result<Json<SessionSnapshot>, BookingError> {
    let mut session = state.session.lock().await;
    session.submit_code(&request.code)?;
    Ok(Json(session.snapshot()))
}

async fn submit_garage_info<B: BookingBackend>(
    State(state): State<AppState<B>>,
    Json(form): Json<GarageForm>,
) -> Result<Json<SessionSnapshot>, BookingError> {
    let mut session = state.session.lock().await;
    session.submit_garage_info(&form)?;
    Ok(Json(session.snapshot()))
}

async fn get_calendar<B: BookingBackend>(State(state): State<AppState<B>>) -> Json<MonthGrid> {
    Json(state.session.lock().await.month_grid())
}

async fn previous_month<B: BookingBackend>(
    State(state): State<AppState<B>>,
) -> Result<Json<MonthGrid>, BookingError> {
    let mut session = state.session.lock().await;
    session.previous_month()?;
    Ok(Json(session.month_grid()))
}

async fn next_month<B: BookingBackend>(
    State(state): State<AppState<B>>,
) -> Result<Json<MonthGrid>, BookingError> {
    let mut session = state.session.lock().await;
    session.next_month()?;
    Ok(Json(session.month_grid()))
}

async fn toggle_date<B: BookingBackend>(
    State(state): State<AppState<B>>,
    Json(request): Json<ToggleDateRequest>,
) -> Result<Json<SessionSnapshot>, BookingError> {
    let mut session = state.session.lock().await;
    session.toggle_date(request.date)?;
    Ok(Json(session.snapshot()))
}

async fn select_time_slot<B: BookingBackend>(
    State(state): State<AppState<B>>,
    Json(request): Json<TimeSlotRequest>,
) -> Result<Json<SessionSnapshot>, BookingError> {
    let mut session = state.session.lock().await;
    session.select_time_slot(&request.slot)?;
    Ok(Json(session.snapshot()))
}

async fn submit_schedule<B: BookingBackend>(
    State(state): State<AppState<B>>,
) -> Result<Json<SessionSnapshot>, BookingError> {
    let mut session = state.session.lock().await;
    session.advance_from_step2()?;
    Ok(Json(session.snapshot()))
}

async fn go_back<B: BookingBackend>(
    State(state): State<AppState<B>>,
) -> Result<Json<SessionSnapshot>, BookingError> {
    let mut session = state.session.lock().await;
    session.retreat()?;
    Ok(Json(session.snapshot()))
}

async fn set_terms<B: BookingBackend>(
    State(state): State<AppState<B>>,
    Json(request): Json<TermsRequest>,
) -> Result<Json<SessionSnapshot>, BookingError> {
    let mut session = state.session.lock().await;
    session.set_terms_accepted(request.accepted)?;
    Ok(Json(session.snapshot()))
}

async fn confirm<B: BookingBackend>(
    State(state): State<AppState<B>>,
) -> Result<Json<Confirmed>, BookingError> {
    let pending = state.session.lock().await.begin_confirm()?;
    let delivery = pending.send().await;
    Ok(Json(state.session.lock().await.finish_confirm(delivery)))
}

async fn resend_confirmation_email<B: BookingBackend>(
    State(state): State<AppState<B>>,
) -> Result<Json<SessionSnapshot>, BookingError> {
    let pending = state
        .session
        .lock()
        .await
        .begin_resend_confirmation_email()?;
    let delivery = pending.send().await;
    let mut session = state.session.lock().await;
    session.finish_resend_confirmation_email(delivery)?;
    Ok(Json(session.snapshot()))
}

async fn copy_payment_link<B: BookingBackend>(
    State(state): State<AppState<B>>,
) -> Result<Json<PaymentLinkResponse>, BookingError> {
    let session = state.session.lock().await;
    let payment_link = session.copy_payment_link()?;
    Ok(Json(PaymentLinkResponse { payment_link }))
}
