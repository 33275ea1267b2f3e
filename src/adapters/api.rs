use std::sync::{Arc, Mutex};

use actix_web::{HttpResponse, Responder, get, post, web};
use serde::{Deserialize, Serialize};

use crate::app::SystemClock;
use crate::app::services::{SessionStore, SqliteSessionStore, StoreError};
use crate::app::tracker::{SleepTracker, TrackerError};
use crate::domain::format::timestamp_to_iso8601;
use crate::domain::models::{SleepSession, UNRATED_QUALITY};

pub type SharedTracker = Arc<Mutex<SleepTracker<SqliteSessionStore, SystemClock>>>;

#[derive(Clone)]
pub struct ApiState {
    pub tracker: SharedTracker,
    pub session_queries: SqliteSessionStore,
    pub list_page_limit: u32,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: i64,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub quality: Option<i64>,
}

impl SessionResponse {
    fn from_session(session: &SleepSession) -> Self {
        Self {
            id: session.id,
            started_at: timestamp_to_iso8601(session.started_at),
            ended_at: (!session.is_open()).then(|| timestamp_to_iso8601(session.ended_at)),
            quality: (session.quality != UNRATED_QUALITY).then_some(session.quality),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingStateResponse {
    pub start_visible: bool,
    pub stop_visible: bool,
    pub clear_visible: bool,
    pub history_text: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEventsResponse {
    pub rating: Option<SessionResponse>,
    pub cleared_notice: bool,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsDbResponse {
    pub schema_version: u32,
    pub sessions_count: i64,
    pub latest_session: Option<SessionResponse>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(start_tracking_endpoint)
        .service(stop_tracking_endpoint)
        .service(clear_tracking_endpoint)
        .service(get_tracking_state_endpoint)
        .service(get_tracking_events_endpoint)
        .service(ack_rating_event_endpoint)
        .service(ack_cleared_event_endpoint)
        .service(list_sessions_endpoint)
        .service(get_latest_session_endpoint)
        .service(get_db_diagnostics_endpoint);
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[post("/tracking/start")]
async fn start_tracking_endpoint(state: web::Data<ApiState>) -> impl Responder {
    let Ok(mut tracker) = state.tracker.lock() else {
        return tracker_lock_response();
    };

    match tracker.start() {
        Ok(()) => match tracker.current() {
            Some(session) => HttpResponse::Created().json(SessionResponse::from_session(session)),
            None => HttpResponse::Created().finish(),
        },
        Err(TrackerError::SessionAlreadyOpen) => HttpResponse::Conflict().json(serde_json::json!({
            "error": "a sleep session is already being tracked"
        })),
        Err(error) => tracker_error_response(error),
    }
}

#[post("/tracking/stop")]
async fn stop_tracking_endpoint(state: web::Data<ApiState>) -> impl Responder {
    let Ok(mut tracker) = state.tracker.lock() else {
        return tracker_lock_response();
    };

    match tracker.stop() {
        Ok(Some(session)) => HttpResponse::Ok().json(SessionResponse::from_session(&session)),
        Ok(None) => HttpResponse::NoContent().finish(),
        Err(error) => tracker_error_response(error),
    }
}

#[post("/tracking/clear")]
async fn clear_tracking_endpoint(state: web::Data<ApiState>) -> impl Responder {
    let Ok(mut tracker) = state.tracker.lock() else {
        return tracker_lock_response();
    };

    match tracker.clear() {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(error) => tracker_error_response(error),
    }
}

#[get("/tracking/state")]
async fn get_tracking_state_endpoint(state: web::Data<ApiState>) -> impl Responder {
    let Ok(tracker) = state.tracker.lock() else {
        return tracker_lock_response();
    };

    match tracker.view() {
        Ok(view) => HttpResponse::Ok().json(TrackingStateResponse {
            start_visible: view.start_visible,
            stop_visible: view.stop_visible,
            clear_visible: view.clear_visible,
            history_text: view.history_text,
        }),
        Err(error) => tracker_error_response(error),
    }
}

#[get("/tracking/events")]
async fn get_tracking_events_endpoint(state: web::Data<ApiState>) -> impl Responder {
    let Ok(tracker) = state.tracker.lock() else {
        return tracker_lock_response();
    };

    HttpResponse::Ok().json(TrackingEventsResponse {
        rating: tracker.navigate_to_rating().map(SessionResponse::from_session),
        cleared_notice: tracker.show_cleared_notice(),
    })
}

#[post("/tracking/events/rating/ack")]
async fn ack_rating_event_endpoint(state: web::Data<ApiState>) -> impl Responder {
    let Ok(mut tracker) = state.tracker.lock() else {
        return tracker_lock_response();
    };

    tracker.done_navigating();
    HttpResponse::NoContent().finish()
}

#[post("/tracking/events/cleared/ack")]
async fn ack_cleared_event_endpoint(state: web::Data<ApiState>) -> impl Responder {
    let Ok(mut tracker) = state.tracker.lock() else {
        return tracker_lock_response();
    };

    tracker.done_showing_cleared();
    HttpResponse::NoContent().finish()
}

#[get("/sessions")]
async fn list_sessions_endpoint(
    state: web::Data<ApiState>,
    query: web::Query<ListQuery>,
) -> impl Responder {
    let limit = query.limit.unwrap_or(state.list_page_limit).clamp(1, 500);
    let offset = query.offset.unwrap_or(0);

    match state.session_queries.list_page(limit, offset) {
        Ok(sessions) => {
            let mapped: Vec<SessionResponse> = sessions
                .iter()
                .map(SessionResponse::from_session)
                .collect();

            HttpResponse::Ok().json(mapped)
        }
        Err(error) => store_error_response(error),
    }
}

#[get("/sessions/latest")]
async fn get_latest_session_endpoint(state: web::Data<ApiState>) -> impl Responder {
    match state.session_queries.latest() {
        Ok(Some(session)) => HttpResponse::Ok().json(SessionResponse::from_session(&session)),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
            "error": "no sessions recorded"
        })),
        Err(error) => store_error_response(error),
    }
}

#[get("/diagnostics/db")]
async fn get_db_diagnostics_endpoint(state: web::Data<ApiState>) -> impl Responder {
    let schema_version = match state.session_queries.schema_version() {
        Ok(value) => value,
        Err(error) => return store_error_response(error),
    };
    let sessions_count = match state.session_queries.count() {
        Ok(value) => value,
        Err(error) => return store_error_response(error),
    };
    let latest_session = match state.session_queries.latest() {
        Ok(value) => value,
        Err(error) => return store_error_response(error),
    };

    HttpResponse::Ok().json(DiagnosticsDbResponse {
        schema_version,
        sessions_count,
        latest_session: latest_session
            .as_ref()
            .map(SessionResponse::from_session),
    })
}

fn tracker_lock_response() -> HttpResponse {
    HttpResponse::InternalServerError().json(serde_json::json!({
        "error": "tracker lock poisoned"
    }))
}

fn tracker_error_response(error: TrackerError) -> HttpResponse {
    match error {
        TrackerError::SessionAlreadyOpen => HttpResponse::Conflict().json(serde_json::json!({
            "error": "a sleep session is already being tracked"
        })),
        TrackerError::Store(error) => store_error_response(error),
    }
}

fn store_error_response(error: StoreError) -> HttpResponse {
    match error {
        StoreError::DbLockPoisoned => HttpResponse::InternalServerError().json(serde_json::json!({
            "error": "database lock poisoned"
        })),
        StoreError::Database(error) => HttpResponse::InternalServerError().json(serde_json::json!({
            "error": format!("database query failed: {error}")
        })),
    }
}
