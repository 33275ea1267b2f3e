use std::sync::{Arc, Mutex};

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use chrono::Utc;

use crate::adapters::api::{ApiState, configure_routes};
use crate::app::config::AppConfig;
use crate::app::error::AppError;
use crate::app::services::SqliteSessionStore;
use crate::app::tracker::SleepTracker;
use crate::domain::models::{Clock, TimestampMs};

#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimestampMs {
        TimestampMs(Utc::now().timestamp_millis())
    }
}

pub fn run(config: AppConfig) -> Result<(), AppError> {
    let mut connection =
        crate::adapters::db::open_connection(&config.db_path).map_err(AppError::database_init)?;
    crate::adapters::db::run_migrations(&mut connection).map_err(AppError::database_init)?;

    let shared_connection = Arc::new(Mutex::new(connection));
    let store = SqliteSessionStore::new(Arc::clone(&shared_connection));

    let tracker = SleepTracker::new(store.clone(), SystemClock).map_err(AppError::runtime)?;
    let api_state = ApiState {
        tracker: Arc::new(Mutex::new(tracker)),
        session_queries: store,
        list_page_limit: config.list_page_limit,
    };

    tracing::info!(bind = %config.http_bind, "http server starting");

    let server_result = actix_web::rt::System::new().block_on(async move {
        HttpServer::new(move || {
            App::new()
                .wrap(Cors::permissive())
                .app_data(web::Data::new(api_state.clone()))
                .configure(configure_routes)
        })
        .bind(&config.http_bind)?
        .run()
        .await
    });

    server_result.map_err(AppError::runtime)
}
