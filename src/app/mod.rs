mod config;
mod error;
mod logging;
mod runtime;
pub mod services;
pub mod tracker;

pub use error::AppError;
pub use runtime::SystemClock;

pub fn run() -> Result<(), AppError> {
    logging::init()?;

    let config = config::AppConfig::from_env()?;

    tracing::info!(
        db_path = %config.db_path,
        http_bind = %config.http_bind,
        list_page_limit = config.list_page_limit,
        "application bootstrap initialized"
    );

    runtime::run(config)
}
