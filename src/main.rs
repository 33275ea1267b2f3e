fn main() {
    dotenvy::dotenv().ok();

    if let Err(err) = sleep_log_api::app::run() {
        eprintln!("application startup failed: {err}");
        std::process::exit(1);
    }
}
