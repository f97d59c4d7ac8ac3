use quote0::settings::Settings;

#[tokio::main]
async fn main() {
    let settings = Settings::new().expect("Failed to load settings.");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                let app_name = env!("CARGO_PKG_NAME").replace('-', "_");
                let level = settings.log_level.as_str();

                format!("{app_name}={level},tower_http={level}").into()
            }),
        )
        .init();

    if settings.dot_api_key.is_empty() {
        tracing::warn!("DOT_API_KEY is not set; configure it in the settings page");
    }

    if let Err(e) = quote0::server::run(settings).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
