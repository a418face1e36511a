use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use voice_proxy::{
    api::{self, AppState},
    config::Settings,
    estate::EstateClient,
    mailer::{ApiMailer, LeadMailer},
    LookupEngine,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("voice_proxy=info")),
        )
        .init();

    let settings = Settings::from_env()?;

    info!("==================================================");
    info!("  VOICE-PROXY ({})", settings.env_name);
    info!("==================================================");
    info!("Estate API: {}", settings.estate.base_url);
    if settings.estate.api_key.is_empty() {
        warn!("ESTATE_API_KEY is not set; every lookup will fail until it is");
    }

    let source = Arc::new(EstateClient::new(&settings.estate));
    let engine = LookupEngine::new(source, settings.lookup.clone());

    let mailer: Option<Arc<dyn LeadMailer>> = match settings.mail.clone() {
        Some(config) => {
            info!("Lead mailer: {}", config.api_url);
            Some(Arc::new(ApiMailer::new(config)))
        }
        None => {
            warn!("MAIL_API_KEY is not set; send_lead will report mailer_not_configured");
            None
        }
    };

    let state = Arc::new(AppState {
        engine,
        mailer,
        force_lead_to: settings.force_lead_to.clone(),
        env_name: settings.env_name.clone(),
    });

    let app = api::router(state, settings.request_timeout);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", settings.port)).await?;
    info!("Server running on port {}", settings.port);
    axum::serve(listener, app).await?;
    Ok(())
}
