pub mod agents;
pub mod aggregate;
pub mod building_codes;
pub mod clients;
pub mod config;
pub mod deserializers;
pub mod error;
pub mod http;
pub mod notify;
pub mod prompts;
pub mod schemas;
pub mod workflows;

use std::sync::Arc;

// Load env from INSPECT_ENV_FILE if set, else ./.env; missing files are ignored.
pub fn load_env() {
    match std::env::var("INSPECT_ENV_FILE") {
        Ok(path) => {
            let _ = dotenvy::from_path(path);
        }
        Err(_) => {
            let _ = dotenvy::dotenv();
        }
    }
}

/// Pick the webhook notifier the configuration asks for.
pub fn build_notifier(config: &config::Config) -> error::Result<Arc<dyn notify::Notifier>> {
    if config.webhooks.enabled {
        Ok(Arc::new(notify::WebhookNotifier::new(&config.webhooks)?))
    } else {
        Ok(Arc::new(notify::DisabledNotifier))
    }
}

/// OpenAI-compatible completion client from configuration and `OPENAI_API_KEY`.
pub fn build_completion_client(
    config: &config::Config,
) -> error::Result<Arc<dyn clients::CompletionClient>> {
    let api_key = config
        .runtime
        .openai_api_key
        .clone()
        .unwrap_or_default();
    Ok(Arc::new(clients::OpenAiClient::new(
        api_key,
        &config.completion,
    )?))
}
