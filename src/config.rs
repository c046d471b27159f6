use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main configuration structure loaded from inspect_pipeline.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub webhooks: WebhookConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Chat-completions endpoint shared by every model-backed stage
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub base_url: String,
    /// Model for the photo-reading stages (detection, diagnosis)
    pub vision_model: String,
    /// Model for enrichment and report writing
    pub text_model: String,
    pub timeout_ms: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            vision_model: "gpt-4o".to_string(),
            text_model: "gpt-4o".to_string(),
            timeout_ms: 120_000,
        }
    }
}

/// Where finished payloads are pushed
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub enabled: bool,
    pub backend_base_url: String,
    pub inspection_path: String,
    pub diagnosis_path: String,
    pub timeout_ms: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend_base_url: "http://localhost:3000".to_string(),
            inspection_path: "/api/v1/webhooks/inspection-complete".to_string(),
            diagnosis_path: "/api/v1/webhooks/diagnosis-complete".to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl WebhookConfig {
    pub fn inspection_url(&self) -> String {
        join_url(&self.backend_base_url, &self.inspection_path)
    }

    pub fn diagnosis_url(&self) -> String {
        join_url(&self.backend_base_url, &self.diagnosis_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Per-stage completion knobs
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AgentSettings {
    /// Overrides the pipeline-wide model for this stage
    #[serde(default)]
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(default)]
    pub json_mode: bool,
}

impl AgentSettings {
    fn new(max_tokens: u32, temperature: f32, json_mode: bool) -> Self {
        Self {
            model: None,
            max_tokens,
            temperature,
            json_mode,
        }
    }

    /// Stage model, falling back to `default_model`.
    pub fn model_or<'a>(&'a self, default_model: &'a str) -> &'a str {
        self.model.as_deref().unwrap_or(default_model)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentsConfig {
    pub vision: AgentSettings,
    pub diagnosis: AgentSettings,
    pub inspection_repair_scope: AgentSettings,
    pub diagnosis_repair_scope: AgentSettings,
    pub inspection_report: AgentSettings,
    pub diagnosis_report: AgentSettings,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            // Vision output is parsed leniently; json mode is not requested for image calls.
            vision: AgentSettings::new(4096, 0.3, false),
            diagnosis: AgentSettings::new(2048, 0.3, false),
            inspection_repair_scope: AgentSettings::new(4096, 0.3, true),
            diagnosis_repair_scope: AgentSettings::new(4096, 0.3, true),
            inspection_report: AgentSettings::new(4096, 0.5, true),
            diagnosis_report: AgentSettings::new(4096, 0.5, true),
        }
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub openai_api_key: Option<String>,
    pub http_bind: SocketAddr,
    pub bearer_token: Option<String>,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            http_bind: SocketAddr::from(([127, 0, 0, 1], 8088)),
            bearer_token: None,
            log_level: "inspect_pipeline=info,tower_http=info".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        let mut cfg = Self {
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            ..Self::default()
        };
        if let Ok(level) = std::env::var("RUST_LOG") {
            cfg.log_level = level;
        }
        if let Ok(v) = std::env::var("INSPECT_HTTP_BIND") {
            match v.parse::<SocketAddr>() {
                Ok(bind) => cfg.http_bind = bind,
                Err(_) => tracing::warn!("INSPECT_HTTP_BIND '{}' is not a socket address, ignoring", v),
            }
        }
        cfg.bearer_token = std::env::var("INSPECT_BEARER_TOKEN")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        cfg
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses INSPECT_PIPELINE_CONFIG or defaults to "inspect_pipeline.toml"
    pub fn load() -> anyhow::Result<Self> {
        crate::load_env();

        let config_path = std::env::var("INSPECT_PIPELINE_CONFIG")
            .unwrap_or_else(|_| "inspect_pipeline.toml".to_string());

        let mut config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            Self::from_toml_str(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();
        config.runtime = RuntimeConfig::load_from_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            self.completion.base_url = url;
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            self.completion.vision_model = model.clone();
            self.completion.text_model = model;
        }
        if let Ok(model) = std::env::var("OPENAI_TEXT_MODEL") {
            self.completion.text_model = model;
        }
        if let Some(ms) = env_parse::<u64>("INSPECT_COMPLETION_TIMEOUT_MS") {
            self.completion.timeout_ms = ms;
        }
        if let Ok(url) = std::env::var("BACKEND_BASE_URL") {
            self.webhooks.backend_base_url = url;
        }
        if let Some(ms) = env_parse::<u64>("INSPECT_WEBHOOK_TIMEOUT_MS") {
            self.webhooks.timeout_ms = ms;
        }
        if let Ok(v) = std::env::var("INSPECT_WEBHOOKS_ENABLED") {
            self.webhooks.enabled = v == "1" || v.eq_ignore_ascii_case("true");
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.completion.base_url.starts_with("http://")
            && !self.completion.base_url.starts_with("https://")
        {
            anyhow::bail!(
                "completion.base_url '{}' must start with http:// or https://",
                self.completion.base_url
            );
        }
        if self.completion.timeout_ms == 0 {
            anyhow::bail!("completion.timeout_ms must be > 0");
        }
        if self.webhooks.enabled {
            if !self.webhooks.backend_base_url.starts_with("http://")
                && !self.webhooks.backend_base_url.starts_with("https://")
            {
                anyhow::bail!(
                    "webhooks.backend_base_url '{}' must start with http:// or https://",
                    self.webhooks.backend_base_url
                );
            }
            if self.webhooks.timeout_ms == 0 {
                anyhow::bail!("webhooks.timeout_ms must be > 0");
            }
        }
        for (name, agent) in [
            ("vision", &self.agents.vision),
            ("diagnosis", &self.agents.diagnosis),
            ("inspection_repair_scope", &self.agents.inspection_repair_scope),
            ("diagnosis_repair_scope", &self.agents.diagnosis_repair_scope),
            ("inspection_report", &self.agents.inspection_report),
            ("diagnosis_report", &self.agents.diagnosis_report),
        ] {
            if agent.max_tokens == 0 {
                anyhow::bail!("agents.{}.max_tokens must be > 0", name);
            }
            if !(0.0..=2.0).contains(&agent.temperature) {
                anyhow::bail!("agents.{}.temperature must be between 0.0 and 2.0", name);
            }
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
