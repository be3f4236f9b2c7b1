use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use secrecy::{ExposeSecret, SecretString};
use sqlwise_agent::{AgentConfig, DEFAULT_MAX_ITERATIONS};
use sqlwise_core::ToolCallingLlm;
use sqlwise_llm::providers::google::DEFAULT_GEMINI_MODEL;
use sqlwise_llm::providers::openai_compatible::DEFAULT_OPENAI_MODEL;
use sqlwise_llm::{GoogleClient, OpenAiCompatibleClient};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    Google,
    Openai,
}

impl Provider {
    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Google => DEFAULT_GEMINI_MODEL,
            Provider::Openai => DEFAULT_OPENAI_MODEL,
        }
    }
}

/// Answer a question about a SQLite database.
#[derive(Clone, Parser)]
#[command(name = "sqlwise", version, about)]
pub struct Cli {
    /// The question, in plain language.
    pub question: String,

    #[arg(long, env = "SQLWISE_PROVIDER", value_enum, default_value_t = Provider::Google)]
    pub provider: Provider,

    /// Defaults to the provider's own model family.
    #[arg(long, env = "SQLWISE_MODEL")]
    pub model: Option<String>,

    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub google_api_key: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Overrides the provider's API endpoint.
    #[arg(long, env = "SQLWISE_BASE_URL")]
    pub base_url: Option<String>,

    #[arg(long, env = "SQLWISE_DATABASE", default_value = "data/chinook.db")]
    pub database: PathBuf,

    /// Script used to populate the database when the file does not exist yet.
    #[arg(long, env = "SQLWISE_BOOTSTRAP_SQL", default_value = "data/chinook.sql")]
    pub bootstrap_sql: PathBuf,

    #[arg(long, env = "SQLWISE_MAX_ITERATIONS", default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: u32,

    #[arg(long, env = "SQLWISE_CHART_DIR", default_value = "charts")]
    pub chart_dir: PathBuf,

    /// Upper bound on workflow stage transitions.
    #[arg(long, env = "SQLWISE_MAX_STEPS", default_value_t = 50)]
    pub max_steps: usize,
}

impl std::fmt::Debug for Cli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("Cli")
            .field("question", &self.question)
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("google_api_key", &redacted(&self.google_api_key))
            .field("openai_api_key", &redacted(&self.openai_api_key))
            .field("base_url", &self.base_url)
            .field("database", &self.database)
            .field("bootstrap_sql", &self.bootstrap_sql)
            .field("max_iterations", &self.max_iterations)
            .field("chart_dir", &self.chart_dir)
            .field("max_steps", &self.max_steps)
            .finish()
    }
}

impl Cli {
    pub fn model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            model: self.model(),
            max_iterations: self.max_iterations,
            max_steps: self.max_steps,
        }
    }

    /// The key for the selected provider; blank values count as missing.
    pub fn api_key(&self) -> anyhow::Result<SecretString> {
        let (key, variable) = match self.provider {
            Provider::Google => (&self.google_api_key, "GOOGLE_API_KEY"),
            Provider::Openai => (&self.openai_api_key, "OPENAI_API_KEY"),
        };
        match key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(SecretString::new(key.to_string())),
            _ => bail!("{variable} is not set; it is required for the {:?} provider", self.provider),
        }
    }

    pub fn build_llm(&self) -> anyhow::Result<Arc<dyn ToolCallingLlm>> {
        let key = self.api_key()?;
        match self.provider {
            Provider::Google => {
                let mut client = GoogleClient::new(key.expose_secret().as_str(), self.model())
                    .context("failed to create the Gemini client")?;
                if let Some(base_url) = &self.base_url {
                    client = client.with_base_url(base_url.clone());
                }
                Ok(Arc::new(client))
            }
            Provider::Openai => {
                let mut builder = OpenAiCompatibleClient::builder()
                    .api_key(key.expose_secret().as_str())
                    .model(self.model());
                if let Some(base_url) = &self.base_url {
                    builder = builder.base_url(base_url.clone());
                }
                let client = builder
                    .build()
                    .context("failed to create the OpenAI-compatible client")?;
                Ok(Arc::new(client))
            }
        }
    }
}
