use secrecy::Secret;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub embeddings: EmbeddingsSettings,
    pub captioning: CaptioningSettings,
    pub context_store: ContextStoreSettings,
    pub llm: LlmSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    /// Groups of endpoints served by this instance.
    ///
    /// Running with only `embedding`, `vision` or `llm` gives the standalone APIs.
    pub apis: Vec<ApiGroup>,
    /// Origins allowed to call the API from a browser, any origin when empty
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApiGroup {
    /// `/embed_context`, `/prompt`, `/get_images`, `/delete_all_images`
    Context,
    /// `/embed`
    Embedding,
    /// `/process`
    Vision,
    /// `/generate`
    Llm,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingsSettings {
    pub provider: EmbeddingsProvider,
    /// Sentence embeddings model type for `huggingface`, model name for `ollama`
    pub model: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingsProvider {
    Huggingface,
    Ollama,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CaptioningSettings {
    pub provider: CaptioningProvider,
    /// Vision model name, only used by the `ollama` provider
    pub model: String,
    /// Instruction sent along the image to the vision model
    pub prompt: String,
    /// Base URL of a vision API exposing `POST /process`, required by the `remote` provider
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaptioningProvider {
    Ollama,
    Remote,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContextStoreSettings {
    pub provider: ContextStoreProvider,
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub grpc_port: u16,
    pub api_key: Option<Secret<String>>,
    /// Qdrant distance name: `Cosine`, `Euclid`, `Dot` or `Manhattan`
    pub distance: String,
    /// Prepended to the user id to name the user collection
    pub collection_prefix: String,
    /// Number of nearest items retrieved to answer a prompt
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub retrieval_limit: usize,
}

impl ContextStoreSettings {
    pub fn get_grpc_base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.grpc_port)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContextStoreProvider {
    Qdrant,
    InMemory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmSettings {
    /// Base URL of the Ollama-compatible server, also used by the `ollama` embeddings and captioning providers
    pub base_url: String,
    pub chat_model: String,
    pub generate_model: String,
    pub system_prompt: String,
}

/// Extracts app settings from configuration files and env variables
///
/// `base.yaml` should contain shared settings for all environments.
/// A specific env file should be created for each environment: `local.yaml` and `production.yaml`
/// The environment is set with the env var `APP_ENVIRONMENT`.
/// If `APP_ENVIRONMENT` is not set, `local.yaml` is the default.
///
/// Settings are also taken from environment variables: with a prefix of APP and '__' as separator
/// For ex: `APP_LLM__BASE_URL=http://ollama:11434` would set `Settings.llm.base_url`
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| {
        config::ConfigError::Message(format!("Failed to determine the current directory: {}", e))
    })?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

/// The possible runtime environment for our application.
#[derive(Debug, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}
