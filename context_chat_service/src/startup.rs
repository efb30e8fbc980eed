use actix_cors::Cors;
use actix_multipart::form::MultipartFormConfig;
use actix_web::{
    dev::Server,
    error::{InternalError, JsonPayloadError, QueryPayloadError},
    http::{header, StatusCode},
    web::{self, Data},
    App, HttpRequest, HttpServer,
};
use qdrant_client::Qdrant;
use secrecy::ExposeSecret;
use std::{net::TcpListener, sync::Arc};
use tracing::info;
use tracing_actix_web::TracingLogger;

#[cfg(feature = "huggingface")]
use crate::adapters::huggingface_embeddings::{
    HuggingFaceEmbeddingsService, HuggingFaceModelError,
};
use crate::{
    adapters::{
        ollama_captioning::OllamaCaptioningService,
        ollama_chat_completion::OllamaChatCompletionService,
        ollama_embeddings::OllamaEmbeddingsService, remote_captioning::RemoteCaptioningService,
    },
    configuration::{
        ApiGroup, CaptioningProvider, ContextStoreProvider, ContextStoreSettings,
        EmbeddingsProvider, Settings,
    },
    controllers::{
        delete_all_images, embed, embed_context, generate, get_images, health_check,
        json_error_response, process, prompt,
    },
    ports::{
        captioning_service::CaptioningService, chat_completion_service::ChatCompletionService,
        context_store::{ContextStore, ContextStoreError},
        embeddings_service::EmbeddingsService,
    },
    repositories::{
        context_item_in_memory_repository::ContextItemInMemoryRepository,
        context_item_qdrant_repository::ContextItemQdrantRepository,
    },
    use_cases::{
        answer_prompt::AnswerPromptUseCase, embed_context::EmbedContextUseCase,
        manage_images::ManageImagesUseCase,
    },
};

/// Holds the newly built server, and some useful properties
pub struct Application {
    server: Server,
    port: u16,
}

/// The backends the use cases and controllers are built on
#[derive(Clone)]
pub struct Providers {
    pub embeddings_service: Arc<dyn EmbeddingsService>,
    pub captioning_service: Arc<dyn CaptioningService>,
    pub context_store: Arc<dyn ContextStore>,
    pub chat_completion_service: Arc<dyn ChatCompletionService>,
}

#[derive(thiserror::Error, Debug)]
pub enum ApplicationBuildError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error("Qdrant client error: {0}")]
    QdrantError(#[from] qdrant_client::QdrantError),
    #[error(transparent)]
    ContextStoreError(#[from] ContextStoreError),
    #[cfg(feature = "huggingface")]
    #[error(transparent)]
    HuggingFaceModelError(#[from] HuggingFaceModelError),
    #[error("Missing setting: {0}")]
    MissingSetting(String),
    #[error("Provider not available in this build: {0}")]
    ProviderUnavailable(String),
}

impl Providers {
    /// Builds the providers selected by the configuration.
    ///
    /// Nothing is contacted yet: models and remote services are only reached on the first request.
    #[tracing::instrument(name = "Building providers", skip(settings))]
    pub fn try_from_settings(settings: &Settings) -> Result<Self, ApplicationBuildError> {
        let client = reqwest::Client::new();

        let embeddings_service: Arc<dyn EmbeddingsService> = match settings.embeddings.provider {
            EmbeddingsProvider::Huggingface => {
                huggingface_embeddings_service(&settings.embeddings.model)?
            }
            EmbeddingsProvider::Ollama => Arc::new(OllamaEmbeddingsService::new(
                client.clone(),
                &settings.llm.base_url,
                &settings.embeddings.model,
            )),
        };

        let captioning_service: Arc<dyn CaptioningService> = match settings.captioning.provider {
            CaptioningProvider::Ollama => Arc::new(OllamaCaptioningService::new(
                client.clone(),
                &settings.llm.base_url,
                &settings.captioning.model,
                &settings.captioning.prompt,
            )),
            CaptioningProvider::Remote => {
                let base_url = settings.captioning.base_url.as_deref().ok_or_else(|| {
                    ApplicationBuildError::MissingSetting(
                        "captioning.base_url is required by the remote captioning provider".into(),
                    )
                })?;
                Arc::new(RemoteCaptioningService::new(client.clone(), base_url))
            }
        };

        let context_store: Arc<dyn ContextStore> = match settings.context_store.provider {
            ContextStoreProvider::Qdrant => Arc::new(get_qdrant_repository(&settings.context_store)?),
            ContextStoreProvider::InMemory => Arc::new(ContextItemInMemoryRepository::new()),
        };

        let chat_completion_service = Arc::new(OllamaChatCompletionService::new(
            client,
            &settings.llm.base_url,
            &settings.llm.chat_model,
            &settings.llm.generate_model,
        ));

        info!(
            embeddings = ?settings.embeddings.provider,
            captioning = ?settings.captioning.provider,
            context_store = ?settings.context_store.provider,
            "Providers built"
        );

        Ok(Self {
            embeddings_service,
            captioning_service,
            context_store,
            chat_completion_service,
        })
    }
}

impl Application {
    /// # Parameters
    /// - nb_workers: number of actix-web workers
    ///   if `None`, the number of available physical CPUs is used as the worker count.
    #[tracing::instrument(name = "Building application", skip(settings))]
    pub async fn build(
        settings: Settings,
        nb_workers: Option<usize>,
    ) -> Result<Self, ApplicationBuildError> {
        let providers = Providers::try_from_settings(&settings)?;

        Self::build_with_providers(settings, providers, nb_workers).await
    }

    /// Builds the application on already instantiated providers
    #[tracing::instrument(name = "Building application with providers", skip(settings, providers))]
    pub async fn build_with_providers(
        settings: Settings,
        providers: Providers,
        nb_workers: Option<usize>,
    ) -> Result<Self, ApplicationBuildError> {
        let address = format!(
            "{}:{}",
            settings.application.host, settings.application.port
        );
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();

        let server = run(listener, settings, nb_workers, providers)?;

        Ok(Self { server, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// This function only returns when the application is stopped
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        info!("Running server ...");
        self.server.await
    }
}

/// listener: the consumer binds their own port
///
/// TracingLogger middleware: helps collecting telemetry data.
/// It generates a unique identifier for each incoming request: `request_id`.
///
/// Cors middleware: lets a frontend served from another origin call the API.
///
/// Only the endpoints of the API groups listed in the settings are registered.
pub fn run(
    listener: TcpListener,
    settings: Settings,
    nb_workers: Option<usize>,
    providers: Providers,
) -> Result<Server, std::io::Error> {
    let apis = settings.application.apis.clone();
    let cors_allowed_origins = settings.application.cors_allowed_origins.clone();
    info!(?apis, ?cors_allowed_origins, "Serving API groups");

    // Wraps the use cases and providers in a `actix_web::Data` (`Arc`) to be able to register them
    // and access them from handlers. They are shared among all workers.
    let embed_context_use_case = Data::new(EmbedContextUseCase::new(
        providers.embeddings_service.clone(),
        providers.captioning_service.clone(),
        providers.context_store.clone(),
    ));
    let answer_prompt_use_case = Data::new(AnswerPromptUseCase::new(
        providers.embeddings_service.clone(),
        providers.context_store.clone(),
        providers.chat_completion_service.clone(),
        &settings.llm.system_prompt,
        settings.context_store.retrieval_limit,
    ));
    let manage_images_use_case = Data::new(ManageImagesUseCase::new(
        providers.context_store.clone(),
    ));
    let embeddings_service: Data<dyn EmbeddingsService> =
        Data::from(providers.embeddings_service.clone());
    let captioning_service: Data<dyn CaptioningService> =
        Data::from(providers.captioning_service.clone());
    let chat_completion_service: Data<dyn ChatCompletionService> =
        Data::from(providers.chat_completion_service.clone());

    let server = HttpServer::new(move || {
        info!("Starting actix-web worker");

        let apis = apis.clone();
        let embed_context_use_case = embed_context_use_case.clone();
        let answer_prompt_use_case = answer_prompt_use_case.clone();
        let manage_images_use_case = manage_images_use_case.clone();
        let embeddings_service = embeddings_service.clone();
        let captioning_service = captioning_service.clone();
        let chat_completion_service = chat_completion_service.clone();

        App::new()
            .wrap(cors(&cors_allowed_origins))
            .wrap(TracingLogger::default())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::QueryConfig::default().error_handler(query_error_handler))
            .app_data(MultipartFormConfig::default().error_handler(multipart_error_handler))
            .route("/health_check", web::get().to(health_check))
            .configure(move |cfg| {
                for api in &apis {
                    match api {
                        ApiGroup::Context => {
                            cfg.app_data(embed_context_use_case.clone())
                                .app_data(answer_prompt_use_case.clone())
                                .app_data(manage_images_use_case.clone())
                                .route("/embed_context", web::post().to(embed_context))
                                .route("/prompt", web::post().to(prompt))
                                .route("/get_images", web::get().to(get_images))
                                .route("/delete_all_images", web::delete().to(delete_all_images));
                        }
                        ApiGroup::Embedding => {
                            cfg.app_data(embeddings_service.clone())
                                .route("/embed", web::post().to(embed));
                        }
                        ApiGroup::Vision => {
                            cfg.app_data(captioning_service.clone())
                                .route("/process", web::post().to(process));
                        }
                        ApiGroup::Llm => {
                            cfg.app_data(chat_completion_service.clone())
                                .route("/generate", web::post().to(generate));
                        }
                    }
                }
            })
    })
    .listen(listener)?;

    // If no workers were set, use the actix-web settings (number of workers = number of physical CPUs)
    if let Some(nb_workers) = nb_workers {
        return Ok(server.workers(nb_workers).run());
    }

    // No await
    Ok(server.run())
}

/// Any origin is allowed when no origin is configured
fn cors(allowed_origins: &[String]) -> Cors {
    if allowed_origins.is_empty() {
        return Cors::permissive();
    }

    allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(vec!["GET", "POST", "DELETE"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
        .max_age(3600)
}

#[tracing::instrument(name = "Creating Qdrant context repository", skip(settings))]
pub fn get_qdrant_repository(
    settings: &ContextStoreSettings,
) -> Result<ContextItemQdrantRepository, ApplicationBuildError> {
    let mut builder = Qdrant::from_url(&settings.get_grpc_base_url());

    if let Some(api_key) = &settings.api_key {
        builder = builder.api_key(api_key.expose_secret().to_string());
    }

    let client = builder.build()?;

    Ok(ContextItemQdrantRepository::try_new(
        client,
        &settings.collection_prefix,
        &settings.distance,
    )?)
}

#[cfg(feature = "huggingface")]
fn huggingface_embeddings_service(
    model: &str,
) -> Result<Arc<dyn EmbeddingsService>, ApplicationBuildError> {
    Ok(Arc::new(HuggingFaceEmbeddingsService::try_new(model)?))
}

#[cfg(not(feature = "huggingface"))]
fn huggingface_embeddings_service(
    _model: &str,
) -> Result<Arc<dyn EmbeddingsService>, ApplicationBuildError> {
    Err(ApplicationBuildError::ProviderUnavailable(
        "huggingface embeddings, build with the `huggingface` feature".into(),
    ))
}

// Malformed bodies, queries and forms are answered with the same JSON error shape as the handlers
fn json_error_handler(error: JsonPayloadError, _: &HttpRequest) -> actix_web::Error {
    let response = json_error_response(StatusCode::BAD_REQUEST, &error);
    InternalError::from_response(error, response).into()
}

fn query_error_handler(error: QueryPayloadError, _: &HttpRequest) -> actix_web::Error {
    let response = json_error_response(StatusCode::BAD_REQUEST, &error);
    InternalError::from_response(error, response).into()
}

fn multipart_error_handler(
    error: actix_multipart::MultipartError,
    _: &HttpRequest,
) -> actix_web::Error {
    let response = json_error_response(StatusCode::BAD_REQUEST, &error);
    InternalError::from_response(error, response).into()
}
