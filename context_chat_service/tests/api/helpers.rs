use std::{
    net::TcpListener,
    sync::{Arc, Mutex},
};

use actix_web::{web, App, HttpResponse, HttpServer};
use base64::{engine::general_purpose::STANDARD, Engine};
use common::telemetry::{get_tracing_subscriber, init_tracing_subscriber};
use context_chat_service::{
    configuration::{
        get_configuration, ApiGroup, CaptioningProvider, ContextStoreProvider, EmbeddingsProvider,
        Settings,
    },
    startup::Application,
};
use once_cell::sync::Lazy;
use serde_json::{json, Value};

/// Caption returned by the fake vision model
pub const FAKE_CAPTION: &str = "a cat sitting on a sofa";
/// Answer returned by the fake chat model
pub const FAKE_CHAT_ANSWER: &str = "mocked answer";
/// Images whose content starts with this marker fail to be captioned
pub const UNDECODABLE_IMAGE_MARKER: &[u8] = b"not-an-image";
/// Dimension of the fake embeddings
const FAKE_EMBEDDING_DIMENSION: usize = 8;

// Ensures that the `tracing` stack is only initialized once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    // We cannot assign the output of `get_tracing_subscriber` to a variable based on the value of `TEST_LOG`
    // because the sink is part of the type returned by `get_tracing_subscriber`, therefore they are not the
    // same type.
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber =
            get_tracing_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_tracing_subscriber(subscriber).expect("Failed to set up tracing");
    } else {
        let subscriber =
            get_tracing_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_tracing_subscriber(subscriber).expect("Failed to set up tracing");
    };
});

/// A request received by the fake Ollama server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub body: Value,
}

#[derive(Clone, Default)]
pub struct RequestRecorder(Arc<Mutex<Vec<RecordedRequest>>>);

impl RequestRecorder {
    fn record(&self, path: &str, body: &Value) {
        self.0.lock().unwrap().push(RecordedRequest {
            path: path.to_string(),
            body: body.clone(),
        });
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.path == path)
            .cloned()
            .collect()
    }
}

pub struct TestApp {
    pub address: String,
    /// Requests received by the fake Ollama server, used to assert checks on what the application sent
    pub ollama_requests: RequestRecorder,
    pub api_client: reqwest::Client,
}

/// A test API client / test suite
impl TestApp {
    pub async fn embed_context(&self, form: reqwest::multipart::Form) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/embed_context", &self.address))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn prompt(&self, body: &Value) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/prompt", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_images(&self, user_id: &str) -> reqwest::Response {
        self.api_client
            .get(&format!("{}/get_images", &self.address))
            .query(&[("userId", user_id)])
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn delete_all_images(&self, user_id: &str) -> reqwest::Response {
        self.api_client
            .delete(&format!("{}/delete_all_images", &self.address))
            .query(&[("userId", user_id)])
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Messages sent to the chat model on the last `/api/chat` request
    pub fn last_chat_messages(&self) -> Vec<Value> {
        let requests = self.ollama_requests.requests_to("/api/chat");
        let last_request = requests.last().expect("No chat request received");

        last_request.body["messages"]
            .as_array()
            .expect("Chat request without messages")
            .clone()
    }
}

/// An image part of a multipart form
pub fn image_part(filename: &str, content: &[u8]) -> reqwest::multipart::Part {
    reqwest::multipart::Part::bytes(content.to_vec())
        .file_name(filename.to_string())
        .mime_str("image/png")
        .unwrap()
}

/// Launches the server as a background task, with the in-memory context store and
/// every model served by a fake Ollama server.
///
/// When a tokio runtime is shut down all tasks spawned on it are dropped.
/// tokio::test spins up a new runtime at the beginning of each test case and they shut down at the end of each test case.
/// Therefore no need to implement any clean up logic to avoid leaking resources between test runs
pub async fn spawn_app() -> TestApp {
    spawn_app_with_apis(&[
        ApiGroup::Context,
        ApiGroup::Embedding,
        ApiGroup::Vision,
        ApiGroup::Llm,
    ])
    .await
}

pub async fn spawn_app_with_apis(apis: &[ApiGroup]) -> TestApp {
    let apis = apis.to_vec();
    spawn_app_with(move |c| c.application.apis = apis).await
}

/// Launches the server after the test settings have been customized by `configure`
pub async fn spawn_app_with(configure: impl FnOnce(&mut Settings)) -> TestApp {
    // The first time `initialize` is invoked the code in `TRACING` is executed.
    // All other invocations will instead skip execution.
    Lazy::force(&TRACING);

    let ollama_requests = RequestRecorder::default();
    let ollama_address = spawn_fake_ollama(ollama_requests.clone());

    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        // Uses a random OS port: port 0 is special-cased at the OS level:
        // trying to bind port 0 will trigger an OS scan for an available port which will then be bound to the application.
        c.application.port = 0;

        c.embeddings.provider = EmbeddingsProvider::Ollama;
        c.embeddings.model = "fake-embeddings".to_string();
        c.captioning.provider = CaptioningProvider::Ollama;
        c.context_store.provider = ContextStoreProvider::InMemory;
        c.context_store.retrieval_limit = 3;
        c.llm.base_url = ollama_address;

        configure(&mut c);
        c
    };

    // Only one actix-web worker is needed for integration tests
    let application = Application::build(configuration, Some(1))
        .await
        .expect("Failed to build application.");

    // Gets the port before spawning the application
    let application_port = application.port();

    // Launches the application as a background task
    let _ = tokio::spawn(application.run_until_stopped());

    TestApp {
        address: format!("http://127.0.0.1:{}", application_port),
        ollama_requests,
        api_client: reqwest::Client::new(),
    }
}

/// Starts a fake Ollama server in the background and returns its base URL
fn spawn_fake_ollama(recorder: RequestRecorder) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind fake Ollama port");
    let port = listener.local_addr().unwrap().port();
    let recorder = web::Data::new(recorder);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(recorder.clone())
            .route("/api/embeddings", web::post().to(fake_embeddings))
            .route("/api/generate", web::post().to(fake_generate))
            .route("/api/chat", web::post().to(fake_chat))
    })
    .workers(1)
    .listen(listener)
    .expect("Failed to listen on fake Ollama port")
    .run();

    let _ = tokio::spawn(server);

    format!("http://127.0.0.1:{}", port)
}

/// Deterministic embeddings: the bytes of the prompt are counted into buckets
fn fake_embedding(prompt: &str) -> Vec<f32> {
    let mut embedding = vec![0.0; FAKE_EMBEDDING_DIMENSION];
    embedding[0] = 1.0;

    for byte in prompt.bytes() {
        embedding[byte as usize % FAKE_EMBEDDING_DIMENSION] += 1.0;
    }

    embedding
}

async fn fake_embeddings(
    recorder: web::Data<RequestRecorder>,
    body: web::Json<Value>,
) -> HttpResponse {
    recorder.record("/api/embeddings", &body);

    let prompt = body["prompt"].as_str().unwrap_or_default();
    HttpResponse::Ok().json(json!({ "embedding": fake_embedding(prompt) }))
}

async fn fake_generate(recorder: web::Data<RequestRecorder>, body: web::Json<Value>) -> HttpResponse {
    recorder.record("/api/generate", &body);

    match body["images"].as_array().and_then(|images| images.first()) {
        Some(image) => {
            let content = STANDARD
                .decode(image.as_str().unwrap_or_default())
                .unwrap_or_default();

            if content.starts_with(UNDECODABLE_IMAGE_MARKER) {
                return HttpResponse::InternalServerError()
                    .json(json!({ "error": "failed to decode image" }));
            }

            HttpResponse::Ok().json(json!({ "response": format!(" {} \n", FAKE_CAPTION) }))
        }
        None => {
            let prompt = body["prompt"].as_str().unwrap_or_default();
            HttpResponse::Ok().json(json!({ "response": format!("generated: {}", prompt) }))
        }
    }
}

async fn fake_chat(recorder: web::Data<RequestRecorder>, body: web::Json<Value>) -> HttpResponse {
    recorder.record("/api/chat", &body);

    HttpResponse::Ok().json(json!({
        "model": body["model"],
        "message": { "role": "assistant", "content": FAKE_CHAT_ANSWER },
        "done": true
    }))
}
