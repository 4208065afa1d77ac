//! Rotas HTTP e WebSocket sobre um etiquetador compartilhado

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use pos_core::{
    corpus::{normalize_sentence, TrainingPair},
    pipeline::{tag_streaming, TagEvent},
    trainer, DecodeError, PosTagger, TagError,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Estado compartilhado da aplicação.
///
/// Um único escritor durante o retreino, vários leitores na etiquetagem.
pub struct AppState {
    pub tagger: RwLock<PosTagger>,
}

impl AppState {
    pub fn new(tagger: PosTagger) -> Arc<Self> {
        Arc::new(Self {
            tagger: RwLock::new(tagger),
        })
    }
}

#[derive(Deserialize)]
struct TagRequest {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    tokens: Option<Vec<String>>,
}

#[derive(Serialize)]
struct TagResponse {
    tokens: Vec<String>,
    tags: Vec<String>,
    score: f64,
    processing_ms: u64,
}

/// Pares prontos e/ou linhas paralelas de sentenças e tags.
#[derive(Deserialize)]
struct TrainRequest {
    #[serde(default)]
    pairs: Vec<TrainingPair>,
    #[serde(default)]
    sentences: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
}

/// Mensagem WebSocket recebida do cliente
#[derive(Deserialize)]
struct WsRequest {
    text: String,
}

#[derive(Serialize)]
struct StatusResponse {
    trained: bool,
    tags: Vec<String>,
    vocabulary: usize,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(status_handler))
        .route("/train", post(train_handler))
        .route("/tag", post(tag_handler))
        .route("/model", get(model_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

fn tag_error_response(err: TagError) -> Response {
    let status = match &err {
        TagError::NotTrained => StatusCode::CONFLICT,
        TagError::Decode(DecodeError::EmptyInput) => StatusCode::BAD_REQUEST,
        TagError::Decode(DecodeError::Unreachable { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    error_response(status, err.to_string())
}

/// Resumo do modelo atual
async fn status_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let tagger = state.tagger.read().await;
    let (tags, vocabulary) = match tagger.model() {
        Some(model) => (
            model.tags().into_iter().map(str::to_string).collect(),
            model.vocabulary_size(),
        ),
        None => (vec![], 0),
    };
    Json(StatusResponse {
        trained: tagger.is_trained(),
        tags,
        vocabulary,
    })
}

/// Retreina o etiquetador. O modelo novo é montado fora do lock e trocado de uma vez.
async fn train_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TrainRequest>,
) -> Response {
    if req.sentences.len() != req.tags.len() {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!(
                "{} sentences but {} tag lines",
                req.sentences.len(),
                req.tags.len()
            ),
        );
    }

    let mut pairs = req.pairs;
    pairs.extend(
        req.sentences
            .iter()
            .zip(&req.tags)
            .map(|(sentence, tags)| TrainingPair::from_lines(sentence, tags)),
    );
    info!("Treinando com {} pares", pairs.len());

    let outcome = match tokio::task::spawn_blocking(move || trainer::train(&pairs)).await {
        Ok(outcome) => outcome,
        Err(err) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    };

    state.tagger.write().await.set_model(outcome.model);
    Json(outcome.report).into_response()
}

/// Etiquetagem via HTTP POST (sem streaming)
async fn tag_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TagRequest>,
) -> Response {
    let start = Instant::now();
    let tokens = match (req.tokens, req.text) {
        (Some(tokens), _) => tokens.iter().map(|t| t.to_lowercase()).collect(),
        (None, Some(text)) => normalize_sentence(&text),
        (None, None) => vec![],
    };

    let tagger = state.tagger.read().await;
    match tagger.tag_tokens(&tokens) {
        Ok(decoded) => Json(TagResponse {
            tokens,
            tags: decoded.tags,
            score: decoded.score,
            processing_ms: start.elapsed().as_millis() as u64,
        })
        .into_response(),
        Err(err) => tag_error_response(err),
    }
}

/// Modelo atual em JSON
async fn model_handler(State(state): State<Arc<AppState>>) -> Response {
    let tagger = state.tagger.read().await;
    match tagger.model() {
        Some(model) if tagger.is_trained() => Json(model).into_response(),
        _ => tag_error_response(TagError::NotTrained),
    }
}

/// Upgrade HTTP → WebSocket
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Texto a etiquetar de uma mensagem WebSocket: JSON `{text}` ou texto puro.
/// Mensagens em branco são ignoradas.
fn parse_ws_text(raw: &str) -> Option<String> {
    let text = match serde_json::from_str::<WsRequest>(raw) {
        Ok(req) => req.text,
        Err(_) => raw.to_string(),
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Executa o pipeline fora do runtime async e coleta todos os eventos.
async fn stream_events(
    state: Arc<AppState>,
    text: String,
) -> Result<Vec<TagEvent>, tokio::task::JoinError> {
    let (tx, rx) = std::sync::mpsc::channel::<TagEvent>();
    tokio::task::spawn_blocking(move || {
        let tagger = state.tagger.blocking_read();
        tag_streaming(&tagger, &text, tx);
    })
    .await?;
    Ok(rx.try_iter().collect())
}

/// Recebe uma sentença, executa o Viterbi e transmite os eventos de cada passo
async fn handle_websocket(mut socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket conectado");

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                let Some(text) = parse_ws_text(&text) else {
                    continue;
                };
                info!("Etiquetando via WebSocket: {} chars", text.len());

                let events = match stream_events(Arc::clone(&state), text).await {
                    Ok(events) => events,
                    Err(err) => {
                        warn!("tagging task failed: {err}");
                        continue;
                    }
                };
                for event in &events {
                    if let Ok(json) = serde_json::to_string(event) {
                        if socket.send(Message::Text(json)).await.is_err() {
                            return; // cliente desconectou
                        }
                    }
                }
            }
            Message::Close(_) => {
                info!("WebSocket desconectado");
                return;
            }
            Message::Ping(payload) => {
                let _ = socket.send(Message::Pong(payload)).await;
            }
            _ => {}
        }
    }
}
