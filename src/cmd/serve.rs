// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A JSON API over the deck store.

use std::fmt::Display;
use std::fmt::Formatter;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use memodeck_core::Deck;
use memodeck_core::DeckId;
use memodeck_core::DeckStore;
use memodeck_core::SessionResult;
use memodeck_core::StudySession;
use memodeck_core::Timestamp;
use memodeck_core::error::ErrorReport;
use memodeck_core::error::Fallible;
use memodeck_core::validate_deck;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot::channel;
use uuid::Uuid;

use crate::db::Database;
use crate::utils::shutdown_signal;

pub struct ApiConfig {
    pub database: PathBuf,
    pub host: String,
    pub port: u16,
}

#[derive(Clone)]
struct ApiState {
    db: Arc<Mutex<Database>>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn not_found(id: &DeckId) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("Deck {id} not found"))
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.status, self.message)
    }
}

impl From<ErrorReport> for ApiError {
    fn from(value: ErrorReport) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, value.message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            log::error!("{self}");
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub async fn start_api_server(config: ApiConfig) -> Fallible<()> {
    let db = Database::new(&config.database)?;
    let state = ApiState {
        db: Arc::new(Mutex::new(db)),
    };
    let app = router(state);
    let bind = format!("{}:{}", config.host, config.port);

    // Only Ctrl+C stops the API server.
    let (_shutdown_tx, shutdown_rx) = channel();
    log::info!("Server listening at http://{bind}");
    let listener = TcpListener::bind(bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_rx))
        .await?;
    Ok(())
}

fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/decks", get(list_decks).post(create_deck))
        .route(
            "/api/decks/{id}",
            get(get_deck).put(update_deck).delete(delete_deck),
        )
        .route("/api/decks/{id}/sessions", post(append_session))
        .with_state(state)
}

async fn list_decks(State(state): State<ApiState>) -> Result<Json<Vec<Deck>>, ApiError> {
    let db = state.db.lock().unwrap();
    Ok(Json(db.decks()?))
}

async fn get_deck(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Deck>, ApiError> {
    let id = DeckId::new(id);
    let db = state.db.lock().unwrap();
    if !db.contains(&id)? {
        return Err(ApiError::not_found(&id));
    }
    Ok(Json(db.deck(&id)?))
}

async fn create_deck(
    State(state): State<ApiState>,
    Json(mut deck): Json<Deck>,
) -> Result<(StatusCode, Json<Deck>), ApiError> {
    if deck.id.is_empty() {
        deck.id = DeckId::new(Uuid::new_v4().to_string());
    }
    validate_deck(&deck).map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.message()))?;
    let mut db = state.db.lock().unwrap();
    if db.contains(&deck.id)? {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            format!("A deck with ID {} already exists", deck.id),
        ));
    }
    db.insert_deck(deck.clone())?;
    log::info!("Created deck {} ({})", deck.id, deck.title);
    Ok((StatusCode::CREATED, Json(deck)))
}

/// Replace a deck with the document in the body. Title, description and
/// cards are taken from it; the history stays as recorded.
async fn update_deck(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(mut deck): Json<Deck>,
) -> Result<Json<Deck>, ApiError> {
    let id = DeckId::new(id);
    if deck.id.is_empty() {
        deck.id = id.clone();
    }
    if deck.id != id {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("Deck ID {} does not match the URL", deck.id),
        ));
    }
    validate_deck(&deck).map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.message()))?;
    let mut db = state.db.lock().unwrap();
    if !db.contains(&id)? {
        return Err(ApiError::not_found(&id));
    }
    db.replace_deck(deck)?;
    Ok(Json(db.deck(&id)?))
}

async fn delete_deck(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = DeckId::new(id);
    let mut db = state.db.lock().unwrap();
    if !db.contains(&id)? {
        return Err(ApiError::not_found(&id));
    }
    db.delete_deck(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// The server stamps the date, not the client.
async fn append_session(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(result): Json<SessionResult>,
) -> Result<(StatusCode, Json<StudySession>), ApiError> {
    let id = DeckId::new(id);
    let mut db = state.db.lock().unwrap();
    if !db.contains(&id)? {
        return Err(ApiError::not_found(&id));
    }
    let entry = StudySession {
        date: Timestamp::now(),
        result,
    };
    db.append_session(&id, entry.clone())?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[cfg(test)]
mod tests {
    use memodeck_core::Card;
    use memodeck_core::CardId;
    use memodeck_core::error::Fallible;
    use portpicker::pick_unused_port;
    use reqwest::Client;
    use reqwest::StatusCode;
    use tokio::spawn;

    use super::*;
    use crate::helper::TEST_DECK_ID;
    use crate::helper::create_tmp_database;
    use crate::helper::test_deck;
    use crate::utils::wait_for_server;

    const TEST_HOST: &str = "127.0.0.1";

    async fn serve() -> Fallible<String> {
        let port = pick_unused_port().unwrap();
        let config = ApiConfig {
            database: create_tmp_database(vec![])?,
            host: TEST_HOST.to_string(),
            port,
        };
        spawn(async move { start_api_server(config).await });
        wait_for_server(TEST_HOST, port).await?;
        Ok(format!("http://{TEST_HOST}:{port}/api/decks"))
    }

    #[tokio::test]
    async fn test_deck_lifecycle() -> Fallible<()> {
        let base = serve().await?;
        let client = Client::new();

        let decks: Vec<Deck> = client.get(&base).send().await.unwrap().json().await.unwrap();
        assert!(decks.is_empty());

        let response = client.post(&base).json(&test_deck()).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = client.post(&base).json(&test_deck()).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let url = format!("{base}/{TEST_DECK_ID}");
        let deck: Deck = client.get(&url).send().await.unwrap().json().await.unwrap();
        assert_eq!(deck, test_deck());

        let mut renamed = test_deck();
        renamed.title = "Capitals II".to_string();
        let response = client.put(&url).json(&renamed).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let deck: Deck = response.json().await.unwrap();
        assert_eq!(deck.title, "Capitals II");
        assert_eq!(deck.cards.len(), 2);

        let result = SessionResult {
            known: 2,
            unknown: 3,
            completed: true,
            known_card_ids: vec![CardId::new("fr"), CardId::new("de")],
            unknown_card_ids: vec![CardId::new("de")],
        };
        let response = client
            .post(format!("{url}/sessions"))
            .json(&result)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let deck: Deck = client.get(&url).send().await.unwrap().json().await.unwrap();
        assert_eq!(deck.study_history.len(), 1);
        assert_eq!(deck.study_history[0].result, result);
        assert_eq!(deck.last_played, Some(deck.study_history[0].date));

        let response = client.delete(&url).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = client.get(&url).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = client.delete(&url).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn test_put_replaces_cards() -> Fallible<()> {
        let base = serve().await?;
        let client = Client::new();
        client.post(&base).json(&test_deck()).send().await.unwrap();
        let url = format!("{base}/{TEST_DECK_ID}");
        let result = json!({
            "known": 2,
            "unknown": 0,
            "completed": true,
            "knownCardIds": ["fr", "de"],
            "unknownCardIds": []
        });
        client.post(format!("{url}/sessions")).json(&result).send().await.unwrap();

        let mut edited = test_deck();
        edited.title = "Renamed".to_string();
        edited.cards[0].back = "Paris (city)".to_string();
        edited.cards.push(Card::new("it", "Italy", "Rome"));
        let response = client.put(&url).json(&edited).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let deck: Deck = client.get(&url).send().await.unwrap().json().await.unwrap();
        assert_eq!(deck.title, "Renamed");
        assert_eq!(deck.cards, edited.cards);
        assert_eq!(deck.study_history.len(), 1);

        edited.id = DeckId::new("other");
        let response = client.put(&url).json(&edited).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = client
            .put(format!("{base}/missing"))
            .json(&json!({ "id": "missing", "title": "M", "cards": [] }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_assigns_missing_id() -> Fallible<()> {
        let base = serve().await?;
        let client = Client::new();
        let response = client
            .post(&base)
            .json(&json!({ "id": "", "title": "Fresh", "cards": [] }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let deck: Deck = response.json().await.unwrap();
        assert!(!deck.id.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_deck() -> Fallible<()> {
        let base = serve().await?;
        let response = Client::new()
            .post(&base)
            .json(&json!({ "id": "x", "title": "", "cards": [] }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_session_on_missing_deck() -> Fallible<()> {
        let base = serve().await?;
        let response = Client::new()
            .post(format!("{base}/nope/sessions"))
            .json(&json!({
                "known": 0,
                "unknown": 0,
                "completed": false,
                "knownCardIds": [],
                "unknownCardIds": []
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        Ok(())
    }
}
