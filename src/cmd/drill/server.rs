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

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use axum::Router;
use axum::http::HeaderName;
use axum::http::StatusCode;
use axum::http::header::CACHE_CONTROL;
use axum::http::header::CONTENT_TYPE;
use axum::response::Html;
use axum::routing::get;
use axum::routing::post;
use memodeck_core::DeckId;
use memodeck_core::DeckStore;
use memodeck_core::ReviewSession;
use memodeck_core::Timestamp;
use memodeck_core::TinyRng;
use memodeck_core::error::Fallible;
use memodeck_core::error::fail;
use tokio::net::TcpListener;
use tokio::sync::oneshot::channel;

use crate::cmd::drill::get::get_handler;
use crate::cmd::drill::post::post_handler;
use crate::cmd::drill::state::MutableState;
use crate::cmd::drill::state::ServerState;
use crate::db::Database;
use crate::utils::CACHE_CONTROL_IMMUTABLE;
use crate::utils::shutdown_signal;

pub struct ServerConfig {
    pub database: PathBuf,
    pub deck_id: DeckId,
    pub host: String,
    pub port: u16,
    /// Fixed shuffle seed. By default the clock is used.
    pub seed: Option<u64>,
}

pub async fn start_server(config: ServerConfig) -> Fallible<()> {
    let mut db = Database::new(&config.database)?;
    let deck = db.deck(&config.deck_id)?;
    let mut rng = match config.seed {
        Some(seed) => TinyRng::from_seed(seed),
        None => TinyRng::from_clock(),
    };
    let mut session = ReviewSession::new(deck.id.clone(), deck.cards, &mut rng)?;
    // An empty deck terminates on creation.
    session.record(&mut db, Timestamp::now())?;

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = channel();

    let state = ServerState {
        deck_title: deck.title,
        mutable: Arc::new(Mutex::new(MutableState { db, session })),
        shutdown_tx: Arc::new(Mutex::new(Some(shutdown_tx))),
    };
    let app = Router::new();
    let app = app.route("/", get(get_handler));
    let app = app.route("/", post(post_handler));
    let app = app.route("/script.js", get(script_handler));
    let app = app.route("/style.css", get(style_handler));
    let app = app.fallback(not_found_handler);
    let app = app.with_state(state.clone());
    let bind = format!("{}:{}", config.host, config.port);

    // Start the server with graceful shutdown on Ctrl+C or shutdown button.
    log::debug!("Starting drill server on {bind}");
    let listener = TcpListener::bind(bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_rx))
        .await?;

    let mutable = state.mutable.lock().unwrap();
    if !mutable.session.is_terminal() {
        fail("Session interrupted before completion")
    } else if !mutable.session.is_claimed() {
        fail("Session finished but its result was not saved")
    } else {
        Ok(())
    }
}

async fn script_handler() -> (StatusCode, [(HeaderName, &'static str); 1], &'static str) {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/javascript")],
        include_str!("script.js"),
    )
}

async fn style_handler() -> (StatusCode, [(HeaderName, &'static str); 2], &'static [u8]) {
    let bytes = include_bytes!("style.css");
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "text/css"),
            (CACHE_CONTROL, CACHE_CONTROL_IMMUTABLE),
        ],
        bytes,
    )
}

async fn not_found_handler() -> (StatusCode, Html<String>) {
    (StatusCode::NOT_FOUND, Html("Not Found".to_string()))
}
