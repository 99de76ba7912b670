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

use axum::Form;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use maud::Markup;
use maud::html;
use memodeck_core::Timestamp;
use memodeck_core::Verdict;
use memodeck_core::error::Fallible;
use serde::Deserialize;

use crate::cmd::drill::get::render_page;
use crate::cmd::drill::state::ServerState;
use crate::cmd::drill::template::page_template;

#[derive(Clone, Copy, Debug, Deserialize)]
pub enum Action {
    Reveal,
    Known,
    Unknown,
    End,
    Shutdown,
}

#[derive(Deserialize)]
pub struct FormData {
    action: Action,
}

pub async fn post_handler(
    State(state): State<ServerState>,
    Form(form): Form<FormData>,
) -> (StatusCode, Html<String>) {
    match action_handler(&state, form.action) {
        Ok(body) => (StatusCode::OK, Html(page_template(body).into_string())),
        Err(e) => {
            log::error!("Failed to handle {:?}: {e}", form.action);
            let body = html! {
                div.error {
                    h1 { "Error" }
                    p { (e.to_string()) }
                }
            };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(page_template(body).into_string()),
            )
        }
    }
}

fn action_handler(state: &ServerState, action: Action) -> Fallible<Markup> {
    log::debug!("Action: {action:?}");
    if let Action::Shutdown = action {
        // A result that failed to save on the terminating event gets one
        // more try here; the server keeps running if it fails again.
        {
            let mut guard = state.mutable.lock().unwrap();
            let mutable = &mut *guard;
            mutable.session.record(&mut mutable.db, Timestamp::now())?;
        }
        if let Some(tx) = state.shutdown_tx.lock().unwrap().take() {
            if tx.send(()).is_err() {
                log::warn!("Server already shutting down");
            }
        }
        return Ok(html! {
            div.summary {
                p { "Shutting down. You can close this tab." }
            }
        });
    }
    let mut guard = state.mutable.lock().unwrap();
    let mutable = &mut *guard;
    match action {
        Action::Reveal => {
            mutable.session.reveal();
        }
        Action::Known => {
            mutable.session.answer(Verdict::Known);
        }
        Action::Unknown => {
            mutable.session.answer(Verdict::Unknown);
        }
        Action::End => {
            mutable.session.abort();
        }
        Action::Shutdown => {}
    }
    // Only the first call after termination writes anything.
    mutable.session.record(&mut mutable.db, Timestamp::now())?;
    Ok(render_page(state, mutable))
}
