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

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use maud::Markup;
use maud::PreEscaped;
use maud::html;
use memodeck_core::Face;
use memodeck_core::SessionResult;

use crate::cmd::drill::state::MutableState;
use crate::cmd::drill::state::ServerState;
use crate::cmd::drill::template::page_template;
use crate::markdown::markdown_to_html_inline;

pub async fn get_handler(State(state): State<ServerState>) -> (StatusCode, Html<String>) {
    let mutable = state.mutable.lock().unwrap();
    let body = render_page(&state, &mutable);
    (StatusCode::OK, Html(page_template(body).into_string()))
}

/// The card being reviewed, or the summary once the session is over.
pub fn render_page(state: &ServerState, mutable: &MutableState) -> Markup {
    match mutable.session.result() {
        Some(result) => render_summary(state, result),
        None => render_session(state, mutable),
    }
}

fn render_session(state: &ServerState, mutable: &MutableState) -> Markup {
    let session = &mutable.session;
    let Some(card) = session.current() else {
        return html! { p { "Calculating results..." } };
    };
    let percent = (session.progress() * 100.0).round() as usize;
    let progress_style = format!("width: {percent}%;");
    let revealed = session.face() == Face::Back;
    let front = markdown_to_html_inline(&card.front);
    let back = markdown_to_html_inline(&card.back);
    let controls = if revealed {
        html! {
            form.grades action="/" method="post" {
                button id="unknown" type="submit" name="action" value="Unknown" title="Shortcut: 1." {
                    "I Didn't Know"
                }
                button id="known" type="submit" name="action" value="Known" title="Shortcut: 2." {
                    "I Knew It"
                }
            }
        }
    } else {
        html! {
            form action="/" method="post" {
                button id="reveal" type="submit" name="action" value="Reveal" title="Shortcut: space." {
                    "Show Answer"
                }
            }
        }
    };
    html! {
        div.root {
            div.header {
                div.counters {
                    span.known-count { "Know: " (session.known()) }
                    span.unknown-count { "Don't Know: " (session.unknown()) }
                    span.pending-count { "Pending: " (session.remaining()) }
                }
                form.header-action action="/" method="post" {
                    button id="end" type="submit" name="action" value="End" title="End this session. Your progress will be saved." {
                        "End"
                    }
                }
            }
            div.progress-bar {
                div.progress-fill style=(progress_style) {}
            }
            div.card-container {
                div.card {
                    div.card-header {
                        h1 { (state.deck_title) }
                    }
                    div.card-content {
                        div.front { (PreEscaped(front)) }
                        @if revealed {
                            hr;
                            div.back { (PreEscaped(back)) }
                        }
                    }
                }
            }
            div.controls {
                (controls)
            }
        }
    }
}

fn render_summary(state: &ServerState, result: &SessionResult) -> Markup {
    let heading = if result.completed {
        "Deck Completed!"
    } else {
        "Session Finished"
    };
    html! {
        div.summary {
            h1 { (heading) }
            p { "Results for \"" (state.deck_title) "\"" }
            table {
                tbody {
                    tr {
                        td.key { "Correct Answers:" }
                        td.val id="known-total" { (result.known) }
                    }
                    tr {
                        td.key { "Incorrect Answers:" }
                        td.val id="unknown-total" { (result.unknown) }
                    }
                    tr {
                        td.key { "Accuracy:" }
                        td.val { (result.accuracy()) "%" }
                    }
                }
            }
            form action="/" method="post" {
                button id="shutdown" type="submit" name="action" value="Shutdown" title="Stop the server." {
                    "Done"
                }
            }
        }
    }
}
