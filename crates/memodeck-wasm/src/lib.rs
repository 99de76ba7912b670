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

//! WASM bindings for memodeck: review decks in the browser.

use wasm_bindgen::prelude::*;
use web_sys::console;

use memodeck_core::exchange::{ImportOutcome, export_deck, import_deck, merge_import};
use memodeck_core::rng::TinyRng;
use memodeck_core::session::{Face, JUDGMENT_DELAY, PendingJudgment, ReviewSession, Transition, Verdict};
use memodeck_core::store::{DeckStore, MemoryStore};
use memodeck_core::types::ids::DeckId;
use memodeck_core::types::timestamp::Timestamp;
use memodeck_core::ErrorReport;

mod storage;

use storage::Storage;

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    console::log_1(&"memodeck WASM initialized".into());
}

fn js_error(e: ErrorReport) -> JsValue {
    JsValue::from_str(e.message())
}

/// The main application state managed from JavaScript.
#[wasm_bindgen]
pub struct MemodeckApp {
    /// Every deck, mirrored to localStorage after each change
    store: MemoryStore,
    storage: Storage,
    /// The session in progress, if any
    session: Option<ReviewSession>,
    /// Phase one of a judgment, waiting for `apply_pending`
    pending: Option<PendingJudgment>,
}

#[wasm_bindgen]
impl MemodeckApp {
    /// Create the app, loading saved decks from localStorage.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<MemodeckApp, JsValue> {
        let storage = Storage::new();
        let store = storage.load_store()?;
        Ok(Self {
            store,
            storage,
            session: None,
            pending: None,
        })
    }

    /// Import a deck document. Returns false if a deck with the same id is
    /// already present.
    #[wasm_bindgen]
    pub fn import_deck(&mut self, json: &str) -> Result<bool, JsValue> {
        let deck = import_deck(json).map_err(js_error)?;
        let outcome = merge_import(&mut self.store, deck).map_err(js_error)?;
        if outcome == ImportOutcome::Skipped {
            return Ok(false);
        }
        self.storage.save_store(&self.store)?;
        Ok(true)
    }

    /// Export a deck, history included, as a JSON document.
    #[wasm_bindgen]
    pub fn export_deck(&self, deck_id: &str) -> Result<String, JsValue> {
        let deck = self.store.deck(&DeckId::new(deck_id)).map_err(js_error)?;
        export_deck(&deck).map_err(js_error)
    }

    /// A JSON array of `{id, title, cards, lastPlayed}` summaries.
    #[wasm_bindgen]
    pub fn deck_list(&self) -> Result<String, JsValue> {
        let decks = self.store.decks().map_err(js_error)?;
        let list: Vec<serde_json::Value> = decks
            .iter()
            .map(|deck| {
                serde_json::json!({
                    "id": deck.id,
                    "title": deck.title,
                    "cards": deck.cards.len(),
                    "lastPlayed": deck.last_played,
                })
            })
            .collect();
        serde_json::to_string(&list).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Start reviewing a deck, replacing any session in progress.
    /// Returns the number of cards in the session.
    #[wasm_bindgen]
    pub fn start_session(&mut self, deck_id: &str) -> Result<usize, JsValue> {
        let deck = self.store.deck(&DeckId::new(deck_id)).map_err(js_error)?;
        let mut rng = TinyRng::from_seed(random_seed());
        let session = ReviewSession::new(deck.id, deck.cards, &mut rng).map_err(js_error)?;
        let total = session.total();
        self.session = Some(session);
        self.pending = None;
        Ok(total)
    }

    #[wasm_bindgen]
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    #[wasm_bindgen]
    pub fn current_front(&self) -> Option<String> {
        self.session
            .as_ref()
            .and_then(|s| s.current())
            .map(|card| card.front.clone())
    }

    #[wasm_bindgen]
    pub fn current_back(&self) -> Option<String> {
        self.session
            .as_ref()
            .and_then(|s| s.current())
            .map(|card| card.back.clone())
    }

    /// Reveal the current card's answer.
    #[wasm_bindgen]
    pub fn reveal(&mut self) -> bool {
        self.session.as_mut().is_some_and(|s| s.reveal())
    }

    #[wasm_bindgen]
    pub fn is_revealed(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.face() == Face::Back)
    }

    /// Record a verdict for the current card. The queue does not change until
    /// `apply_pending` is called. Returns false if the verdict was ignored.
    #[wasm_bindgen]
    pub fn judge(&mut self, known: bool) -> bool {
        if self.pending.is_some() {
            return false;
        }
        let verdict = if known {
            Verdict::Known
        } else {
            Verdict::Unknown
        };
        self.pending = self.session.as_mut().and_then(|s| s.judge(verdict));
        self.pending.is_some()
    }

    /// Apply the verdict recorded by `judge`. Returns "ignored", "retired",
    /// "requeued" or "completed".
    #[wasm_bindgen]
    pub fn apply_pending(&mut self) -> String {
        let transition = match (self.session.as_mut(), self.pending.take()) {
            (Some(session), Some(pending)) => session.apply(pending),
            _ => Transition::Ignored,
        };
        match transition {
            Transition::Ignored => "ignored",
            Transition::Retired => "retired",
            Transition::Requeued => "requeued",
            Transition::Completed => "completed",
        }
        .to_string()
    }

    /// Leave the session early.
    #[wasm_bindgen]
    pub fn abort(&mut self) -> bool {
        self.session.as_mut().is_some_and(|s| s.abort())
    }

    #[wasm_bindgen]
    pub fn is_finished(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_terminal())
    }

    #[wasm_bindgen]
    pub fn total_cards(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.total())
    }

    #[wasm_bindgen]
    pub fn remaining_cards(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.remaining())
    }

    #[wasm_bindgen]
    pub fn known_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.known())
    }

    #[wasm_bindgen]
    pub fn unknown_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.unknown())
    }

    /// Fraction of the deck retired as known.
    #[wasm_bindgen]
    pub fn progress(&self) -> f64 {
        self.session.as_ref().map_or(0.0, |s| s.progress())
    }

    /// Append the finished session to the deck's history and return it as
    /// JSON. Returns `None` until the session ends, and after the first call.
    #[wasm_bindgen]
    pub fn take_result(&mut self) -> Result<Option<String>, JsValue> {
        let Some(session) = self.session.as_mut() else {
            return Ok(None);
        };
        let now = Timestamp::try_from(now_timestamp()).map_err(js_error)?;
        let Some(entry) = session.record(&mut self.store, now).map_err(js_error)? else {
            return Ok(None);
        };
        self.storage.save_store(&self.store)?;
        serde_json::to_string(&entry)
            .map(Some)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// How long the UI should wait between `judge` and `apply_pending`.
    #[wasm_bindgen]
    pub fn judgment_delay_ms(&self) -> u32 {
        JUDGMENT_DELAY.as_millis() as u32
    }
}

fn random_seed() -> u64 {
    let mut buf = [0u8; 8];
    match getrandom::getrandom(&mut buf) {
        Ok(()) => u64::from_le_bytes(buf),
        Err(_) => js_sys::Date::now() as u64,
    }
}

/// Get the current UTC time as a timestamp string.
#[wasm_bindgen]
pub fn now_timestamp() -> String {
    js_sys::Date::new_0().to_iso_string().into()
}
