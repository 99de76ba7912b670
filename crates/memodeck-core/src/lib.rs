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

//! memodeck-core: Core library for the memodeck flashcard reviewer.
//!
//! This library provides WASM-compatible types and algorithms for:
//! - The review session engine (shuffle, reveal, judge, abort, result)
//! - Decks, cards and study history
//! - The deck store interface and an in-memory implementation
//! - Importing and exporting decks as JSON documents

pub mod error;
pub mod exchange;
pub mod rng;
pub mod session;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use error::{ErrorReport, Fallible, fail};
pub use exchange::{ImportOutcome, export_deck, import_deck, merge_import, validate_deck};
pub use rng::{TinyRng, shuffle};
pub use session::{
    Face, JUDGMENT_DELAY, PendingJudgment, ReviewSession, SessionResult, Status, Transition,
    Verdict,
};
pub use store::{DeckStore, MemoryStore};
pub use types::card::Card;
pub use types::deck::{Deck, StudySession};
pub use types::ids::{CardId, DeckId};
pub use types::timestamp::Timestamp;
