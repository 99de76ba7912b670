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

//! Test fixtures.

use std::path::PathBuf;

use memodeck_core::Card;
use memodeck_core::Deck;
use memodeck_core::DeckStore;
use memodeck_core::error::Fallible;
use tempfile::tempdir;

use crate::db::Database;

pub const TEST_DECK_ID: &str = "capitals";

pub fn create_tmp_directory() -> Fallible<PathBuf> {
    let dir = tempdir()?.keep();
    Ok(dir.canonicalize()?)
}

pub fn test_deck() -> Deck {
    let mut deck = Deck::new(TEST_DECK_ID, "Capitals", "European capitals");
    deck.cards.push(Card::new("fr", "France", "Paris"));
    deck.cards.push(Card::new("de", "Germany", "Berlin"));
    deck
}

/// A fresh database in a temporary directory holding `decks`.
pub fn create_tmp_database(decks: Vec<Deck>) -> Fallible<PathBuf> {
    let path = create_tmp_directory()?.join("memodeck.db");
    let mut db = Database::new(&path)?;
    for deck in decks {
        db.insert_deck(deck)?;
    }
    Ok(path)
}
