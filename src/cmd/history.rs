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

use std::fmt::Write;

use memodeck_core::CardId;
use memodeck_core::Deck;
use memodeck_core::DeckId;
use memodeck_core::DeckStore;
use memodeck_core::error::Fallible;

/// Render a deck's study history, newest first.
pub fn print_history(store: &impl DeckStore, deck_id: &DeckId) -> Fallible<String> {
    let deck = store.deck(deck_id)?;
    let mut out = String::new();
    let _ = writeln!(out, "{}", deck.title);
    if deck.study_history.is_empty() {
        let _ = writeln!(out, "No study sessions yet.");
        return Ok(out);
    }
    for entry in &deck.study_history {
        let result = &entry.result;
        let status = if result.completed {
            "completed"
        } else {
            "finished early"
        };
        let _ = writeln!(
            out,
            "{}  {status}  known: {}  unknown: {}  accuracy: {}%",
            entry.date,
            result.known,
            result.unknown,
            result.accuracy()
        );
        write_cards(&mut out, &deck, "Cards you knew", "known", &result.known_card_ids);
        write_cards(&mut out, &deck, "Cards you missed", "missed", &result.unknown_card_ids);
    }
    Ok(out)
}

/// Cards deleted since the session are left out of the list and its count.
fn write_cards(out: &mut String, deck: &Deck, heading: &str, verdict: &str, ids: &[CardId]) {
    let cards: Vec<_> = ids.iter().filter_map(|id| deck.card(id)).collect();
    let _ = writeln!(out, "    {heading} ({}):", cards.len());
    if cards.is_empty() {
        let _ = writeln!(out, "      No cards were marked as {verdict}.");
    }
    for card in cards {
        let _ = writeln!(out, "      {} -> {}", card.front, card.back);
    }
}
