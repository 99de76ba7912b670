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

//! Deck and card management.

use std::fmt::Write;

use memodeck_core::Card;
use memodeck_core::CardId;
use memodeck_core::Deck;
use memodeck_core::DeckId;
use memodeck_core::DeckStore;
use memodeck_core::error::Fallible;
use memodeck_core::error::fail;
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn require_text(what: &str, value: &str) -> Fallible<()> {
    if value.trim().is_empty() {
        return fail(format!("{what} must not be empty."));
    }
    Ok(())
}

pub fn list_decks(store: &impl DeckStore) -> Fallible<String> {
    let decks = store.decks()?;
    if decks.is_empty() {
        return Ok("No decks.\n".to_string());
    }
    let mut out = String::new();
    for deck in decks {
        let count = deck.cards.len();
        let plural = if count == 1 { "" } else { "s" };
        let last_played = match deck.last_played {
            Some(ts) => ts.to_string(),
            None => "Never".to_string(),
        };
        let _ = writeln!(
            out,
            "{}\t{}\t{count} card{plural}\tlast played: {last_played}",
            deck.id, deck.title
        );
    }
    Ok(out)
}

/// Create an empty deck and return its id.
pub fn add_deck(store: &mut impl DeckStore, title: &str, description: &str) -> Fallible<DeckId> {
    require_text("title", title)?;
    let deck = Deck::new(new_id(), title, description);
    let id = deck.id.clone();
    store.insert_deck(deck)?;
    log::info!("Created deck {id} ({title})");
    Ok(id)
}

pub fn edit_deck(
    store: &mut impl DeckStore,
    id: &DeckId,
    title: Option<String>,
    description: Option<String>,
) -> Fallible<()> {
    let deck = store.deck(id)?;
    let title = title.unwrap_or(deck.title);
    let description = description.unwrap_or(deck.description);
    require_text("title", &title)?;
    store.update_deck(id, &title, &description)
}

pub fn delete_deck(store: &mut impl DeckStore, id: &DeckId) -> Fallible<()> {
    store.delete_deck(id)?;
    log::info!("Deleted deck {id}");
    Ok(())
}

pub fn list_cards(store: &impl DeckStore, deck_id: &DeckId) -> Fallible<String> {
    let deck = store.deck(deck_id)?;
    if deck.cards.is_empty() {
        return Ok("This deck has no cards.\n".to_string());
    }
    let mut out = String::new();
    for card in deck.cards {
        let _ = writeln!(out, "{}\t{}\t{}", card.id, card.front, card.back);
    }
    Ok(out)
}

/// Append a card to a deck and return its id.
pub fn add_card(
    store: &mut impl DeckStore,
    deck_id: &DeckId,
    front: &str,
    back: &str,
) -> Fallible<CardId> {
    require_text("front", front)?;
    require_text("back", back)?;
    let card = Card::new(new_id(), front, back);
    let id = card.id.clone();
    store.add_card(deck_id, card)?;
    Ok(id)
}

pub fn edit_card(
    store: &mut impl DeckStore,
    deck_id: &DeckId,
    card_id: &CardId,
    front: Option<String>,
    back: Option<String>,
) -> Fallible<()> {
    let deck = store.deck(deck_id)?;
    let Some(card) = deck.card(card_id) else {
        return fail(format!("deck {deck_id} has no card '{card_id}'."));
    };
    let front = front.unwrap_or_else(|| card.front.clone());
    let back = back.unwrap_or_else(|| card.back.clone());
    require_text("front", &front)?;
    require_text("back", &back)?;
    store.update_card(deck_id, card_id, &front, &back)
}

pub fn delete_card(store: &mut impl DeckStore, deck_id: &DeckId, card_id: &CardId) -> Fallible<()> {
    store.delete_card(deck_id, card_id)
}

#[cfg(test)]
mod tests {
    use memodeck_core::MemoryStore;

    use super::*;

    #[test]
    fn test_deck_commands() -> Fallible<()> {
        let mut store = MemoryStore::default();
        assert_eq!(list_decks(&store)?, "No decks.\n");
        assert!(add_deck(&mut store, "  ", "").is_err());
        let id = add_deck(&mut store, "Verbs", "irregular")?;
        let listing = list_decks(&store)?;
        assert!(listing.contains("Verbs\t0 cards\tlast played: Never"));

        edit_deck(&mut store, &id, None, Some("regular".to_string()))?;
        let deck = store.deck(&id)?;
        assert_eq!(deck.title, "Verbs");
        assert_eq!(deck.description, "regular");
        assert!(edit_deck(&mut store, &id, Some(String::new()), None).is_err());

        delete_deck(&mut store, &id)?;
        assert!(delete_deck(&mut store, &id).is_err());
        Ok(())
    }

    #[test]
    fn test_card_commands() -> Fallible<()> {
        let mut store = MemoryStore::default();
        let deck = add_deck(&mut store, "Verbs", "")?;
        assert_eq!(list_cards(&store, &deck)?, "This deck has no cards.\n");
        let card = add_card(&mut store, &deck, "ser", "to be")?;
        assert!(add_card(&mut store, &deck, "estar", "").is_err());
        assert!(list_decks(&store)?.contains("1 card\t"));

        edit_card(&mut store, &deck, &card, None, Some("to be (essence)".to_string()))?;
        assert!(list_cards(&store, &deck)?.contains("ser\tto be (essence)"));
        assert!(edit_card(&mut store, &deck, &CardId::new("nope"), None, None).is_err());

        delete_card(&mut store, &deck, &card)?;
        assert!(store.deck(&deck)?.cards.is_empty());
        Ok(())
    }
}
