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

//! The deck store: where decks, cards and study history live.

use serde::Deserialize;
use serde::Serialize;

use crate::error::Fallible;
use crate::error::fail;
use crate::types::card::Card;
use crate::types::deck::Deck;
use crate::types::deck::StudySession;
use crate::types::ids::CardId;
use crate::types::ids::DeckId;

/// Durable storage for decks. Last write wins.
pub trait DeckStore {
    /// All decks, in insertion order.
    fn decks(&self) -> Fallible<Vec<Deck>>;

    /// Fetch one deck, failing if it does not exist.
    fn deck(&self, id: &DeckId) -> Fallible<Deck>;

    fn contains(&self, id: &DeckId) -> Fallible<bool> {
        Ok(self.decks()?.iter().any(|deck| &deck.id == id))
    }

    /// Insert a new deck. Fails if the id is taken.
    fn insert_deck(&mut self, deck: Deck) -> Fallible<()>;

    fn update_deck(&mut self, id: &DeckId, title: &str, description: &str) -> Fallible<()>;

    /// Overwrite a deck's title, description and card list with those of
    /// `deck`, matched by id. Study history and the last-played marker are
    /// kept: only [`DeckStore::append_session`] writes them.
    fn replace_deck(&mut self, deck: Deck) -> Fallible<()>;

    fn delete_deck(&mut self, id: &DeckId) -> Fallible<()>;

    /// Append a card to the end of a deck.
    fn add_card(&mut self, deck_id: &DeckId, card: Card) -> Fallible<()>;

    fn update_card(
        &mut self,
        deck_id: &DeckId,
        card_id: &CardId,
        front: &str,
        back: &str,
    ) -> Fallible<()>;

    fn delete_card(&mut self, deck_id: &DeckId, card_id: &CardId) -> Fallible<()>;

    /// Prepend a session to the deck's history and update its last-played
    /// marker.
    fn append_session(&mut self, deck_id: &DeckId, session: StudySession) -> Fallible<()>;
}

/// A store that keeps everything in memory. Serializes to the `{"decks":
/// [...]}` document used by the browser host.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    decks: Vec<Deck>,
}

impl MemoryStore {
    pub fn from_json(json: &str) -> Fallible<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Fallible<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn find_mut(&mut self, id: &DeckId) -> Fallible<&mut Deck> {
        match self.decks.iter_mut().find(|deck| &deck.id == id) {
            Some(deck) => Ok(deck),
            None => fail(format!("no deck with id '{id}'.")),
        }
    }
}

impl DeckStore for MemoryStore {
    fn decks(&self) -> Fallible<Vec<Deck>> {
        Ok(self.decks.clone())
    }

    fn deck(&self, id: &DeckId) -> Fallible<Deck> {
        match self.decks.iter().find(|deck| &deck.id == id) {
            Some(deck) => Ok(deck.clone()),
            None => fail(format!("no deck with id '{id}'.")),
        }
    }

    fn insert_deck(&mut self, deck: Deck) -> Fallible<()> {
        if self.decks.iter().any(|d| d.id == deck.id) {
            return fail(format!("a deck with id '{}' already exists.", deck.id));
        }
        self.decks.push(deck);
        Ok(())
    }

    fn update_deck(&mut self, id: &DeckId, title: &str, description: &str) -> Fallible<()> {
        let deck = self.find_mut(id)?;
        deck.title = title.to_string();
        deck.description = description.to_string();
        Ok(())
    }

    fn replace_deck(&mut self, deck: Deck) -> Fallible<()> {
        if let Some(id) = deck.duplicate_card_id() {
            return fail(format!("deck {} contains duplicate card id '{id}'.", deck.id));
        }
        let stored = self.find_mut(&deck.id)?;
        stored.title = deck.title;
        stored.description = deck.description;
        stored.cards = deck.cards;
        Ok(())
    }

    fn delete_deck(&mut self, id: &DeckId) -> Fallible<()> {
        let before = self.decks.len();
        self.decks.retain(|deck| &deck.id != id);
        if self.decks.len() == before {
            return fail(format!("no deck with id '{id}'."));
        }
        Ok(())
    }

    fn add_card(&mut self, deck_id: &DeckId, card: Card) -> Fallible<()> {
        let deck = self.find_mut(deck_id)?;
        if deck.card(&card.id).is_some() {
            return fail(format!("deck {deck_id} already has a card '{}'.", card.id));
        }
        deck.cards.push(card);
        Ok(())
    }

    fn update_card(
        &mut self,
        deck_id: &DeckId,
        card_id: &CardId,
        front: &str,
        back: &str,
    ) -> Fallible<()> {
        let deck = self.find_mut(deck_id)?;
        match deck.card_mut(card_id) {
            Some(card) => {
                card.front = front.to_string();
                card.back = back.to_string();
                Ok(())
            }
            None => fail(format!("deck {deck_id} has no card '{card_id}'.")),
        }
    }

    fn delete_card(&mut self, deck_id: &DeckId, card_id: &CardId) -> Fallible<()> {
        let deck = self.find_mut(deck_id)?;
        let before = deck.cards.len();
        deck.cards.retain(|card| &card.id != card_id);
        if deck.cards.len() == before {
            return fail(format!("deck {deck_id} has no card '{card_id}'."));
        }
        Ok(())
    }

    fn append_session(&mut self, deck_id: &DeckId, session: StudySession) -> Fallible<()> {
        self.find_mut(deck_id)?.record(session);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Fallible<MemoryStore> {
        let mut store = MemoryStore::default();
        store.insert_deck(Deck::new("a", "Alpha", "first"))?;
        store.insert_deck(Deck::new("b", "Beta", ""))?;
        Ok(store)
    }

    #[test]
    fn test_insert_rejects_taken_id() -> Fallible<()> {
        let mut store = store()?;
        assert!(store.insert_deck(Deck::new("a", "Again", "")).is_err());
        assert_eq!(store.decks()?.len(), 2);
        Ok(())
    }

    #[test]
    fn test_update_and_delete_deck() -> Fallible<()> {
        let mut store = store()?;
        let a = DeckId::new("a");
        store.update_deck(&a, "Alpha 2", "changed")?;
        assert_eq!(store.deck(&a)?.title, "Alpha 2");
        store.delete_deck(&a)?;
        assert!(!store.contains(&a)?);
        assert!(store.delete_deck(&a).is_err());
        assert!(store.deck(&a).is_err());
        Ok(())
    }

    #[test]
    fn test_card_crud_preserves_order() -> Fallible<()> {
        let mut store = store()?;
        let b = DeckId::new("b");
        store.add_card(&b, Card::new("1", "one", "uno"))?;
        store.add_card(&b, Card::new("2", "two", "dos"))?;
        store.add_card(&b, Card::new("3", "three", "tres"))?;
        assert!(store.add_card(&b, Card::new("2", "dup", "dup")).is_err());
        store.update_card(&b, &CardId::new("2"), "TWO", "DOS")?;
        store.delete_card(&b, &CardId::new("1"))?;
        let deck = store.deck(&b)?;
        let fronts: Vec<&str> = deck.cards.iter().map(|c| c.front.as_str()).collect();
        assert_eq!(fronts, vec!["TWO", "three"]);
        assert!(store.delete_card(&b, &CardId::new("1")).is_err());
        Ok(())
    }

    #[test]
    fn test_replace_deck_swaps_cards_and_keeps_history() -> Fallible<()> {
        let mut store = store()?;
        let a = DeckId::new("a");
        store.add_card(&a, Card::new("1", "one", "uno"))?;
        let session = StudySession {
            date: crate::types::timestamp::Timestamp::try_from("2024-01-01T00:00:00.000Z".to_string())?,
            result: crate::session::SessionResult {
                known: 1,
                unknown: 0,
                completed: true,
                known_card_ids: vec![CardId::new("1")],
                unknown_card_ids: vec![],
            },
        };
        store.append_session(&a, session.clone())?;

        let mut edited = Deck::new("a", "Renamed", "new description");
        edited.cards.push(Card::new("2", "two", "dos"));
        edited.cards.push(Card::new("1", "one", "UNO"));
        store.replace_deck(edited.clone())?;

        let deck = store.deck(&a)?;
        assert_eq!(deck.title, "Renamed");
        assert_eq!(deck.cards, edited.cards);
        assert_eq!(deck.study_history, vec![session.clone()]);
        assert_eq!(deck.last_played, Some(session.date));

        let mut dup = edited;
        dup.cards.push(Card::new("2", "again", "again"));
        assert!(store.replace_deck(dup).is_err());
        assert!(store.replace_deck(Deck::new("missing", "M", "")).is_err());
        Ok(())
    }

    #[test]
    fn test_json_document() -> Fallible<()> {
        let store = store()?;
        let json = store.to_json()?;
        assert!(json.starts_with("{\"decks\":["));
        assert_eq!(MemoryStore::from_json(&json)?, store);
        Ok(())
    }
}
