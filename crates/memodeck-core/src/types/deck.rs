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

use std::collections::HashSet;

use serde::Deserialize;
use serde::Serialize;

use crate::session::SessionResult;
use crate::types::card::Card;
use crate::types::ids::CardId;
use crate::types::ids::DeckId;
use crate::types::timestamp::Timestamp;

/// A named collection of cards plus its study history.
///
/// The serialized shape (camelCase keys) is shared by the browser store,
/// the REST API, and exported deck files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: DeckId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub cards: Vec<Card>,
    /// Newest first.
    #[serde(default)]
    pub study_history: Vec<StudySession>,
    #[serde(default)]
    pub last_played: Option<Timestamp>,
}

/// One entry in a deck's study history: a session result stamped with the
/// time the host recorded it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StudySession {
    pub date: Timestamp,
    #[serde(flatten)]
    pub result: SessionResult,
}

impl Deck {
    pub fn new(id: impl Into<DeckId>, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            cards: Vec::new(),
            study_history: Vec::new(),
            last_played: None,
        }
    }

    pub fn card(&self, id: &CardId) -> Option<&Card> {
        self.cards.iter().find(|card| &card.id == id)
    }

    pub fn card_mut(&mut self, id: &CardId) -> Option<&mut Card> {
        self.cards.iter_mut().find(|card| &card.id == id)
    }

    /// Prepend a session to the history and mark the deck as played.
    pub fn record(&mut self, session: StudySession) {
        self.last_played = Some(session.date);
        self.study_history.insert(0, session);
    }

    /// The first card id that occurs more than once, if any.
    pub fn duplicate_card_id(&self) -> Option<&CardId> {
        first_duplicate(&self.cards)
    }
}

pub(crate) fn first_duplicate(cards: &[Card]) -> Option<&CardId> {
    let mut seen: HashSet<&CardId> = HashSet::new();
    cards.iter().map(|card| &card.id).find(|id| !seen.insert(*id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Fallible;

    fn timestamp(s: &str) -> Timestamp {
        Timestamp::try_from(s.to_string()).unwrap()
    }

    fn result(known: usize) -> SessionResult {
        SessionResult {
            known,
            unknown: 0,
            completed: true,
            known_card_ids: Vec::new(),
            unknown_card_ids: Vec::new(),
        }
    }

    #[test]
    fn test_record_prepends_and_marks_played() {
        let mut deck = Deck::new("d", "Capitals", "");
        let first = StudySession {
            date: timestamp("2024-01-01T10:00:00.000"),
            result: result(1),
        };
        let second = StudySession {
            date: timestamp("2024-01-02T10:00:00.000"),
            result: result(2),
        };
        deck.record(first);
        deck.record(second.clone());
        assert_eq!(deck.study_history.len(), 2);
        assert_eq!(deck.study_history[0], second);
        assert_eq!(deck.last_played, Some(second.date));
    }

    #[test]
    fn test_duplicate_card_id() {
        let mut deck = Deck::new("d", "t", "");
        deck.cards.push(Card::new("a", "1", "2"));
        deck.cards.push(Card::new("b", "3", "4"));
        assert_eq!(deck.duplicate_card_id(), None);
        deck.cards.push(Card::new("a", "5", "6"));
        assert_eq!(deck.duplicate_card_id(), Some(&CardId::new("a")));
    }

    #[test]
    fn test_deserialize_document_shape() -> Fallible<()> {
        let json = r#"{
            "id": "deck-1",
            "title": "Spanish",
            "description": "Basics",
            "cards": [{"id": "c1", "front": "hola", "back": "hello"}],
            "studyHistory": [{
                "date": "2024-05-01T09:30:00.000Z",
                "known": 1,
                "unknown": 2,
                "completed": true,
                "knownCardIds": ["c1"],
                "unknownCardIds": ["c1"]
            }],
            "lastPlayed": "2024-05-01T09:30:00.000Z"
        }"#;
        let deck: Deck = serde_json::from_str(json)?;
        assert_eq!(deck.cards[0].back, "hello");
        assert_eq!(deck.study_history[0].result.unknown, 2);
        assert_eq!(
            deck.study_history[0].result.unknown_card_ids,
            vec![CardId::new("c1")]
        );
        assert!(deck.last_played.is_some());
        Ok(())
    }

    #[test]
    fn test_missing_optional_fields() -> Fallible<()> {
        let deck: Deck = serde_json::from_str(r#"{"id": "x", "title": "T", "cards": []}"#)?;
        assert_eq!(deck.description, "");
        assert!(deck.study_history.is_empty());
        assert_eq!(deck.last_played, None);
        Ok(())
    }
}
