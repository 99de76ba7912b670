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

//! Moving decks in and out as standalone JSON documents.

use crate::error::Fallible;
use crate::error::fail;
use crate::store::DeckStore;
use crate::types::deck::Deck;

#[derive(Debug, PartialEq)]
pub enum ImportOutcome {
    Imported,
    /// A deck with the same id already exists; nothing was written.
    Skipped,
}

/// Serialize a deck, history included, as pretty-printed JSON.
pub fn export_deck(deck: &Deck) -> Fallible<String> {
    Ok(serde_json::to_string_pretty(deck)?)
}

/// The suggested file name for an exported deck.
pub fn export_file_name(deck: &Deck) -> String {
    let stem: String = deck
        .title
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    format!("{stem}.json")
}

/// Parse and validate a deck document.
pub fn import_deck(json: &str) -> Fallible<Deck> {
    let deck: Deck = serde_json::from_str(json)?;
    validate_deck(&deck)?;
    Ok(deck)
}

/// Check the parts of a deck document that serde cannot.
pub fn validate_deck(deck: &Deck) -> Fallible<()> {
    if deck.id.is_empty() {
        return fail("invalid deck format: missing id.");
    }
    if deck.title.trim().is_empty() {
        return fail("invalid deck format: missing title.");
    }
    if let Some(id) = deck.duplicate_card_id() {
        return fail(format!("invalid deck format: duplicate card id '{id}'."));
    }
    Ok(())
}

/// Add an imported deck to the store unless its id is already taken.
pub fn merge_import<S: DeckStore + ?Sized>(store: &mut S, deck: Deck) -> Fallible<ImportOutcome> {
    if store.contains(&deck.id)? {
        log::warn!(
            "A deck with ID {} ({}) already exists. Skipping import.",
            deck.id,
            deck.title
        );
        return Ok(ImportOutcome::Skipped);
    }
    log::info!("Importing deck {} ({})", deck.id, deck.title);
    store.insert_deck(deck)?;
    Ok(ImportOutcome::Imported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::card::Card;
    use crate::types::ids::DeckId;

    fn deck() -> Deck {
        let mut deck = Deck::new("d-1", "World Capitals", "Geography");
        deck.cards.push(Card::new("c-1", "France", "Paris"));
        deck.cards.push(Card::new("c-2", "Peru", "Lima"));
        deck
    }

    #[test]
    fn test_export_then_import() -> Fallible<()> {
        let deck = deck();
        let json = export_deck(&deck)?;
        assert!(json.contains("\"studyHistory\": []"));
        assert!(json.contains("\"lastPlayed\": null"));
        assert_eq!(import_deck(&json)?, deck);
        Ok(())
    }

    #[test]
    fn test_browser_dates_keep_utc_suffix() -> Fallible<()> {
        let json = r#"{
            "id": "d-2",
            "title": "Spanish",
            "cards": [{"id": "c1", "front": "hola", "back": "hello"}],
            "studyHistory": [{
                "date": "2024-05-01T09:30:00.000Z",
                "known": 1,
                "unknown": 0,
                "completed": true,
                "knownCardIds": ["c1"],
                "unknownCardIds": []
            }],
            "lastPlayed": "2024-05-01T09:30:00.000Z"
        }"#;
        let exported = export_deck(&import_deck(json)?)?;
        assert!(exported.contains("\"lastPlayed\": \"2024-05-01T09:30:00.000Z\""));
        assert!(exported.contains("\"date\": \"2024-05-01T09:30:00.000Z\""));
        Ok(())
    }

    #[test]
    fn test_file_name() {
        assert_eq!(export_file_name(&deck()), "World_Capitals.json");
    }

    #[test]
    fn test_import_rejects_invalid() {
        assert!(import_deck("not json").is_err());
        assert!(import_deck(r#"{"id": "", "title": "T", "cards": []}"#).is_err());
        assert!(import_deck(r#"{"id": "x", "title": " ", "cards": []}"#).is_err());
        assert!(import_deck(r#"{"id": "x", "title": "T"}"#).is_err());
        let dup = r#"{"id": "x", "title": "T", "cards": [
            {"id": "a", "front": "1", "back": "2"},
            {"id": "a", "front": "3", "back": "4"}
        ]}"#;
        assert!(import_deck(dup).is_err());
    }

    #[test]
    fn test_merge_skips_existing_id() -> Fallible<()> {
        let mut store = MemoryStore::default();
        assert_eq!(merge_import(&mut store, deck())?, ImportOutcome::Imported);
        let mut other = deck();
        other.title = "Something else".to_string();
        assert_eq!(merge_import(&mut store, other)?, ImportOutcome::Skipped);
        assert_eq!(store.deck(&DeckId::new("d-1"))?.title, "World Capitals");
        Ok(())
    }
}
