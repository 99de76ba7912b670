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

//! SQLite-backed deck store.

use std::path::Path;

use memodeck_core::Card;
use memodeck_core::CardId;
use memodeck_core::Deck;
use memodeck_core::DeckId;
use memodeck_core::DeckStore;
use memodeck_core::SessionResult;
use memodeck_core::StudySession;
use memodeck_core::Timestamp;
use memodeck_core::error::Fallible;
use memodeck_core::error::fail;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

const SCHEMA: &str = "
create table if not exists decks (
    id text primary key,
    title text not null,
    description text not null,
    last_played text
);
create table if not exists cards (
    deck_id text not null,
    id text not null,
    front text not null,
    back text not null,
    position integer not null,
    primary key (deck_id, id)
);
create table if not exists sessions (
    deck_id text not null,
    date text not null,
    known integer not null,
    unknown integer not null,
    completed integer not null,
    known_card_ids text not null,
    unknown_card_ids text not null
);
";

pub struct Database {
    conn: Connection,
}

/// A `sessions` row before its columns are parsed.
struct SessionRow {
    date: String,
    known: i64,
    unknown: i64,
    completed: bool,
    known_card_ids: String,
    unknown_card_ids: String,
}

impl Database {
    pub fn new(path: &Path) -> Fallible<Self> {
        log::debug!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn in_memory() -> Fallible<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Fallible<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    fn deck_ids(&self) -> Fallible<Vec<DeckId>> {
        let mut stmt = self.conn.prepare("select id from decks order by rowid")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids.into_iter().map(DeckId::new).collect())
    }

    fn load(&self, id: &DeckId) -> Fallible<Option<Deck>> {
        let row = self
            .conn
            .query_row(
                "select title, description, last_played from decks where id = ?1",
                params![id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;
        let Some((title, description, last_played)) = row else {
            return Ok(None);
        };
        let last_played = last_played.map(Timestamp::try_from).transpose()?;
        Ok(Some(Deck {
            id: id.clone(),
            title,
            description,
            cards: self.cards(id)?,
            study_history: self.history(id)?,
            last_played,
        }))
    }

    fn cards(&self, deck_id: &DeckId) -> Fallible<Vec<Card>> {
        let mut stmt = self.conn.prepare(
            "select id, front, back from cards where deck_id = ?1 order by position",
        )?;
        let cards = stmt
            .query_map(params![deck_id.as_str()], |row| {
                Ok(Card::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cards)
    }

    /// Newest first.
    fn history(&self, deck_id: &DeckId) -> Fallible<Vec<StudySession>> {
        let mut stmt = self.conn.prepare(
            "select date, known, unknown, completed, known_card_ids, unknown_card_ids
             from sessions where deck_id = ?1 order by rowid desc",
        )?;
        let rows = stmt
            .query_map(params![deck_id.as_str()], |row| {
                Ok(SessionRow {
                    date: row.get(0)?,
                    known: row.get(1)?,
                    unknown: row.get(2)?,
                    completed: row.get(3)?,
                    known_card_ids: row.get(4)?,
                    unknown_card_ids: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|row| -> Fallible<StudySession> {
                Ok(StudySession {
                    date: Timestamp::try_from(row.date)?,
                    result: SessionResult {
                        known: row.known as usize,
                        unknown: row.unknown as usize,
                        completed: row.completed,
                        known_card_ids: serde_json::from_str(&row.known_card_ids)?,
                        unknown_card_ids: serde_json::from_str(&row.unknown_card_ids)?,
                    },
                })
            })
            .collect()
    }

    fn has_deck(&self, id: &DeckId) -> Fallible<bool> {
        let count: i64 = self.conn.query_row(
            "select count(*) from decks where id = ?1",
            params![id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn require_deck(&self, id: &DeckId) -> Fallible<()> {
        if self.has_deck(id)? {
            Ok(())
        } else {
            fail(format!("no deck with id '{id}'."))
        }
    }
}

fn insert_session(conn: &Connection, deck_id: &DeckId, session: &StudySession) -> Fallible<()> {
    let result = &session.result;
    conn.execute(
        "insert into sessions (deck_id, date, known, unknown, completed, known_card_ids, unknown_card_ids)
         values (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            deck_id.as_str(),
            session.date.to_string(),
            result.known as i64,
            result.unknown as i64,
            result.completed,
            serde_json::to_string(&result.known_card_ids)?,
            serde_json::to_string(&result.unknown_card_ids)?,
        ],
    )?;
    Ok(())
}

impl DeckStore for Database {
    fn decks(&self) -> Fallible<Vec<Deck>> {
        let mut decks = Vec::new();
        for id in self.deck_ids()? {
            if let Some(deck) = self.load(&id)? {
                decks.push(deck);
            }
        }
        Ok(decks)
    }

    fn deck(&self, id: &DeckId) -> Fallible<Deck> {
        match self.load(id)? {
            Some(deck) => Ok(deck),
            None => fail(format!("no deck with id '{id}'.")),
        }
    }

    fn contains(&self, id: &DeckId) -> Fallible<bool> {
        self.has_deck(id)
    }

    fn insert_deck(&mut self, deck: Deck) -> Fallible<()> {
        if self.has_deck(&deck.id)? {
            return fail(format!("a deck with id '{}' already exists.", deck.id));
        }
        if let Some(id) = deck.duplicate_card_id() {
            return fail(format!("deck {} contains duplicate card id '{id}'.", deck.id));
        }
        let tx = self.conn.transaction()?;
        tx.execute(
            "insert into decks (id, title, description, last_played) values (?1, ?2, ?3, ?4)",
            params![
                deck.id.as_str(),
                deck.title,
                deck.description,
                deck.last_played.map(|ts| ts.to_string()),
            ],
        )?;
        for (position, card) in deck.cards.iter().enumerate() {
            tx.execute(
                "insert into cards (deck_id, id, front, back, position) values (?1, ?2, ?3, ?4, ?5)",
                params![
                    deck.id.as_str(),
                    card.id.as_str(),
                    card.front,
                    card.back,
                    position as i64
                ],
            )?;
        }
        // History is newest first; insert oldest first so rowid order matches.
        for session in deck.study_history.iter().rev() {
            insert_session(&tx, &deck.id, session)?;
        }
        tx.commit()?;
        log::debug!("Inserted deck {} ({} cards)", deck.id, deck.cards.len());
        Ok(())
    }

    fn update_deck(&mut self, id: &DeckId, title: &str, description: &str) -> Fallible<()> {
        let changed = self.conn.execute(
            "update decks set title = ?2, description = ?3 where id = ?1",
            params![id.as_str(), title, description],
        )?;
        if changed == 0 {
            return fail(format!("no deck with id '{id}'."));
        }
        Ok(())
    }

    fn replace_deck(&mut self, deck: Deck) -> Fallible<()> {
        if let Some(id) = deck.duplicate_card_id() {
            return fail(format!("deck {} contains duplicate card id '{id}'.", deck.id));
        }
        let tx = self.conn.transaction()?;
        let changed = tx.execute(
            "update decks set title = ?2, description = ?3 where id = ?1",
            params![deck.id.as_str(), deck.title, deck.description],
        )?;
        if changed == 0 {
            return fail(format!("no deck with id '{}'.", deck.id));
        }
        tx.execute("delete from cards where deck_id = ?1", params![deck.id.as_str()])?;
        for (position, card) in deck.cards.iter().enumerate() {
            tx.execute(
                "insert into cards (deck_id, id, front, back, position) values (?1, ?2, ?3, ?4, ?5)",
                params![
                    deck.id.as_str(),
                    card.id.as_str(),
                    card.front,
                    card.back,
                    position as i64
                ],
            )?;
        }
        tx.commit()?;
        log::debug!("Replaced deck {} ({} cards)", deck.id, deck.cards.len());
        Ok(())
    }

    fn delete_deck(&mut self, id: &DeckId) -> Fallible<()> {
        let tx = self.conn.transaction()?;
        tx.execute("delete from cards where deck_id = ?1", params![id.as_str()])?;
        tx.execute("delete from sessions where deck_id = ?1", params![id.as_str()])?;
        let changed = tx.execute("delete from decks where id = ?1", params![id.as_str()])?;
        if changed == 0 {
            return fail(format!("no deck with id '{id}'."));
        }
        tx.commit()?;
        log::debug!("Deleted deck {id}");
        Ok(())
    }

    fn add_card(&mut self, deck_id: &DeckId, card: Card) -> Fallible<()> {
        self.require_deck(deck_id)?;
        let exists: i64 = self.conn.query_row(
            "select count(*) from cards where deck_id = ?1 and id = ?2",
            params![deck_id.as_str(), card.id.as_str()],
            |row| row.get(0),
        )?;
        if exists > 0 {
            return fail(format!("deck {deck_id} already has a card '{}'.", card.id));
        }
        self.conn.execute(
            "insert into cards (deck_id, id, front, back, position)
             values (?1, ?2, ?3, ?4, (select coalesce(max(position) + 1, 0) from cards where deck_id = ?1))",
            params![deck_id.as_str(), card.id.as_str(), card.front, card.back],
        )?;
        Ok(())
    }

    fn update_card(
        &mut self,
        deck_id: &DeckId,
        card_id: &CardId,
        front: &str,
        back: &str,
    ) -> Fallible<()> {
        let changed = self.conn.execute(
            "update cards set front = ?3, back = ?4 where deck_id = ?1 and id = ?2",
            params![deck_id.as_str(), card_id.as_str(), front, back],
        )?;
        if changed == 0 {
            return fail(format!("deck {deck_id} has no card '{card_id}'."));
        }
        Ok(())
    }

    fn delete_card(&mut self, deck_id: &DeckId, card_id: &CardId) -> Fallible<()> {
        let changed = self.conn.execute(
            "delete from cards where deck_id = ?1 and id = ?2",
            params![deck_id.as_str(), card_id.as_str()],
        )?;
        if changed == 0 {
            return fail(format!("deck {deck_id} has no card '{card_id}'."));
        }
        Ok(())
    }

    fn append_session(&mut self, deck_id: &DeckId, session: StudySession) -> Fallible<()> {
        self.require_deck(deck_id)?;
        let tx = self.conn.transaction()?;
        insert_session(&tx, deck_id, &session)?;
        tx.execute(
            "update decks set last_played = ?2 where id = ?1",
            params![deck_id.as_str(), session.date.to_string()],
        )?;
        tx.commit()?;
        log::info!(
            "Recorded session for deck {deck_id}: {} known, {} unknown, completed: {}",
            session.result.known,
            session.result.unknown,
            session.result.completed
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use memodeck_core::MemoryStore;
    use tempfile::tempdir;

    use super::*;

    fn at(s: &str) -> Timestamp {
        Timestamp::try_from(s.to_string()).unwrap()
    }

    fn session(date: &str, known: usize) -> StudySession {
        StudySession {
            date: at(date),
            result: SessionResult {
                known,
                unknown: 1,
                completed: false,
                known_card_ids: vec![CardId::new("c1")],
                unknown_card_ids: vec![CardId::new("c2")],
            },
        }
    }

    fn deck() -> Deck {
        let mut deck = Deck::new("d1", "Kanji", "N5");
        deck.cards.push(Card::new("c1", "日", "sun"));
        deck.cards.push(Card::new("c2", "月", "moon"));
        deck.cards.push(Card::new("c3", "火", "fire"));
        deck.study_history.push(session("2024-02-02T10:00:00.000", 2));
        deck.study_history.push(session("2024-02-01T10:00:00.000", 1));
        deck.last_played = Some(at("2024-02-02T10:00:00.000"));
        deck
    }

    #[test]
    fn test_roundtrip_deck() -> Fallible<()> {
        let mut db = Database::in_memory()?;
        db.insert_deck(deck())?;
        assert_eq!(db.deck(&DeckId::new("d1"))?, deck());
        assert!(db.insert_deck(deck()).is_err());
        Ok(())
    }

    #[test]
    fn test_append_session_is_newest_first() -> Fallible<()> {
        let mut db = Database::in_memory()?;
        db.insert_deck(deck())?;
        let id = DeckId::new("d1");
        let latest = session("2024-03-01T08:00:00.000", 3);
        db.append_session(&id, latest.clone())?;
        let loaded = db.deck(&id)?;
        assert_eq!(loaded.study_history.len(), 3);
        assert_eq!(loaded.study_history[0], latest);
        assert_eq!(loaded.last_played, Some(latest.date));
        assert!(db.append_session(&DeckId::new("nope"), latest).is_err());
        Ok(())
    }

    #[test]
    fn test_card_crud() -> Fallible<()> {
        let mut db = Database::in_memory()?;
        db.insert_deck(deck())?;
        let id = DeckId::new("d1");
        db.add_card(&id, Card::new("c4", "水", "water"))?;
        assert!(db.add_card(&id, Card::new("c4", "x", "y")).is_err());
        db.update_card(&id, &CardId::new("c2"), "月", "month")?;
        db.delete_card(&id, &CardId::new("c1"))?;
        assert!(db.delete_card(&id, &CardId::new("c1")).is_err());
        let backs: Vec<String> = db.deck(&id)?.cards.into_iter().map(|c| c.back).collect();
        assert_eq!(backs, vec!["month", "fire", "water"]);
        Ok(())
    }

    #[test]
    fn test_update_and_delete_deck() -> Fallible<()> {
        let mut db = Database::in_memory()?;
        db.insert_deck(deck())?;
        db.insert_deck(Deck::new("d2", "Other", ""))?;
        let id = DeckId::new("d1");
        db.update_deck(&id, "Kanji I", "")?;
        assert_eq!(db.deck(&id)?.title, "Kanji I");
        db.delete_deck(&id)?;
        assert!(db.deck(&id).is_err());
        assert!(db.delete_deck(&id).is_err());
        let ids: Vec<DeckId> = db.decks()?.into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![DeckId::new("d2")]);
        Ok(())
    }

    #[test]
    fn test_replace_deck_is_atomic() -> Fallible<()> {
        let mut db = Database::in_memory()?;
        db.insert_deck(deck())?;
        let id = DeckId::new("d1");
        let mut bad = deck();
        bad.title = "Changed".to_string();
        bad.cards.push(Card::new("c1", "dup", "dup"));
        assert!(db.replace_deck(bad).is_err());
        assert_eq!(db.deck(&id)?, deck());

        let mut edited = deck();
        edited.cards = vec![Card::new("c3", "火", "fire"), Card::new("c5", "金", "gold")];
        db.replace_deck(edited.clone())?;
        let loaded = db.deck(&id)?;
        assert_eq!(loaded.cards, edited.cards);
        assert_eq!(loaded.study_history, deck().study_history);
        Ok(())
    }

    #[test]
    fn test_persists_across_connections() -> Fallible<()> {
        let dir = tempdir()?;
        let path = dir.path().join("memodeck.db");
        {
            let mut db = Database::new(&path)?;
            db.insert_deck(deck())?;
        }
        let db = Database::new(&path)?;
        assert_eq!(db.decks()?, vec![deck()]);
        Ok(())
    }

    #[test]
    fn test_matches_memory_store() -> Fallible<()> {
        let mut db = Database::in_memory()?;
        let mut mem = MemoryStore::default();
        let id = DeckId::new("d1");
        for store in [&mut db as &mut dyn DeckStore, &mut mem as &mut dyn DeckStore] {
            store.insert_deck(deck())?;
            store.add_card(&id, Card::new("c9", "木", "tree"))?;
            store.append_session(&id, session("2024-04-01T00:00:00.000", 0))?;
            let mut edited = deck();
            edited.title = "Kanji II".to_string();
            edited.cards.reverse();
            edited.cards.pop();
            edited.study_history.clear();
            store.replace_deck(edited)?;
        }
        assert_eq!(db.decks()?, mem.decks()?);
        Ok(())
    }
}
