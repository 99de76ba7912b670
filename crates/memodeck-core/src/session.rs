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

//! The review session engine.
//!
//! A [`ReviewSession`] owns a shuffled queue of cards and a tally of
//! outcomes. The host feeds it discrete events (reveal, judge, abort) and
//! collects exactly one [`SessionResult`] when the session terminates.
//!
//! Judging a card is split in two phases so that hosts with a flip animation
//! can let it start before the card underneath changes:
//!
//! 1. [`ReviewSession::judge`] records the verdict against the current card
//!    and returns a [`PendingJudgment`].
//! 2. [`ReviewSession::apply`] performs the tally and queue mutation, after
//!    [`JUDGMENT_DELAY`] or immediately.
//!
//! Hosts without animation can call [`ReviewSession::answer`], which does
//! both at once.

use std::collections::HashSet;
use std::collections::VecDeque;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Fallible;
use crate::error::fail;
use crate::rng::TinyRng;
use crate::rng::shuffle;
use crate::store::DeckStore;
use crate::types::card::Card;
use crate::types::deck::StudySession;
use crate::types::deck::first_duplicate;
use crate::types::ids::CardId;
use crate::types::ids::DeckId;
use crate::types::timestamp::Timestamp;

/// How long a host should wait between [`ReviewSession::judge`] and
/// [`ReviewSession::apply`] so that the flip animation starts first.
pub const JUDGMENT_DELAY: Duration = Duration::from_millis(150);

/// The reviewer's classification of a revealed card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Known,
    Unknown,
}

/// Which side of the current card is showing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Face {
    Front,
    Back,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Active,
    /// Every card was eventually judged known (or the deck was empty).
    Completed,
    /// The reviewer ended the session with cards still in the queue.
    Aborted,
}

/// The terminal record of a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub known: usize,
    /// Counts miss events: a card missed three times contributes three.
    pub unknown: usize,
    pub completed: bool,
    pub known_card_ids: Vec<CardId>,
    /// Distinct cards missed at least once.
    pub unknown_card_ids: Vec<CardId>,
}

impl SessionResult {
    /// The number of judgments made.
    pub fn attempted(&self) -> usize {
        self.known + self.unknown
    }

    /// Percentage of judgments that were "known", rounded. Zero when nothing
    /// was attempted.
    pub fn accuracy(&self) -> usize {
        let attempted = self.attempted();
        if attempted == 0 {
            0
        } else {
            (self.known * 100 + attempted / 2) / attempted
        }
    }
}

/// A verdict recorded against a card, waiting to be applied.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct PendingJudgment {
    card_id: CardId,
    verdict: Verdict,
}

impl PendingJudgment {
    pub fn card_id(&self) -> &CardId {
        &self.card_id
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }
}

/// What an event did to the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// The event did not apply to the current state and was dropped.
    Ignored,
    /// The card was judged known and left the queue.
    Retired,
    /// The card was judged unknown and moved to the back of the queue.
    Requeued,
    /// The last card was retired and the session completed.
    Completed,
}

#[derive(Default)]
struct Tally {
    known: usize,
    unknown: usize,
    known_ids: Vec<CardId>,
    /// First-miss order.
    unknown_ids: Vec<CardId>,
    /// Same ids as `unknown_ids`, for membership checks.
    missed: HashSet<CardId>,
}

pub struct ReviewSession {
    deck_id: DeckId,
    total: usize,
    queue: VecDeque<Card>,
    face: Face,
    tally: Tally,
    pending: Option<PendingJudgment>,
    status: Status,
    result: Option<SessionResult>,
    claimed: bool,
}

impl ReviewSession {
    /// Start a session over a snapshot of a deck's cards.
    ///
    /// Fails if two cards share an id. An empty snapshot yields a session
    /// that is already completed.
    pub fn new(deck_id: DeckId, cards: Vec<Card>, rng: &mut TinyRng) -> Fallible<Self> {
        if let Some(id) = first_duplicate(&cards) {
            return fail(format!("deck {deck_id} contains duplicate card id '{id}'."));
        }
        let total = cards.len();
        let queue: VecDeque<Card> = shuffle(cards, rng).into();
        let mut session = Self {
            deck_id,
            total,
            queue,
            face: Face::Front,
            tally: Tally::default(),
            pending: None,
            status: Status::Active,
            result: None,
            claimed: false,
        };
        log::debug!(
            "Starting session on deck {} with {total} cards",
            session.deck_id
        );
        if total == 0 {
            session.terminate(Status::Completed);
        }
        Ok(session)
    }

    pub fn deck_id(&self) -> &DeckId {
        &self.deck_id
    }

    /// The size of the original snapshot.
    pub fn total(&self) -> usize {
        self.total
    }

    /// The number of cards still in the queue.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn known(&self) -> usize {
        self.tally.known
    }

    pub fn unknown(&self) -> usize {
        self.tally.unknown
    }

    pub fn known_ids(&self) -> &[CardId] {
        &self.tally.known_ids
    }

    pub fn unknown_ids(&self) -> &[CardId] {
        &self.tally.unknown_ids
    }

    /// Ids in the queue, head first.
    pub fn queue_ids(&self) -> impl Iterator<Item = &CardId> {
        self.queue.iter().map(|card| &card.id)
    }

    pub fn face(&self) -> Face {
        self.face
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status != Status::Active
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Fraction of the deck retired as known.
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.tally.known as f64 / self.total as f64
        }
    }

    /// The card being presented, if the session is still running.
    pub fn current(&self) -> Option<&Card> {
        match self.status {
            Status::Active => self.queue.front(),
            Status::Completed | Status::Aborted => None,
        }
    }

    /// Show the back of the current card. Returns whether anything changed.
    pub fn reveal(&mut self) -> bool {
        if self.current().is_none() || self.pending.is_some() {
            return false;
        }
        self.face = Face::Back;
        true
    }

    /// Phase one of a judgment: record the verdict for the current card.
    ///
    /// Only accepted while the back is showing and no other judgment is
    /// pending. The face flips back to the front immediately.
    pub fn judge(&mut self, verdict: Verdict) -> Option<PendingJudgment> {
        if self.face != Face::Back || self.pending.is_some() {
            return None;
        }
        let card = self.current()?;
        let pending = PendingJudgment {
            card_id: card.id.clone(),
            verdict,
        };
        self.pending = Some(pending.clone());
        self.face = Face::Front;
        Some(pending)
    }

    /// Phase two of a judgment: update the tally and the queue.
    ///
    /// A no-op if the session terminated since [`ReviewSession::judge`], or
    /// if `pending` is not the judgment currently outstanding.
    pub fn apply(&mut self, pending: PendingJudgment) -> Transition {
        if self.is_terminal() {
            self.pending = None;
            log::debug!("Dropping judgment for {}: session is over", pending.card_id);
            return Transition::Ignored;
        }
        if self.pending.as_ref() != Some(&pending) {
            return Transition::Ignored;
        }
        self.pending = None;
        let Some(card) = self.queue.pop_front() else {
            return Transition::Ignored;
        };
        if card.id != pending.card_id {
            self.queue.push_front(card);
            return Transition::Ignored;
        }
        self.face = Face::Front;
        match pending.verdict {
            Verdict::Known => {
                self.tally.known += 1;
                self.tally.known_ids.push(card.id);
                if self.queue.is_empty() {
                    self.terminate(Status::Completed);
                    Transition::Completed
                } else {
                    Transition::Retired
                }
            }
            Verdict::Unknown => {
                self.tally.unknown += 1;
                if self.tally.missed.insert(card.id.clone()) {
                    self.tally.unknown_ids.push(card.id.clone());
                }
                self.queue.push_back(card);
                Transition::Requeued
            }
        }
    }

    /// Judge and apply in one step.
    pub fn answer(&mut self, verdict: Verdict) -> Transition {
        match self.judge(verdict) {
            Some(pending) => self.apply(pending),
            None => Transition::Ignored,
        }
    }

    /// End the session early. Returns `false` if it had already terminated.
    pub fn abort(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.pending = None;
        self.queue.clear();
        self.terminate(Status::Aborted);
        true
    }

    /// Whether the terminal record has been handed out, by
    /// [`ReviewSession::take_result`] or a successful
    /// [`ReviewSession::record`].
    pub fn is_claimed(&self) -> bool {
        self.claimed
    }

    /// The terminal record, without claiming it.
    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    /// Claim the terminal record. Returns `Some` exactly once per session,
    /// and only after it has terminated.
    pub fn take_result(&mut self) -> Option<SessionResult> {
        if self.claimed {
            return None;
        }
        let result = self.result.clone()?;
        self.claimed = true;
        Some(result)
    }

    /// Append the terminal record to the deck's history in `store`.
    ///
    /// Returns the stored entry the first time it is called after
    /// termination, and `None` otherwise. If the store fails the result stays
    /// unclaimed so the host can retry.
    pub fn record<S: DeckStore + ?Sized>(
        &mut self,
        store: &mut S,
        at: Timestamp,
    ) -> Fallible<Option<StudySession>> {
        if self.claimed {
            return Ok(None);
        }
        let Some(result) = self.result.clone() else {
            return Ok(None);
        };
        let entry = StudySession { date: at, result };
        store.append_session(&self.deck_id, entry.clone())?;
        self.claimed = true;
        Ok(Some(entry))
    }

    fn terminate(&mut self, status: Status) {
        let result = SessionResult {
            known: self.tally.known,
            unknown: self.tally.unknown,
            completed: status == Status::Completed,
            known_card_ids: self.tally.known_ids.clone(),
            unknown_card_ids: self.tally.unknown_ids.clone(),
        };
        log::info!(
            "Session on deck {} {}: {} known, {} unknown",
            self.deck_id,
            if result.completed { "completed" } else { "aborted" },
            result.known,
            result.unknown
        );
        self.status = status;
        self.result = Some(result);
    }
}
