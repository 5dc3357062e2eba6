use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TicksError;

/// Status token that puts a learner into the hand-up queue.
pub const HAND_UP: &str = "hand-up";

/// Case-insensitive room code, stored upper-cased.
///
/// Every boundary that accepts a room code goes through [`RoomCode::parse`],
/// so "abc" and "ABC" can never name two different rooms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(pub(super) String);

impl RoomCode {
    pub fn parse(raw: &str) -> Result<Self, TicksError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.chars().any(|c| c.is_control() || c == '/') {
            return Err(TicksError::InvalidRoomCode(raw.to_string()));
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomCode {
    type Error = TicksError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier a learner's device picks for itself. Opaque, unique per room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientId(String);

impl ClientId {
    pub fn parse(raw: &str) -> Result<Self, TicksError> {
        if raw.trim().is_empty() {
            return Err(TicksError::InvalidClientId);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ClientId {
    type Error = TicksError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ClientId> for String {
    fn from(id: ClientId) -> Self {
        id.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Learner {
    pub name: String,
    pub status: String,
    pub answer: String,
    /// Set only while `status == HAND_UP`.
    pub hand_up_rank: Option<u32>,
    pub last_communication_at: DateTime<Utc>,
    /// Derived by tidy, never written by event handlers.
    pub is_active: bool,
}

impl Learner {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            name: String::new(),
            status: String::new(),
            answer: String::new(),
            hand_up_rank: None,
            last_communication_at: now,
            is_active: true,
        }
    }

    pub fn has_hand_up(&self) -> bool {
        self.status == HAND_UP
    }
}

#[derive(Debug, Clone)]
pub struct Room {
    pub code: RoomCode,
    pub description: String,
    pub learners: BTreeMap<ClientId, Learner>,
    pub created_at: DateTime<Utc>,
    /// Consumed by the next tutor broadcast.
    pub beep_pending: bool,
}

impl Room {
    pub fn new(code: RoomCode, created_at: DateTime<Utc>) -> Self {
        let description = code.to_string();
        Self {
            code,
            description,
            learners: BTreeMap::new(),
            created_at,
            beep_pending: false,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
            self.description = description;
        }
        self
    }

    /// Returns the learner for `client_id`, creating it on first contact, and
    /// stamps its last communication time.
    pub fn touch_learner(&mut self, client_id: &ClientId, now: DateTime<Utc>) -> &mut Learner {
        let learner = self
            .learners
            .entry(client_id.clone())
            .or_insert_with(|| Learner::new(now));
        learner.last_communication_at = now;
        learner
    }

    /// Resets every learner to "no status" without removing anyone.
    pub fn clear_statuses(&mut self) {
        for learner in self.learners.values_mut() {
            learner.status.clear();
            learner.answer.clear();
            learner.hand_up_rank = None;
        }
    }

    pub fn remove_learner(&mut self, client_id: &ClientId) -> Option<Learner> {
        self.learners.remove(client_id)
    }

    pub fn remove_all_learners(&mut self) -> usize {
        let removed = self.learners.len();
        self.learners.clear();
        removed
    }

    pub fn take_beep(&mut self) -> bool {
        std::mem::take(&mut self.beep_pending)
    }
}

/// Keeps ASCII letters, digits, dots and spaces, then trims.
pub fn sanitize_answer(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == ' ')
        .collect::<String>()
        .trim()
        .to_string()
}
