use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::room::{ClientId, Learner, Room, RoomCode};

/// Aggregate view pushed to every tutor connection of a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorView {
    pub room_code: RoomCode,
    pub description: String,
    pub beep_fired: bool,
    pub learners: Vec<LearnerEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerEntry {
    pub client_id: ClientId,
    pub name: String,
    pub status: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hand_up_rank: Option<u32>,
    pub is_active: bool,
    pub last_communication_at: DateTime<Utc>,
}

/// What one learner sees of itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerView {
    pub room_code: RoomCode,
    pub description: String,
    pub client_id: ClientId,
    pub name: String,
    pub status: String,
    pub answer: String,
}

/// Read-only room listing entry for the HTTP surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_code: RoomCode,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub learner_count: usize,
    pub active_count: usize,
    pub hands_up: usize,
}

impl LearnerEntry {
    fn from_learner(client_id: &ClientId, learner: &Learner) -> Self {
        Self {
            client_id: client_id.clone(),
            name: learner.name.clone(),
            status: learner.status.clone(),
            answer: learner.answer.clone(),
            hand_up_rank: learner.hand_up_rank,
            is_active: learner.is_active,
            last_communication_at: learner.last_communication_at,
        }
    }
}

/// Named learners only, ordered by name ignoring case, then by client id.
pub fn tutor_view(room: &Room, beep_fired: bool) -> TutorView {
    let mut learners: Vec<LearnerEntry> = room
        .learners
        .iter()
        .filter(|(_, learner)| !learner.name.is_empty())
        .map(|(client_id, learner)| LearnerEntry::from_learner(client_id, learner))
        .collect();
    learners.sort_by(compare_entries);

    TutorView {
        room_code: room.code.clone(),
        description: room.description.clone(),
        beep_fired,
        learners,
    }
}

fn compare_entries(a: &LearnerEntry, b: &LearnerEntry) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.client_id.cmp(&b.client_id))
}

/// Unknown learners get empty strings for every field.
pub fn learner_view(room: &Room, client_id: &ClientId) -> LearnerView {
    let (name, status, answer) = room
        .learners
        .get(client_id)
        .map(|l| (l.name.clone(), l.status.clone(), l.answer.clone()))
        .unwrap_or_default();

    LearnerView {
        room_code: room.code.clone(),
        description: room.description.clone(),
        client_id: client_id.clone(),
        name,
        status,
        answer,
    }
}

pub fn room_summary(room: &Room) -> RoomSummary {
    RoomSummary {
        room_code: room.code.clone(),
        description: room.description.clone(),
        created_at: room.created_at,
        learner_count: room.learners.len(),
        active_count: room.learners.values().filter(|l| l.is_active).count(),
        hands_up: room.learners.values().filter(|l| l.hand_up_rank.is_some()).count(),
    }
}

/// Number of visible learners per non-empty status, for poll displays.
pub fn status_counts(view: &TutorView) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for learner in view.learners.iter().filter(|l| !l.status.is_empty()) {
        *counts.entry(learner.status.clone()).or_insert(0) += 1;
    }
    counts
}
