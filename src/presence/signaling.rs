use serde::{Deserialize, Serialize};

use super::room::{ClientId, RoomCode};
use super::snapshot::{LearnerView, TutorView};
use crate::error::{Result, TicksError};

/// Events a tutor or learner connection sends to the server.
///
/// Learner payloads also accept the short `room` and `client` field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinAsLearner {
        #[serde(alias = "room")]
        room_code: RoomCode,
        #[serde(alias = "client")]
        client_id: ClientId,
    },

    JoinAsTutor {
        #[serde(alias = "room")]
        room_code: RoomCode,
    },

    PingFromTutor {
        #[serde(alias = "room")]
        room_code: RoomCode,
    },

    PingFromLearner {
        #[serde(alias = "room")]
        room_code: RoomCode,
        #[serde(alias = "client")]
        client_id: ClientId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    Status {
        #[serde(alias = "room")]
        room_code: RoomCode,
        #[serde(alias = "client")]
        client_id: ClientId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        answer: Option<String>,
    },

    Clear {
        #[serde(alias = "room")]
        room_code: RoomCode,
    },

    KickLearner {
        #[serde(alias = "room")]
        room_code: RoomCode,
        #[serde(alias = "client")]
        client_id: ClientId,
    },

    KickAllLearners {
        #[serde(alias = "room")]
        room_code: RoomCode,
    },
}

impl ClientEvent {
    /// Validates and decodes one inbound text frame.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| TicksError::malformed(e.to_string()))
    }

    pub fn room_code(&self) -> &RoomCode {
        match self {
            ClientEvent::JoinAsLearner { room_code, .. }
            | ClientEvent::JoinAsTutor { room_code }
            | ClientEvent::PingFromTutor { room_code }
            | ClientEvent::PingFromLearner { room_code, .. }
            | ClientEvent::Status { room_code, .. }
            | ClientEvent::Clear { room_code }
            | ClientEvent::KickLearner { room_code, .. }
            | ClientEvent::KickAllLearners { room_code } => room_code,
        }
    }

    /// Wire name of the event, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientEvent::JoinAsLearner { .. } => "join-as-learner",
            ClientEvent::JoinAsTutor { .. } => "join-as-tutor",
            ClientEvent::PingFromTutor { .. } => "ping-from-tutor",
            ClientEvent::PingFromLearner { .. } => "ping-from-learner",
            ClientEvent::Status { .. } => "status",
            ClientEvent::Clear { .. } => "clear",
            ClientEvent::KickLearner { .. } => "kick-learner",
            ClientEvent::KickAllLearners { .. } => "kick-all-learners",
        }
    }
}

/// Events the server pushes to connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    RefreshTutor(TutorView),
    RefreshLearner(LearnerView),
    /// Tells learners to drop their status and answer.
    Clear,
}

impl ServerEvent {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
