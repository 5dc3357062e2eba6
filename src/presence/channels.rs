use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::room::RoomCode;

/// Identifies one live transport connection for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Broadcast channel a connection listens on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Learner-facing channel of a room.
    Learners(RoomCode),
    /// Tutor-only sub-channel of a room.
    Tutors(RoomCode),
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Learners(code) => write!(f, "{code}"),
            Channel::Tutors(code) => write!(f, "tutor-{code}"),
        }
    }
}

/// Keeps every connection bound to at most one channel.
#[derive(Debug, Default)]
pub struct ChannelRouter {
    bindings: HashMap<ConnectionId, Channel>,
    members: HashMap<Channel, HashSet<ConnectionId>>,
}

impl ChannelRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_as_tutor(&mut self, connection: ConnectionId, room_code: &RoomCode) {
        self.bind(connection, Channel::Tutors(room_code.clone()));
    }

    pub fn bind_as_learner(&mut self, connection: ConnectionId, room_code: &RoomCode) {
        self.bind(connection, Channel::Learners(room_code.clone()));
    }

    /// Old membership is fully dropped before the new one is recorded.
    fn bind(&mut self, connection: ConnectionId, channel: Channel) {
        if self.bindings.get(&connection) == Some(&channel) {
            return;
        }

        self.unbind(connection);
        tracing::debug!(connection = %connection, channel = %channel, "Connection bound to channel");
        self.members
            .entry(channel.clone())
            .or_default()
            .insert(connection);
        self.bindings.insert(connection, channel);
    }

    /// Removes `connection` from whatever channel it was on.
    pub fn unbind(&mut self, connection: ConnectionId) -> Option<Channel> {
        let channel = self.bindings.remove(&connection)?;
        if let Some(members) = self.members.get_mut(&channel) {
            members.remove(&connection);
            if members.is_empty() {
                self.members.remove(&channel);
            }
        }
        Some(channel)
    }

    pub fn channel_of(&self, connection: ConnectionId) -> Option<&Channel> {
        self.bindings.get(&connection)
    }

    /// Connections on `channel`, in a stable order.
    pub fn members(&self, channel: &Channel) -> Vec<ConnectionId> {
        let mut members: Vec<ConnectionId> = self
            .members
            .get(channel)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        members.sort();
        members
    }
}
