use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::channels::{Channel, ChannelRouter, ConnectionId};
use super::room::{ClientId, Room, RoomCode};
use super::signaling::ServerEvent;
use super::snapshot::{learner_view, tutor_view, TutorView};
use super::tidy::{tidy, PresencePolicy};

/// Outbound queue of one connection. The transport task drains it.
pub type Outbox = mpsc::UnboundedSender<ServerEvent>;

/// Builds snapshots and delivers them to connections.
#[derive(Debug, Default)]
pub struct SyncBroadcaster {
    outboxes: HashMap<ConnectionId, Outbox>,
}

impl SyncBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, connection: ConnectionId, outbox: Outbox) {
        self.outboxes.insert(connection, outbox);
    }

    pub fn unregister(&mut self, connection: ConnectionId) {
        self.outboxes.remove(&connection);
    }

    pub fn connection_count(&self) -> usize {
        self.outboxes.len()
    }

    /// Tidies `room`, consumes its beep and sends the tutor view to the
    /// room's tutor channel. The caller saves the room afterwards.
    pub fn push_tutor_view(
        &self,
        router: &ChannelRouter,
        room: &mut Room,
        now: DateTime<Utc>,
        policy: &PresencePolicy,
    ) -> TutorView {
        tidy(room, now, policy);
        let beep_fired = room.take_beep();
        let view = tutor_view(room, beep_fired);

        let delivered = self.send_to_channel(
            router,
            &Channel::Tutors(room.code.clone()),
            ServerEvent::RefreshTutor(view.clone()),
        );

        if beep_fired {
            tracing::debug!(room_code = %room.code, tutors = delivered, "Beep fired");
        }

        view
    }

    /// Sends one learner's view to the requesting connection only.
    pub fn push_learner_view(&self, connection: ConnectionId, room: &Room, client_id: &ClientId) {
        self.send(connection, ServerEvent::RefreshLearner(learner_view(room, client_id)));
    }

    pub fn broadcast_clear(&self, router: &ChannelRouter, room_code: &RoomCode) -> usize {
        self.send_to_channel(router, &Channel::Learners(room_code.clone()), ServerEvent::Clear)
    }

    /// Returns how many connections accepted the event.
    fn send_to_channel(&self, router: &ChannelRouter, channel: &Channel, event: ServerEvent) -> usize {
        router
            .members(channel)
            .into_iter()
            .filter(|connection| self.send(*connection, event.clone()))
            .count()
    }

    fn send(&self, connection: ConnectionId, event: ServerEvent) -> bool {
        let Some(outbox) = self.outboxes.get(&connection) else {
            tracing::warn!(connection = %connection, "No outbox registered for connection");
            return false;
        };

        if outbox.send(event).is_err() {
            tracing::warn!(connection = %connection, "Connection closed before snapshot could be delivered");
            return false;
        }
        true
    }
}
