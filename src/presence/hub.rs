use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::broadcaster::{Outbox, SyncBroadcaster};
use super::channels::{ChannelRouter, ConnectionId};
use super::clock::{Clock, SystemClock};
use super::ranking::apply_status;
use super::registry::{MemoryRoomStore, RoomRegistry, RoomStore};
use super::room::{sanitize_answer, ClientId, Room, RoomCode};
use super::signaling::ClientEvent;
use super::snapshot::{room_summary, RoomSummary};
use super::tidy::{tidy, PresencePolicy};
use crate::diagnostics::DiagnosticLog;
use crate::error::{Result, TicksError};

/// Work items processed one at a time by the hub task.
#[derive(Debug)]
pub enum HubCommand {
    Connect {
        connection: ConnectionId,
        outbox: Outbox,
    },
    Disconnect {
        connection: ConnectionId,
    },
    Event {
        connection: ConnectionId,
        event: ClientEvent,
    },
    ListRooms {
        reply: oneshot::Sender<Vec<RoomSummary>>,
    },
    DescribeRoom {
        room_code: RoomCode,
        reply: oneshot::Sender<Option<RoomSummary>>,
    },
    CreateRoom {
        description: Option<String>,
        reply: oneshot::Sender<RoomSummary>,
    },
}

/// Owns all room, channel and connection state.
///
/// Every mutation goes through `&mut self`, and once spawned the hub lives on
/// a single task that drains its command queue in order, so no two events
/// ever interleave and no lock guards the registry.
pub struct PresenceHub<S: RoomStore = MemoryRoomStore> {
    registry: RoomRegistry<S>,
    router: ChannelRouter,
    broadcaster: SyncBroadcaster,
    clock: Arc<dyn Clock>,
    policy: PresencePolicy,
    diagnostics: DiagnosticLog,
}

impl PresenceHub<MemoryRoomStore> {
    pub fn new(policy: PresencePolicy, diagnostics: DiagnosticLog) -> Self {
        Self::with_store(MemoryRoomStore::new(), Arc::new(SystemClock), policy, diagnostics)
    }
}

impl<S: RoomStore + 'static> PresenceHub<S> {
    pub fn with_store(
        store: S,
        clock: Arc<dyn Clock>,
        policy: PresencePolicy,
        diagnostics: DiagnosticLog,
    ) -> Self {
        Self {
            registry: RoomRegistry::new(store, clock.clone()),
            router: ChannelRouter::new(),
            broadcaster: SyncBroadcaster::new(),
            clock,
            policy,
            diagnostics,
        }
    }

    pub fn registry(&self) -> &RoomRegistry<S> {
        &self.registry
    }

    pub fn router(&self) -> &ChannelRouter {
        &self.router
    }

    /// Moves the hub onto its own task and returns the handle used to feed it.
    pub fn spawn(mut self) -> HubHandle {
        let (commands, mut receiver) = mpsc::unbounded_channel::<HubCommand>();

        tokio::spawn(async move {
            tracing::info!("Presence hub started");
            while let Some(command) = receiver.recv().await {
                self.apply(command);
            }
            tracing::info!("Presence hub stopped");
        });

        HubHandle { commands }
    }

    pub fn apply(&mut self, command: HubCommand) {
        match command {
            HubCommand::Connect { connection, outbox } => self.connect(connection, outbox),
            HubCommand::Disconnect { connection } => self.disconnect(connection),
            HubCommand::Event { connection, event } => self.handle_event(connection, event),
            HubCommand::ListRooms { reply } => {
                let _ = reply.send(self.room_summaries());
            }
            HubCommand::DescribeRoom { room_code, reply } => {
                let _ = reply.send(self.room_summary(&room_code));
            }
            HubCommand::CreateRoom { description, reply } => {
                let _ = reply.send(self.create_room(description));
            }
        }
    }

    pub fn connect(&mut self, connection: ConnectionId, outbox: Outbox) {
        self.broadcaster.register(connection, outbox);
        tracing::debug!(
            connection = %connection,
            connections = self.broadcaster.connection_count(),
            "Connection registered"
        );
    }

    pub fn disconnect(&mut self, connection: ConnectionId) {
        let channel = self.router.unbind(connection);
        self.broadcaster.unregister(connection);
        tracing::debug!(connection = %connection, channel = ?channel, "Connection released");
    }

    pub fn handle_event(&mut self, connection: ConnectionId, event: ClientEvent) {
        tracing::debug!(
            connection = %connection,
            event = event.kind(),
            room_code = %event.room_code(),
            "Handling event"
        );

        match event {
            ClientEvent::JoinAsLearner { room_code, client_id } => {
                self.join_as_learner(connection, &room_code, &client_id)
            }
            ClientEvent::JoinAsTutor { room_code } => self.join_as_tutor(connection, &room_code),
            ClientEvent::PingFromTutor { room_code } => self.ping_from_tutor(connection, &room_code),
            ClientEvent::PingFromLearner { room_code, client_id, name } => {
                self.ping_from_learner(connection, &room_code, &client_id, name)
            }
            ClientEvent::Status { room_code, client_id, name, status, answer } => {
                self.update_status(connection, &room_code, &client_id, name, status, answer)
            }
            ClientEvent::Clear { room_code } => self.clear(connection, &room_code),
            ClientEvent::KickLearner { room_code, client_id } => {
                self.kick_learner(connection, &room_code, &client_id)
            }
            ClientEvent::KickAllLearners { room_code } => self.kick_all_learners(connection, &room_code),
        }
    }

    fn join_as_learner(&mut self, connection: ConnectionId, room_code: &RoomCode, client_id: &ClientId) {
        tracing::info!(room_code = %room_code, client_id = %client_id, "Learner joined");
        self.router.bind_as_learner(connection, room_code);

        let mut room = self.registry.get_or_create(room_code);
        room.touch_learner(client_id, self.clock.now());
        self.broadcaster.push_learner_view(connection, &room, client_id);
        self.push_tutor_view(&mut room);
        self.registry.save(room);
    }

    fn join_as_tutor(&mut self, connection: ConnectionId, room_code: &RoomCode) {
        tracing::info!(room_code = %room_code, "Tutor joined");
        self.diagnostics.record(format!("join-as-tutor: {room_code}"));
        self.router.bind_as_tutor(connection, room_code);

        let mut room = self.registry.get_or_create(room_code);
        self.push_tutor_view(&mut room);
        self.registry.save(room);
    }

    fn ping_from_tutor(&mut self, connection: ConnectionId, room_code: &RoomCode) {
        self.router.bind_as_tutor(connection, room_code);

        let mut room = self.registry.get_or_create(room_code);
        self.push_tutor_view(&mut room);
        self.registry.save(room);
    }

    fn ping_from_learner(
        &mut self,
        connection: ConnectionId,
        room_code: &RoomCode,
        client_id: &ClientId,
        name: Option<String>,
    ) {
        self.router.bind_as_learner(connection, room_code);

        let mut room = self.registry.get_or_create(room_code);
        let learner = room.touch_learner(client_id, self.clock.now());
        if let Some(name) = name {
            learner.name = name;
        }
        self.push_tutor_view(&mut room);
        self.broadcaster.push_learner_view(connection, &room, client_id);
        self.registry.save(room);
    }

    fn update_status(
        &mut self,
        connection: ConnectionId,
        room_code: &RoomCode,
        client_id: &ClientId,
        name: Option<String>,
        status: Option<String>,
        answer: Option<String>,
    ) {
        self.router.bind_as_learner(connection, room_code);

        let mut room = self.registry.get_or_create(room_code);
        let learner = room.touch_learner(client_id, self.clock.now());
        if let Some(name) = name {
            learner.name = name;
        }
        if let Some(answer) = answer {
            learner.answer = sanitize_answer(&answer);
        }
        if let Some(status) = status {
            apply_status(&mut room, client_id, &status);
        }

        self.push_tutor_view(&mut room);
        self.registry.save(room);
    }

    fn clear(&mut self, connection: ConnectionId, room_code: &RoomCode) {
        self.router.bind_as_tutor(connection, room_code);

        let mut room = self.registry.get_or_create(room_code);
        room.clear_statuses();
        let learners = self.broadcaster.broadcast_clear(&self.router, room_code);
        tracing::info!(room_code = %room_code, learners, "Room cleared");

        self.push_tutor_view(&mut room);
        self.registry.save(room);
    }

    fn kick_learner(&mut self, connection: ConnectionId, room_code: &RoomCode, client_id: &ClientId) {
        self.router.bind_as_tutor(connection, room_code);

        let mut room = self.registry.get_or_create(room_code);
        if room.remove_learner(client_id).is_some() {
            tracing::info!(room_code = %room_code, client_id = %client_id, "Learner kicked");
        }

        self.push_tutor_view(&mut room);
        self.registry.save(room);
    }

    fn kick_all_learners(&mut self, connection: ConnectionId, room_code: &RoomCode) {
        self.router.bind_as_tutor(connection, room_code);

        let mut room = self.registry.get_or_create(room_code);
        let removed = room.remove_all_learners();
        tracing::info!(room_code = %room_code, removed, "All learners kicked");
        self.diagnostics.record(format!("kick-all-learners: {room_code} ({removed} removed)"));

        self.push_tutor_view(&mut room);
        self.registry.save(room);
    }

    fn push_tutor_view(&self, room: &mut Room) {
        self.broadcaster
            .push_tutor_view(&self.router, room, self.clock.now(), &self.policy);
    }

    /// Tidies every room before summarizing it.
    pub fn room_summaries(&mut self) -> Vec<RoomSummary> {
        let now = self.clock.now();
        let mut summaries = Vec::new();
        for mut room in self.registry.rooms() {
            tidy(&mut room, now, &self.policy);
            summaries.push(room_summary(&room));
            self.registry.save(room);
        }
        summaries
    }

    /// `None` for codes never referenced; looking does not create a room.
    pub fn room_summary(&mut self, room_code: &RoomCode) -> Option<RoomSummary> {
        if !self.registry.contains(room_code) {
            return None;
        }

        let mut room = self.registry.get_or_create(room_code);
        tidy(&mut room, self.clock.now(), &self.policy);
        let summary = room_summary(&room);
        self.registry.save(room);
        Some(summary)
    }

    pub fn create_room(&mut self, description: Option<String>) -> RoomSummary {
        let room = self.registry.create_with_generated_code(description);
        room_summary(&room)
    }
}

/// Cloneable front door to a spawned [`PresenceHub`].
#[derive(Debug, Clone)]
pub struct HubHandle {
    commands: mpsc::UnboundedSender<HubCommand>,
}

impl HubHandle {
    pub fn connect(&self, connection: ConnectionId, outbox: Outbox) -> Result<()> {
        self.submit(HubCommand::Connect { connection, outbox })
    }

    /// Best effort: a stopped hub has nothing left to release.
    pub fn disconnect(&self, connection: ConnectionId) {
        let _ = self.submit(HubCommand::Disconnect { connection });
    }

    pub fn dispatch(&self, connection: ConnectionId, event: ClientEvent) -> Result<()> {
        self.submit(HubCommand::Event { connection, event })
    }

    pub async fn list_rooms(&self) -> Result<Vec<RoomSummary>> {
        let (reply, response) = oneshot::channel();
        self.submit(HubCommand::ListRooms { reply })?;
        response.await.map_err(|_| TicksError::HubUnavailable)
    }

    pub async fn describe_room(&self, room_code: RoomCode) -> Result<Option<RoomSummary>> {
        let (reply, response) = oneshot::channel();
        self.submit(HubCommand::DescribeRoom { room_code, reply })?;
        response.await.map_err(|_| TicksError::HubUnavailable)
    }

    pub async fn create_room(&self, description: Option<String>) -> Result<RoomSummary> {
        let (reply, response) = oneshot::channel();
        self.submit(HubCommand::CreateRoom { description, reply })?;
        response.await.map_err(|_| TicksError::HubUnavailable)
    }

    fn submit(&self, command: HubCommand) -> Result<()> {
        self.commands.send(command).map_err(|_| TicksError::HubUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::clock::ManualClock;
    use crate::presence::room::HAND_UP;
    use crate::presence::signaling::ServerEvent;
    use crate::presence::snapshot::{LearnerView, TutorView};
    use chrono::Duration;

    struct Harness {
        hub: PresenceHub,
        clock: Arc<ManualClock>,
    }

    struct Conn {
        id: ConnectionId,
        rx: mpsc::UnboundedReceiver<ServerEvent>,
    }

    impl Conn {
        fn drain(&mut self) -> Vec<ServerEvent> {
            let mut events = Vec::new();
            while let Ok(event) = self.rx.try_recv() {
                events.push(event);
            }
            events
        }

        fn last_tutor_view(&mut self) -> TutorView {
            self.drain()
                .into_iter()
                .filter_map(|e| match e {
                    ServerEvent::RefreshTutor(view) => Some(view),
                    _ => None,
                })
                .last()
                .expect("no refresh-tutor received")
        }

        fn last_learner_view(&mut self) -> LearnerView {
            self.drain()
                .into_iter()
                .filter_map(|e| match e {
                    ServerEvent::RefreshLearner(view) => Some(view),
                    _ => None,
                })
                .last()
                .expect("no refresh-learner received")
        }
    }

    impl Harness {
        fn new() -> Self {
            let clock = Arc::new(ManualClock::default());
            let hub = PresenceHub::with_store(
                MemoryRoomStore::new(),
                clock.clone(),
                PresencePolicy::default(),
                DiagnosticLog::disabled(),
            );
            Self { hub, clock }
        }

        fn connect(&mut self) -> Conn {
            let id = ConnectionId::next();
            let (tx, rx) = mpsc::unbounded_channel();
            self.hub.connect(id, tx);
            Conn { id, rx }
        }

        fn send(&mut self, conn: &Conn, event: serde_json::Value) {
            let event = ClientEvent::parse(&event.to_string()).unwrap();
            self.hub.handle_event(conn.id, event);
        }

        fn tutor(&mut self, room: &str) -> Conn {
            let conn = self.connect();
            self.send(&conn, serde_json::json!({"type": "join-as-tutor", "roomCode": room}));
            conn
        }

        fn learner(&mut self, room: &str, client: &str, name: &str) -> Conn {
            let conn = self.connect();
            self.send(&conn, serde_json::json!({"type": "join-as-learner", "roomCode": room, "clientId": client}));
            self.send(&conn, serde_json::json!({"type": "status", "room": room, "clientId": client, "name": name}));
            conn
        }

        fn status(&mut self, conn: &Conn, room: &str, client: &str, status: &str) {
            self.send(conn, serde_json::json!({"type": "status", "room": room, "clientId": client, "status": status}));
        }
    }

    fn rank(view: &TutorView, client: &str) -> Option<u32> {
        view.learners
            .iter()
            .find(|l| l.client_id.as_str() == client)
            .and_then(|l| l.hand_up_rank)
    }

    #[test]
    fn test_hand_up_scenario_ranks_and_beeps_once() {
        let mut h = Harness::new();
        let mut tutor = h.tutor("xyz");
        let l1 = h.learner("xyz", "c1", "Ada");
        tutor.drain();

        h.status(&l1, "xyz", "c1", HAND_UP);
        let view = tutor.last_tutor_view();
        assert_eq!(view.learners.len(), 1);
        assert_eq!(view.learners[0].name, "Ada");
        assert_eq!(rank(&view, "c1"), Some(1));
        assert!(view.beep_fired);

        let l2 = h.learner("xyz", "c2", "Bea");
        let view = tutor.last_tutor_view();
        assert!(!view.beep_fired);

        h.status(&l2, "xyz", "c2", HAND_UP);
        let view = tutor.last_tutor_view();
        assert_eq!(rank(&view, "c1"), Some(1));
        assert_eq!(rank(&view, "c2"), Some(2));
        assert!(view.beep_fired);
    }

    #[test]
    fn test_repeated_hand_up_does_not_rerank_or_beep() {
        let mut h = Harness::new();
        let mut tutor = h.tutor("xyz");
        let l1 = h.learner("xyz", "c1", "Ada");
        let l2 = h.learner("xyz", "c2", "Bea");
        h.status(&l1, "xyz", "c1", HAND_UP);
        h.status(&l2, "xyz", "c2", HAND_UP);
        tutor.drain();

        h.status(&l1, "xyz", "c1", HAND_UP);
        let view = tutor.last_tutor_view();
        assert_eq!(rank(&view, "c1"), Some(1));
        assert_eq!(rank(&view, "c2"), Some(2));
        assert!(!view.beep_fired);
    }

    #[test]
    fn test_lowered_hand_gets_new_rank_on_re_raise() {
        let mut h = Harness::new();
        let mut tutor = h.tutor("xyz");
        let l1 = h.learner("xyz", "c1", "Ada");
        let l2 = h.learner("xyz", "c2", "Bea");
        h.status(&l1, "xyz", "c1", HAND_UP);
        h.status(&l2, "xyz", "c2", HAND_UP);

        h.status(&l1, "xyz", "c1", "");
        assert_eq!(rank(&tutor.last_tutor_view(), "c1"), None);

        h.status(&l1, "xyz", "c1", HAND_UP);
        assert_eq!(rank(&tutor.last_tutor_view(), "c1"), Some(3));
    }

    #[test]
    fn test_clear_resets_learners_and_signals_learner_channel() {
        let mut h = Harness::new();
        let mut tutor = h.tutor("abc");
        let mut l1 = h.learner("abc", "c1", "Ada");
        h.send(&l1, serde_json::json!({"type": "status", "room": "abc", "clientId": "c1", "status": HAND_UP, "answer": "42"}));
        l1.drain();

        h.send(&tutor, serde_json::json!({"type": "clear", "roomCode": "ABC"}));

        assert_eq!(l1.drain(), vec![ServerEvent::Clear]);
        let view = tutor.last_tutor_view();
        assert_eq!(view.learners.len(), 1);
        assert_eq!(view.learners[0].status, "");
        assert_eq!(view.learners[0].answer, "");
        assert_eq!(view.learners[0].hand_up_rank, None);
    }

    #[test]
    fn test_room_codes_are_case_insensitive() {
        let mut h = Harness::new();
        let mut tutor = h.tutor("abc");
        h.learner("ABC", "c1", "Ada");
        h.learner("aBc", "c2", "Bea");

        let view = tutor.last_tutor_view();
        assert_eq!(view.room_code.as_str(), "ABC");
        assert_eq!(view.learners.len(), 2);
    }

    #[test]
    fn test_unnamed_learner_hidden_until_named() {
        let mut h = Harness::new();
        let mut tutor = h.tutor("abc");
        h.learner("abc", "c1", "bob");
        let anon = h.connect();
        h.send(&anon, serde_json::json!({"type": "join-as-learner", "roomCode": "abc", "clientId": "c2"}));

        let view = tutor.last_tutor_view();
        assert_eq!(view.learners.len(), 1);
        assert!(h.hub.registry().rooms()[0].learners.len() == 2);

        h.send(&anon, serde_json::json!({"type": "ping-from-learner", "room": "abc", "clientId": "c2", "name": "Alice"}));
        let names: Vec<String> = tutor.last_tutor_view().learners.into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["Alice", "bob"]);
    }

    #[test]
    fn test_learner_view_sent_to_requester_only() {
        let mut h = Harness::new();
        let mut l1 = h.learner("abc", "c1", "Ada");
        let mut l2 = h.learner("abc", "c2", "Bea");
        l1.drain();
        l2.drain();

        h.send(&l1, serde_json::json!({"type": "ping-from-learner", "room": "abc", "clientId": "c1"}));
        let view = l1.last_learner_view();
        assert_eq!(view.name, "Ada");
        assert_eq!(view.client_id.as_str(), "c1");
        assert!(l2.drain().is_empty());
    }

    #[test]
    fn test_join_as_learner_rebinds_away_from_tutor_channel() {
        let mut h = Harness::new();
        let conn = h.connect();
        h.hub.router.bind_as_tutor(conn.id, &RoomCode::parse("abc").unwrap());
        let mut conn = conn;
        h.send(&conn, serde_json::json!({"type": "join-as-learner", "roomCode": "abc", "clientId": "c1"}));

        // The learner binding replaced the tutor binding before the tutor push.
        let events = conn.drain();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ServerEvent::RefreshLearner(_)));
    }

    #[test]
    fn test_kick_learner_and_kick_all() {
        let mut h = Harness::new();
        let mut tutor = h.tutor("abc");
        h.learner("abc", "c1", "Ada");
        h.learner("abc", "c2", "Bea");
        h.learner("abc", "c3", "Cy");

        h.send(&tutor, serde_json::json!({"type": "kick-learner", "roomCode": "abc", "clientId": "c2"}));
        let ids: Vec<String> = tutor
            .last_tutor_view()
            .learners
            .into_iter()
            .map(|l| l.client_id.to_string())
            .collect();
        assert_eq!(ids, vec!["c1", "c3"]);

        h.send(&tutor, serde_json::json!({"type": "kick-all-learners", "roomCode": "abc"}));
        assert!(tutor.last_tutor_view().learners.is_empty());

        let code = RoomCode::parse("abc").unwrap();
        assert!(h.hub.registry().contains(&code));
        assert_eq!(h.hub.room_summary(&code).unwrap().learner_count, 0);
    }

    #[test]
    fn test_silent_learners_go_inactive_then_disappear() {
        let mut h = Harness::new();
        let mut tutor = h.tutor("abc");
        h.learner("abc", "c1", "Ada");
        let l2 = h.learner("abc", "c2", "Bea");

        h.clock.advance(Duration::minutes(3));
        h.send(&l2, serde_json::json!({"type": "ping-from-learner", "room": "abc", "clientId": "c2"}));
        let view = tutor.last_tutor_view();
        let ada = view.learners.iter().find(|l| l.name == "Ada").unwrap();
        let bea = view.learners.iter().find(|l| l.name == "Bea").unwrap();
        assert!(!ada.is_active);
        assert!(bea.is_active);

        h.clock.advance(Duration::minutes(2));
        h.send(&tutor, serde_json::json!({"type": "ping-from-tutor", "roomCode": "abc"}));
        let view = tutor.last_tutor_view();
        assert_eq!(view.learners.len(), 1);
        assert_eq!(view.learners[0].name, "Bea");
    }

    #[test]
    fn test_tutor_moving_rooms_stops_old_broadcasts() {
        let mut h = Harness::new();
        let mut tutor = h.tutor("abc");
        h.send(&tutor, serde_json::json!({"type": "ping-from-tutor", "roomCode": "def"}));
        tutor.drain();

        h.learner("abc", "c1", "Ada");
        assert!(tutor.drain().is_empty());
    }

    #[test]
    fn test_disconnect_releases_connection() {
        let mut h = Harness::new();
        let tutor = h.tutor("abc");
        h.hub.disconnect(tutor.id);
        assert!(h.hub.router().channel_of(tutor.id).is_none());

        // Broadcasting to the room no longer touches the dropped connection.
        h.learner("abc", "c1", "Ada");
    }

    #[test]
    fn test_answer_is_sanitized() {
        let mut h = Harness::new();
        let mut tutor = h.tutor("abc");
        let l1 = h.learner("abc", "c1", "Ada");
        h.send(&l1, serde_json::json!({"type": "status", "room": "abc", "clientId": "c1", "answer": " x = 4! "}));

        let view = tutor.last_tutor_view();
        assert_eq!(view.learners[0].answer, "x  4");
        assert_eq!(view.learners[0].status, "");
    }

    #[test]
    fn test_room_summaries_and_create_room() {
        let mut h = Harness::new();
        h.learner("abc", "c1", "Ada");
        let created = h.hub.create_room(Some("Algebra".into()));
        assert_eq!(created.description, "Algebra");
        assert_eq!(created.learner_count, 0);

        let summaries = h.hub.room_summaries();
        assert_eq!(summaries.len(), 2);
        let abc = summaries.iter().find(|s| s.room_code.as_str() == "ABC").unwrap();
        assert_eq!(abc.learner_count, 1);

        assert!(h.hub.room_summary(&RoomCode::parse("nope").unwrap()).is_none());
        assert!(!h.hub.registry().contains(&RoomCode::parse("nope").unwrap()));
    }

    #[tokio::test]
    async fn test_spawned_hub_serves_handle_requests() {
        let hub = PresenceHub::new(PresencePolicy::default(), DiagnosticLog::disabled());
        let handle = hub.spawn();

        let connection = ConnectionId::next();
        let (tx, mut rx) = mpsc::unbounded_channel();
        handle.connect(connection, tx).unwrap();
        handle
            .dispatch(connection, ClientEvent::JoinAsTutor { room_code: RoomCode::parse("abc").unwrap() })
            .unwrap();

        match rx.recv().await {
            Some(ServerEvent::RefreshTutor(view)) => assert_eq!(view.room_code.as_str(), "ABC"),
            other => panic!("unexpected {other:?}"),
        }

        let rooms = handle.list_rooms().await.unwrap();
        assert_eq!(rooms.len(), 1);

        let created = handle.create_room(None).await.unwrap();
        let described = handle.describe_room(created.room_code.clone()).await.unwrap();
        assert_eq!(described.map(|s| s.room_code), Some(created.room_code));
    }
}
