//! Room presence and synchronization engine.

mod broadcaster;
mod channels;
mod clock;
mod hub;
mod ranking;
mod registry;
mod room;
mod signaling;
mod snapshot;
mod tidy;

pub use broadcaster::{Outbox, SyncBroadcaster};
pub use channels::{Channel, ChannelRouter, ConnectionId};
pub use clock::{Clock, ManualClock, SystemClock};
pub use hub::{HubCommand, HubHandle, PresenceHub};
pub use ranking::{apply_status, next_hand_up_rank};
pub use registry::{generate_room_code, MemoryRoomStore, RoomRegistry, RoomStore};
pub use room::{sanitize_answer, ClientId, Learner, Room, RoomCode, HAND_UP};
pub use signaling::{ClientEvent, ServerEvent};
pub use snapshot::{
    learner_view, room_summary, status_counts, tutor_view, LearnerEntry, LearnerView, RoomSummary,
    TutorView,
};
pub use tidy::{tidy, PresencePolicy};
