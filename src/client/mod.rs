//! WebSocket client for tutor and learner sessions.

mod ping;
mod session;

pub use ping::{PingSchedule, LEARNER_PING_INTERVAL, TUTOR_PING_INTERVAL};
pub use session::{ClientSession, EventSender};
