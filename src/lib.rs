//! Live classroom presence: learners signal their status, tutors watch the
//! room update in real time.

pub mod api;
pub mod client;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod presence;

pub use error::{Result, TicksError};
