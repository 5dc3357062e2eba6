use chrono::{DateTime, Utc};

use super::room::{ClientId, Room};
use crate::error::{Result, TicksError};

/// Silence thresholds, in whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresencePolicy {
    /// Learners silent this long are shown as inactive.
    pub active_minutes: i64,
    /// Learners silent this long are removed.
    pub removal_minutes: i64,
}

impl PresencePolicy {
    pub const DEFAULT_ACTIVE_MINUTES: i64 = 3;
    pub const DEFAULT_REMOVAL_MINUTES: i64 = 5;

    pub fn validate(&self) -> Result<()> {
        if self.active_minutes <= 0 || self.removal_minutes <= 0 {
            return Err(TicksError::InvalidConfiguration(
                "presence timeouts must be positive".to_string(),
            ));
        }
        if self.active_minutes > self.removal_minutes {
            return Err(TicksError::InvalidConfiguration(format!(
                "active timeout ({} min) exceeds removal timeout ({} min)",
                self.active_minutes, self.removal_minutes
            )));
        }
        Ok(())
    }
}

impl Default for PresencePolicy {
    fn default() -> Self {
        Self {
            active_minutes: Self::DEFAULT_ACTIVE_MINUTES,
            removal_minutes: Self::DEFAULT_REMOVAL_MINUTES,
        }
    }
}

/// Recomputes `is_active` for every learner and drops the ones silent past
/// the removal threshold. Returns the removed client ids.
///
/// Elapsed time is truncated to whole minutes, so a learner 4m59s silent is
/// still "4 minutes" and survives a 5 minute removal threshold.
pub fn tidy(room: &mut Room, now: DateTime<Utc>, policy: &PresencePolicy) -> Vec<ClientId> {
    let mut removed = Vec::new();

    room.learners.retain(|client_id, learner| {
        let minutes_silent = (now - learner.last_communication_at).num_minutes();
        if minutes_silent >= policy.removal_minutes {
            removed.push(client_id.clone());
            false
        } else {
            learner.is_active = minutes_silent < policy.active_minutes;
            true
        }
    });

    for client_id in &removed {
        tracing::debug!(room_code = %room.code, client_id = %client_id, "Tidy removed silent learner");
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::room::RoomCode;
    use chrono::Duration;

    fn client(raw: &str) -> ClientId {
        ClientId::parse(raw).unwrap()
    }

    fn room_with_learner_silent_for(silence: Duration) -> (Room, DateTime<Utc>) {
        let now = Utc::now();
        let mut room = Room::new(RoomCode::parse("abc").unwrap(), now);
        room.touch_learner(&client("c1"), now - silence);
        (room, now)
    }

    #[test]
    fn test_recent_learner_is_active() {
        let (mut room, now) = room_with_learner_silent_for(Duration::seconds(30));
        let removed = tidy(&mut room, now, &PresencePolicy::default());
        assert!(removed.is_empty());
        assert!(room.learners[&client("c1")].is_active);
    }

    #[test]
    fn test_learner_past_active_threshold_is_inactive_but_present() {
        let (mut room, now) = room_with_learner_silent_for(Duration::minutes(3));
        tidy(&mut room, now, &PresencePolicy::default());
        assert!(!room.learners[&client("c1")].is_active);
    }

    #[test]
    fn test_truncation_keeps_learner_active_just_under_threshold() {
        let (mut room, now) =
            room_with_learner_silent_for(Duration::minutes(3) - Duration::seconds(1));
        tidy(&mut room, now, &PresencePolicy::default());
        assert!(room.learners[&client("c1")].is_active);
    }

    #[test]
    fn test_learner_past_removal_threshold_is_removed() {
        let (mut room, now) = room_with_learner_silent_for(Duration::minutes(5));
        let removed = tidy(&mut room, now, &PresencePolicy::default());
        assert_eq!(removed, vec![client("c1")]);
        assert!(room.learners.is_empty());
    }

    #[test]
    fn test_truncation_keeps_learner_just_under_removal() {
        let (mut room, now) =
            room_with_learner_silent_for(Duration::minutes(5) - Duration::seconds(1));
        tidy(&mut room, now, &PresencePolicy::default());
        let learner = &room.learners[&client("c1")];
        assert!(!learner.is_active);
    }

    #[test]
    fn test_tidy_is_idempotent() {
        let (mut room, now) = room_with_learner_silent_for(Duration::minutes(4));
        tidy(&mut room, now, &PresencePolicy::default());
        let first = room.learners.clone();
        let removed = tidy(&mut room, now, &PresencePolicy::default());
        assert!(removed.is_empty());
        assert_eq!(room.learners, first);
    }

    #[test]
    fn test_tidy_revives_learner_after_contact() {
        let (mut room, now) = room_with_learner_silent_for(Duration::minutes(4));
        tidy(&mut room, now, &PresencePolicy::default());
        assert!(!room.learners[&client("c1")].is_active);

        room.touch_learner(&client("c1"), now);
        tidy(&mut room, now, &PresencePolicy::default());
        assert!(room.learners[&client("c1")].is_active);
    }

    #[test]
    fn test_policy_validation() {
        assert!(PresencePolicy::default().validate().is_ok());

        let inverted = PresencePolicy { active_minutes: 6, removal_minutes: 5 };
        assert!(matches!(inverted.validate(), Err(TicksError::InvalidConfiguration(_))));

        let zero = PresencePolicy { active_minutes: 0, removal_minutes: 5 };
        assert!(zero.validate().is_err());
    }
}
