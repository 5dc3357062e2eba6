use super::room::{ClientId, Room, HAND_UP};

/// Next free queue position in `room`: one past the highest rank currently
/// held, or 1 when no hand is up.
pub fn next_hand_up_rank(room: &Room) -> u32 {
    room.learners
        .values()
        .map(|learner| learner.hand_up_rank.unwrap_or(0))
        .max()
        .unwrap_or(0)
        + 1
}

/// Sets a learner's status, maintaining its hand-up rank.
///
/// A transition into [`HAND_UP`] takes the next rank and arms the room's beep.
/// Re-sending [`HAND_UP`] while the hand is already up changes nothing, so
/// retries cannot reorder the queue. Any other status drops the rank.
///
/// Returns the rank assigned by this call, if any. Unknown learners are left
/// alone.
pub fn apply_status(room: &mut Room, client_id: &ClientId, status: &str) -> Option<u32> {
    let was_hand_up = room.learners.get(client_id)?.has_hand_up();
    let raising = status == HAND_UP && !was_hand_up;
    let rank = raising.then(|| next_hand_up_rank(room));

    let learner = room.learners.get_mut(client_id)?;
    learner.status = status.to_string();
    if raising {
        learner.hand_up_rank = rank;
        room.beep_pending = true;
    } else if status != HAND_UP {
        learner.hand_up_rank = None;
    }

    debug_assert!(
        rank.map_or(true, |r| {
            room.learners.values().filter(|l| l.hand_up_rank == Some(r)).count() == 1
        }),
        "hand-up rank assigned twice in room {}",
        room.code
    );

    if let Some(rank) = rank {
        tracing::debug!(room_code = %room.code, client_id = %client_id, rank, "Hand raised");
    }

    rank
}
