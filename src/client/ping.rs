use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::session::EventSender;
use crate::presence::ClientEvent;

/// Learners re-announce themselves once a minute.
pub const LEARNER_PING_INTERVAL: Duration = Duration::from_secs(60);

/// Tutors refresh their view every fifteen seconds.
pub const TUTOR_PING_INTERVAL: Duration = Duration::from_secs(15);

/// Background task that re-sends one event on a fixed period.
///
/// The first ping goes out one period after start. [`nudge`](Self::nudge)
/// sends immediately, for a client returning from the background. The task
/// ends on [`cancel`](Self::cancel), on drop, or once the session closes.
pub struct PingSchedule {
    nudge: Arc<Notify>,
    task: JoinHandle<()>,
}

impl PingSchedule {
    pub fn start(sender: EventSender, event: ClientEvent, period: Duration) -> Self {
        let nudge = Arc::new(Notify::new());
        let notified = nudge.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = notified.notified() => ticker.reset(),
                }

                if sender.send(event.clone()).is_err() {
                    tracing::debug!(event = event.kind(), "Session closed, stopping pings");
                    break;
                }
            }
        });

        Self { nudge, task }
    }

    pub fn nudge(&self) {
        self.nudge.notify_one();
    }

    pub fn cancel(self) {
        drop(self);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PingSchedule {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::RoomCode;
    use tokio::sync::mpsc;
    use tokio::time::{sleep, timeout};

    fn tutor_ping() -> ClientEvent {
        ClientEvent::PingFromTutor {
            room_code: RoomCode::parse("abc").unwrap(),
        }
    }

    #[tokio::test]
    async fn test_pings_repeat_on_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _schedule = PingSchedule::start(EventSender::new(tx), tutor_ping(), Duration::from_millis(30));

        for _ in 0..3 {
            let event = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
            assert_eq!(event, tutor_ping());
        }
    }

    #[tokio::test]
    async fn test_nudge_sends_immediately() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let schedule = PingSchedule::start(EventSender::new(tx), tutor_ping(), Duration::from_secs(3600));

        schedule.nudge();
        let event = timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert_eq!(event, Some(tutor_ping()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancel_stops_pings() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let schedule = PingSchedule::start(EventSender::new(tx), tutor_ping(), Duration::from_millis(20));
        schedule.cancel();

        sleep(Duration::from_millis(80)).await;
        // The aborted task dropped the only sender.
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_schedule_ends_when_session_closes() {
        let (tx, rx) = mpsc::unbounded_channel();
        let schedule = PingSchedule::start(EventSender::new(tx), tutor_ping(), Duration::from_millis(10));
        drop(rx);

        timeout(Duration::from_secs(1), async {
            while !schedule.is_finished() {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }
}
