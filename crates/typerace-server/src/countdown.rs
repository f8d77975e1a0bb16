use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::RaceConfig;
use crate::state::SharedRoomManager;

/// Per-room start sequence: `Idle → Counting(n) → Typing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownPhase {
    Idle,
    Counting(u32),
    Typing,
}

/// What a single tick asks the room to broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownSignal {
    Count(u32),
    StartTyping,
}

impl CountdownPhase {
    /// Advance by one tick: emit the current count, then decrement. Once the
    /// count would drop below zero the start signal follows and the phase
    /// becomes `Typing`.
    pub fn advance(self) -> (Vec<CountdownSignal>, CountdownPhase) {
        match self {
            Self::Counting(0) => (
                vec![CountdownSignal::Count(0), CountdownSignal::StartTyping],
                Self::Typing,
            ),
            Self::Counting(n) => (vec![CountdownSignal::Count(n)], Self::Counting(n - 1)),
            Self::Idle | Self::Typing => (Vec::new(), self),
        }
    }
}

/// Timing parameters for one countdown run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownTiming {
    pub count_from: u32,
    pub tick: Duration,
    /// Delay between the start signal and the final results. `None` skips
    /// final results.
    pub test_duration: Option<Duration>,
}

impl Default for CountdownTiming {
    fn default() -> Self {
        Self {
            count_from: 3,
            tick: Duration::from_secs(1),
            test_duration: Some(Duration::from_secs(60)),
        }
    }
}

impl From<&RaceConfig> for CountdownTiming {
    fn from(race: &RaceConfig) -> Self {
        Self {
            count_from: race.countdown_from,
            tick: Duration::from_millis(race.tick_millis),
            test_duration: (race.test_duration_secs > 0)
                .then(|| Duration::from_secs(race.test_duration_secs)),
        }
    }
}

/// Owner-side handle of a running countdown. The room entry holds it;
/// cancelling stops the task before its next broadcast.
#[derive(Debug)]
pub struct CountdownHandle {
    run_id: u64,
    token: CancellationToken,
}

impl CountdownHandle {
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Spawn the countdown task for a room.
pub fn spawn_countdown(
    rooms: SharedRoomManager,
    room_id: String,
    run_id: u64,
    timing: CountdownTiming,
) -> CountdownHandle {
    let token = CancellationToken::new();
    let task_token = token.clone();
    tokio::spawn(async move {
        run_countdown(rooms, room_id, run_id, timing, task_token).await;
    });
    CountdownHandle { run_id, token }
}

async fn run_countdown(
    rooms: SharedRoomManager,
    room_id: String,
    run_id: u64,
    timing: CountdownTiming,
    token: CancellationToken,
) {
    tracing::info!(room_id = %room_id, run_id, from = timing.count_from, "Countdown started");

    let mut phase = CountdownPhase::Counting(timing.count_from);
    let mut interval = tokio::time::interval_at(Instant::now() + timing.tick, timing.tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while phase != CountdownPhase::Typing {
        tokio::select! {
            () = token.cancelled() => {
                tracing::debug!(room_id = %room_id, run_id, "Countdown cancelled");
                return;
            }
            _ = interval.tick() => {}
        }

        let mgr = rooms.read().await;
        // Room may have been deleted or restarted between ticks.
        if token.is_cancelled() || !mgr.countdown_is_current(&room_id, run_id) {
            return;
        }
        let (signals, next) = phase.advance();
        for signal in signals {
            mgr.emit_countdown_signal(&room_id, signal);
        }
        phase = next;
    }

    if let Some(duration) = timing.test_duration {
        tokio::select! {
            () = token.cancelled() => {
                tracing::debug!(room_id = %room_id, run_id, "Test cancelled before results");
                return;
            }
            () = tokio::time::sleep(duration) => {}
        }

        let mgr = rooms.read().await;
        if token.is_cancelled() || !mgr.countdown_is_current(&room_id, run_id) {
            return;
        }
        mgr.emit_final_results(&room_id);
    }

    rooms.write().await.finish_countdown(&room_id, run_id);
    tracing::info!(room_id = %room_id, run_id, "Countdown finished");
}
