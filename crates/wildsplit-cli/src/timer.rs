//! Console run timer
//!
//! Keeps real time and load-removed game time, and turns [`TimerActions`] into printable
//! events.

use std::fmt;
use std::time::{Duration, Instant};

use owo_colors::OwoColorize;
use wildsplit_core::TimerActions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    Started,
    Split {
        /// 1-based split number
        number: usize,
        real: Duration,
        game: Duration,
    },
    Finished {
        real: Duration,
        game: Duration,
    },
    Reset,
}

impl fmt::Display for TimerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerEvent::Started => write!(f, "{}", "Run started".green().bold()),
            TimerEvent::Split { number, real, game } => write!(
                f,
                "{} {:>3}  {}  {}",
                "Split".cyan(),
                number,
                format_time(*real),
                format_time(*game).dimmed()
            ),
            TimerEvent::Finished { real, game } => write!(
                f,
                "{}  {}  {}",
                "Finished".green().bold(),
                format_time(*real).bold(),
                format_time(*game)
            ),
            TimerEvent::Reset => write!(f, "{}", "Run reset".yellow()),
        }
    }
}

/// `h:mm:ss.mmm`, hours omitted when zero
pub fn format_time(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    let hours = total_ms / 3_600_000;
    let minutes = total_ms / 60_000 % 60;
    let seconds = total_ms / 1000 % 60;
    let millis = total_ms % 1000;
    if hours > 0 {
        format!("{}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
    } else {
        format!("{}:{:02}.{:03}", minutes, seconds, millis)
    }
}

#[derive(Debug, Default)]
pub struct RunTimer {
    splits: usize,
    started: Option<Instant>,
    last_tick: Option<Instant>,
    game_time: Duration,
    loading: bool,
    completed: usize,
}

impl RunTimer {
    /// Timer for a run of `splits` splits.
    pub fn new(splits: usize) -> Self {
        Self {
            splits,
            ..Default::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some() && self.completed < self.splits.max(1)
    }

    /// Advance the clocks to `now` and apply one tick of actions.
    pub fn apply(&mut self, actions: TimerActions, now: Instant) -> Vec<TimerEvent> {
        let mut events = Vec::new();

        if self.is_running()
            && !self.loading
            && let Some(last) = self.last_tick
        {
            self.game_time += now.saturating_duration_since(last);
        }
        self.last_tick = Some(now);
        self.loading = actions.is_loading;

        if actions.reset && self.started.is_some() {
            self.started = None;
            events.push(TimerEvent::Reset);
        }

        if actions.start {
            self.started = Some(now);
            self.game_time = Duration::ZERO;
            self.completed = 0;
            events.push(TimerEvent::Started);
        }

        if actions.split
            && self.is_running()
            && let Some(started) = self.started
        {
            self.completed += 1;
            let real = now.saturating_duration_since(started);
            let game = self.game_time;
            if self.completed == self.splits {
                events.push(TimerEvent::Finished { real, game });
            } else {
                events.push(TimerEvent::Split {
                    number: self.completed,
                    real,
                    game,
                });
            }
        }

        events
    }
}
