use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

use crate::shutdown::{ShutdownSignal, StopReason};

/// Watch the keyboard for Esc, `q` or Ctrl+C and trigger `shutdown` when one is pressed.
pub fn spawn_keyboard_monitor(shutdown: Arc<ShutdownSignal>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("keyboard-monitor".to_string())
        .spawn(move || {
            while !shutdown.is_shutdown() {
                // Short poll timeout so a shutdown from elsewhere ends the thread
                if event::poll(Duration::from_millis(100)).unwrap_or(false)
                    && let Ok(Event::Key(key_event)) = event::read()
                    && is_quit_key(&key_event)
                {
                    debug!("Quit key pressed: {:?}", key_event.code);
                    shutdown.trigger(StopReason::QuitKey);
                }
            }
        })
}

fn is_quit_key(event: &KeyEvent) -> bool {
    match event.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => true,
        KeyCode::Char('c') => event.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}
