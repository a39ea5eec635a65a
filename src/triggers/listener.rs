//! Global key listener feeding the trigger matcher.
//!
//! On Windows the letter keys are polled with `GetAsyncKeyState`, so trigger
//! words work while the game has focus. Elsewhere lines typed on stdin are
//! fed through the matcher instead.

use anyhow::{Context, Result};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::info;

use super::matcher::{TriggerAction, TriggerMatcher};

/// Spawns the listener thread. It exits once the receiving side is dropped
/// and the next trigger fires.
pub fn spawn_listener(
    start: &str,
    reset: &str,
    actions: Sender<TriggerAction>,
) -> Result<JoinHandle<()>> {
    let matcher = TriggerMatcher::new(start, reset);
    info!(start, reset, "Listening for trigger words");

    thread::Builder::new()
        .name("trigger-listener".to_string())
        .spawn(move || run(matcher, actions))
        .context("Failed to spawn trigger listener")
}

/// Forwards a recognized action. Returns false when nobody listens anymore.
fn dispatch(
    matcher: &mut TriggerMatcher,
    key: char,
    now: Instant,
    actions: &Sender<TriggerAction>,
) -> bool {
    match matcher.push(key, now) {
        Some(action) => {
            info!(?action, "Trigger detected");
            actions.send(action).is_ok()
        }
        None => true,
    }
}

#[cfg(windows)]
fn run(mut matcher: TriggerMatcher, actions: Sender<TriggerAction>) {
    use std::time::Duration;
    use windows::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;

    const POLL: Duration = Duration::from_millis(15);
    let mut was_down = [false; 26];

    loop {
        for (i, down_before) in was_down.iter_mut().enumerate() {
            let vk = b'A' as i32 + i as i32;
            // High bit set means the key is currently held.
            let down = unsafe { GetAsyncKeyState(vk) } as u16 & 0x8000 != 0;
            if down && !*down_before {
                let key = (b'a' + i as u8) as char;
                if !dispatch(&mut matcher, key, Instant::now(), &actions) {
                    info!("Trigger listener stopped");
                    return;
                }
            }
            *down_before = down;
        }
        thread::sleep(POLL);
    }
}

#[cfg(not(windows))]
fn run(mut matcher: TriggerMatcher, actions: Sender<TriggerAction>) {
    use std::io::BufRead;
    use tracing::warn;

    info!("Type trigger words on stdin and press Enter");
    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to read stdin");
                break;
            }
        };
        let now = Instant::now();
        for key in line.chars() {
            if !dispatch(&mut matcher, key, now, &actions) {
                info!("Trigger listener stopped");
                return;
            }
        }
    }
    info!("stdin closed, trigger listener stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn test_dispatch_forwards_actions() {
        let (tx, rx) = channel();
        let mut matcher = TriggerMatcher::new("ccc", "rrr");
        let now = Instant::now();
        for key in "xccc".chars() {
            assert!(dispatch(&mut matcher, key, now, &tx));
        }
        assert_eq!(rx.try_recv().unwrap(), TriggerAction::Start);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dispatch_reports_closed_channel() {
        let (tx, rx) = channel();
        drop(rx);
        let mut matcher = TriggerMatcher::new("ccc", "rrr");
        let now = Instant::now();
        assert!(dispatch(&mut matcher, 'c', now, &tx));
        assert!(dispatch(&mut matcher, 'c', now, &tx));
        assert!(!dispatch(&mut matcher, 'c', now, &tx));
    }
}
