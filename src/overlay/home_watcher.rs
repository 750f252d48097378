//! Home gesture watcher.
//!
//! Overlay windows receive no lifecycle callbacks when the user leaves via
//! the home gesture, so a background thread polls the host's home signal
//! and posts a dismiss command onto the overlay's command queue. The thread
//! never touches overlay state itself.

use super::host::{DismissReason, OverlayCommandSender, SessionId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Edge-triggered home signal: `true` once per press since the last poll.
pub trait HomeSignalSource: Send + Sync {
    fn poll_home_pressed(&self) -> bool;
}

pub struct HomeWatcher {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl HomeWatcher {
    pub fn start(
        source: Arc<dyn HomeSignalSource>,
        session: SessionId,
        commands: OverlayCommandSender,
        interval: Duration,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);

        let handle = thread::spawn(move || {
            Self::run_poll_loop(source, session, commands, running_clone, interval);
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    fn run_poll_loop(
        source: Arc<dyn HomeSignalSource>,
        session: SessionId,
        commands: OverlayCommandSender,
        running: Arc<AtomicBool>,
        interval: Duration,
    ) {
        while running.load(Ordering::SeqCst) {
            if source.poll_home_pressed() {
                if !running.load(Ordering::SeqCst) {
                    debug!(%session, "home gesture after stop, not posting");
                    break;
                }
                debug!(%session, "home gesture detected");
                commands.dismiss(session, DismissReason::Home);
                break;
            }
            thread::park_timeout(interval);
        }
    }

    /// Stop polling and wait for the thread to exit, so a press after this
    /// returns is left for whoever polls next. A command posted before the
    /// stop is dropped by the host because its session is gone.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                warn!("home watcher thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for HomeWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::FakeHomeSource;
    use super::*;
    use crate::overlay::host::OverlayCommand;
    use std::sync::mpsc;

    #[test]
    fn press_posts_one_dismiss() {
        let source = Arc::new(FakeHomeSource::default());
        let (tx, rx) = mpsc::channel();
        let session = SessionId::new();
        let mut watcher = HomeWatcher::start(
            source.clone(),
            session,
            OverlayCommandSender::new(tx),
            Duration::from_millis(5),
        );

        source.press();
        let command = rx
            .recv_timeout(Duration::from_secs(2))
            .expect("dismiss command");
        assert_eq!(
            command,
            OverlayCommand::Dismiss {
                session,
                reason: DismissReason::Home
            }
        );

        source.press();
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        watcher.stop();
    }

    #[test]
    fn stop_clears_running_flag() {
        let (tx, rx) = mpsc::channel();
        let source = Arc::new(FakeHomeSource::default());
        let mut watcher = HomeWatcher::start(
            source.clone(),
            SessionId::new(),
            OverlayCommandSender::new(tx),
            Duration::from_millis(5),
        );
        assert!(watcher.is_running());
        watcher.stop();
        assert!(!watcher.is_running());

        source.press();
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn stopped_watcher_leaves_press_for_next_session() {
        let (tx, rx) = mpsc::channel();
        let source = Arc::new(FakeHomeSource::default());
        let mut old = HomeWatcher::start(
            source.clone(),
            SessionId::new(),
            OverlayCommandSender::new(tx.clone()),
            Duration::from_secs(60),
        );
        old.stop();

        source.press();
        let next = SessionId::new();
        let mut watcher = HomeWatcher::start(
            source.clone(),
            next,
            OverlayCommandSender::new(tx),
            Duration::from_millis(5),
        );
        let command = rx
            .recv_timeout(Duration::from_secs(2))
            .expect("dismiss command");
        assert_eq!(
            command,
            OverlayCommand::Dismiss {
                session: next,
                reason: DismissReason::Home
            }
        );
        watcher.stop();
    }
}
