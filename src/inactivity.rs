//! Inactivity monitor: force-expires the session after an idle window, or
//! immediately when the actor lands on the public storefront, and tears the
//! session down silently on host shutdown. One spawned task owns exactly
//! one timer; dropping the monitor aborts the task, so remounting never
//! accumulates timers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::info;

use crate::identity::{SessionStatus, SessionStore};
use crate::routes::{Navigator, LOGIN_PATH, STOREFRONT_PATH};

/// Reason marker the login view keys the inactivity notice on.
pub const EXPIRED_REDIRECT: &str = "/login?session=expired";

pub const DEFAULT_IDLE_WINDOW: Duration = Duration::from_secs(5 * 60);

/// User-activity signal kinds that reset the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    PointerDown,
    PointerMove,
    KeyPress,
    Scroll,
    TouchStart,
    Click,
}

enum Event {
    Activity(Activity),
    Navigated(String),
    Shutdown,
}

pub struct InactivityMonitor {
    tx: mpsc::UnboundedSender<Event>,
    task: JoinHandle<()>,
}

impl InactivityMonitor {
    pub fn spawn(store: SessionStore, nav: Arc<dyn Navigator>, idle_window: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(store, nav, idle_window, rx));
        Self { tx, task }
    }

    /// A qualifying user-input signal; restarts the countdown.
    pub fn record(&self, activity: Activity) {
        let _ = self.tx.send(Event::Activity(activity));
    }

    /// The shell navigated to `path`. Landing on the public storefront with
    /// a live session tears it down immediately, no reason marker.
    pub fn navigated(&self, path: &str) {
        let _ = self.tx.send(Event::Navigated(path.to_string()));
    }

    /// Host lifecycle teardown: destroy the session silently, no redirect.
    /// Explicit and reliable, unlike a browser unload signal.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Event::Shutdown);
    }
}

impl Drop for InactivityMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    store: SessionStore,
    nav: Arc<dyn Navigator>,
    idle_window: Duration,
    mut rx: mpsc::UnboundedReceiver<Event>,
) {
    let mut status_rx = store.subscribe();
    // Armed only while a session is live; an unauthenticated shell must not
    // fire expiries.
    let mut armed = store.read().is_some();
    let mut deadline = Instant::now() + idle_window;

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline), if armed => {
                armed = false;
                store.destroy();
                info!(target: "inactivity", "idle window elapsed, session expired");
                nav.redirect(EXPIRED_REDIRECT);
            }
            ev = rx.recv() => match ev {
                Some(Event::Activity(_)) => {
                    deadline = Instant::now() + idle_window;
                }
                Some(Event::Navigated(path)) => {
                    if path == STOREFRONT_PATH && store.read().is_some() {
                        armed = false;
                        store.destroy();
                        info!(target: "inactivity", "storefront navigation, session torn down");
                        nav.redirect(LOGIN_PATH);
                    }
                }
                Some(Event::Shutdown) => {
                    store.destroy();
                    break;
                }
                None => break,
            },
            changed = status_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                // Login arms a fresh countdown; logout (from anywhere)
                // cancels the pending one.
                match *status_rx.borrow_and_update() {
                    SessionStatus::Authenticated => {
                        armed = true;
                        deadline = Instant::now() + idle_window;
                    }
                    SessionStatus::Loading | SessionStatus::Unauthenticated => {
                        armed = false;
                    }
                }
            }
        }
    }
}
