use super::home_watcher::{HomeSignalSource, HomeWatcher, DEFAULT_POLL_INTERVAL};
use super::surface::{ActionOutcome, FloatingSurface, SurfaceLayout, UserAction};
use serde::Serialize;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DismissReason {
    Close,
    Back,
    Home,
}

/// Work for the UI context. Everything that mutates the overlay from
/// outside the UI context goes through this queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayCommand {
    Dismiss {
        session: SessionId,
        reason: DismissReason,
    },
    UserAction {
        session: SessionId,
        action: UserAction,
    },
}

#[derive(Debug, Clone)]
pub struct OverlayCommandSender {
    tx: Sender<OverlayCommand>,
}

impl OverlayCommandSender {
    pub fn new(tx: Sender<OverlayCommand>) -> Self {
        Self { tx }
    }

    pub fn dismiss(&self, session: SessionId, reason: DismissReason) {
        self.post(OverlayCommand::Dismiss { session, reason });
    }

    pub fn user_action(&self, session: SessionId, action: UserAction) {
        self.post(OverlayCommand::UserAction { session, action });
    }

    fn post(&self, command: OverlayCommand) {
        if self.tx.send(command).is_err() {
            debug!("overlay host gone, dropping command");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewHandle(pub u64);

#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    #[error("an overlay session is already attached")]
    AlreadyAttached,
    #[error("no overlay session is attached")]
    NotAttached,
    #[error("window manager refused the overlay: {0}")]
    Display(String),
}

/// The host's window manager.
pub trait WindowManager: Send {
    fn add_view(&mut self, layout: SurfaceLayout) -> Result<ViewHandle, OverlayError>;

    fn remove_view(&mut self, view: ViewHandle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackDisposition {
    Consumed,
    NotHandled,
}

pub struct OverlaySession {
    surface: Box<dyn FloatingSurface>,
    input_focusable: bool,
}

impl OverlaySession {
    pub fn new(surface: Box<dyn FloatingSurface>) -> Self {
        let input_focusable = surface.layout().focusable;
        Self {
            surface,
            input_focusable,
        }
    }

    pub fn input_focusable(&self) -> bool {
        self.input_focusable
    }
}

struct AttachedSession {
    id: SessionId,
    session: OverlaySession,
    view: ViewHandle,
    home_watcher: Option<HomeWatcher>,
}

/// Owns at most one floating overlay and its dismissal hooks.
///
/// Lives on the UI context. Background threads only reach it through
/// [`OverlayCommandSender`]; the UI loop drains the queue with
/// [`OverlayHost::process_pending`].
pub struct OverlayHost {
    window_manager: Box<dyn WindowManager>,
    home_source: Arc<dyn HomeSignalSource>,
    poll_interval: Duration,
    attached: Option<AttachedSession>,
    commands_tx: Sender<OverlayCommand>,
    commands_rx: Receiver<OverlayCommand>,
}

impl OverlayHost {
    pub fn new(
        window_manager: Box<dyn WindowManager>,
        home_source: Arc<dyn HomeSignalSource>,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel();
        Self {
            window_manager,
            home_source,
            poll_interval: DEFAULT_POLL_INTERVAL,
            attached: None,
            commands_tx,
            commands_rx,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn command_sender(&self) -> OverlayCommandSender {
        OverlayCommandSender::new(self.commands_tx.clone())
    }

    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.attached.as_ref().map(|attached| attached.id)
    }

    pub fn surface_mut(&mut self) -> Option<&mut (dyn FloatingSurface + 'static)> {
        self.attached
            .as_mut()
            .map(|attached| attached.session.surface.as_mut())
    }

    /// A rejected session is released before the error is returned.
    pub fn attach(&mut self, session: OverlaySession) -> Result<SessionId, OverlayError> {
        let mut session = session;
        if self.attached.is_some() {
            session.surface.release();
            return Err(OverlayError::AlreadyAttached);
        }

        let layout = session.surface.layout();
        let view = match self.window_manager.add_view(layout) {
            Ok(view) => view,
            Err(err) => {
                session.surface.release();
                return Err(err);
            }
        };

        let id = SessionId::new();
        let home_watcher = HomeWatcher::start(
            Arc::clone(&self.home_source),
            id,
            self.command_sender(),
            self.poll_interval,
        );
        info!(session = %id, kind = ?session.surface.kind(), focusable = session.input_focusable, "overlay attached");

        self.attached = Some(AttachedSession {
            id,
            session,
            view,
            home_watcher: Some(home_watcher),
        });
        Ok(id)
    }

    /// Tear down the attached overlay. Returns `false` when nothing was
    /// attached; calling it again after a detach changes nothing.
    pub fn detach(&mut self) -> bool {
        let Some(mut attached) = self.attached.take() else {
            return false;
        };

        if let Some(mut watcher) = attached.home_watcher.take() {
            watcher.stop();
        }
        self.window_manager.remove_view(attached.view);
        attached.session.surface.release();

        info!(session = %attached.id, "overlay detached");
        true
    }

    /// Back signal from the host. Consumed while an overlay is attached.
    pub fn on_back_pressed(&mut self) -> BackDisposition {
        match self.attached.as_ref() {
            Some(attached) => {
                debug!(session = %attached.id, reason = ?DismissReason::Back, "dismissing overlay");
                self.detach();
                BackDisposition::Consumed
            }
            None => BackDisposition::NotHandled,
        }
    }

    pub fn handle_user_action(&mut self, action: UserAction) -> Result<ActionOutcome, OverlayError> {
        let attached = self.attached.as_mut().ok_or(OverlayError::NotAttached)?;
        let outcome = attached.session.surface.on_user_action(action);
        if outcome == ActionOutcome::Dismiss {
            debug!(session = %attached.id, reason = ?DismissReason::Close, "dismissing overlay");
            self.detach();
        }
        Ok(outcome)
    }

    /// Drain the command queue. Commands addressed to a session that is no
    /// longer attached are dropped. Returns how many were applied.
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(command) = self.commands_rx.try_recv() {
            if self.apply(command) {
                applied += 1;
            }
        }
        applied
    }

    fn apply(&mut self, command: OverlayCommand) -> bool {
        let current = self.session_id();
        match command {
            OverlayCommand::Dismiss { session, reason } if Some(session) == current => {
                debug!(%session, ?reason, "dismissing overlay");
                self.detach()
            }
            OverlayCommand::UserAction { session, action } if Some(session) == current => {
                match self.handle_user_action(action) {
                    Ok(_) => true,
                    Err(err) => {
                        warn!(%err, "user action failed");
                        false
                    }
                }
            }
            stale => {
                debug!(?stale, "dropping command for inactive session");
                false
            }
        }
    }
}

impl Drop for OverlayHost {
    fn drop(&mut self) {
        self.detach();
    }
}
