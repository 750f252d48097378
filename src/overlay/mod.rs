pub mod home_watcher;
pub mod host;
pub mod surface;
pub mod web;

pub use home_watcher::{HomeSignalSource, HomeWatcher};
pub use host::{
    BackDisposition, DismissReason, OverlayCommand, OverlayCommandSender, OverlayError,
    OverlayHost, OverlaySession, SessionId, ViewHandle, WindowManager,
};
pub use surface::{
    ActionOutcome, FloatingSurface, SurfaceContent, SurfaceKind, SurfaceLayout, UserAction,
};
pub use web::{
    AddressFormatter, ContentRenderer, ExternalOpener, OpenError, SurfaceCallback,
    TranslatePageFormatter, WebContentSurface,
};
