use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    WebContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    OpenExternally,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Handled,
    /// The surface wants the host to detach it.
    Dismiss,
}

/// How the window manager should place the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceLayout {
    /// Steals input focus (needed for text fields and the back signal).
    pub focusable: bool,
    pub fill_screen: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceContent {
    pub text: String,
    pub language: Option<String>,
}

impl SurfaceContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// One kind of floating overlay. The attach/detach lifecycle lives in
/// [`super::OverlayHost`]; a surface only renders and reacts to its own
/// buttons.
pub trait FloatingSurface: Send {
    fn kind(&self) -> SurfaceKind;

    fn layout(&self) -> SurfaceLayout;

    fn render(&mut self, content: &SurfaceContent);

    fn on_user_action(&mut self, action: UserAction) -> ActionOutcome;

    /// Drop renderer resources. Called once by the host on detach.
    fn release(&mut self);
}
