use serde::Serialize;
use tracing::debug;

/// Where the capture-and-translate service is in one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    Idle,
    ScreenCircling,
    ScreenCircled,
    ScreenCapturing,
    TextRecognizing,
    TextTranslating,
    ResultDisplaying,
    ErrorDisplaying,
}

impl FlowState {
    fn allowed_next(self) -> &'static [FlowState] {
        use FlowState::*;
        match self {
            Idle => &[ScreenCircling],
            ScreenCircling => &[Idle, ScreenCircled],
            ScreenCircled => &[Idle, ScreenCapturing],
            ScreenCapturing => &[TextRecognizing, ErrorDisplaying],
            TextRecognizing => &[TextTranslating, ErrorDisplaying],
            TextTranslating => &[ResultDisplaying, ErrorDisplaying],
            ResultDisplaying => &[Idle],
            ErrorDisplaying => &[Idle],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot change flow state from {from:?} to {to:?}")]
pub struct FlowError {
    pub from: FlowState,
    pub to: FlowState,
}

#[derive(Debug)]
pub struct TranslationFlow {
    state: FlowState,
}

impl TranslationFlow {
    pub fn new() -> Self {
        Self {
            state: FlowState::Idle,
        }
    }

    pub fn current(&self) -> FlowState {
        self.state
    }

    pub fn change(&mut self, to: FlowState) -> Result<(), FlowError> {
        if self.state.allowed_next().contains(&to) {
            debug!(from = ?self.state, ?to, "flow state changed");
            self.state = to;
            Ok(())
        } else {
            Err(FlowError {
                from: self.state,
                to,
            })
        }
    }

    pub fn reset(&mut self) {
        self.state = FlowState::Idle;
    }
}

impl Default for TranslationFlow {
    fn default() -> Self {
        Self::new()
    }
}
