use super::surface::{
    ActionOutcome, FloatingSurface, SurfaceContent, SurfaceKind, SurfaceLayout, UserAction,
};
use crate::locale::{self, Locale};
use crate::settings::AppSettings;
use tracing::{debug, warn};

const TRANSLATE_PAGE_BASE: &str = "https://translate.google.com/m/translate";

/// Embedded web view the surface renders into.
pub trait ContentRenderer: Send {
    fn load_url(&mut self, url: &str);

    /// Stop loading and drop history/navigation state.
    fn clear(&mut self);
}

#[derive(Debug, thiserror::Error)]
#[error("could not open {url}: {reason}")]
pub struct OpenError {
    pub url: String,
    pub reason: String,
}

/// Hands an address to the system browser.
pub trait ExternalOpener: Send {
    fn open(&self, url: &str) -> Result<(), OpenError>;
}

/// Owner-side notifications.
pub trait SurfaceCallback: Send {
    fn on_open_externally(&mut self, url: &str);
}

pub trait AddressFormatter: Send + Sync {
    fn format(&self, text: &str, language_tag: &str) -> String;
}

/// Builds a translate-page address for auto-detected source text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TranslatePageFormatter;

impl AddressFormatter for TranslatePageFormatter {
    fn format(&self, text: &str, language_tag: &str) -> String {
        format!(
            "{TRANSLATE_PAGE_BASE}#auto/{}/{}",
            urlencoding::encode(language_tag),
            urlencoding::encode(text)
        )
    }
}

/// Full-screen, focusable overlay showing a translation page.
pub struct WebContentSurface {
    renderer: Box<dyn ContentRenderer>,
    opener: Box<dyn ExternalOpener>,
    formatter: Box<dyn AddressFormatter>,
    callback: Option<Box<dyn SurfaceCallback>>,
    locale: Locale,
    preferred_language: Option<String>,
    address: Option<String>,
}

impl WebContentSurface {
    pub fn new(renderer: Box<dyn ContentRenderer>, opener: Box<dyn ExternalOpener>) -> Self {
        Self {
            renderer,
            opener,
            formatter: Box::new(TranslatePageFormatter),
            callback: None,
            locale: locale::system_locale(),
            preferred_language: None,
            address: None,
        }
    }

    pub fn from_settings(
        settings: &AppSettings,
        renderer: Box<dyn ContentRenderer>,
        opener: Box<dyn ExternalOpener>,
    ) -> Self {
        let mut surface = Self::new(renderer, opener);
        surface.preferred_language = settings.target_language.clone();
        surface
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_formatter(mut self, formatter: Box<dyn AddressFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_callback(mut self, callback: Box<dyn SurfaceCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Load the translation of `text`. Without a hint the target language
    /// comes from the configured language, then from the locale.
    pub fn set_content(&mut self, text: &str, target_language: Option<&str>) {
        let tag = match target_language.or(self.preferred_language.as_deref()) {
            Some(language) => language.to_string(),
            None => self.locale.translation_tag(),
        };
        let url = self.formatter.format(text, &tag);
        debug!(%tag, "loading translation page");
        self.renderer.load_url(&url);
        self.address = Some(url);
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    fn open_externally(&mut self) {
        let Some(url) = self.address.as_deref() else {
            debug!("nothing loaded yet, ignoring open request");
            return;
        };
        if let Err(err) = self.opener.open(url) {
            warn!(%err, "failed to open translation externally");
            return;
        }
        if let Some(callback) = self.callback.as_mut() {
            callback.on_open_externally(url);
        }
    }
}

impl FloatingSurface for WebContentSurface {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::WebContent
    }

    fn layout(&self) -> SurfaceLayout {
        SurfaceLayout {
            focusable: true,
            fill_screen: true,
        }
    }

    fn render(&mut self, content: &SurfaceContent) {
        self.set_content(&content.text, content.language.as_deref());
    }

    fn on_user_action(&mut self, action: UserAction) -> ActionOutcome {
        match action {
            UserAction::OpenExternally => {
                self.open_externally();
                ActionOutcome::Handled
            }
            UserAction::Close => ActionOutcome::Dismiss,
        }
    }

    fn release(&mut self) {
        self.renderer.clear();
        self.address = None;
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::*;
    use super::*;

    struct EchoFormatter;

    impl AddressFormatter for EchoFormatter {
        fn format(&self, text: &str, language_tag: &str) -> String {
            format!("{language_tag}|{text}")
        }
    }

    fn build_surface(locale: Locale) -> (WebContentSurface, FakeRenderer, FakeOpener, FakeCallback) {
        let renderer = FakeRenderer::default();
        let opener = FakeOpener::default();
        let callback = FakeCallback::default();
        let surface = WebContentSurface::new(Box::new(renderer.clone()), Box::new(opener.clone()))
            .with_locale(locale)
            .with_formatter(Box::new(EchoFormatter))
            .with_callback(Box::new(callback.clone()));
        (surface, renderer, opener, callback)
    }

    #[test]
    fn locale_tag_used_without_hint() {
        let (mut surface, renderer, _, _) = build_surface(Locale::new("zh", Some("TW")));
        surface.set_content("hello", None);
        assert_eq!(surface.address(), Some("zh-TW|hello"));

        let (mut surface, _, _, _) = build_surface(Locale::new("en", Some("US")));
        surface.set_content("hallo", None);
        assert_eq!(surface.address(), Some("en|hallo"));

        assert_eq!(renderer.0.lock().unwrap().loaded, vec!["zh-TW|hello"]);
    }

    #[test]
    fn explicit_hint_wins() {
        let (mut surface, _, _, _) = build_surface(Locale::new("zh", Some("TW")));
        surface.set_content("hello", Some("ja"));
        assert_eq!(surface.address(), Some("ja|hello"));
    }

    #[test]
    fn configured_language_beats_locale() {
        let settings = AppSettings {
            target_language: Some("fr".to_string()),
            ..AppSettings::default()
        };
        let mut surface = WebContentSurface::from_settings(
            &settings,
            Box::new(FakeRenderer::default()),
            Box::new(FakeOpener::default()),
        )
        .with_locale(Locale::new("de", None))
        .with_formatter(Box::new(EchoFormatter));

        surface.render(&SurfaceContent::new("text"));
        assert_eq!(surface.address(), Some("fr|text"));
    }

    #[test]
    fn open_externally_uses_opener_then_callback() {
        let (mut surface, _, opener, callback) = build_surface(Locale::new("en", None));
        surface.set_content("hi", None);

        assert_eq!(surface.on_user_action(UserAction::OpenExternally), ActionOutcome::Handled);
        assert_eq!(*opener.opened.lock().unwrap(), vec!["en|hi"]);
        assert_eq!(*callback.0.lock().unwrap(), vec!["en|hi"]);
    }

    #[test]
    fn open_externally_before_content_is_noop() {
        let (mut surface, _, opener, callback) = build_surface(Locale::new("en", None));
        surface.on_user_action(UserAction::OpenExternally);
        assert!(opener.opened.lock().unwrap().is_empty());
        assert!(callback.0.lock().unwrap().is_empty());
    }

    #[test]
    fn failed_open_skips_callback() {
        let callback = FakeCallback::default();
        let opener = FakeOpener {
            fail: true,
            ..FakeOpener::default()
        };
        let mut surface =
            WebContentSurface::new(Box::new(FakeRenderer::default()), Box::new(opener))
                .with_callback(Box::new(callback.clone()));
        surface.set_content("hi", Some("en"));
        surface.on_user_action(UserAction::OpenExternally);
        assert!(callback.0.lock().unwrap().is_empty());
    }

    #[test]
    fn close_asks_for_dismiss() {
        let (mut surface, _, _, _) = build_surface(Locale::default());
        assert_eq!(surface.on_user_action(UserAction::Close), ActionOutcome::Dismiss);
    }

    #[test]
    fn release_clears_renderer() {
        let (mut surface, renderer, _, _) = build_surface(Locale::default());
        surface.set_content("x", None);
        surface.release();
        assert_eq!(renderer.0.lock().unwrap().clears, 1);
        assert_eq!(surface.address(), None);
    }

    #[test]
    fn translate_page_address_is_encoded() {
        let url = TranslatePageFormatter.format("a b&c", "zh-TW");
        assert_eq!(
            url,
            "https://translate.google.com/m/translate#auto/zh-TW/a%20b%26c"
        );
    }
}
