use std::sync::OnceLock;

/// Language families whose translation target must carry the region
/// subtag (`zh-TW` vs `zh-CN`). Every other family uses the bare code.
const REGION_QUALIFIED_LANGUAGES: &[&str] = &["zh"];

const FALLBACK_LANGUAGE: &str = "en";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    language: String,
    region: Option<String>,
}

impl Locale {
    pub fn new(language: &str, region: Option<&str>) -> Self {
        Self {
            language: language.trim().to_lowercase(),
            region: region
                .map(|r| r.trim().to_uppercase())
                .filter(|r| !r.is_empty()),
        }
    }

    /// Parse POSIX (`zh_TW.UTF-8`, `de_DE@euro`) or BCP 47 (`zh-TW`) forms.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let short = trimmed.split(['.', '@']).next().unwrap_or(trimmed).trim();
        if short.is_empty() || short.eq_ignore_ascii_case("c") || short.eq_ignore_ascii_case("posix")
        {
            return None;
        }
        let mut parts = short.split(['_', '-']);
        let language = parts.next().filter(|l| !l.is_empty())?;
        if !language.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        // A four-letter script subtag (`Hant`) may sit between language and region.
        let region = parts.find(|part| !is_script_subtag(part));
        Some(Self::new(language, region))
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Target language tag for the translation page.
    pub fn translation_tag(&self) -> String {
        translation_tag(&self.language, self.region.as_deref())
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::new(FALLBACK_LANGUAGE, None)
    }
}

fn is_script_subtag(part: &str) -> bool {
    part.len() == 4 && part.chars().all(|c| c.is_ascii_alphabetic())
}

pub fn translation_tag(language: &str, region: Option<&str>) -> String {
    let language = language.to_lowercase();
    match region {
        Some(region) if REGION_QUALIFIED_LANGUAGES.contains(&language.as_str()) => {
            format!("{language}-{}", region.to_uppercase())
        }
        _ => language,
    }
}

pub fn system_locale() -> Locale {
    static DETECTED: OnceLock<Locale> = OnceLock::new();
    DETECTED.get_or_init(detect_system_locale).clone()
}

fn detect_system_locale() -> Locale {
    for key in ["LC_ALL", "LC_MESSAGES", "LANG"] {
        if let Ok(raw) = std::env::var(key) {
            if let Some(locale) = Locale::parse(&raw) {
                return locale;
            }
        }
    }
    Locale::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chinese_keeps_region() {
        assert_eq!(Locale::new("zh", Some("TW")).translation_tag(), "zh-TW");
        assert_eq!(Locale::new("zh", Some("cn")).translation_tag(), "zh-CN");
    }

    #[test]
    fn other_families_drop_region() {
        assert_eq!(Locale::new("en", Some("US")).translation_tag(), "en");
        assert_eq!(Locale::new("de", Some("DE")).translation_tag(), "de");
    }

    #[test]
    fn chinese_without_region_is_bare() {
        assert_eq!(Locale::new("zh", None).translation_tag(), "zh");
    }

    #[test]
    fn parse_skips_script_subtag() {
        assert_eq!(Locale::parse("zh_Hant_TW"), Some(Locale::new("zh", Some("TW"))));
        assert_eq!(Locale::parse("zh-Hans-CN").map(|l| l.translation_tag()), Some("zh-CN".to_string()));
        assert_eq!(Locale::parse("zh-Hant"), Some(Locale::new("zh", None)));
    }

    #[test]
    fn parse_posix_and_bcp47() {
        assert_eq!(Locale::parse("zh_TW.UTF-8"), Some(Locale::new("zh", Some("TW"))));
        assert_eq!(Locale::parse("de_DE@euro"), Some(Locale::new("de", Some("DE"))));
        assert_eq!(Locale::parse("en-US"), Some(Locale::new("en", Some("US"))));
        assert_eq!(Locale::parse("fr"), Some(Locale::new("fr", None)));
    }

    #[test]
    fn parse_rejects_c_locale_and_garbage() {
        assert_eq!(Locale::parse("C"), None);
        assert_eq!(Locale::parse("POSIX"), None);
        assert_eq!(Locale::parse(""), None);
        assert_eq!(Locale::parse("C.UTF-8"), None);
        assert_eq!(Locale::parse("12_34"), None);
    }

    #[test]
    fn default_is_english() {
        assert_eq!(Locale::default().translation_tag(), "en");
    }
}
