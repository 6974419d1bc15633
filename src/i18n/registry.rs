//! Language registry: Single source of truth for all supported languages.
//!
//! The table is immutable and built once on first access with `OnceLock`.
//! Mutable per-session state (the active language and its cache) lives in
//! [`crate::coordinator::TranslationCoordinator`], not here.

use std::sync::OnceLock;

/// Configuration for a supported language.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// ISO 639-1 language code (e.g., "en", "hi")
    pub code: &'static str,

    /// English name of the language (e.g., "English", "Hindi")
    pub name: &'static str,

    /// Native name of the language (e.g., "English", "हिन्दी")
    pub native_name: &'static str,

    /// Whether this is the base language that needs no translation (only one should be true)
    pub is_canonical: bool,

    /// Whether this language is offered in the language picker
    pub enabled: bool,
}

/// Global language registry.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global language registry instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
        })
    }

    /// Get a language configuration by its code.
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    /// Get all enabled languages, in picker order.
    pub fn list_enabled(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().filter(|lang| lang.enabled).collect()
    }

    /// Get the canonical (base) language configuration.
    ///
    /// # Panics
    /// Panics if the built-in table does not contain exactly one canonical
    /// language. The table is static, so this is a programming error.
    pub fn canonical(&self) -> &LanguageConfig {
        let canonical_langs: Vec<_> = self
            .languages
            .iter()
            .filter(|lang| lang.is_canonical)
            .collect();

        match canonical_langs.len() {
            0 => panic!("No canonical language found in registry"),
            1 => canonical_langs[0],
            _ => panic!("Multiple canonical languages found in registry"),
        }
    }

    /// Check if a language code is supported and enabled.
    pub fn is_enabled(&self, code: &str) -> bool {
        self.get_by_code(code)
            .map(|lang| lang.enabled)
            .unwrap_or(false)
    }
}

const fn language(
    code: &'static str,
    name: &'static str,
    native_name: &'static str,
) -> LanguageConfig {
    LanguageConfig {
        code,
        name,
        native_name,
        is_canonical: false,
        enabled: true,
    }
}

/// English plus the eleven Indian languages offered by the storefront.
fn default_languages() -> Vec<LanguageConfig> {
    vec![
        LanguageConfig {
            code: "en",
            name: "English",
            native_name: "English",
            is_canonical: true,
            enabled: true,
        },
        language("hi", "Hindi", "हिन्दी"),
        language("mr", "Marathi", "मराठी"),
        language("bn", "Bengali", "বাংলা"),
        language("ta", "Tamil", "தமிழ்"),
        language("te", "Telugu", "తెలుగు"),
        language("gu", "Gujarati", "ગુજરાતી"),
        language("kn", "Kannada", "ಕನ್ನಡ"),
        language("ml", "Malayalam", "മലയാളം"),
        language("pa", "Punjabi", "ਪੰਜਾਬੀ"),
        language("or", "Odia", "ଓଡ଼ିଆ"),
        language("as", "Assamese", "অসমীয়া"),
    ]
}
