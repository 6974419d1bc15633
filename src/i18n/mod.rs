//! Internationalization (i18n) module.
//!
//! # Architecture
//!
//! - `registry`: Single source of truth for the storefront's supported languages
//! - `language`: Type-safe, validated `Language` handle
//! - `metrics`: Translation cache and service call counters
//!
//! # Example
//!
//! ```rust,ignore
//! use storefront_i18n::i18n::{Language, LanguageRegistry};
//!
//! let base = Language::canonical();
//! let marathi = Language::from_code("mr")?;
//! let languages = LanguageRegistry::get().list_enabled();
//! ```

mod language;
mod metrics;
mod registry;

pub use language::Language;
pub use metrics::{MetricsReport, TranslationMetrics};
pub use registry::{LanguageConfig, LanguageRegistry};
