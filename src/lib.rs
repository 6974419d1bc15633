//! Per-language translation cache for the artisan storefront.
//!
//! UI strings are authored in the base language and used as cache keys.
//! [`coordinator::TranslationCoordinator`] serves them in the active language,
//! backfilling misses from the translation service and persisting results
//! through [`store::TranslationStore`].

pub mod config;
pub mod coordinator;
pub mod i18n;
pub mod retry;
pub mod store;
pub mod translation;

pub use coordinator::{CacheVersion, TranslationCoordinator};
pub use i18n::Language;
