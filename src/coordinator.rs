//! Translation coordinator: the active language, its in-memory cache, and
//! backfill of missing strings from the translation service.
//!
//! Lookups come in two flavours:
//!
//! - [`TranslationCoordinator::translate_sync`] answers from the cache and
//!   falls back to the source text. It never blocks or issues a request.
//! - [`TranslationCoordinator::translate`] and
//!   [`TranslationCoordinator::translate_many`] additionally request any
//!   missing strings. The single-string form returns the source text right
//!   away and backfills in the background; the list form waits for its batch.
//!
//! Each request snapshots the strings that are neither cached nor pending at
//! call time, so a string is never sent twice while a request for it is in
//! flight. Strings asked for after the snapshot go out in their own request.
//!
//! All state lives behind one mutex that is never held across an `.await`,
//! while writing to the store, or while publishing a new [`CacheVersion`].
//! Dependents learn about backfills through [`TranslationCoordinator::subscribe`].

use crate::config::Config;
use crate::i18n::{Language, LanguageConfig, LanguageRegistry, MetricsReport, TranslationMetrics};
use crate::retry::{FailureLog, RetryConfig};
use crate::store::{FileStore, TranslationMap, TranslationStore};
use crate::translation::TranslationClient;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio_util::task::task_tracker::TaskTrackerToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Published whenever the active cache changes: a language switch or a
/// successful backfill. `revision` increases monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheVersion {
    pub language: Language,
    pub revision: u64,
    /// Activation that set `language`; a publish from an older one only
    /// bumps `revision`.
    activation: u64,
}

#[derive(Debug)]
struct State {
    language: Language,
    /// Bumped on every language switch; batches from older activations must
    /// not touch the current pending set or failure log.
    generation: u64,
    map: TranslationMap,
    pending: HashSet<String>,
    failures: FailureLog,
    in_flight: usize,
}

/// One outbound request: a fixed, deduplicated set of source strings.
struct Batch {
    language: Language,
    generation: u64,
    texts: Vec<String>,
    /// Taken at claim time so `shutdown` also waits for batches not yet spawned.
    _task: TaskTrackerToken,
}

/// What a successful batch leaves to persist once the state lock is released.
enum Merge {
    /// Encoded snapshot of the active map.
    Active(Option<String>),
    /// Results for a language that is no longer active.
    Inactive(Vec<(String, String)>),
}

#[derive(Debug)]
struct Inner {
    state: Mutex<State>,
    /// Serialises store reads and writes of translation maps. Always taken
    /// after `state`, and handed over before `state` is released.
    persist: Mutex<()>,
    store: TranslationStore,
    client: TranslationClient,
    retry: RetryConfig,
    metrics: TranslationMetrics,
    version: watch::Sender<CacheVersion>,
    idle: Notify,
    tasks: TaskTracker,
}

/// Shared handle to the translation cache. Clones refer to the same state.
#[derive(Debug, Clone)]
pub struct TranslationCoordinator {
    inner: Arc<Inner>,
}

impl TranslationCoordinator {
    /// Build a coordinator backed by a [`FileStore`] in `config.store_dir`.
    pub fn new(config: &Config) -> Result<Self> {
        let store = FileStore::open(&config.store_dir).with_context(|| {
            format!(
                "Failed to open translation store at {}",
                config.store_dir.display()
            )
        })?;
        let client =
            TranslationClient::from_config(config).context("Failed to build translation client")?;

        Ok(Self::with_parts(
            TranslationStore::new(store),
            client,
            config.retry.clone(),
        ))
    }

    /// Restores the preferred language from `store` (falling back to the base
    /// language) and loads its cached translations.
    pub fn with_parts(
        store: TranslationStore,
        client: TranslationClient,
        retry: RetryConfig,
    ) -> Self {
        let language = store
            .load_preferred_language()
            .and_then(|code| match Language::from_code(&code) {
                Ok(language) => Some(language),
                Err(e) => {
                    warn!("Ignoring stored language preference: {}", e);
                    None
                }
            })
            .unwrap_or_else(Language::canonical);

        let map = store.load(language);
        info!(
            "Translation cache ready: language={}, {} cached entries",
            language,
            map.len()
        );

        let (version, _) = watch::channel(CacheVersion {
            language,
            revision: 0,
            activation: 0,
        });

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    language,
                    generation: 0,
                    map,
                    pending: HashSet::new(),
                    failures: FailureLog::new(),
                    in_flight: 0,
                }),
                persist: Mutex::new(()),
                store,
                client,
                retry,
                metrics: TranslationMetrics::new(),
                version,
                idle: Notify::new(),
                tasks: TaskTracker::new(),
            }),
        }
    }

    pub fn language(&self) -> Language {
        self.inner.lock_state().language
    }

    /// Languages offered in the picker.
    pub fn languages(&self) -> Vec<&'static LanguageConfig> {
        LanguageRegistry::get().list_enabled()
    }

    /// Switch the active language and persist it as the user's preference.
    ///
    /// Loads the stored map for `language` and starts a fresh pending set.
    /// Does not contact the translation service.
    pub fn set_language(&self, language: Language) {
        self.inner.store.save_preferred_language(language);

        let mut state = self.inner.lock_state();
        if state.language == language {
            debug!("Language {} already active", language);
            return;
        }

        // A merge still writing this language's map finishes before the load
        let persist = self.inner.lock_persist();
        state.map = self.inner.store.load(language);
        state.language = language;
        state.generation += 1;
        state.pending.clear();
        state.failures = FailureLog::new();
        info!(
            "Switched language to {} ({} cached entries)",
            language,
            state.map.len()
        );
        let generation = state.generation;
        drop(persist);
        drop(state);

        self.inner.publish(language, generation);
    }

    /// Cached translation of `text`, or `text` itself.
    pub fn translate_sync(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let state = self.inner.lock_state();
        if state.language.is_canonical() {
            return text.to_string();
        }
        self.inner.lookup(&state, text)
    }

    /// Cached translation of `text`; on a miss, schedules a backfill and
    /// returns `text` without waiting for it.
    pub async fn translate(&self, text: &str) -> String {
        let batch = {
            let mut state = self.inner.lock_state();
            if text.is_empty() || state.language.is_canonical() {
                return text.to_string();
            }
            if let Some(translated) = state.map.get(text) {
                self.inner.metrics.record_cache_hit();
                return translated.clone();
            }
            self.inner.metrics.record_cache_miss();
            self.inner.claim(&mut state, [text])
        };

        if let Some(batch) = batch {
            // Detached; the merge happens even if nobody is waiting
            drop(self.spawn_batch(batch));
        }
        text.to_string()
    }

    /// Translate every entry of `texts`, requesting the missing ones in a
    /// single batch and waiting for it.
    ///
    /// Strings already pending in another request, or whose request failed,
    /// come back untranslated.
    pub async fn translate_many<S: AsRef<str>>(&self, texts: &[S]) -> Vec<String> {
        let (language, batch) = {
            let mut state = self.inner.lock_state();
            if state.language.is_canonical() {
                return texts.iter().map(|t| t.as_ref().to_string()).collect();
            }
            for text in texts.iter().map(|t| t.as_ref()) {
                if text.is_empty() {
                    continue;
                }
                if state.map.contains_key(text) {
                    self.inner.metrics.record_cache_hit();
                } else {
                    self.inner.metrics.record_cache_miss();
                }
            }
            let batch = self.inner.claim(&mut state, texts.iter().map(|t| t.as_ref()));
            (state.language, batch)
        };

        if let Some(batch) = batch {
            if let Err(e) = self.spawn_batch(batch).await {
                warn!("Translation batch task did not complete: {}", e);
            }
        }

        let state = self.inner.lock_state();
        if state.language != language {
            // Switched away while waiting; the batch was stored under its own language
            return texts.iter().map(|t| t.as_ref().to_string()).collect();
        }
        texts
            .iter()
            .map(|t| {
                let text = t.as_ref();
                state
                    .map
                    .get(text)
                    .cloned()
                    .unwrap_or_else(|| text.to_string())
            })
            .collect()
    }

    /// Receive a [`CacheVersion`] each time the active cache changes.
    pub fn subscribe(&self) -> watch::Receiver<CacheVersion> {
        self.inner.version.subscribe()
    }

    /// `true` when no batch is waiting on the translation service.
    pub fn is_ready(&self) -> bool {
        self.inner.lock_state().in_flight == 0
    }

    /// Number of source strings currently awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.inner.lock_state().pending.len()
    }

    /// Number of cached translations for the active language.
    pub fn cached_count(&self) -> usize {
        self.inner.lock_state().map.len()
    }

    pub fn metrics(&self) -> MetricsReport {
        self.inner.metrics.report()
    }

    /// Wait until every batch started so far has been merged or dropped.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.is_ready() {
                return;
            }
            notified.await;
        }
    }

    /// Refuse new backfills and wait for in-flight ones to finish, so their
    /// results are persisted before the process exits.
    pub async fn shutdown(self) {
        {
            // `claim` checks for a closed tracker under the same lock
            let _state = self.inner.lock_state();
            self.inner.tasks.close();
        }
        self.inner.tasks.wait().await;

        let report = self.inner.metrics.report();
        info!(
            "Translation cache shut down: {} hits, {} misses ({:.1}% hit rate), {} service calls, {} failed",
            report.cache_hits,
            report.cache_misses,
            report.cache_hit_rate,
            report.api_calls,
            report.api_failures
        );
    }

    fn spawn_batch(&self, batch: Batch) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.resolve(batch).await })
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_persist(&self) -> MutexGuard<'_, ()> {
        self.persist.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lookup(&self, state: &State, text: &str) -> String {
        match state.map.get(text) {
            Some(translated) => {
                self.metrics.record_cache_hit();
                translated.clone()
            }
            None => {
                self.metrics.record_cache_miss();
                text.to_string()
            }
        }
    }

    /// Snapshot the strings that need a request and mark them pending.
    fn claim<'a>(
        &self,
        state: &mut State,
        texts: impl IntoIterator<Item = &'a str>,
    ) -> Option<Batch> {
        if self.tasks.is_closed() {
            return None;
        }

        let now = Instant::now();
        let mut seen = HashSet::new();
        let missing: Vec<String> = texts
            .into_iter()
            .filter(|text| {
                !text.is_empty()
                    && !state.map.contains_key(*text)
                    && !state.pending.contains(*text)
                    && !state.failures.is_cooling_down(text, now)
                    && seen.insert(*text)
            })
            .map(str::to_string)
            .collect();

        if missing.is_empty() {
            return None;
        }

        state.pending.extend(missing.iter().cloned());
        state.in_flight += 1;
        Some(Batch {
            language: state.language,
            generation: state.generation,
            texts: missing,
            _task: self.tasks.token(),
        })
    }

    async fn resolve(&self, batch: Batch) {
        self.metrics.record_api_call();
        debug!(
            "Requesting {} translation(s) to {}",
            batch.texts.len(),
            batch.language
        );

        let result = self
            .client
            .translate_batch(&batch.texts, batch.language)
            .await;

        let mut state = self.lock_state();
        let same_activation = state.generation == batch.generation;
        if same_activation {
            for text in &batch.texts {
                state.pending.remove(text);
            }
        }

        let merge = match result {
            Ok(translations) => {
                let pairs: Vec<(String, String)> = batch
                    .texts
                    .iter()
                    .cloned()
                    .zip(translations)
                    .filter(|(_, translated)| !translated.is_empty())
                    .collect();

                if state.language == batch.language {
                    if same_activation {
                        for (text, _) in &pairs {
                            state.failures.clear(text);
                        }
                    }
                    state.map.extend(pairs);
                    Some(Merge::Active(TranslationStore::encode(
                        batch.language,
                        &state.map,
                    )))
                } else {
                    Some(Merge::Inactive(pairs))
                }
            }
            Err(e) => {
                self.metrics.record_api_failure();
                warn!(
                    "Translation of {} string(s) to {} failed, showing originals: {}",
                    batch.texts.len(),
                    batch.language,
                    e
                );
                if same_activation {
                    state
                        .failures
                        .record_failure(&batch.texts, &self.retry, Instant::now());
                }
                None
            }
        };

        let mut state = match merge {
            None => state,
            Some(merge) => {
                // Taken before releasing `state` so writes land in merge order
                let persist = self.lock_persist();
                drop(state);

                let active = match merge {
                    Merge::Active(json) => {
                        if let Some(json) = json {
                            self.store.write(batch.language, &json);
                        }
                        true
                    }
                    Merge::Inactive(pairs) => {
                        let mut stored = self.store.load(batch.language);
                        stored.extend(pairs);
                        self.store.save(batch.language, &stored);
                        false
                    }
                };
                drop(persist);

                if active {
                    self.publish(batch.language, batch.generation);
                }
                debug!(
                    "Cached {} translation(s) for {}",
                    batch.texts.len(),
                    batch.language
                );
                self.lock_state()
            }
        };

        state.in_flight = state.in_flight.saturating_sub(1);
        if state.in_flight == 0 {
            self.idle.notify_waiters();
        }
    }

    fn publish(&self, language: Language, generation: u64) {
        self.version.send_modify(|version| {
            if generation >= version.activation {
                version.language = language;
                version.activation = generation;
            }
            version.revision += 1;
        });
    }
}
