//! CoordinatorBuilder - SyncCoordinator の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）: 必須 port が欠けていたら build() で失敗
//! - 開発体験の改善（欠けている port 名をまとめて返す）

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;

use crate::config::SyncConfig;
use crate::ports::{
    ArticleBackend, Clock, DeferralStore, HostScheduler, IdGenerator, ItemFetcher, Notifier,
    PreferenceSource, ProgressListener, ReadabilityParser, SystemClock, UlidGenerator,
};

use super::coordinator::{CoordinatorInner, SyncCoordinator, DEFAULT_TIMEOUT};
use super::gateway::SchedulingGateway;
use super::walk::WalkPorts;

/// BuildError は coordinator 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing ports: {0:?}. These collaborators are required but were not provided.")]
    MissingPorts(Vec<&'static str>),

    #[error("no Tokio runtime: call build() inside a runtime or pass one with runtime()")]
    NoRuntime,
}

/// Wires collaborators into a [`SyncCoordinator`].
///
/// # Fail-fast 設計
/// - fetcher / deferral_store / notifier / preferences / host_scheduler は必須
/// - readability / article / listener は任意（無ければその機能は追跡されない）
/// - 不足があれば BuildError::MissingPorts にすべて並べて返す
#[derive(Default)]
pub struct CoordinatorBuilder {
    fetcher: Option<Arc<dyn ItemFetcher>>,
    deferrals: Option<Arc<dyn DeferralStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    preferences: Option<Arc<dyn PreferenceSource>>,
    host: Option<Arc<dyn HostScheduler>>,
    readability: Option<Arc<dyn ReadabilityParser>>,
    article: Option<ArticleBackend>,
    listener: Option<Arc<dyn ProgressListener>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Box<dyn IdGenerator>>,
    timeout: Option<Duration>,
    runtime: Option<Handle>,
}

impl CoordinatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take tunables (currently the timeout) from `config`.
    pub fn config(mut self, config: &SyncConfig) -> Self {
        self.timeout = Some(config.timeout());
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn ItemFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn deferral_store(mut self, store: Arc<dyn DeferralStore>) -> Self {
        self.deferrals = Some(store);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn preferences(mut self, preferences: Arc<dyn PreferenceSource>) -> Self {
        self.preferences = Some(preferences);
        self
    }

    pub fn host_scheduler(mut self, host: Arc<dyn HostScheduler>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn readability(mut self, parser: Arc<dyn ReadabilityParser>) -> Self {
        self.readability = Some(parser);
        self
    }

    pub fn article_backend(mut self, backend: ArticleBackend) -> Self {
        self.article = Some(backend);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn ProgressListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Box<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Runtime the coordinator spawns its tasks on. Defaults to the
    /// runtime `build()` is called from.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn build(self) -> Result<SyncCoordinator, BuildError> {
        let mut missing = Vec::new();
        if self.fetcher.is_none() {
            missing.push("fetcher");
        }
        if self.deferrals.is_none() {
            missing.push("deferral_store");
        }
        if self.notifier.is_none() {
            missing.push("notifier");
        }
        if self.preferences.is_none() {
            missing.push("preferences");
        }
        if self.host.is_none() {
            missing.push("host_scheduler");
        }

        let (Some(fetcher), Some(deferrals), Some(notifier), Some(preferences), Some(host)) = (
            self.fetcher,
            self.deferrals,
            self.notifier,
            self.preferences,
            self.host,
        ) else {
            return Err(BuildError::MissingPorts(missing));
        };

        let handle = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| BuildError::NoRuntime)?,
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Box::new(UlidGenerator::new(Arc::clone(&clock))));

        Ok(SyncCoordinator::from_inner(CoordinatorInner {
            ports: WalkPorts {
                fetcher,
                deferrals,
                readability: self.readability,
                article: self.article,
            },
            notifier,
            gateway: SchedulingGateway::new(host, Arc::clone(&preferences)),
            preferences,
            ids,
            clock,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            handle,
            listener: Mutex::new(self.listener),
            runs: Mutex::new(HashMap::new()),
            outcomes: Mutex::new(HashMap::new()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigPreferences, Connectivity, OfflineConfig};
    use crate::impls::{
        InMemoryDeferralStore, InMemoryHostScheduler, InMemoryItemSource, TracingNotifier,
    };

    fn complete() -> CoordinatorBuilder {
        CoordinatorBuilder::new()
            .fetcher(Arc::new(InMemoryItemSource::new()))
            .deferral_store(Arc::new(InMemoryDeferralStore::new()))
            .notifier(Arc::new(TracingNotifier))
            .preferences(Arc::new(ConfigPreferences::new(
                OfflineConfig::default(),
                Connectivity::Unmetered,
            )))
            .host_scheduler(Arc::new(InMemoryHostScheduler::new()))
    }

    #[tokio::test]
    async fn test_build_success() {
        let coordinator = complete().build();
        assert!(coordinator.is_ok());
    }

    #[tokio::test]
    async fn test_build_missing_ports() {
        let result = CoordinatorBuilder::new()
            .fetcher(Arc::new(InMemoryItemSource::new()))
            .notifier(Arc::new(TracingNotifier))
            .build();
        assert!(matches!(
            result,
            Err(BuildError::MissingPorts(missing))
                if missing == vec!["deferral_store", "preferences", "host_scheduler"]
        ));
    }

    #[test]
    fn test_build_outside_runtime() {
        assert!(matches!(complete().build(), Err(BuildError::NoRuntime)));
    }

    #[test]
    fn test_build_with_explicit_runtime() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let coordinator = complete().runtime(rt.handle().clone()).build();
        assert!(coordinator.is_ok());
    }

    #[tokio::test]
    async fn test_config_sets_timeout() {
        let config = SyncConfig {
            timeout_secs: 5,
            ..SyncConfig::default()
        };
        let coordinator = complete().config(&config).build().unwrap();
        assert_eq!(coordinator.timeout(), Duration::from_secs(5));

        let coordinator = complete().build().unwrap();
        assert_eq!(coordinator.timeout(), DEFAULT_TIMEOUT);
    }
}
