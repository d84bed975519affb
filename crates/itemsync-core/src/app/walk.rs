//! TreeWalk - 1 回の run でアイテムツリーを並行にたどる
//!
//! # フロー（ノードごと）
//! 1. connection gate が閉じていれば DeferralStore に記録して終了
//! 2. 同じ run で既に見た id なら Revisited を送って終了（1 id につき 1 回だけ解決、
//!    親が予約したスロットは埋める）
//! 3. キャッシュにあれば即解決、なければ FetchStarted を送ってリモート取得
//! 4. 解決: 延期記録を消す → ItemResolved → readability / article（root のみ）/ 子ノード
//!
//! ノードは独立した task として spawn される。集計には触らず、SyncEvent を
//! run のチャネルへ送るだけ。

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::{Item, ItemId, RunId, SyncEvent, SyncJob};
use crate::ports::{
    ArticleBackend, ArticleProgressSink, DeferralStore, ItemFetcher, ReadabilityParser,
};

/// Per-run "connection enabled" flag.
///
/// Starts from the job's flag and is switched off when the run is stopped
/// or superseded. In-flight fetches finish, but nothing new fans out.
#[derive(Debug)]
pub(crate) struct ConnectionGate(AtomicBool);

impl ConnectionGate {
    pub(crate) fn new(enabled: bool) -> Self {
        Self(AtomicBool::new(enabled))
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn disable(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Collaborators a walk needs. Cloned out of the coordinator per run.
#[derive(Clone)]
pub(crate) struct WalkPorts {
    pub(crate) fetcher: Arc<dyn ItemFetcher>,
    pub(crate) deferrals: Arc<dyn DeferralStore>,
    pub(crate) readability: Option<Arc<dyn ReadabilityParser>>,
    pub(crate) article: Option<ArticleBackend>,
}

pub(crate) struct TreeWalk {
    job: SyncJob,
    run: RunId,
    gate: Arc<ConnectionGate>,
    events: mpsc::UnboundedSender<SyncEvent>,
    ports: WalkPorts,
    visited: Mutex<HashSet<ItemId>>,
    handle: Handle,
}

impl TreeWalk {
    pub(crate) fn new(
        job: SyncJob,
        run: RunId,
        gate: Arc<ConnectionGate>,
        events: mpsc::UnboundedSender<SyncEvent>,
        ports: WalkPorts,
        handle: Handle,
    ) -> Arc<Self> {
        Arc::new(Self {
            job,
            run,
            gate,
            events,
            ports,
            visited: Mutex::new(HashSet::new()),
            handle,
        })
    }

    /// Start the walk at the job's root.
    pub(crate) fn start(self: &Arc<Self>) {
        self.spawn_node(self.job.id.clone());
    }

    fn spawn_node(self: &Arc<Self>, id: ItemId) {
        let walk = Arc::clone(self);
        self.handle.spawn(walk.sync_node(id));
    }

    // boxed: the node future spawns further node futures
    fn sync_node(self: Arc<Self>, id: ItemId) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            if !self.gate.is_enabled() {
                self.defer(&id);
                return;
            }
            if !self.first_visit(&id) {
                debug!(run = %self.run, item = %id, "already visited");
                self.emit(SyncEvent::Revisited { id });
                return;
            }

            if let Some(item) = self.ports.fetcher.get_cached(&id) {
                debug!(run = %self.run, item = %id, "cache hit");
                self.resolve(item);
                return;
            }

            self.emit(SyncEvent::FetchStarted { id: id.clone() });
            match self.ports.fetcher.get_remote(&id).await {
                Ok(item) => self.resolve(item),
                Err(e) => {
                    warn!(run = %self.run, item = %id, error = %e, "fetch failed");
                    self.resolve_missing(id);
                }
            }
        })
    }

    fn resolve(self: &Arc<Self>, item: Item) {
        let is_root = item.id == self.job.id;
        let connected = self.gate.is_enabled();
        // the aggregate has one readability and one article slot, both the root's
        let root_story = is_root && item.is_story_type();

        let readability = match &self.ports.readability {
            Some(parser) if self.job.readability_enabled && connected && root_story => {
                Some(Arc::clone(parser))
            }
            _ => None,
        };
        let article = match (&self.ports.article, item.article_url()) {
            (Some(backend), Some(url)) if self.job.article_enabled && connected && root_story => {
                Some((backend.clone(), url.to_string()))
            }
            _ => None,
        };
        let kids_enabled = self.job.comments_enabled && connected;

        if let Err(e) = self.ports.deferrals.remove(&item.id) {
            warn!(item = %item.id, error = %e, "failed to clear deferral");
        }

        self.emit(SyncEvent::ItemResolved {
            id: item.id.clone(),
            item: Some(item.clone()),
            kids_enabled,
            readability_enabled: readability.is_some(),
        });

        if let Some(parser) = readability {
            let events = self.events.clone();
            let id = item.id.clone();
            let url = item.raw_url().map(str::to_string);
            self.handle.spawn(async move {
                parser.parse(&id, url.as_deref()).await;
                let _ = events.send(SyncEvent::ReadabilityDone { id });
            });
        }

        match article {
            Some((backend, url)) => self.start_article(backend, url),
            None if is_root => self.collapse_article_slot(),
            None => {}
        }

        // after a stop the children still fan out, and defer themselves
        if self.job.comments_enabled {
            for kid in &item.kids {
                self.spawn_node(kid.clone());
            }
        }
    }

    fn resolve_missing(&self, id: ItemId) {
        let is_root = id == self.job.id;
        self.emit(SyncEvent::ItemResolved {
            id,
            item: None,
            kids_enabled: false,
            readability_enabled: false,
        });
        if is_root {
            self.collapse_article_slot();
        }
    }

    /// The root will not be rendered, so its reserved article slot is dropped.
    fn collapse_article_slot(&self) {
        if self.job.article_enabled {
            self.emit(SyncEvent::ArticleProgress { current: 0, max: 0 });
        }
    }

    fn start_article(&self, backend: ArticleBackend, url: String) {
        match backend {
            ArticleBackend::Renderer(renderer) => {
                let sink = ArticleProgressSink::new(self.events.clone());
                sink.report(0);
                debug!(run = %self.run, url = %url, "rendering article");
                self.handle.spawn(async move {
                    renderer.load(&url, sink).await;
                });
            }
            ArticleBackend::Service(service) => {
                service.cache(&url);
                let sink = ArticleProgressSink::new(self.events.clone());
                sink.report(100);
            }
        }
    }

    fn defer(&self, id: &ItemId) {
        match self.ports.deferrals.add(id) {
            Ok(()) => info!(run = %self.run, item = %id, "connection disabled, deferred"),
            Err(e) => warn!(run = %self.run, item = %id, error = %e, "failed to defer"),
        }
    }

    fn first_visit(&self, id: &ItemId) -> bool {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone())
    }

    fn emit(&self, event: SyncEvent) {
        if self.events.send(event).is_err() {
            debug!(run = %self.run, "run already finished, event dropped");
        }
    }
}
