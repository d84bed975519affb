//! End-to-end runs of the coordinator against in-memory collaborators.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use itemsync_core::config::{ConfigPreferences, Connectivity, OfflineConfig};
use itemsync_core::domain::{Item, ItemId, SyncJob};
use itemsync_core::impls::{
    ImmediateReadability, InMemoryDeferralStore, InMemoryHostScheduler, InMemoryItemSource,
    LoggingWebCache, RecordingNotifier,
};
use itemsync_core::ports::{
    ArticleBackend, ArticleProgressSink, ArticleRenderer, DeferralStore, ReadabilityParser,
};
use itemsync_core::{CoordinatorBuilder, SyncCoordinator};
use tokio::sync::{mpsc, Notify};

struct Env {
    coordinator: SyncCoordinator,
    source: Arc<InMemoryItemSource>,
    deferrals: Arc<InMemoryDeferralStore>,
    notifier: Arc<RecordingNotifier>,
    host: Arc<InMemoryHostScheduler>,
    prefs: Arc<ConfigPreferences>,
    done: mpsc::UnboundedReceiver<ItemId>,
}

fn env_with(configure: impl FnOnce(CoordinatorBuilder) -> CoordinatorBuilder) -> Env {
    let source = Arc::new(InMemoryItemSource::new());
    let deferrals = Arc::new(InMemoryDeferralStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let host = Arc::new(InMemoryHostScheduler::new());
    let prefs = Arc::new(ConfigPreferences::new(
        OfflineConfig {
            wifi_only: false,
            ..OfflineConfig::default()
        },
        Connectivity::Unmetered,
    ));
    let (tx, done) = mpsc::unbounded_channel();

    let builder = CoordinatorBuilder::new()
        .fetcher(source.clone())
        .deferral_store(deferrals.clone())
        .notifier(notifier.clone())
        .preferences(prefs.clone())
        .host_scheduler(host.clone());
    let coordinator = configure(builder).build().unwrap();
    coordinator.subscribe(Arc::new(move |id: &ItemId| {
        let _ = tx.send(id.clone());
    }));

    Env {
        coordinator,
        source,
        deferrals,
        notifier,
        host,
        prefs,
        done,
    }
}

fn env() -> Env {
    env_with(|b| b)
}

fn job(id: u64) -> SyncJob {
    SyncJob {
        id: ItemId::from(id),
        connection_enabled: true,
        ..SyncJob::default()
    }
}

async fn wait_done(env: &mut Env) -> Option<ItemId> {
    tokio::time::timeout(Duration::from_secs(30), env.done.recv())
        .await
        .ok()
        .flatten()
}

fn assert_monotonic_and_bounded(shown: &[(u32, u32)]) {
    let mut last = 0;
    for &(progress, max) in shown {
        assert!(progress <= max, "{progress} > {max}");
        assert!(progress >= last, "progress went back: {last} -> {progress}");
        last = progress;
    }
}

#[tokio::test(start_paused = true)]
async fn root_with_two_kids_completes_after_both() {
    let mut env = env();
    env.source
        .insert_remote(Item::story(1u64, "Root").with_kids([2u64, 3]));
    env.source.insert_remote(Item::comment(2u64));
    env.source.insert_remote(Item::comment(3u64));
    let id = ItemId::from(1u64);

    env.coordinator.perform_sync(SyncJob {
        comments_enabled: true,
        notification_enabled: true,
        ..job(1)
    });

    assert_eq!(wait_done(&mut env).await, Some(id.clone()));
    assert_eq!(env.source.remote_calls(), 3);
    assert!(!env.coordinator.is_active(&id));
    assert_eq!(env.notifier.cancel_count(&id), 1);

    let shown = env.notifier.shown(&id);
    assert!(shown.contains(&(1, 3)));
    assert!(shown.contains(&(2, 3)));
    assert_monotonic_and_bounded(&shown);

    // completion fires once, and the cleared timer never cancels again
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(env.done.try_recv().is_err());
    assert_eq!(env.notifier.cancel_count(&id), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_root_still_completes() {
    let mut env = env();
    assert_eq!(wait_for(&mut env, job(9)).await, Some(ItemId::from(9u64)));
    assert_eq!(env.source.remote_calls(), 1);
    assert!(env.coordinator.status(&ItemId::from(9u64)).is_none());
}

async fn wait_for(env: &mut Env, job: SyncJob) -> Option<ItemId> {
    env.coordinator.perform_sync(job);
    wait_done(env).await
}

#[tokio::test(start_paused = true)]
async fn cached_tree_needs_no_network() {
    let mut env = env();
    env.source
        .insert_cached(Item::story(1u64, "Root").with_kids([2u64]));
    env.source.insert_cached(Item::comment(2u64));

    let job = SyncJob {
        comments_enabled: true,
        ..job(1)
    };
    assert_eq!(wait_for(&mut env, job).await, Some(ItemId::from(1u64)));
    assert_eq!(env.source.remote_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn descendants_are_waited_for() {
    let mut env = env();
    env.source
        .insert_remote(Item::story(1u64, "Root").with_kids([2u64]));
    env.source
        .insert_remote(Item::comment(2u64).with_kids([4u64, 5]));
    env.source.insert_remote(Item::comment(4u64));
    env.source.insert_remote(Item::comment(5u64));

    let job = SyncJob {
        comments_enabled: true,
        ..job(1)
    };
    assert_eq!(wait_for(&mut env, job).await, Some(ItemId::from(1u64)));
    assert_eq!(env.source.remote_calls(), 4);
    assert!(env.source.is_cached(&ItemId::from(5u64)));
}

#[tokio::test(start_paused = true)]
async fn comments_disabled_skips_kids() {
    let mut env = env();
    env.source
        .insert_remote(Item::story(1u64, "Root").with_kids([2u64, 3]));

    assert_eq!(wait_for(&mut env, job(1)).await, Some(ItemId::from(1u64)));
    assert_eq!(env.source.remote_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn disabled_connection_defers_without_fetching() {
    let mut env = env();
    env.source.insert_remote(Item::story(1u64, "Root"));
    let id = ItemId::from(1u64);

    env.coordinator.perform_sync(SyncJob {
        connection_enabled: false,
        comments_enabled: true,
        ..job(1)
    });
    tokio::time::sleep(Duration::from_millis(1)).await;

    assert_eq!(env.source.remote_calls(), 0);
    assert!(env.deferrals.contains(&id));

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(!env.coordinator.is_active(&id));
    assert!(env.done.try_recv().is_err());
    assert_eq!(env.notifier.cancel_count(&id), 1);
}

#[tokio::test(start_paused = true)]
async fn resolving_clears_the_deferral() {
    let mut env = env();
    env.source.insert_remote(Item::story(1u64, "Root"));
    let id = ItemId::from(1u64);
    env.deferrals.add(&id).unwrap();

    assert_eq!(wait_for(&mut env, job(1)).await, Some(id.clone()));
    assert!(!env.deferrals.contains(&id));
}

#[tokio::test(start_paused = true)]
async fn flush_schedules_one_job_per_deferred_id() {
    let env = env();
    env.deferrals.add(&ItemId::from(5u64)).unwrap();
    env.deferrals.add(&ItemId::from(6u64)).unwrap();
    env.deferrals.add(&ItemId::from(5u64)).unwrap();

    let run = env
        .coordinator
        .perform_sync(SyncJob::flush(env.prefs.as_ref()));
    assert!(run.is_none());
    assert!(env.deferrals.is_empty());

    let mut jobs = env.host.take_jobs();
    jobs.sort_by(|a, b| a.id.cmp(&b.id));
    let ids: Vec<_> = jobs.iter().map(|j| j.id.clone()).collect();
    assert_eq!(ids, vec![ItemId::from(5u64), ItemId::from(6u64)]);
    for request in &jobs {
        let job = SyncJob::from_extras(&request.extras);
        assert!(!job.notification_enabled);
        assert!(job.connection_enabled);
        assert!(request.run_immediately);
    }
    assert!(env.coordinator.active_jobs().is_empty());
}

#[tokio::test(start_paused = true)]
async fn readability_is_tracked_for_stories() {
    struct HeldParser {
        release: Notify,
        seen: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl ReadabilityParser for HeldParser {
        async fn parse(&self, _id: &ItemId, url: Option<&str>) {
            self.seen.lock().unwrap().push(url.map(str::to_string));
            self.release.notified().await;
        }
    }

    let parser = Arc::new(HeldParser {
        release: Notify::new(),
        seen: Mutex::new(Vec::new()),
    });
    let mut env = env_with(|b| b.readability(parser.clone()));
    env.source
        .insert_remote(Item::story(1u64, "Root").with_url("https://example.com/a"));
    let id = ItemId::from(1u64);

    env.coordinator.perform_sync(SyncJob {
        readability_enabled: true,
        ..job(1)
    });
    tokio::time::sleep(Duration::from_millis(1)).await;

    let view = env.coordinator.status(&id).unwrap();
    assert_eq!((view.progress, view.max), (1, 2));
    assert_eq!(
        *parser.seen.lock().unwrap(),
        vec![Some("https://example.com/a".to_string())]
    );

    parser.release.notify_waiters();
    assert_eq!(wait_done(&mut env).await, Some(id));
}

#[tokio::test(start_paused = true)]
async fn comment_root_drops_readability_and_article_slots() {
    let mut env = env_with(|b| {
        b.readability(Arc::new(ImmediateReadability))
            .article_backend(ArticleBackend::Service(Arc::new(LoggingWebCache::new())))
    });
    env.source.insert_remote(Item::comment(1u64));

    let job = SyncJob {
        readability_enabled: true,
        article_enabled: true,
        ..job(1)
    };
    assert_eq!(wait_for(&mut env, job).await, Some(ItemId::from(1u64)));
}

#[tokio::test(start_paused = true)]
async fn article_service_counts_as_fully_loaded() {
    let cache = Arc::new(LoggingWebCache::new());
    let mut env = env_with(|b| b.article_backend(ArticleBackend::Service(cache.clone())));
    env.source
        .insert_remote(Item::story(1u64, "Root").with_url("https://example.com/a"));

    let job = SyncJob {
        article_enabled: true,
        ..job(1)
    };
    assert_eq!(wait_for(&mut env, job).await, Some(ItemId::from(1u64)));
    assert_eq!(cache.urls(), vec!["https://example.com/a".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn article_renderer_progress_drives_completion() {
    struct SteppedRenderer;

    #[async_trait]
    impl ArticleRenderer for SteppedRenderer {
        async fn load(&self, _url: &str, progress: ArticleProgressSink) {
            for percent in [30, 60, 45, 100] {
                tokio::time::sleep(Duration::from_millis(100)).await;
                progress.report(percent);
            }
        }
    }

    let mut env =
        env_with(|b| b.article_backend(ArticleBackend::Renderer(Arc::new(SteppedRenderer))));
    env.source
        .insert_remote(Item::story(1u64, "Root").with_url("https://example.com/a"));
    let id = ItemId::from(1u64);

    env.coordinator.perform_sync(SyncJob {
        article_enabled: true,
        notification_enabled: true,
        ..job(1)
    });
    assert_eq!(wait_done(&mut env).await, Some(id.clone()));

    let shown = env.notifier.shown(&id);
    assert_monotonic_and_bounded(&shown);
    assert!(shown.contains(&(31, 101)));
    assert!(shown.contains(&(61, 101)));
}

#[tokio::test(start_paused = true)]
async fn story_without_url_is_not_rendered() {
    let cache = Arc::new(LoggingWebCache::new());
    let mut env = env_with(|b| b.article_backend(ArticleBackend::Service(cache.clone())));
    env.source.insert_remote(Item::story(1u64, "Ask"));

    let job = SyncJob {
        article_enabled: true,
        ..job(1)
    };
    assert_eq!(wait_for(&mut env, job).await, Some(ItemId::from(1u64)));
    assert!(cache.urls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn notifications_off_still_cancels() {
    let mut env = env();
    env.source.insert_remote(Item::story(1u64, "Root"));
    let id = ItemId::from(1u64);

    assert_eq!(wait_for(&mut env, job(1)).await, Some(id.clone()));
    assert!(env.notifier.shown(&id).is_empty());
    assert_eq!(env.notifier.cancel_count(&id), 1);
}

#[tokio::test(start_paused = true)]
async fn request_sync_goes_through_the_gateway() {
    let env = env();
    env.prefs.set_connectivity(Connectivity::Offline);

    env.coordinator.request_sync(ItemId::from(3u64)).unwrap();
    let jobs = env.host.take_jobs();
    assert_eq!(jobs.len(), 1);
    assert!(!jobs[0].run_immediately);
    assert!(!SyncJob::from_extras(&jobs[0].extras).connection_enabled);
}

#[tokio::test(start_paused = true)]
async fn repeated_kid_is_fetched_once_and_completes() {
    let mut env = env();
    env.source
        .insert_remote(Item::story(1u64, "Root").with_kids([2u64, 2]));
    env.source.insert_remote(Item::comment(2u64));

    let job = SyncJob {
        comments_enabled: true,
        ..job(1)
    };
    assert_eq!(wait_for(&mut env, job).await, Some(ItemId::from(1u64)));
    assert_eq!(env.source.remote_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn reply_shared_by_two_parents_completes() {
    let mut env = env();
    env.source
        .insert_remote(Item::story(1u64, "Root").with_kids([2u64, 3]));
    env.source
        .insert_remote(Item::comment(2u64).with_kids([4u64]));
    env.source
        .insert_remote(Item::comment(3u64).with_kids([4u64]));
    env.source.insert_remote(Item::comment(4u64));

    let job = SyncJob {
        comments_enabled: true,
        ..job(1)
    };
    assert_eq!(wait_for(&mut env, job).await, Some(ItemId::from(1u64)));
    assert_eq!(env.source.remote_calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn root_listed_as_its_own_kid_completes() {
    let mut env = env();
    env.source
        .insert_remote(Item::story(1u64, "Root").with_kids([1u64]));

    let job = SyncJob {
        comments_enabled: true,
        ..job(1)
    };
    assert_eq!(wait_for(&mut env, job).await, Some(ItemId::from(1u64)));
    assert_eq!(env.source.remote_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn nested_story_does_not_fill_the_root_slots() {
    struct HeldParser {
        release: Notify,
        seen: Mutex<Vec<ItemId>>,
    }

    #[async_trait]
    impl ReadabilityParser for HeldParser {
        async fn parse(&self, id: &ItemId, _url: Option<&str>) {
            self.seen.lock().unwrap().push(id.clone());
            self.release.notified().await;
        }
    }

    let parser = Arc::new(HeldParser {
        release: Notify::new(),
        seen: Mutex::new(Vec::new()),
    });
    let cache = Arc::new(LoggingWebCache::new());
    let mut env = env_with(|b| {
        b.readability(parser.clone())
            .article_backend(ArticleBackend::Service(cache.clone()))
    });
    env.source.insert_remote(
        Item::story(1u64, "Root")
            .with_url("https://example.com/root")
            .with_kids([2u64]),
    );
    env.source
        .insert_remote(Item::story(2u64, "Nested").with_url("https://example.com/nested"));
    let id = ItemId::from(1u64);

    env.coordinator.perform_sync(SyncJob {
        comments_enabled: true,
        readability_enabled: true,
        article_enabled: true,
        ..job(1)
    });
    tokio::time::sleep(Duration::from_millis(1)).await;

    // self + kid + article are in; the root's readability is still held
    let view = env.coordinator.status(&id).unwrap();
    assert_eq!((view.progress, view.max), (102, 103));
    assert_eq!(*parser.seen.lock().unwrap(), vec![id.clone()]);
    assert_eq!(cache.urls(), vec!["https://example.com/root".to_string()]);
    assert!(env.done.try_recv().is_err());

    parser.release.notify_waiters();
    assert_eq!(wait_done(&mut env).await, Some(id));
}

#[tokio::test(start_paused = true)]
async fn rejected_flush_keeps_the_deferred_id() {
    let env = env();
    let id = ItemId::from(5u64);
    env.deferrals.add(&id).unwrap();
    env.host.set_rejecting(true);

    assert_eq!(env.coordinator.flush_deferred(), 0);
    assert!(env.deferrals.contains(&id));
    assert_eq!(env.host.pending_jobs(), 0);

    env.host.set_rejecting(false);
    assert_eq!(env.coordinator.flush_deferred(), 1);
    assert!(env.deferrals.is_empty());
    assert_eq!(env.host.take_jobs()[0].id, id);
}
