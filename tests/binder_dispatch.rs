use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use cachebind::binder::{
    BinderConfig, BinderError, CacheBinder, ContextFactory, ContextOrigin, ContextReference,
    DefaultContextFactory, EventArgs, EventDefinition, ExecutionContext, HandlerContext,
    HandlerEntry, HandlerError, HandlerRegistry, Sender, TreeChange, TreeChangeKind,
    sender_types::*,
};
use cachebind::cache::{
    AppCaches, CacheConfig, CacheRegion, DistributedCache, InstructionQueue, RefreshInstruction,
    Refresher,
};
use serde_json::json;
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

struct Harness {
    binder: CacheBinder,
    caches: Arc<AppCaches>,
    messenger: Arc<InstructionQueue>,
}

fn harness_with(registry: HandlerRegistry, contexts: Arc<dyn ContextFactory>) -> Harness {
    let config = CacheConfig::default();
    let caches = Arc::new(AppCaches::new(&config));
    for region in CacheRegion::ALL {
        for id in 1..=4 {
            caches.insert(region, id, json!({ "id": id }));
        }
    }
    let messenger = Arc::new(InstructionQueue::new(128));
    let cache = Arc::new(DistributedCache::new(
        config,
        Arc::clone(&caches),
        messenger.clone(),
    ));
    let binder = CacheBinder::new(BinderConfig::default(), Arc::new(registry), contexts, cache);

    Harness {
        binder,
        caches,
        messenger,
    }
}

fn harness() -> Harness {
    harness_with(
        HandlerRegistry::with_default_handlers().expect("default handlers"),
        Arc::new(DefaultContextFactory::new()),
    )
}

fn sent(messenger: &InstructionQueue) -> Vec<RefreshInstruction> {
    messenger
        .drain(usize::MAX)
        .iter()
        .map(|queued| queued.decode().expect("decodable instruction"))
        .collect()
}

#[test]
fn redundant_type_events_refresh_once() {
    let h = harness();
    let events = vec![
        EventDefinition::new(CONTENT_TYPE_SERVICE, "Saved", EventArgs::Empty),
        EventDefinition::new(CONTENT_TYPE_SERVICE, "Changed", EventArgs::Empty),
        EventDefinition::new(MEDIA_SERVICE, "Saved", EventArgs::Saved { ids: vec![2] }),
    ];

    let report = h.binder.handle_events(&events).expect("dispatch succeeds");

    assert_eq!(report.received, 3);
    assert_eq!(report.reduced, 2);
    assert_eq!(report.invoked, 2);
    assert_eq!(
        sent(&h.messenger),
        vec![
            RefreshInstruction::refresh_all(Refresher::ContentType),
            RefreshInstruction::refresh_by_ids(Refresher::Media, vec![2]),
        ]
    );
    assert!(h.caches.is_empty(CacheRegion::ContentType));
    assert!(h.caches.is_empty(CacheRegion::Content));
    assert!(h.caches.is_empty(CacheRegion::Media));
    assert_eq!(h.caches.len(CacheRegion::Member), 4);
}

#[test]
fn tree_changes_evict_only_touched_nodes() {
    let h = harness();
    let events = vec![EventDefinition::new(
        CONTENT_SERVICE,
        "TreeChanged",
        EventArgs::TreeChanged {
            changes: vec![
                TreeChange {
                    id: 1,
                    change: TreeChangeKind::RefreshNode,
                },
                TreeChange {
                    id: 3,
                    change: TreeChangeKind::Remove,
                },
            ],
        },
    )];

    h.binder.handle_events(&events).expect("dispatch succeeds");

    assert_eq!(h.caches.ids(CacheRegion::Content), vec![2, 4]);
    assert_eq!(
        sent(&h.messenger),
        vec![
            RefreshInstruction::remove_by_ids(Refresher::Content, vec![3]),
            RefreshInstruction::refresh_by_ids(Refresher::Content, vec![1]),
        ]
    );
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        let bytes = self.0.lock().expect("log buffer lock").clone();
        String::from_utf8(bytes).expect("utf-8 logs")
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .expect("log buffer lock")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn unknown_event_is_logged_and_skipped() {
    let h = harness();
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(Level::WARN)
        .finish();

    let events = vec![
        EventDefinition::new("Foo", "Bar", EventArgs::Empty),
        EventDefinition::new(MEMBER_SERVICE, "Deleted", EventArgs::Deleted { ids: vec![4] }),
    ];
    let report = tracing::subscriber::with_default(subscriber, || {
        h.binder.handle_events(&events).expect("dispatch succeeds")
    });

    assert_eq!(report.invoked, 1);
    assert_eq!(report.dropped.len(), 1);
    assert_eq!(report.dropped[0].as_str(), "Foo_Bar");
    assert!(!h.caches.contains(CacheRegion::Member, 4));

    let output = logs.contents();
    assert!(output.contains("WARN"), "missing warning level: {output}");
    assert!(
        output.contains("Dropping event Foo_Bar because no corresponding handler was found."),
        "missing warning text: {output}"
    );
}

struct CountingContexts {
    acquired: AtomicUsize,
    released: Arc<AtomicUsize>,
}

impl CountingContexts {
    fn new() -> Self {
        Self {
            acquired: AtomicUsize::new(0),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ContextFactory for CountingContexts {
    fn ensure_context(&self) -> ContextReference {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        let released = Arc::clone(&self.released);
        ContextReference::root(
            Arc::new(ExecutionContext::new(ContextOrigin::Background)),
            move |_| {
                released.fetch_add(1, Ordering::SeqCst);
            },
        )
    }
}

fn drop_macros(
    context: &HandlerContext<'_>,
    _: &Sender,
    _: &EventArgs,
) -> Result<(), HandlerError> {
    context.cache.refresh_all(Refresher::Macro);
    Ok(())
}

fn always_fails(_: &HandlerContext<'_>, _: &Sender, _: &EventArgs) -> Result<(), HandlerError> {
    Err(HandlerError::failed("store unavailable"))
}

fn never_runs(
    context: &HandlerContext<'_>,
    _: &Sender,
    _: &EventArgs,
) -> Result<(), HandlerError> {
    context.cache.refresh_all(Refresher::Template);
    Ok(())
}

#[test]
fn failing_handler_aborts_batch_and_releases_scope() {
    let contexts = Arc::new(CountingContexts::new());
    let registry = HandlerRegistry::new(vec![
        HandlerEntry::new("MacroService_Saved", drop_macros),
        HandlerEntry::new("Broken_Saved", always_fails),
        HandlerEntry::new("FileService_SavedTemplate", never_runs),
    ])
    .expect("valid table");
    let h = harness_with(registry, contexts.clone());

    let events = vec![
        EventDefinition::new(MACRO_SERVICE, "Saved", EventArgs::Empty),
        EventDefinition::new("Broken", "Saved", EventArgs::Empty),
        EventDefinition::new(FILE_SERVICE, "SavedTemplate", EventArgs::Empty),
    ];
    let err = h.binder.handle_events(&events).expect_err("handler fails");

    match err {
        BinderError::Handler { key, source } => {
            assert_eq!(key.as_str(), "Broken_Saved");
            assert!(matches!(source, HandlerError::Failed { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(contexts.acquired.load(Ordering::SeqCst), 1);
    assert_eq!(contexts.released.load(Ordering::SeqCst), 1);
    assert!(h.caches.is_empty(CacheRegion::Macro));
    assert_eq!(h.caches.len(CacheRegion::Template), 4);
}

#[test]
fn every_call_gets_its_own_scope() {
    let contexts = Arc::new(CountingContexts::new());
    let h = harness_with(
        HandlerRegistry::with_default_handlers().expect("default handlers"),
        contexts.clone(),
    );
    let events = vec![EventDefinition::new(
        MACRO_SERVICE,
        "Saved",
        EventArgs::Saved { ids: vec![1] },
    )];

    h.binder.handle_events(&events).expect("dispatch succeeds");
    h.binder.handle_events(&[]).expect("empty dispatch succeeds");

    assert_eq!(contexts.acquired.load(Ordering::SeqCst), 2);
    assert_eq!(contexts.released.load(Ordering::SeqCst), 2);
}

#[test]
fn request_context_is_reused_without_new_scope() {
    let contexts = Arc::new(CountingContexts::new());
    let h = harness_with(
        HandlerRegistry::with_default_handlers().expect("default handlers"),
        contexts.clone(),
    );
    let request = Arc::new(ExecutionContext::new(ContextOrigin::Request));
    let events = vec![EventDefinition::new(
        DOMAIN_SERVICE,
        "Deleted",
        EventArgs::Deleted { ids: vec![1] },
    )];

    h.binder
        .handle_events_in(&request, &events)
        .expect("dispatch succeeds");

    assert_eq!(contexts.acquired.load(Ordering::SeqCst), 0);
    assert!(!h.caches.contains(CacheRegion::Domain, 1));
}

#[test]
fn concurrent_dispatch_shares_one_registry() {
    let h = Arc::new(harness());
    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let h = Arc::clone(&h);
            thread::spawn(move || {
                let events = vec![
                    EventDefinition::new(MEMBER_SERVICE, "Saved", EventArgs::Saved {
                        ids: vec![worker % 4 + 1],
                    }),
                    EventDefinition::new("Unknown", "Event", EventArgs::Empty),
                ];
                h.binder.handle_events(&events).expect("dispatch succeeds")
            })
        })
        .collect();

    for handle in handles {
        let report = handle.join().expect("worker thread");
        assert_eq!(report.invoked, 1);
        assert_eq!(report.dropped.len(), 1);
    }

    assert!(h.caches.is_empty(CacheRegion::Member));
    assert_eq!(h.binder.registry().resolved_len(), 2);
}
