//! Offline replay of recorded event batches.
//!
//! A batch file lists `{sender, event, args}` records. Replaying it runs the
//! records through a fresh trigger and binder and collects the refresh
//! instructions the handlers would have sent to the farm.

use std::{fs, path::Path, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    binder::{
        BinderConfig, BinderError, CacheBinder, DefaultContextFactory, DispatchReport, EventArgs,
        EventDefinition, EventTrigger, HandlerRegistry, PendingEvents,
    },
    cache::{AppCaches, CacheConfig, DistributedCache, InstructionQueue, RefreshInstruction},
    config::Settings,
    error::AppError,
    infra::error::InfraError,
};

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub sender: String,
    pub event: String,
    #[serde(default)]
    pub args: EventArgs,
}

impl From<EventRecord> for EventDefinition {
    fn from(record: EventRecord) -> Self {
        EventDefinition::new(record.sender, record.event, record.args)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayBatch {
    #[serde(default)]
    pub events: Vec<EventRecord>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonBatch {
    Table(ReplayBatch),
    List(Vec<EventRecord>),
}

/// Result of a replay: the dispatch report and every instruction queued for
/// the farm, in send order.
#[derive(Debug, Clone, Serialize)]
pub struct ReplaySummary {
    pub report: DispatchReport,
    pub instructions: Vec<RefreshInstruction>,
}

/// Read a batch file; `.toml` files are parsed as TOML, anything else as JSON.
pub fn load_batch(path: &Path) -> Result<ReplayBatch, AppError> {
    let data = fs::read_to_string(path).map_err(|err| AppError::from(InfraError::Io(err)))?;

    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    if is_toml {
        toml::from_str(&data)
            .map_err(|err| AppError::from(InfraError::parse(path, err.to_string())))
    } else {
        let batch: JsonBatch = serde_json::from_str(&data)
            .map_err(|err| AppError::from(InfraError::parse(path, err.to_string())))?;
        Ok(match batch {
            JsonBatch::Table(batch) => batch,
            JsonBatch::List(events) => ReplayBatch { events },
        })
    }
}

/// Dispatch `batch` against empty caches built from `settings`.
pub fn replay(settings: &Settings, batch: ReplayBatch) -> Result<ReplaySummary, AppError> {
    let cache_config = CacheConfig::from(&settings.caches);
    let binder_config = BinderConfig::from(&settings.binder);
    let pending_limit = cache_config.max_pending_instructions_non_zero().get();

    let caches = Arc::new(AppCaches::new(&cache_config));
    let messenger = Arc::new(InstructionQueue::new(pending_limit));
    let cache = Arc::new(DistributedCache::new(cache_config, caches, messenger.clone()));
    let registry = Arc::new(HandlerRegistry::with_default_handlers().map_err(BinderError::from)?);
    let binder = Arc::new(CacheBinder::new(
        binder_config.clone(),
        registry,
        Arc::new(DefaultContextFactory::new()),
        cache,
    ));
    let trigger = EventTrigger::new(binder_config, Arc::new(PendingEvents::new()), binder);

    let records = batch.events.len();
    for record in batch.events {
        trigger.publish(record.into());
    }

    let report = trigger.flush()?;
    let instructions = messenger
        .drain(pending_limit)
        .iter()
        .map(|queued| {
            queued
                .decode()
                .map_err(|err| AppError::unexpected(format!("corrupt queued instruction: {err}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        records,
        invoked = report.invoked,
        dropped = report.dropped.len(),
        instructions = instructions.len(),
        "Replay completed"
    );

    Ok(ReplaySummary {
        report,
        instructions,
    })
}
