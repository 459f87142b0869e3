//! Handler registry.
//!
//! Maps a [`HandlerKey`] to the single handler able to process it. The
//! registration table is filtered once, on first lookup, down to the entries
//! whose names follow the `SenderType_EventName` convention. Lookups are then
//! memoized per key, misses included, so an unknown key never triggers a
//! second scan.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use tracing::debug;

use super::context::HandlerContext;
use super::error::{HandlerError, RegistryError};
use super::events::{EventArgs, EventDefinition, HandlerKey, Sender};
use super::handlers::DEFAULT_HANDLERS;

/// Signature shared by every cache handler.
pub type HandlerFn = fn(&HandlerContext<'_>, &Sender, &EventArgs) -> Result<(), HandlerError>;

/// A named handler in the registration table.
#[derive(Clone, Copy)]
pub struct HandlerEntry {
    name: &'static str,
    handler: HandlerFn,
}

impl HandlerEntry {
    pub const fn new(name: &'static str, handler: HandlerFn) -> Self {
        Self { name, handler }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn invoke(
        &self,
        context: &HandlerContext<'_>,
        sender: &Sender,
        args: &EventArgs,
    ) -> Result<(), HandlerError> {
        (self.handler)(context, sender, args)
    }
}

impl fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// True when `name` contains exactly one separator with text on both sides.
fn follows_naming_convention(name: &str) -> bool {
    match name.split_once(HandlerKey::SEPARATOR) {
        Some((sender, event)) => {
            !sender.is_empty() && !event.is_empty() && !event.contains(HandlerKey::SEPARATOR)
        }
        None => false,
    }
}

static SHARED: OnceCell<Arc<HandlerRegistry>> = OnceCell::new();

/// Lazily built handler index.
pub struct HandlerRegistry {
    table: Vec<HandlerEntry>,
    candidates: OnceCell<Vec<HandlerEntry>>,
    /// Key → index into `candidates`; `None` records a miss.
    resolved: DashMap<String, Option<usize>>,
    #[cfg(test)]
    scans: AtomicUsize,
}

impl HandlerRegistry {
    /// Build a registry over `table`.
    ///
    /// Fails when two entries share a name, which would make dispatch
    /// ambiguous.
    pub fn new(table: Vec<HandlerEntry>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::with_capacity(table.len());
        for entry in &table {
            if !seen.insert(entry.name) {
                return Err(RegistryError::DuplicateHandler { name: entry.name });
            }
        }

        Ok(Self {
            table,
            candidates: OnceCell::new(),
            resolved: DashMap::new(),
            #[cfg(test)]
            scans: AtomicUsize::new(0),
        })
    }

    /// Registry over the built-in cache handlers.
    pub fn with_default_handlers() -> Result<Self, RegistryError> {
        Self::new(DEFAULT_HANDLERS.to_vec())
    }

    /// Process-wide registry over the built-in handlers, built on first call.
    pub fn shared() -> Result<Arc<Self>, RegistryError> {
        SHARED
            .get_or_try_init(|| Self::with_default_handlers().map(Arc::new))
            .cloned()
    }

    fn candidates(&self) -> &[HandlerEntry] {
        self.candidates.get_or_init(|| {
            let candidates: Vec<HandlerEntry> = self
                .table
                .iter()
                .filter(|entry| follows_naming_convention(entry.name))
                .copied()
                .collect();
            debug!(
                registered = self.table.len(),
                candidates = candidates.len(),
                "Handler candidates indexed"
            );
            candidates
        })
    }

    /// Find the handler for an event, if any.
    pub fn resolve(&self, event: &EventDefinition) -> Option<&HandlerEntry> {
        self.resolve_key(&event.handler_key())
    }

    pub fn resolve_key(&self, key: &HandlerKey) -> Option<&HandlerEntry> {
        let candidates = self.candidates();

        let cached = self.resolved.get(key.as_str()).map(|hit| *hit);
        let index = match cached {
            Some(index) => index,
            None => *self
                .resolved
                .entry(key.as_str().to_owned())
                .or_insert_with(|| self.scan(candidates, key)),
        };

        index.and_then(|index| candidates.get(index))
    }

    fn scan(&self, candidates: &[HandlerEntry], key: &HandlerKey) -> Option<usize> {
        #[cfg(test)]
        self.scans.fetch_add(1, Ordering::SeqCst);

        candidates
            .iter()
            .position(|entry| entry.name == key.as_str())
    }

    /// Entries that passed the naming filter, in registration order.
    pub fn handlers(&self) -> &[HandlerEntry] {
        self.candidates()
    }

    pub fn handler_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.candidates().iter().map(HandlerEntry::name)
    }

    /// Number of memoized lookups, hits and misses.
    pub fn resolved_len(&self) -> usize {
        self.resolved.len()
    }

    #[cfg(test)]
    fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("registered", &self.table.len())
            .field("resolved", &self.resolved.len())
            .finish_non_exhaustive()
    }
}
