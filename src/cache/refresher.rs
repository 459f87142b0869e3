//! Cache refreshers and the instructions they execute.
//!
//! A refresh instruction is the unit that travels between farm nodes: every
//! node applies the same instruction to its own [`AppCaches`].

use serde::{Deserialize, Serialize};

use super::keys::{CacheRegion, EntityId};
use super::store::AppCaches;

/// Cache refresher responsible for one entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Refresher {
    Content,
    ContentType,
    Media,
    MediaType,
    Member,
    MemberType,
    MemberGroup,
    DataType,
    Domain,
    Language,
    Dictionary,
    Template,
    User,
    PublicAccess,
    RelationType,
    Macro,
}

impl Refresher {
    /// The region holding this refresher's own entries.
    pub fn region(&self) -> CacheRegion {
        match self {
            Refresher::Content => CacheRegion::Content,
            Refresher::ContentType => CacheRegion::ContentType,
            Refresher::Media => CacheRegion::Media,
            Refresher::MediaType => CacheRegion::MediaType,
            Refresher::Member => CacheRegion::Member,
            Refresher::MemberType => CacheRegion::MemberType,
            Refresher::MemberGroup => CacheRegion::MemberGroup,
            Refresher::DataType => CacheRegion::DataType,
            Refresher::Domain => CacheRegion::Domain,
            Refresher::Language => CacheRegion::Language,
            Refresher::Dictionary => CacheRegion::Dictionary,
            Refresher::Template => CacheRegion::Template,
            Refresher::User => CacheRegion::User,
            Refresher::PublicAccess => CacheRegion::PublicAccess,
            Refresher::RelationType => CacheRegion::RelationType,
            Refresher::Macro => CacheRegion::Macro,
        }
    }

    /// Regions whose entries are derived from this refresher's entities and
    /// must be dropped wholesale whenever it runs.
    pub fn dependent_regions(&self) -> &'static [CacheRegion] {
        match self {
            // A content type change reloads both published caches.
            Refresher::ContentType => &[CacheRegion::Content, CacheRegion::Media],
            Refresher::MediaType => &[CacheRegion::Media],
            Refresher::MemberType => &[CacheRegion::Member],
            Refresher::DataType => &[CacheRegion::Content, CacheRegion::Media],
            Refresher::Language => &[CacheRegion::Dictionary, CacheRegion::Domain],
            Refresher::Domain => &[CacheRegion::Content],
            Refresher::PublicAccess => &[CacheRegion::Content],
            Refresher::Content
            | Refresher::Media
            | Refresher::Member
            | Refresher::MemberGroup
            | Refresher::Dictionary
            | Refresher::Template
            | Refresher::User
            | Refresher::RelationType
            | Refresher::Macro => &[],
        }
    }
}

/// What a refresher should do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RefreshAction {
    /// Drop every entry the refresher owns.
    RefreshAll,
    /// Drop the listed entries so they are reloaded on next access.
    RefreshByIds { ids: Vec<EntityId> },
    /// Drop the listed entries because the entities no longer exist.
    RemoveByIds { ids: Vec<EntityId> },
}

/// A refresher paired with its action; the payload sent across the farm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshInstruction {
    pub refresher: Refresher,
    #[serde(flatten)]
    pub action: RefreshAction,
}

impl RefreshInstruction {
    pub fn refresh_all(refresher: Refresher) -> Self {
        Self {
            refresher,
            action: RefreshAction::RefreshAll,
        }
    }

    pub fn refresh_by_ids(refresher: Refresher, ids: Vec<EntityId>) -> Self {
        Self {
            refresher,
            action: RefreshAction::RefreshByIds { ids },
        }
    }

    pub fn remove_by_ids(refresher: Refresher, ids: Vec<EntityId>) -> Self {
        Self {
            refresher,
            action: RefreshAction::RemoveByIds { ids },
        }
    }

    /// Apply the instruction to the local caches.
    ///
    /// Returns the number of cache entries removed. Applying the same
    /// instruction again removes nothing further.
    pub fn apply(&self, caches: &AppCaches) -> usize {
        let region = self.refresher.region();
        let mut removed = match &self.action {
            RefreshAction::RefreshAll => caches.clear(region),
            RefreshAction::RefreshByIds { ids } | RefreshAction::RemoveByIds { ids } => ids
                .iter()
                .filter(|id| caches.evict(region, **id))
                .count(),
        };

        for dependent in self.refresher.dependent_regions() {
            removed += caches.clear(*dependent);
        }

        removed
    }
}
