//! Cache region identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a content-model entity (node, type, member, ...).
pub type EntityId = i64;

/// A named partition of the application caches.
///
/// Each region holds the entries of one entity kind so that a structural
/// change can drop a whole kind at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheRegion {
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

impl CacheRegion {
    pub const ALL: [CacheRegion; 16] = [
        CacheRegion::Content,
        CacheRegion::ContentType,
        CacheRegion::Media,
        CacheRegion::MediaType,
        CacheRegion::Member,
        CacheRegion::MemberType,
        CacheRegion::MemberGroup,
        CacheRegion::DataType,
        CacheRegion::Domain,
        CacheRegion::Language,
        CacheRegion::Dictionary,
        CacheRegion::Template,
        CacheRegion::User,
        CacheRegion::PublicAccess,
        CacheRegion::RelationType,
        CacheRegion::Macro,
    ];

    /// Stable label used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheRegion::Content => "content",
            CacheRegion::ContentType => "content_type",
            CacheRegion::Media => "media",
            CacheRegion::MediaType => "media_type",
            CacheRegion::Member => "member",
            CacheRegion::MemberType => "member_type",
            CacheRegion::MemberGroup => "member_group",
            CacheRegion::DataType => "data_type",
            CacheRegion::Domain => "domain",
            CacheRegion::Language => "language",
            CacheRegion::Dictionary => "dictionary",
            CacheRegion::Template => "template",
            CacheRegion::User => "user",
            CacheRegion::PublicAccess => "public_access",
            CacheRegion::RelationType => "relation_type",
            CacheRegion::Macro => "macro",
        }
    }
}

impl fmt::Display for CacheRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn labels_are_unique() {
        let labels: HashSet<_> = CacheRegion::ALL.iter().map(CacheRegion::as_str).collect();
        assert_eq!(labels.len(), CacheRegion::ALL.len());
    }

    #[test]
    fn serde_label_matches_display() {
        for region in CacheRegion::ALL {
            let json = serde_json::to_string(&region).expect("serialize region");
            assert_eq!(json, format!("\"{region}\""));
        }
    }
}
