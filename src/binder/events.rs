//! Domain event definitions.
//!
//! An [`EventDefinition`] records who raised which event with what payload.
//! The sender's type name and the event name together form the
//! [`HandlerKey`] used to route the event to its handler.

use std::borrow::{Borrow, Cow};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cache::EntityId;

/// Type names of the content services that raise domain events.
pub mod sender_types {
    pub const CONTENT_SERVICE: &str = "ContentService";
    pub const CONTENT_TYPE_SERVICE: &str = "ContentTypeService";
    pub const MEDIA_SERVICE: &str = "MediaService";
    pub const MEDIA_TYPE_SERVICE: &str = "MediaTypeService";
    pub const MEMBER_SERVICE: &str = "MemberService";
    pub const MEMBER_TYPE_SERVICE: &str = "MemberTypeService";
    pub const MEMBER_GROUP_SERVICE: &str = "MemberGroupService";
    pub const DATA_TYPE_SERVICE: &str = "DataTypeService";
    pub const DOMAIN_SERVICE: &str = "DomainService";
    pub const LOCALIZATION_SERVICE: &str = "LocalizationService";
    pub const FILE_SERVICE: &str = "FileService";
    pub const USER_SERVICE: &str = "UserService";
    pub const PUBLIC_ACCESS_SERVICE: &str = "PublicAccessService";
    pub const RELATION_SERVICE: &str = "RelationService";
    pub const MACRO_SERVICE: &str = "MacroService";
}

/// Sender categories whose events all invalidate one entire cache region,
/// so a batch never needs more than one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReductionCategory {
    DocumentType,
    MediaType,
    MemberType,
}

impl ReductionCategory {
    /// Exact match on the sender type name.
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        match type_name {
            sender_types::CONTENT_TYPE_SERVICE => Some(Self::DocumentType),
            sender_types::MEDIA_TYPE_SERVICE => Some(Self::MediaType),
            sender_types::MEMBER_TYPE_SERVICE => Some(Self::MemberType),
            _ => None,
        }
    }
}

/// The object that raised an event, identified by its type name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Sender {
    type_name: Cow<'static, str>,
    category: Option<ReductionCategory>,
}

impl Sender {
    pub fn new(type_name: impl Into<Cow<'static, str>>) -> Self {
        let type_name = type_name.into();
        let category = ReductionCategory::from_type_name(&type_name);
        Self {
            type_name,
            category,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn category(&self) -> Option<ReductionCategory> {
        self.category
    }
}

impl From<String> for Sender {
    fn from(type_name: String) -> Self {
        Self::new(type_name)
    }
}

impl From<&'static str> for Sender {
    fn from(type_name: &'static str) -> Self {
        Self::new(type_name)
    }
}

impl From<Sender> for String {
    fn from(sender: Sender) -> Self {
        sender.type_name.into_owned()
    }
}

/// Structural change applied to a content, media or member type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentTypeChangeKind {
    Create,
    RefreshMain,
    RefreshOther,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeChange {
    pub id: EntityId,
    pub change: ContentTypeChangeKind,
}

/// Change applied to a node of the content or media tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeChangeKind {
    RefreshNode,
    RefreshBranch,
    RefreshAll,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeChange {
    pub id: EntityId,
    pub change: TreeChangeKind,
}

/// Event payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventArgs {
    #[default]
    Empty,
    Saved {
        ids: Vec<EntityId>,
    },
    Deleted {
        ids: Vec<EntityId>,
    },
    Moved {
        ids: Vec<EntityId>,
    },
    Changed {
        changes: Vec<ContentTypeChange>,
    },
    TreeChanged {
        changes: Vec<TreeChange>,
    },
}

impl EventArgs {
    pub fn kind_name(&self) -> &'static str {
        match self {
            EventArgs::Empty => "empty",
            EventArgs::Saved { .. } => "saved",
            EventArgs::Deleted { .. } => "deleted",
            EventArgs::Moved { .. } => "moved",
            EventArgs::Changed { .. } => "changed",
            EventArgs::TreeChanged { .. } => "tree_changed",
        }
    }
}

/// Routing key of a handler: `SenderType_EventName`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct HandlerKey(String);

impl HandlerKey {
    pub const SEPARATOR: char = '_';

    pub fn new(type_name: &str, event_name: &str) -> Self {
        let mut key = String::with_capacity(type_name.len() + event_name.len() + 1);
        key.push_str(type_name);
        key.push(Self::SEPARATOR);
        key.push_str(event_name);
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for HandlerKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An event raised by a content service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDefinition {
    sender: Sender,
    event_name: Cow<'static, str>,
    args: EventArgs,
}

impl EventDefinition {
    pub fn new(
        sender: impl Into<Sender>,
        event_name: impl Into<Cow<'static, str>>,
        args: EventArgs,
    ) -> Self {
        Self {
            sender: sender.into(),
            event_name: event_name.into(),
            args,
        }
    }

    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn args(&self) -> &EventArgs {
        &self.args
    }

    pub fn handler_key(&self) -> HandlerKey {
        HandlerKey::new(self.sender.type_name(), &self.event_name)
    }
}
