//! Built-in cache handlers.
//!
//! Each handler reacts to one `SenderType_EventName` pair by asking the
//! distributed cache to drop the affected entries. Every handler is
//! idempotent: running it twice with the same arguments leaves the caches as
//! running it once does.

use crate::cache::{EntityId, Refresher};

use super::context::HandlerContext;
use super::error::HandlerError;
use super::events::{EventArgs, Sender, TreeChange, TreeChangeKind};
use super::registry::HandlerEntry;

/// Registration table for [`HandlerRegistry`](super::HandlerRegistry).
pub static DEFAULT_HANDLERS: &[HandlerEntry] = &[
    // Content types: no per-type logic, the whole region goes.
    HandlerEntry::new("ContentTypeService_Changed", content_type_service_changed),
    HandlerEntry::new("ContentTypeService_Saved", content_type_service_changed),
    HandlerEntry::new("MediaTypeService_Changed", media_type_service_changed),
    HandlerEntry::new("MediaTypeService_Saved", media_type_service_changed),
    HandlerEntry::new("MemberTypeService_Changed", member_type_service_changed),
    HandlerEntry::new("MemberTypeService_Saved", member_type_service_changed),
    // Content and media trees
    HandlerEntry::new("ContentService_TreeChanged", content_service_tree_changed),
    HandlerEntry::new("ContentService_Trashed", content_service_trashed),
    HandlerEntry::new("ContentService_Deleted", content_service_deleted),
    HandlerEntry::new("MediaService_TreeChanged", media_service_tree_changed),
    HandlerEntry::new("MediaService_Saved", media_service_saved),
    // Members
    HandlerEntry::new("MemberService_Saved", member_service_saved),
    HandlerEntry::new("MemberService_Deleted", member_service_deleted),
    HandlerEntry::new("MemberGroupService_Saved", member_group_service_saved),
    HandlerEntry::new("MemberGroupService_Deleted", member_group_service_deleted),
    // Data types and domains
    HandlerEntry::new("DataTypeService_Saved", data_type_service_saved),
    HandlerEntry::new("DataTypeService_Deleted", data_type_service_deleted),
    HandlerEntry::new("DomainService_Saved", domain_service_saved),
    HandlerEntry::new("DomainService_Deleted", domain_service_deleted),
    // Localization
    HandlerEntry::new(
        "LocalizationService_SavedLanguage",
        localization_service_saved_language,
    ),
    HandlerEntry::new(
        "LocalizationService_DeletedLanguage",
        localization_service_deleted_language,
    ),
    HandlerEntry::new(
        "LocalizationService_SavedDictionaryItem",
        localization_service_saved_dictionary_item,
    ),
    HandlerEntry::new(
        "LocalizationService_DeletedDictionaryItem",
        localization_service_deleted_dictionary_item,
    ),
    // Files, users, access
    HandlerEntry::new("FileService_SavedTemplate", file_service_saved_template),
    HandlerEntry::new("FileService_DeletedTemplate", file_service_deleted_template),
    HandlerEntry::new("UserService_SavedUser", user_service_saved_user),
    HandlerEntry::new("UserService_DeletedUser", user_service_deleted_user),
    HandlerEntry::new("PublicAccessService_Saved", public_access_service_changed),
    HandlerEntry::new("PublicAccessService_Deleted", public_access_service_changed),
    // Relations and macros
    HandlerEntry::new(
        "RelationService_SavedRelationType",
        relation_service_saved_relation_type,
    ),
    HandlerEntry::new(
        "RelationService_DeletedRelationType",
        relation_service_deleted_relation_type,
    ),
    HandlerEntry::new("MacroService_Saved", macro_service_saved),
    HandlerEntry::new("MacroService_Deleted", macro_service_deleted),
];

/// Ids carried by a `saved`, `deleted` or `moved` payload.
fn entity_ids<'a>(
    handler: &'static str,
    args: &'a EventArgs,
) -> Result<&'a [EntityId], HandlerError> {
    match args {
        EventArgs::Saved { ids } | EventArgs::Deleted { ids } | EventArgs::Moved { ids } => {
            Ok(ids.as_slice())
        }
        other => Err(HandlerError::unexpected_args(
            handler,
            "saved, deleted or moved",
            other.kind_name(),
        )),
    }
}

fn tree_changes<'a>(
    handler: &'static str,
    args: &'a EventArgs,
) -> Result<&'a [TreeChange], HandlerError> {
    match args {
        EventArgs::TreeChanged { changes } => Ok(changes.as_slice()),
        other => Err(HandlerError::unexpected_args(
            handler,
            "tree_changed",
            other.kind_name(),
        )),
    }
}

fn refresh_ids(
    context: &HandlerContext<'_>,
    refresher: Refresher,
    handler: &'static str,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    let ids = entity_ids(handler, args)?;
    context.cache.refresh_by_ids(refresher, ids);
    Ok(())
}

fn remove_ids(
    context: &HandlerContext<'_>,
    refresher: Refresher,
    handler: &'static str,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    let ids = entity_ids(handler, args)?;
    context.cache.remove_by_ids(refresher, ids);
    Ok(())
}

fn apply_tree_changes(
    context: &HandlerContext<'_>,
    refresher: Refresher,
    changes: &[TreeChange],
) {
    if changes
        .iter()
        .any(|change| change.change == TreeChangeKind::RefreshAll)
    {
        context.cache.refresh_all(refresher);
        return;
    }

    let (removed, refreshed): (Vec<&TreeChange>, Vec<&TreeChange>) = changes
        .iter()
        .partition(|change| change.change == TreeChangeKind::Remove);
    let removed: Vec<EntityId> = removed.iter().map(|change| change.id).collect();
    let refreshed: Vec<EntityId> = refreshed.iter().map(|change| change.id).collect();

    context.cache.remove_by_ids(refresher, &removed);
    context.cache.refresh_by_ids(refresher, &refreshed);
}

fn content_type_service_changed(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    _args: &EventArgs,
) -> Result<(), HandlerError> {
    context.cache.refresh_all(Refresher::ContentType);
    Ok(())
}

fn media_type_service_changed(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    _args: &EventArgs,
) -> Result<(), HandlerError> {
    context.cache.refresh_all(Refresher::MediaType);
    Ok(())
}

fn member_type_service_changed(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    _args: &EventArgs,
) -> Result<(), HandlerError> {
    context.cache.refresh_all(Refresher::MemberType);
    Ok(())
}

fn content_service_tree_changed(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    let changes = tree_changes("ContentService_TreeChanged", args)?;
    apply_tree_changes(context, Refresher::Content, changes);
    Ok(())
}

fn content_service_trashed(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    remove_ids(context, Refresher::Content, "ContentService_Trashed", args)
}

fn content_service_deleted(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    remove_ids(context, Refresher::Content, "ContentService_Deleted", args)
}

fn media_service_tree_changed(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    let changes = tree_changes("MediaService_TreeChanged", args)?;
    apply_tree_changes(context, Refresher::Media, changes);
    Ok(())
}

fn media_service_saved(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    refresh_ids(context, Refresher::Media, "MediaService_Saved", args)
}

fn member_service_saved(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    refresh_ids(context, Refresher::Member, "MemberService_Saved", args)
}

fn member_service_deleted(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    remove_ids(context, Refresher::Member, "MemberService_Deleted", args)
}

fn member_group_service_saved(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    refresh_ids(context, Refresher::MemberGroup, "MemberGroupService_Saved", args)
}

fn member_group_service_deleted(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    remove_ids(context, Refresher::MemberGroup, "MemberGroupService_Deleted", args)
}

fn data_type_service_saved(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    refresh_ids(context, Refresher::DataType, "DataTypeService_Saved", args)
}

fn data_type_service_deleted(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    remove_ids(context, Refresher::DataType, "DataTypeService_Deleted", args)
}

fn domain_service_saved(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    refresh_ids(context, Refresher::Domain, "DomainService_Saved", args)
}

fn domain_service_deleted(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    remove_ids(context, Refresher::Domain, "DomainService_Deleted", args)
}

fn localization_service_saved_language(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    refresh_ids(
        context,
        Refresher::Language,
        "LocalizationService_SavedLanguage",
        args,
    )
}

fn localization_service_deleted_language(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    remove_ids(
        context,
        Refresher::Language,
        "LocalizationService_DeletedLanguage",
        args,
    )
}

fn localization_service_saved_dictionary_item(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    refresh_ids(
        context,
        Refresher::Dictionary,
        "LocalizationService_SavedDictionaryItem",
        args,
    )
}

fn localization_service_deleted_dictionary_item(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    remove_ids(
        context,
        Refresher::Dictionary,
        "LocalizationService_DeletedDictionaryItem",
        args,
    )
}

fn file_service_saved_template(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    refresh_ids(context, Refresher::Template, "FileService_SavedTemplate", args)
}

fn file_service_deleted_template(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    remove_ids(context, Refresher::Template, "FileService_DeletedTemplate", args)
}

fn user_service_saved_user(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    refresh_ids(context, Refresher::User, "UserService_SavedUser", args)
}

fn user_service_deleted_user(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    remove_ids(context, Refresher::User, "UserService_DeletedUser", args)
}

fn public_access_service_changed(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    _args: &EventArgs,
) -> Result<(), HandlerError> {
    context.cache.refresh_all(Refresher::PublicAccess);
    Ok(())
}

fn relation_service_saved_relation_type(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    refresh_ids(
        context,
        Refresher::RelationType,
        "RelationService_SavedRelationType",
        args,
    )
}

fn relation_service_deleted_relation_type(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    remove_ids(
        context,
        Refresher::RelationType,
        "RelationService_DeletedRelationType",
        args,
    )
}

fn macro_service_saved(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    refresh_ids(context, Refresher::Macro, "MacroService_Saved", args)
}

fn macro_service_deleted(
    context: &HandlerContext<'_>,
    _sender: &Sender,
    args: &EventArgs,
) -> Result<(), HandlerError> {
    remove_ids(context, Refresher::Macro, "MacroService_Deleted", args)
}
