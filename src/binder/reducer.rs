//! Event batch reduction.
//!
//! Document-type, media-type and member-type handlers drop a whole cache
//! region regardless of which type changed, and those services raise several
//! events (`Saved`, `Changed`, ...) for one edit. Only the first event of each
//! of these categories in a batch is kept; every other event passes through.

use super::events::{EventDefinition, ReductionCategory};

/// Ordered, borrowed projection of a batch after reduction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReducedEventBatch<'a> {
    events: Vec<&'a EventDefinition>,
}

impl<'a> ReducedEventBatch<'a> {
    pub fn iter(&self) -> impl Iterator<Item = &'a EventDefinition> + '_ {
        self.events.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn as_slice(&self) -> &[&'a EventDefinition] {
        &self.events
    }
}

#[derive(Default)]
struct SeenCategories {
    document_type: bool,
    media_type: bool,
    member_type: bool,
}

impl SeenCategories {
    /// Marks the category as seen; true on first sight.
    fn first_sight(&mut self, category: ReductionCategory) -> bool {
        let seen = match category {
            ReductionCategory::DocumentType => &mut self.document_type,
            ReductionCategory::MediaType => &mut self.media_type,
            ReductionCategory::MemberType => &mut self.member_type,
        };
        !std::mem::replace(seen, true)
    }
}

/// Collapse a batch to the minimal batch with the same cache effect.
pub fn reduce<'a, I>(events: I) -> ReducedEventBatch<'a>
where
    I: IntoIterator<Item = &'a EventDefinition>,
{
    let mut seen = SeenCategories::default();
    let events = events
        .into_iter()
        .filter(|event| match event.sender().category() {
            Some(category) => seen.first_sight(category),
            None => true,
        })
        .collect();

    ReducedEventBatch { events }
}
