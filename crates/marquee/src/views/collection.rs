use crate::api::CollectionKind;

use super::{ListController, ListSource, ListView};

/// One of the user's own collections.
///
/// Membership depends on the annotation itself, so a mutation that takes an
/// item out of the collection triggers a refetch instead of a patch. Page
/// counts are reported exactly.
#[derive(Debug, Clone)]
pub struct CollectionView {
    kind: CollectionKind,
    list: ListView,
}

impl CollectionView {
    pub fn new(kind: CollectionKind) -> Self {
        Self {
            kind,
            // Collections are never capped.
            list: ListView::new(ListSource::Collection(kind), u32::MAX),
        }
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }
}

impl ListController for CollectionView {
    fn list(&self) -> &ListView {
        &self.list
    }

    fn list_mut(&mut self) -> &mut ListView {
        &mut self.list
    }
}
