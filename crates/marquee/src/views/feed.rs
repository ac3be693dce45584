use crate::api::Category;

use super::{ListController, ListSource, ListView};

/// Tabbed home feed, one tab per [`Category`].
#[derive(Debug, Clone)]
pub struct FeedView {
    list: ListView,
}

impl FeedView {
    pub fn new(category: Category, page_ceiling: u32) -> Self {
        Self {
            list: ListView::new(ListSource::Feed(category), page_ceiling),
        }
    }

    pub fn category(&self) -> Category {
        match self.list.source() {
            ListSource::Feed(category) => *category,
            _ => Category::default(),
        }
    }

    /// Switch tabs. Returns `false` if `category` is already active.
    pub fn select_category(&mut self, category: Category) -> bool {
        if self.category() == category {
            return false;
        }
        self.list.reset(ListSource::Feed(category));
        true
    }
}

impl ListController for FeedView {
    fn list(&self) -> &ListView {
        &self.list
    }

    fn list_mut(&mut self) -> &mut ListView {
        &mut self.list
    }
}
