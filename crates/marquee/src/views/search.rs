use super::{ListController, ListSource, ListView};

/// Paginated search results.
#[derive(Debug, Clone)]
pub struct SearchView {
    list: ListView,
}

impl SearchView {
    pub fn new(page_ceiling: u32) -> Self {
        Self {
            list: ListView::new(ListSource::Search(String::new()), page_ceiling),
        }
    }

    pub fn query_text(&self) -> &str {
        match self.list.source() {
            ListSource::Search(query) => query,
            _ => "",
        }
    }

    /// Replace the query. Surrounding whitespace is ignored and a blank
    /// query clears the view. Returns `false` if nothing changed.
    pub fn set_query(&mut self, query: &str) -> bool {
        let query = query.trim();
        if query == self.query_text() {
            return false;
        }
        self.list.reset(ListSource::Search(query.to_string()));
        true
    }

    pub fn clear(&mut self) {
        self.list.reset(ListSource::Search(String::new()));
    }
}

impl ListController for SearchView {
    fn list(&self) -> &ListView {
        &self.list
    }

    fn list_mut(&mut self) -> &mut ListView {
        &mut self.list
    }
}
