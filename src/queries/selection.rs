//! Selection queries: category lookup against the store, then the date window.

use log::debug;

use crate::error::Result;
use crate::filter::{FilteredView, Selection};
use crate::queries::records::RecordQuery;

// ---------------------------------------------------------------------------
// SelectionQuery
// ---------------------------------------------------------------------------

/// Builds [`FilteredView`]s from the loaded record store.
pub struct SelectionQuery<'a> {
    conn: &'a crate::connection::Connection,
}

impl<'a> SelectionQuery<'a> {
    /// Create a new `SelectionQuery` bound to the given connection.
    pub fn new(conn: &'a crate::connection::Connection) -> Self {
        Self { conn }
    }

    /// View over every record of `category`, spanning all of its dates.
    pub fn by_category(&self, category: &str) -> Result<FilteredView> {
        self.select(&Selection::new(category))
    }

    /// Resolve a full selection into a view.
    ///
    /// Explicit bounds are validated before the store is touched; omitted
    /// bounds default to the category's own first / last date.
    pub fn select(&self, selection: &Selection) -> Result<FilteredView> {
        selection.validate()?;
        let rows = RecordQuery::new(self.conn).by_category(&selection.category)?;
        let view = FilteredView::resolve(selection, rows)?;
        debug!(
            "selection {:?} -> {} rows in [{:?}, {:?}]",
            selection.category,
            view.len(),
            view.start(),
            view.end()
        );
        Ok(view)
    }
}
