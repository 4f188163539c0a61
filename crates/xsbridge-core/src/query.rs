//! Search requests and query text composition.
use std::fmt;
use std::sync::Arc;

use crate::traits::SearchSession;
use crate::types::{FieldValue, SearchResults};

/// Appends each exact-match filter to `base` as ` field:value`, in order.
///
/// Field names and values are passed through untouched; the daemon's query
/// grammar does the rest.
pub fn compose_query(base: &str, filters: &[(String, FieldValue)]) -> String {
    let mut query = base.to_string();
    for (field, value) in filters {
        query.push(' ');
        query.push_str(field);
        query.push(':');
        query.push_str(&value.to_string());
    }
    query
}

/// Inclusive bounds; `None` leaves that side open.
#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    pub from: Option<FieldValue>,
    pub to: Option<FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub ascending: bool,
}

/// Handler that takes over a search with the live daemon session.
///
/// It receives the session (with any limit already applied), the raw query
/// text and the resolved options.
pub type RawSearch =
    Arc<dyn Fn(&mut dyn SearchSession, &str, &SearchOptions) -> anyhow::Result<SearchResults> + Send + Sync>;

#[derive(Clone, Default)]
pub enum SearchMode {
    /// The adapter builds and runs the query.
    #[default]
    Structured,
    /// The caller drives the daemon session directly.
    Delegated(RawSearch),
}

impl fmt::Debug for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structured => f.write_str("Structured"),
            Self::Delegated(_) => f.write_str("Delegated(..)"),
        }
    }
}

/// A search request against one collection.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    text: String,
    filters: Vec<(String, FieldValue)>,
    ranges: Vec<(String, Range)>,
    order: Option<Order>,
    fuzzy: bool,
    limit: Option<usize>,
    mode: SearchMode,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }

    /// Adds an exact-match filter; a second filter on the same field
    /// replaces the value and keeps the original position.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        upsert(&mut self.filters, field.into(), value.into());
        self
    }

    pub fn range(mut self, field: impl Into<String>, from: Option<FieldValue>, to: Option<FieldValue>) -> Self {
        upsert(&mut self.ranges, field.into(), Range { from, to });
        self
    }

    pub fn order(mut self, field: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order { field: field.into(), ascending });
        self
    }

    pub fn fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Hands execution to `handler` instead of the structured path.
    pub fn delegate<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut dyn SearchSession, &str, &SearchOptions) -> anyhow::Result<SearchResults> + Send + Sync + 'static,
    {
        self.mode = SearchMode::Delegated(Arc::new(handler));
        self
    }

    pub fn text(&self) -> &str { &self.text }
    pub fn filters(&self) -> &[(String, FieldValue)] { &self.filters }
    pub fn ranges(&self) -> &[(String, Range)] { &self.ranges }
    pub fn order_by(&self) -> Option<&Order> { self.order.as_ref() }
    pub fn is_fuzzy(&self) -> bool { self.fuzzy }
    pub fn limit_hint(&self) -> Option<usize> { self.limit }
    pub fn mode(&self) -> &SearchMode { &self.mode }

    /// The text submitted to the daemon: free text plus exact-match filters.
    pub fn query_text(&self) -> String { compose_query(&self.text, &self.filters) }
}

fn upsert<V>(entries: &mut Vec<(String, V)>, key: String, value: V) {
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some(slot) => slot.1 = value,
        None => entries.push((key, value)),
    }
}

/// Paging options resolved before a search runs. Zero values are treated as
/// absent. `page` is zero-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub hits_per_page: Option<usize>,
    pub page: Option<usize>,
}

impl SearchOptions {
    pub fn new(hits_per_page: Option<usize>, page: Option<usize>) -> Self {
        Self { hits_per_page: hits_per_page.filter(|n| *n > 0), page: page.filter(|p| *p > 0) }
    }

    /// Options for a 1-based `page_number` of `per_page` hits.
    pub fn paginated(per_page: usize, page_number: usize) -> Self {
        Self::new(Some(per_page), Some(page_number.saturating_sub(1)))
    }

    /// `(limit, offset)` to apply, or `None` to keep the daemon default.
    ///
    /// The offset saturates at `usize::MAX`, which is past any result set.
    pub fn limit_offset(&self) -> Option<(usize, usize)> {
        let hits = self.hits_per_page?;
        match self.page {
            Some(page) if page > 0 => Some((hits, hits.saturating_mul(page))),
            _ => Some((hits, 0)),
        }
    }
}
