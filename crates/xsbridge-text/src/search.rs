use anyhow::Result;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{AllQuery, EmptyQuery, Query, QueryParser, QueryParserError};
use tantivy::{DocAddress, Index, IndexReader, Order, TantivyDocument};
use tracing::warn;

use xsbridge_core::traits::SearchSession;
use xsbridge_core::types::{Document, FieldValue};

use crate::tantivy_utils::{from_tantivy_doc, CollectionLayout};

/// Hits returned when no limit was set.
pub const DEFAULT_LIMIT: usize = 10;

/// One query against a tantivy collection.
///
/// Terms are combined with AND. Ranges are added to the query text as
/// `field:[from TO to]`, `*` marking an open bound. An empty query matches
/// every document.
pub struct TantivySession<'a> {
	index: &'a Index,
	reader: &'a IndexReader,
	layout: &'a CollectionLayout,
	query: String,
	ranges: Vec<String>,
	fuzzy: bool,
	limit: usize,
	offset: usize,
	sort: Option<(String, bool)>,
	last_count: u64,
}

impl<'a> TantivySession<'a> {
	pub fn new(index: &'a Index, reader: &'a IndexReader, layout: &'a CollectionLayout) -> Self {
		Self { index, reader, layout, query: String::new(), ranges: Vec::new(), fuzzy: false, limit: DEFAULT_LIMIT, offset: 0, sort: None, last_count: 0 }
	}

	/// Full query text including range clauses.
	pub fn query_text(&self) -> String {
		let mut text = self.query.trim().to_string();
		for clause in &self.ranges {
			if !text.is_empty() { text.push(' '); }
			text.push_str(clause);
		}
		text
	}

	/// Parses leniently: unparsable parts are dropped and logged. Unprefixed
	/// terms on a collection without default fields match nothing.
	fn build_query(&self) -> Box<dyn Query> {
		let text = self.query_text();
		if text.is_empty() { return Box::new(AllQuery); }
		let mut query_parser = QueryParser::for_index(self.index, self.layout.default_fields.clone());
		query_parser.set_conjunction_by_default();
		if let Some(title) = self.layout.title { query_parser.set_field_boost(title, 2.0); }
		if self.fuzzy {
			for field in &self.layout.default_fields { query_parser.set_field_fuzzy(*field, false, 1, true); }
		}
		let (query, errors) = query_parser.parse_query_lenient(&text);
		if errors.iter().any(|e| matches!(e, QueryParserError::NoDefaultFieldDeclared)) {
			warn!(query = %text, "free text on a collection without default fields, matching nothing");
			return Box::new(EmptyQuery);
		}
		if !errors.is_empty() { warn!(query = %text, ?errors, "ignored unparsable parts of query"); }
		query
	}

	/// Sort field if it can be sorted on; only numeric fields are fast fields.
	fn sort_field(&self) -> Option<(String, bool)> {
		let (name, ascending) = self.sort.as_ref()?;
		match self.layout.field(name) {
			Some(f) if f.numeric => Some((name.clone(), *ascending)),
			_ => { warn!(field = %name, "sorting is only supported on numeric fields, using relevance order"); None }
		}
	}
}

fn bound(value: Option<&FieldValue>) -> String { value.map_or_else(|| "*".to_string(), ToString::to_string) }

impl SearchSession for TantivySession<'_> {
	fn set_limit(&mut self, limit: usize, offset: usize) {
		self.limit = limit.max(1);
		self.offset = offset;
	}

	fn set_fuzzy(&mut self, fuzzy: bool) { self.fuzzy = fuzzy; }

	fn set_query(&mut self, query: &str) { self.query = query.to_string(); }

	fn add_range(&mut self, field: &str, from: Option<&FieldValue>, to: Option<&FieldValue>) {
		self.ranges.push(format!("{}:[{} TO {}]", field, bound(from), bound(to)));
	}

	fn set_sort(&mut self, field: &str, ascending: bool) { self.sort = Some((field.to_string(), ascending)); }

	fn execute(&mut self) -> Result<Vec<Document>> {
		let query = self.build_query();
		let searcher = self.reader.searcher();
		let num_docs = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX);
		if self.offset >= num_docs {
			self.last_count = searcher.search(&query, &Count)? as u64;
			return Ok(Vec::new());
		}
		// Neither bound can exceed the collection, so limit + offset stays in range.
		let top_docs = TopDocs::with_limit(self.limit.min(num_docs)).and_offset(self.offset);
		let (addresses, count): (Vec<DocAddress>, usize) = match self.sort_field() {
			Some((name, ascending)) => {
				let order = if ascending { Order::Asc } else { Order::Desc };
				let (hits, count) = searcher.search(&query, &(top_docs.order_by_fast_field::<f64>(name, order), Count))?;
				(hits.into_iter().map(|(_, addr)| addr).collect(), count)
			}
			None => {
				let (hits, count) = searcher.search(&query, &(top_docs, Count))?;
				(hits.into_iter().map(|(_, addr)| addr).collect(), count)
			}
		};
		self.last_count = count as u64;
		let mut docs = Vec::with_capacity(addresses.len());
		for addr in addresses {
			let doc: TantivyDocument = searcher.doc(addr)?;
			docs.push(from_tantivy_doc(self.layout, &doc));
		}
		Ok(docs)
	}

	fn last_count(&self) -> u64 { self.last_count }
}
