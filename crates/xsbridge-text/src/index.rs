use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use std::path::PathBuf;
use tantivy::directory::MmapDirectory;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Term};
use tracing::{debug, info};

use xsbridge_core::schema::CollectionSchema;
use xsbridge_core::traits::{ClientFactory, SearchClient, SearchSession};
use xsbridge_core::types::Document;

use crate::search::TantivySession;
use crate::tantivy_utils::{build_schema, register_tokenizer, to_tantivy_doc, CollectionLayout};

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Opens one tantivy index per collection.
///
/// In directory mode each collection lives in `<root>/<collection>/` and its
/// rendered project config is written next to it as `<collection>.ini`. An
/// existing index is reopened; opening it with a different schema fails.
#[derive(Debug, Clone, Default)]
pub struct TantivyClientFactory {
	root: Option<PathBuf>,
}

impl TantivyClientFactory {
	pub fn in_memory() -> Self { Self { root: None } }

	pub fn in_dir(root: impl Into<PathBuf>) -> Self { Self { root: Some(root.into()) } }

	fn open_index(&self, collection: &CollectionSchema) -> Result<Index> {
		let schema = build_schema(collection);
		let Some(root) = &self.root else { return Ok(Index::create_in_ram(schema)); };
		let index_dir = root.join(&collection.name);
		std::fs::create_dir_all(&index_dir)?;
		std::fs::write(root.join(format!("{}.ini", collection.name)), collection.render())?;
		Ok(Index::open_or_create(MmapDirectory::open(&index_dir)?, schema)?)
	}
}

impl ClientFactory for TantivyClientFactory {
	type Client = TantivyClient;

	fn connect(&self, collection: &CollectionSchema) -> Result<TantivyClient> {
		let index = self.open_index(collection)?;
		info!(collection = %collection.name, on_disk = self.root.is_some(), "opened tantivy collection");
		TantivyClient::new(index, collection)
	}
}

pub struct TantivyClient {
	index: Index,
	reader: IndexReader,
	writer: Mutex<IndexWriter>,
	layout: CollectionLayout,
}

impl TantivyClient {
	pub fn new(index: Index, collection: &CollectionSchema) -> Result<Self> {
		register_tokenizer(&index);
		let layout = CollectionLayout::new(collection, &index.schema())?;
		let writer: IndexWriter = index.writer_with_num_threads(1, WRITER_HEAP_BYTES)?;
		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
		Ok(Self { index, reader, writer: Mutex::new(writer), layout })
	}

	pub fn num_docs(&self) -> u64 { self.reader.searcher().num_docs() }

	fn commit(&self, writer: &mut IndexWriter) -> Result<()> {
		writer.commit()?;
		self.reader.reload()?;
		Ok(())
	}
}

impl SearchClient for TantivyClient {
	fn update(&self, doc: Document) -> Result<()> {
		let key = doc
			.get(&self.layout.key_name)
			.map(ToString::to_string)
			.ok_or_else(|| anyhow!("document has no '{}' field", self.layout.key_name))?;
		let tantivy_doc = to_tantivy_doc(&self.layout, &doc)?;
		let mut writer = self.writer.lock();
		writer.delete_term(Term::from_field_text(self.layout.key, &key));
		writer.add_document(tantivy_doc)?;
		self.commit(&mut writer)?;
		debug!(key = %key, "upserted document");
		Ok(())
	}

	fn delete(&self, keys: &[String]) -> Result<()> {
		let mut writer = self.writer.lock();
		for key in keys {
			writer.delete_term(Term::from_field_text(self.layout.key, key));
		}
		self.commit(&mut writer)
	}

	fn clean(&self) -> Result<()> {
		let mut writer = self.writer.lock();
		writer.delete_all_documents()?;
		self.commit(&mut writer)
	}

	fn search(&self) -> Box<dyn SearchSession + '_> { Box::new(TantivySession::new(&self.index, &self.reader, &self.layout)) }
}
