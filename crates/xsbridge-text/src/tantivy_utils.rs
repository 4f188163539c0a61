use anyhow::{anyhow, Result};
use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Value, FAST, INDEXED, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer};
use tantivy::{Index, TantivyDocument};
use tracing::debug;

use xsbridge_core::schema::{CollectionSchema, FieldKind, FieldSection, IndexMode, Tokenizer};
use xsbridge_core::types::{Document, FieldValue};

/// Analyzer used for word-segmented fields.
pub const WORDS_TOKENIZER: &str = "xs_words";

pub fn build_schema(collection: &CollectionSchema) -> Schema {
	let mut schema_builder = Schema::builder();
	for section in &collection.fields {
		match section.kind {
			Some(FieldKind::Identifier) => { schema_builder.add_text_field(&section.name, STRING | STORED); }
			Some(FieldKind::Numeric) if is_indexed(section) => { schema_builder.add_f64_field(&section.name, INDEXED | STORED | FAST); }
			Some(FieldKind::Numeric) => { schema_builder.add_f64_field(&section.name, STORED | FAST); }
			_ => { schema_builder.add_text_field(&section.name, text_options(section)); }
		}
	}
	schema_builder.build()
}

fn is_indexed(section: &FieldSection) -> bool {
	section.effective_index() != IndexMode::None && section.tokenizer != Some(Tokenizer::None)
}

fn text_options(section: &FieldSection) -> TextOptions {
	let stored = TextOptions::default().set_stored();
	if !is_indexed(section) { return stored; }
	let indexing = match section.tokenizer {
		Some(Tokenizer::Full) => TextFieldIndexing::default().set_tokenizer("raw").set_index_option(IndexRecordOption::Basic),
		_ => TextFieldIndexing::default().set_tokenizer(WORDS_TOKENIZER).set_index_option(IndexRecordOption::WithFreqsAndPositions),
	};
	stored.set_indexing_options(indexing)
}

pub fn register_tokenizer(index: &Index) {
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(RemoveLongFilter::limit(40))
		.filter(LowerCaser)
		.build();
	index.tokenizers().register(WORDS_TOKENIZER, tokenizer);
}

#[derive(Debug, Clone)]
pub struct FieldLayout {
	pub name: String,
	pub field: Field,
	pub numeric: bool,
}

/// Tantivy handles for the fields of one collection.
#[derive(Debug, Clone)]
pub struct CollectionLayout {
	pub key_name: String,
	pub key: Field,
	pub fields: Vec<FieldLayout>,
	/// Fields searched by unprefixed query terms.
	pub default_fields: Vec<Field>,
	pub title: Option<Field>,
}

impl CollectionLayout {
	pub fn new(collection: &CollectionSchema, schema: &Schema) -> Result<Self> {
		let key_name = collection.key_field().name.clone();
		let key = schema.get_field(&key_name)?;
		let mut fields = Vec::with_capacity(collection.fields.len());
		let mut default_fields = Vec::new();
		let mut title = None;
		for section in &collection.fields {
			let field = schema.get_field(&section.name)?;
			let numeric = section.kind == Some(FieldKind::Numeric);
			let unprefixed = matches!(section.effective_index(), IndexMode::Mixed | IndexMode::Both);
			if unprefixed && !numeric && is_indexed(section) { default_fields.push(field); }
			if section.kind == Some(FieldKind::Title) { title = Some(field); }
			fields.push(FieldLayout { name: section.name.clone(), field, numeric });
		}
		Ok(Self { key_name, key, fields, default_fields, title })
	}

	pub fn field(&self, name: &str) -> Option<&FieldLayout> { self.fields.iter().find(|f| f.name == name) }
}

pub fn to_tantivy_doc(layout: &CollectionLayout, doc: &Document) -> Result<TantivyDocument> {
	let mut out = TantivyDocument::default();
	for (name, value) in doc.fields() {
		let Some(field) = layout.field(name) else {
			debug!(field = %name, "skipping undeclared document field");
			continue;
		};
		if field.numeric {
			let number = value.as_f64().ok_or_else(|| anyhow!("field '{}' expects a numeric value, got '{}'", name, value))?;
			out.add_f64(field.field, number);
		} else {
			out.add_text(field.field, value.to_string());
		}
	}
	Ok(out)
}

pub fn from_tantivy_doc(layout: &CollectionLayout, doc: &TantivyDocument) -> Document {
	let mut out = Document::new();
	for f in &layout.fields {
		let value = if f.numeric {
			doc.get_first(f.field).and_then(|v| v.as_f64()).map(number_value)
		} else {
			doc.get_first(f.field).and_then(|v| v.as_str()).map(FieldValue::from)
		};
		if let Some(value) = value { out.insert(f.name.clone(), value); }
	}
	out
}

/// Whole numbers come back as integers, as they were most likely sent.
fn number_value(n: f64) -> FieldValue {
	if n.fract() == 0.0 && n.abs() < 9.0e15 { FieldValue::Integer(n as i64) } else { FieldValue::Float(n) }
}
