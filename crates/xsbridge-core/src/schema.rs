//! Collection schema description.
//!
//! Host models declare their searchable fields as [`FieldTypes`]; the
//! [`SchemaDescriptor`] validates those declarations and produces the
//! [`CollectionSchema`] a daemon client is created from. The rendered form is
//! the daemon's `project.ini` text:
//!
//! ```text
//! project.name = articles
//! project.default_charset = utf-8
//! server.index = 127.0.0.1:8383
//! server.search = 127.0.0.1:8384
//!
//! [xun_search_object_id]
//! type = id
//!
//! [title]
//! type = title
//! ```
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::EngineConfig;
use crate::error::SchemaError;

/// Synthetic field carrying the soft-delete state of an entity.
pub const SOFT_DELETE_FIELD: &str = "__soft_deleted";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[serde(rename = "id")]
    Identifier,
    Numeric,
    String,
    Title,
    Body,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identifier => "id",
            Self::Numeric => "numeric",
            Self::String => "string",
            Self::Title => "title",
            Self::Body => "body",
        }
    }
}

/// How a field participates in the index.
///
/// `SelfOnly` terms are only reachable through `field:term`, `Mixed` terms
/// only through unprefixed text, `Both` through either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    None,
    #[serde(rename = "self")]
    SelfOnly,
    Mixed,
    Both,
}

impl IndexMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::SelfOnly => "self",
            Self::Mixed => "mixed",
            Self::Both => "both",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerKind {
    /// The whole value is one term.
    Full,
    /// The value is not split into terms.
    None,
    /// Word segmentation, tuned by its parameter.
    Scws,
    /// Fixed-length split.
    Xlen,
    /// Stepped split.
    Xstep,
}

impl TokenizerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::None => "none",
            Self::Scws => "scws",
            Self::Xlen => "xlen",
            Self::Xstep => "xstep",
        }
    }

    pub fn is_parameterless(self) -> bool { matches!(self, Self::Full | Self::None) }
}

/// A tokenizer after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tokenizer {
    Full,
    None,
    Parametrized { kind: TokenizerKind, value: u64 },
}

impl fmt::Display for Tokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::None => f.write_str("none"),
            Self::Parametrized { kind, value } => write!(f, "{}({})", kind.as_str(), value),
        }
    }
}

/// Declared type metadata of one searchable field, as written by the host.
///
/// Nothing is checked here; [`SchemaDescriptor::describe`] validates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub kind: Option<FieldKind>,
    pub index: Option<IndexMode>,
    pub tokenizer: Option<TokenizerKind>,
    pub tokenizer_value: Option<i64>,
}

impl FieldSpec {
    pub fn of(kind: FieldKind) -> Self { Self { kind: Some(kind), ..Self::default() } }
    pub fn numeric() -> Self { Self::of(FieldKind::Numeric) }
    pub fn string() -> Self { Self::of(FieldKind::String) }
    pub fn title() -> Self { Self::of(FieldKind::Title) }
    pub fn body() -> Self { Self::of(FieldKind::Body) }

    pub fn index(mut self, mode: IndexMode) -> Self {
        self.index = Some(mode);
        self
    }

    pub fn tokenizer(mut self, tokenizer: TokenizerKind) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    pub fn tokenizer_value(mut self, value: i64) -> Self {
        self.tokenizer_value = Some(value);
        self
    }

    fn positive_tuning(&self) -> Option<u64> {
        self.tokenizer_value.and_then(|v| u64::try_from(v).ok()).filter(|v| *v > 0)
    }

    /// Resolves the tokenizer line for `field`.
    ///
    /// Parameterless kinds are used verbatim whatever the tuning value; a
    /// parametrized kind needs a positive value; a positive value on its own
    /// selects `scws`.
    fn resolve_tokenizer(&self, field: &str) -> Result<Option<Tokenizer>, SchemaError> {
        match (self.tokenizer, self.positive_tuning()) {
            (Some(TokenizerKind::Full), _) => Ok(Some(Tokenizer::Full)),
            (Some(TokenizerKind::None), _) => Ok(Some(Tokenizer::None)),
            (Some(kind), Some(value)) => Ok(Some(Tokenizer::Parametrized { kind, value })),
            (Some(_), None) => Err(SchemaError::InvalidTokenizer { field: field.to_string() }),
            (None, Some(value)) => Ok(Some(Tokenizer::Parametrized { kind: TokenizerKind::Scws, value })),
            (None, None) => Ok(None),
        }
    }
}

/// Ordered field name → declaration mapping.
///
/// Insertion order is the section order of the rendered schema. Declaring a
/// field twice replaces the earlier declaration in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTypes {
    fields: Vec<(String, FieldSpec)>,
}

impl FieldTypes {
    pub fn new() -> Self { Self::default() }

    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.insert(name, spec);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, spec: FieldSpec) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = spec,
            None => self.fields.push((name, spec)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn len(&self) -> usize { self.fields.len() }

    pub fn is_empty(&self) -> bool { self.fields.is_empty() }
}

impl<S: Into<String>> FromIterator<(S, FieldSpec)> for FieldTypes {
    fn from_iter<I: IntoIterator<Item = (S, FieldSpec)>>(iter: I) -> Self {
        let mut types = Self::new();
        for (name, spec) in iter {
            types.insert(name, spec);
        }
        types
    }
}

/// One `[field]` section of a collection schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSection {
    pub name: String,
    pub kind: Option<FieldKind>,
    pub index: Option<IndexMode>,
    pub tokenizer: Option<Tokenizer>,
}

impl FieldSection {
    /// Index mode the daemon applies when none is declared.
    pub fn effective_index(&self) -> IndexMode {
        match (self.index, self.kind) {
            (Some(mode), _) => mode,
            (None, Some(FieldKind::Title | FieldKind::Body)) => IndexMode::Both,
            (None, _) => IndexMode::SelfOnly,
        }
    }
}

/// A validated schema for one collection. Immutable once described.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSchema {
    pub name: String,
    pub charset: String,
    pub index_server: Endpoint,
    pub search_server: Endpoint,
    /// Document key first, user fields in declaration order, soft-delete
    /// field last when present.
    pub fields: Vec<FieldSection>,
}

impl CollectionSchema {
    pub fn key_field(&self) -> &FieldSection { &self.fields[0] }

    pub fn field(&self, name: &str) -> Option<&FieldSection> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_soft_delete(&self) -> bool { self.field(SOFT_DELETE_FIELD).is_some() }

    /// Renders the daemon's project configuration text.
    pub fn render(&self) -> String { self.to_string() }
}

impl fmt::Display for CollectionSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "project.name = {}", self.name)?;
        writeln!(f, "project.default_charset = {}", self.charset)?;
        writeln!(f, "server.index = {}", self.index_server)?;
        writeln!(f, "server.search = {}", self.search_server)?;
        for section in &self.fields {
            writeln!(f)?;
            writeln!(f, "[{}]", section.name)?;
            if let Some(kind) = section.kind {
                writeln!(f, "type = {}", kind.as_str())?;
            }
            if let Some(index) = section.index {
                writeln!(f, "index = {}", index.as_str())?;
            }
            if let Some(tokenizer) = section.tokenizer {
                writeln!(f, "tokenizer = {tokenizer}")?;
            }
        }
        Ok(())
    }
}

/// A daemon endpoint. Renders as `host:port`, or the bare port when no host
/// resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: Option<String>,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            Some(host) => write!(f, "{}:{}", host, self.port),
            None => write!(f, "{}", self.port),
        }
    }
}

/// Turns field declarations into collection schemas for one daemon setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescriptor {
    charset: String,
    index_server: Endpoint,
    search_server: Endpoint,
    key_name: String,
}

impl SchemaDescriptor {
    pub fn new(config: &EngineConfig) -> Self {
        let resolve = |specific: &Option<String>| specific.clone().or_else(|| config.server_host.clone());
        Self {
            charset: config.default_charset.clone(),
            index_server: Endpoint { host: resolve(&config.server_index_host), port: config.server_index_port },
            search_server: Endpoint { host: resolve(&config.server_search_host), port: config.server_search_port },
            key_name: config.doc_key_name.clone(),
        }
    }

    pub fn key_name(&self) -> &str { &self.key_name }

    pub fn describe(&self, collection: &str, types: &FieldTypes, uses_soft_delete: bool) -> Result<CollectionSchema, SchemaError> {
        let mut fields = Vec::with_capacity(types.len() + 2);
        fields.push(FieldSection { name: self.key_name.clone(), kind: Some(FieldKind::Identifier), index: None, tokenizer: None });

        let (mut titles, mut bodies) = (0usize, 0usize);
        for (name, spec) in types.iter() {
            if name == self.key_name {
                return Err(SchemaError::ReservedName { field: name.to_string() });
            }
            match spec.kind {
                Some(FieldKind::Identifier) => return Err(SchemaError::IdentifierKind { field: name.to_string() }),
                Some(FieldKind::Title) => titles += 1,
                Some(FieldKind::Body) => bodies += 1,
                _ => {}
            }
            if titles > 1 {
                return Err(SchemaError::DuplicateTitle { field: name.to_string() });
            }
            if bodies > 1 {
                return Err(SchemaError::DuplicateBody { field: name.to_string() });
            }
            fields.push(FieldSection {
                name: name.to_string(),
                kind: spec.kind,
                index: spec.index,
                tokenizer: spec.resolve_tokenizer(name)?,
            });
        }

        if uses_soft_delete {
            fields.push(FieldSection {
                name: SOFT_DELETE_FIELD.to_string(),
                kind: Some(FieldKind::Numeric),
                index: Some(IndexMode::SelfOnly),
                tokenizer: Some(Tokenizer::Full),
            });
        }

        Ok(CollectionSchema {
            name: collection.to_string(),
            charset: self.charset.clone(),
            index_server: self.index_server.clone(),
            search_server: self.search_server.clone(),
            fields,
        })
    }
}
