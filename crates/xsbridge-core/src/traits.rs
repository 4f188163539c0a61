use crate::schema::{CollectionSchema, FieldTypes};
use crate::types::{Document, FieldMap, FieldValue};

/// A host entity that can be indexed.
pub trait Searchable {
    /// Collection the entity type is indexed into.
    fn searchable_as() -> String
    where
        Self: Sized;

    /// Declared field types; rendered into the collection schema on first use.
    fn searchable_field_types() -> FieldTypes
    where
        Self: Sized;

    /// Whether the entity type supports reversible deletion.
    fn uses_soft_delete() -> bool
    where
        Self: Sized,
    {
        false
    }

    /// Primary key, as stored in the document key field.
    fn search_key(&self) -> String;

    fn to_searchable_fields(&self) -> FieldMap;

    /// Extra fields indexed alongside the searchable ones.
    fn search_metadata(&self) -> FieldMap { FieldMap::new() }

    /// Current soft-delete state. Only consulted when
    /// [`Searchable::uses_soft_delete`] is true.
    fn is_soft_deleted(&self) -> bool { false }
}

/// Batch lookup of host entities by primary key, supplied by the host's
/// persistence layer. Missing keys are simply absent from the result.
pub trait EntityResolver<T> {
    fn resolve(&self, keys: &[String]) -> anyhow::Result<Vec<T>>;
}

impl<T, F> EntityResolver<T> for F
where
    F: Fn(&[String]) -> anyhow::Result<Vec<T>>,
{
    fn resolve(&self, keys: &[String]) -> anyhow::Result<Vec<T>> { self(keys) }
}

/// Creates a daemon client for a described collection.
pub trait ClientFactory: Send + Sync {
    type Client: SearchClient;

    fn connect(&self, schema: &CollectionSchema) -> anyhow::Result<Self::Client>;
}

/// Connection to one collection on the daemon.
pub trait SearchClient: Send + Sync {
    /// Inserts the document, or replaces the one with the same key.
    fn update(&self, doc: Document) -> anyhow::Result<()>;

    /// Removes every document whose key is in `keys`.
    fn delete(&self, keys: &[String]) -> anyhow::Result<()>;

    /// Removes every document of the collection.
    fn clean(&self) -> anyhow::Result<()>;

    /// Opens a fresh query session.
    fn search(&self) -> Box<dyn SearchSession + '_>;
}

/// A live, mutable query against one collection.
pub trait SearchSession {
    fn set_limit(&mut self, limit: usize, offset: usize);

    fn set_fuzzy(&mut self, fuzzy: bool);

    fn set_query(&mut self, query: &str);

    fn add_range(&mut self, field: &str, from: Option<&FieldValue>, to: Option<&FieldValue>);

    fn set_sort(&mut self, field: &str, ascending: bool);

    fn execute(&mut self) -> anyhow::Result<Vec<Document>>;

    /// Total matches of the last [`SearchSession::execute`].
    fn last_count(&self) -> u64;
}
