use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use xsbridge_core::config::EngineConfig;
use xsbridge_core::error::{Error, Result};
use xsbridge_core::query::{SearchMode, SearchOptions, SearchQuery};
use xsbridge_core::schema::{SchemaDescriptor, SOFT_DELETE_FIELD};
use xsbridge_core::traits::{ClientFactory, EntityResolver, SearchClient, Searchable};
use xsbridge_core::types::{Document, FieldValue, SearchResults};

use crate::cache::ClientCache;

/// Bridges searchable host entities to a full-text search daemon.
///
/// Every operation is a blocking call on the collection's client. Clients
/// are created lazily, one per collection name, and cached until
/// [`SearchEngineAdapter::evict`] is called.
pub struct SearchEngineAdapter<F: ClientFactory> {
    config: EngineConfig,
    descriptor: SchemaDescriptor,
    factory: F,
    clients: ClientCache<F::Client>,
}

impl<F: ClientFactory> SearchEngineAdapter<F> {
    pub fn new(config: EngineConfig, factory: F) -> Self {
        let descriptor = SchemaDescriptor::new(&config);
        Self { config, descriptor, factory, clients: ClientCache::new() }
    }

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn factory(&self) -> &F { &self.factory }

    /// Name of the document field holding entity primary keys.
    pub fn key_name(&self) -> &str { self.descriptor.key_name() }

    /// Upserts one document per entity.
    pub fn update<T: Searchable>(&self, entities: &[T]) -> Result<()> {
        if entities.is_empty() {
            return Ok(());
        }
        let soft_delete = self.uses_soft_delete::<T>();
        let client = self.client_for::<T>()?;
        for (entity, mut doc) in entities.iter().zip(self.attach_soft_delete(entities, soft_delete)) {
            doc.insert(self.key_name(), entity.search_key());
            doc.extend(entity.to_searchable_fields());
            doc.extend(entity.search_metadata());
            client.update(doc)?;
        }
        debug!(collection = %T::searchable_as(), count = entities.len(), "updated documents");
        Ok(())
    }

    /// Removes the entities' documents with a single bulk delete.
    pub fn delete<T: Searchable>(&self, entities: &[T]) -> Result<()> {
        if entities.is_empty() {
            return Ok(());
        }
        let keys: Vec<String> = entities.iter().map(T::search_key).collect();
        self.client_for::<T>()?.delete(&keys)?;
        debug!(collection = %T::searchable_as(), count = keys.len(), "deleted documents");
        Ok(())
    }

    /// Wipes the whole collection of `T`. Irreversible.
    pub fn clean<T: Searchable>(&self) -> Result<()> {
        self.client_for::<T>()?.clean()?;
        info!(collection = %T::searchable_as(), "cleaned collection");
        Ok(())
    }

    pub fn search<T: Searchable>(&self, query: &SearchQuery) -> Result<SearchResults> {
        self.perform_search::<T>(query, SearchOptions::new(query.limit_hint(), None))
    }

    /// Searches one page; `page_number` is 1-based.
    pub fn paginate<T: Searchable>(&self, query: &SearchQuery, per_page: usize, page_number: usize) -> Result<SearchResults> {
        self.perform_search::<T>(query, SearchOptions::paginated(per_page, page_number))
    }

    pub fn perform_search<T: Searchable>(&self, query: &SearchQuery, options: SearchOptions) -> Result<SearchResults> {
        let client = self.client_for::<T>()?;
        let mut session = client.search();

        if let Some((limit, offset)) = options.limit_offset() {
            session.set_limit(limit, offset);
        }

        if let SearchMode::Delegated(handler) = query.mode() {
            debug!(collection = %T::searchable_as(), "delegating search to caller");
            return handler(&mut *session, query.text(), &options).map_err(Error::Client);
        }

        session.set_fuzzy(query.is_fuzzy());
        session.set_query(&query.query_text());
        for (field, range) in query.ranges() {
            session.add_range(field, range.from.as_ref(), range.to.as_ref());
        }
        if let Some(order) = query.order_by() {
            session.set_sort(&order.field, order.ascending);
        }

        let docs = session.execute()?;
        let total = session.last_count();
        debug!(collection = %T::searchable_as(), hits = docs.len(), total, "search finished");
        Ok(SearchResults { docs, total })
    }

    /// Primary keys of the hits, in ranking order.
    pub fn map_ids(&self, results: &SearchResults) -> Vec<String> {
        results.docs.iter().filter_map(|doc| doc.get(self.key_name())).map(FieldValue::to_string).collect()
    }

    /// Resolves hits to entities with one batch lookup.
    ///
    /// The result follows the ranking order of `results`; hits whose entity
    /// no longer resolves are dropped.
    pub fn map<T, R>(&self, results: &SearchResults, resolver: &R) -> Result<Vec<T>>
    where
        T: Searchable + Clone,
        R: EntityResolver<T> + ?Sized,
    {
        if results.docs.is_empty() {
            return Ok(Vec::new());
        }
        let keys = self.map_ids(results);
        let by_key: HashMap<String, T> = resolver
            .resolve(&keys)
            .map_err(Error::Resolve)?
            .into_iter()
            .map(|entity| (entity.search_key(), entity))
            .collect();
        Ok(keys.iter().filter_map(|key| by_key.get(key).cloned()).collect())
    }

    pub fn total_count(&self, results: &SearchResults) -> u64 { results.total }

    /// Drops the cached client of `collection`; the next operation re-reads
    /// the field declarations and connects again.
    pub fn evict(&self, collection: &str) -> bool {
        let evicted = self.clients.evict(collection);
        if evicted {
            info!(collection, "evicted search client");
        }
        evicted
    }

    pub fn cached_collections(&self) -> Vec<String> { self.clients.collections() }

    fn uses_soft_delete<T: Searchable>(&self) -> bool { T::uses_soft_delete() && self.config.soft_delete }

    /// One starting document per entity, holding the soft-delete flag when
    /// it is tracked.
    fn attach_soft_delete<T: Searchable>(&self, entities: &[T], soft_delete: bool) -> Vec<Document> {
        entities
            .iter()
            .map(|entity| {
                if soft_delete {
                    Document::new().with_field(SOFT_DELETE_FIELD, entity.is_soft_deleted())
                } else {
                    Document::new()
                }
            })
            .collect()
    }

    fn client_for<T: Searchable>(&self) -> Result<Arc<F::Client>> {
        let collection = T::searchable_as();
        self.clients.get_or_try_insert_with(&collection, || -> Result<F::Client> {
            let schema = self.descriptor.describe(&collection, &T::searchable_field_types(), self.uses_soft_delete::<T>())?;
            info!(collection = %collection, fields = schema.fields.len(), "creating search client");
            debug!(collection = %collection, schema = %schema, "rendered collection schema");
            Ok(self.factory.connect(&schema)?)
        })
    }
}
