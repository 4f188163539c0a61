use parking_lot::Mutex;
use std::sync::Arc;

use xsbridge_core::config::EngineConfig;
use xsbridge_core::error::Error;
use xsbridge_core::query::SearchQuery;
use xsbridge_core::schema::{CollectionSchema, FieldSpec, FieldTypes, IndexMode, SOFT_DELETE_FIELD};
use xsbridge_core::traits::{ClientFactory, SearchClient, SearchSession, Searchable};
use xsbridge_core::types::{Document, FieldMap, FieldValue, SearchResults};
use xsbridge_core::SchemaError;
use xsbridge_engine::SearchEngineAdapter;

const KEY: &str = "xun_search_object_id";

fn init_logs() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Connect(String),
    Update(Document),
    Delete(Vec<String>),
    Clean,
    SetLimit(usize, usize),
    SetFuzzy(bool),
    SetQuery(String),
    AddRange(String, Option<FieldValue>, Option<FieldValue>),
    SetSort(String, bool),
    Execute,
}

/// Records every daemon call and answers searches with canned hits.
#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
    hits: Arc<Mutex<SearchResults>>,
    schemas: Arc<Mutex<Vec<CollectionSchema>>>,
}

impl Recorder {
    fn push(&self, call: Call) { self.calls.lock().push(call); }
    fn calls(&self) -> Vec<Call> { self.calls.lock().clone() }
    fn clear(&self) { self.calls.lock().clear(); }
    fn answer(&self, results: SearchResults) { *self.hits.lock() = results; }
}

struct FakeFactory(Recorder);

impl ClientFactory for FakeFactory {
    type Client = FakeClient;

    fn connect(&self, schema: &CollectionSchema) -> anyhow::Result<FakeClient> {
        self.0.push(Call::Connect(schema.name.clone()));
        self.0.schemas.lock().push(schema.clone());
        Ok(FakeClient(self.0.clone()))
    }
}

struct FakeClient(Recorder);

impl SearchClient for FakeClient {
    fn update(&self, doc: Document) -> anyhow::Result<()> {
        self.0.push(Call::Update(doc));
        Ok(())
    }

    fn delete(&self, keys: &[String]) -> anyhow::Result<()> {
        self.0.push(Call::Delete(keys.to_vec()));
        Ok(())
    }

    fn clean(&self) -> anyhow::Result<()> {
        self.0.push(Call::Clean);
        Ok(())
    }

    fn search(&self) -> Box<dyn SearchSession + '_> { Box::new(FakeSession { recorder: &self.0, total: 0 }) }
}

struct FakeSession<'a> {
    recorder: &'a Recorder,
    total: u64,
}

impl SearchSession for FakeSession<'_> {
    fn set_limit(&mut self, limit: usize, offset: usize) { self.recorder.push(Call::SetLimit(limit, offset)); }
    fn set_fuzzy(&mut self, fuzzy: bool) { self.recorder.push(Call::SetFuzzy(fuzzy)); }
    fn set_query(&mut self, query: &str) { self.recorder.push(Call::SetQuery(query.to_string())); }
    fn add_range(&mut self, field: &str, from: Option<&FieldValue>, to: Option<&FieldValue>) {
        self.recorder.push(Call::AddRange(field.to_string(), from.cloned(), to.cloned()));
    }
    fn set_sort(&mut self, field: &str, ascending: bool) { self.recorder.push(Call::SetSort(field.to_string(), ascending)); }
    fn execute(&mut self) -> anyhow::Result<Vec<Document>> {
        self.recorder.push(Call::Execute);
        let hits = self.recorder.hits.lock().clone();
        self.total = hits.total;
        Ok(hits.docs)
    }
    fn last_count(&self) -> u64 { self.total }
}

#[derive(Debug, Clone, PartialEq)]
struct Article {
    id: u32,
    title: String,
    status: String,
}

impl Article {
    fn new(id: u32, title: &str) -> Self { Self { id, title: title.to_string(), status: "open".to_string() } }
}

impl Searchable for Article {
    fn searchable_as() -> String { "articles".to_string() }

    fn searchable_field_types() -> FieldTypes {
        FieldTypes::new()
            .field("title", FieldSpec::title())
            .field("status", FieldSpec::string().index(IndexMode::SelfOnly))
    }

    fn search_key(&self) -> String { self.id.to_string() }

    fn to_searchable_fields(&self) -> FieldMap {
        FieldMap::from([
            ("title".to_string(), FieldValue::from(self.title.as_str())),
            ("status".to_string(), FieldValue::from(self.status.as_str())),
        ])
    }

    fn search_metadata(&self) -> FieldMap { FieldMap::from([("lang".to_string(), FieldValue::from("en"))]) }
}

#[derive(Debug, Clone)]
struct Note {
    id: u32,
    trashed: bool,
}

impl Searchable for Note {
    fn searchable_as() -> String { "notes".to_string() }
    fn searchable_field_types() -> FieldTypes { FieldTypes::new().field("body", FieldSpec::body()) }
    fn uses_soft_delete() -> bool { true }
    fn search_key(&self) -> String { self.id.to_string() }
    fn to_searchable_fields(&self) -> FieldMap { FieldMap::from([("body".to_string(), FieldValue::from("text"))]) }
    fn is_soft_deleted(&self) -> bool { self.trashed }
}

struct Broken;

impl Searchable for Broken {
    fn searchable_as() -> String { "broken".to_string() }
    fn searchable_field_types() -> FieldTypes {
        FieldTypes::new().field("a", FieldSpec::title()).field("b", FieldSpec::title())
    }
    fn search_key(&self) -> String { String::new() }
    fn to_searchable_fields(&self) -> FieldMap { FieldMap::new() }
}

fn adapter_with(config: EngineConfig) -> (SearchEngineAdapter<FakeFactory>, Recorder) {
    init_logs();
    let recorder = Recorder::default();
    (SearchEngineAdapter::new(config, FakeFactory(recorder.clone())), recorder)
}

fn adapter() -> (SearchEngineAdapter<FakeFactory>, Recorder) { adapter_with(EngineConfig::default()) }

fn hit(key: &str) -> Document { Document::new().with_field(KEY, key) }

#[test]
fn update_sends_one_document_per_entity() {
    let (engine, recorder) = adapter();
    engine.update(&[Article::new(1, "Rust"), Article::new(2, "Go")]).expect("update");

    let expected = Document::new()
        .with_field(KEY, "1")
        .with_field("title", "Rust")
        .with_field("status", "open")
        .with_field("lang", "en");
    let calls = recorder.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0], Call::Connect("articles".into()));
    assert_eq!(calls[1], Call::Update(expected));
    assert!(matches!(&calls[2], Call::Update(doc) if doc.get(KEY) == Some(&FieldValue::from("2"))));
}

#[test]
fn client_is_created_once_per_collection() {
    let (engine, recorder) = adapter();
    engine.update(&[Article::new(1, "a")]).expect("update");
    engine.update(&[Article::new(2, "b")]).expect("update");
    engine.clean::<Article>().expect("clean");
    let connects = recorder.calls().iter().filter(|c| matches!(c, Call::Connect(_))).count();
    assert_eq!(connects, 1);
    assert_eq!(engine.cached_collections(), vec!["articles".to_string()]);
}

#[test]
fn soft_delete_flag_is_attached_when_enabled() {
    let (engine, recorder) = adapter_with(EngineConfig { soft_delete: true, ..EngineConfig::default() });
    engine.update(&[Note { id: 1, trashed: true }, Note { id: 2, trashed: false }]).expect("update");

    let schema = recorder.schemas.lock()[0].clone();
    assert!(schema.has_soft_delete());
    let flags: Vec<Option<FieldValue>> = recorder
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::Update(doc) => Some(doc.get(SOFT_DELETE_FIELD).cloned()),
            _ => None,
        })
        .collect();
    assert_eq!(flags, vec![Some(FieldValue::Integer(1)), Some(FieldValue::Integer(0))]);
}

#[test]
fn soft_delete_is_ignored_when_disabled() {
    let (engine, recorder) = adapter();
    engine.update(&[Note { id: 1, trashed: true }]).expect("update");
    assert!(!recorder.schemas.lock()[0].has_soft_delete());
    assert!(matches!(&recorder.calls()[1], Call::Update(doc) if doc.get(SOFT_DELETE_FIELD).is_none()));
}

#[test]
fn delete_of_empty_batch_makes_no_call() {
    let (engine, recorder) = adapter();
    engine.delete::<Article>(&[]).expect("delete");
    assert!(recorder.calls().is_empty());
}

#[test]
fn delete_is_one_bulk_call_in_batch_order() {
    let (engine, recorder) = adapter();
    engine.delete(&[Article::new(7, "a"), Article::new(3, "b")]).expect("delete");
    assert_eq!(recorder.calls(), vec![Call::Connect("articles".into()), Call::Delete(vec!["7".into(), "3".into()])]);
}

#[test]
fn paginate_converts_page_number() {
    let (engine, recorder) = adapter();
    engine.paginate::<Article>(&SearchQuery::new("rust"), 10, 2).expect("paginate");
    assert_eq!(recorder.calls()[1], Call::SetLimit(10, 10));

    recorder.clear();
    engine.paginate::<Article>(&SearchQuery::new("rust"), 10, 1).expect("paginate");
    assert_eq!(recorder.calls()[0], Call::SetLimit(10, 0));
}

#[test]
fn search_without_limit_keeps_daemon_default() {
    let (engine, recorder) = adapter();
    engine.search::<Article>(&SearchQuery::new("rust")).expect("search");
    assert!(!recorder.calls().iter().any(|c| matches!(c, Call::SetLimit(..))));

    recorder.clear();
    engine.search::<Article>(&SearchQuery::new("rust").limit(5)).expect("search");
    assert_eq!(recorder.calls()[0], Call::SetLimit(5, 0));
}

#[test]
fn structured_search_drives_session_in_order() {
    let (engine, recorder) = adapter();
    recorder.answer(SearchResults { docs: vec![hit("2"), hit("1")], total: 12 });

    let query = SearchQuery::new("rust")
        .where_eq("status", "open")
        .range("views", Some(10.into()), None)
        .range("year", Some(2020.into()), Some(2024.into()))
        .order("views", false)
        .fuzzy(true);
    let results = engine.search::<Article>(&query).expect("search");

    assert_eq!(results.total, 12);
    assert_eq!(engine.total_count(&results), 12);
    assert_eq!(
        recorder.calls()[1..].to_vec(),
        vec![
            Call::SetFuzzy(true),
            Call::SetQuery("rust status:open".into()),
            Call::AddRange("views".into(), Some(FieldValue::Integer(10)), None),
            Call::AddRange("year".into(), Some(FieldValue::Integer(2020)), Some(FieldValue::Integer(2024))),
            Call::SetSort("views".into(), false),
            Call::Execute,
        ]
    );
}

#[test]
fn delegated_search_hands_over_the_session() {
    let (engine, recorder) = adapter();
    let query = SearchQuery::new("raw text").where_eq("status", "open").delegate(|session, text, options| {
        assert_eq!(text, "raw text");
        assert_eq!(options.hits_per_page, Some(5));
        assert_eq!(options.page, Some(2));
        session.set_query("custom");
        Ok(SearchResults { docs: vec![], total: 99 })
    });
    let results = engine.paginate::<Article>(&query, 5, 3).expect("search");

    assert_eq!(results.total, 99);
    assert_eq!(
        recorder.calls(),
        vec![Call::Connect("articles".into()), Call::SetLimit(5, 10), Call::SetQuery("custom".into())]
    );
}

#[test]
fn delegated_search_errors_pass_through() {
    let (engine, _recorder) = adapter();
    let query = SearchQuery::new("x").delegate(|_, _, _| Err(anyhow::anyhow!("daemon offline")));
    let err = engine.search::<Article>(&query).unwrap_err();
    assert!(matches!(err, Error::Client(_)));
    assert_eq!(err.to_string(), "daemon offline");
}

#[test]
fn map_ids_keeps_order_and_duplicates() {
    let (engine, _recorder) = adapter();
    let results = SearchResults { docs: vec![hit("3"), hit("1"), hit("3")], total: 3 };
    assert_eq!(engine.map_ids(&results), vec!["3", "1", "3"]);
}

#[test]
fn map_follows_ranking_and_drops_missing() {
    let (engine, _recorder) = adapter();
    let results = SearchResults { docs: vec![hit("1"), hit("2"), hit("3")], total: 3 };
    let store = vec![Article::new(3, "c"), Article::new(1, "a")];
    let resolver = |keys: &[String]| -> anyhow::Result<Vec<Article>> {
        assert_eq!(keys, ["1", "2", "3"]);
        Ok(store.iter().filter(|a| keys.contains(&a.search_key())).cloned().collect())
    };
    let mapped = engine.map(&results, &resolver).expect("map");
    assert_eq!(mapped, vec![Article::new(1, "a"), Article::new(3, "c")]);
}

#[test]
fn map_of_no_hits_skips_resolver() {
    let (engine, _recorder) = adapter();
    let resolver = |_: &[String]| -> anyhow::Result<Vec<Article>> { panic!("resolver must not run") };
    assert!(engine.map(&SearchResults::default(), &resolver).expect("map").is_empty());
}

#[test]
fn resolver_failure_is_reported() {
    let (engine, _recorder) = adapter();
    let results = SearchResults { docs: vec![hit("1")], total: 1 };
    let resolver = |_: &[String]| -> anyhow::Result<Vec<Article>> { Err(anyhow::anyhow!("db down")) };
    assert!(matches!(engine.map(&results, &resolver), Err(Error::Resolve(_))));
}

#[test]
fn invalid_schema_fails_and_is_not_cached() {
    let (engine, recorder) = adapter();
    for _ in 0..2 {
        let err = engine.clean::<Broken>().unwrap_err();
        assert!(matches!(err, Error::Schema(SchemaError::DuplicateTitle { .. })));
    }
    assert!(recorder.calls().is_empty());
    assert!(engine.cached_collections().is_empty());
}

#[test]
fn evict_reconnects_on_next_use() {
    let (engine, recorder) = adapter();
    engine.clean::<Article>().expect("clean");
    assert!(engine.evict("articles"));
    engine.clean::<Article>().expect("clean");
    let connects = recorder.calls().iter().filter(|c| matches!(c, Call::Connect(_))).count();
    assert_eq!(connects, 2);
}
