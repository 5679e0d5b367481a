use std::sync::Arc;

use bytehub_database::test_utils::TestDatabase;
use bytehub_store::{
    FeatureFilter, FeatureOptions, FeatureSelector, FeatureStore, FeatureUpdate, Frame,
    Frequency, LoadMode, LoadOptions, NamespaceFilter, NamespaceOptions, NamespaceUpdate,
    StoreConfig, StoreError, Table,
};
use bytehub_timeseries::{BackendRegistry, VALUE_COLUMN};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn setup() -> (TestDatabase, FeatureStore) {
    init_tracing();
    let test_db = TestDatabase::new().await.unwrap();
    let backends = Arc::new(BackendRegistry::with_defaults().await);
    let store = FeatureStore::new(test_db.connection(), backends);
    (test_db, store)
}

fn jan(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
}

fn value_frame(times: Vec<DateTime<Utc>>, values: Vec<Value>) -> Frame {
    Frame::new(times).with_column(VALUE_COLUMN, values).unwrap()
}

fn file_url(dir: &std::path::Path) -> String {
    url::Url::from_directory_path(dir).unwrap().to_string()
}

async fn create_namespace(store: &FeatureStore, name: &str, url: &str) {
    store
        .create_namespace(name, NamespaceOptions::builder().url(url).build().unwrap())
        .await
        .unwrap();
}

async fn create_feature(store: &FeatureStore, namespace: &str, name: &str) {
    store
        .create_feature(
            name,
            FeatureOptions::builder().namespace(namespace).build().unwrap(),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_example_scenario() {
    let (_db, store) = setup().await;
    let dir = tempfile::tempdir().unwrap();

    let options = NamespaceOptions::from_json(json!({ "url": file_url(dir.path()) })).unwrap();
    store.create_namespace("demo", options).await.unwrap();
    create_feature(&store, "demo", "price").await;

    let frame = value_frame(vec![jan(1), jan(2)], vec![json!(9.5), json!(10.25)]);
    store.save(&frame, Some("price"), Some("demo")).await.unwrap();

    let loaded = store.load("demo/price", LoadOptions::new()).await.unwrap();
    assert_eq!(loaded.column_names(), vec!["demo/price"]);
    assert_eq!(loaded.time(), &[jan(1), jan(2)]);
    assert_eq!(
        loaded.column("demo/price").unwrap(),
        &[json!(9.5), json!(10.25)]
    );
}

#[tokio::test]
async fn test_create_namespace_argument_checks() {
    let err = NamespaceOptions::from_json(json!({ "description": "no url" })).unwrap_err();
    assert!(matches!(err, StoreError::MissingArgument(ref arg) if arg == "url"));

    let err = NamespaceOptions::from_json(json!({ "url": "memory://x", "owner": "me" }))
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidArgument(ref arg) if arg == "owner"));

    let err = NamespaceOptions::builder().build().unwrap_err();
    assert!(matches!(err, StoreError::MissingArgument(_)));
}

#[tokio::test]
async fn test_delete_non_empty_namespace_is_rejected() {
    let (_db, store) = setup().await;
    create_namespace(&store, "demo", "memory://demo").await;
    create_feature(&store, "demo", "price").await;

    let err = store.delete_namespace("demo").await.unwrap_err();
    assert!(matches!(err, StoreError::NonEmptyNamespace(ref ns) if ns == "demo"));

    let namespaces = store
        .list_namespaces(NamespaceFilter::new().name("demo"))
        .await
        .unwrap();
    assert_eq!(namespaces.len(), 1);
    let features = store
        .list_features(FeatureFilter::new().namespace("demo"))
        .await
        .unwrap();
    assert_eq!(features.len(), 1);

    store.delete_feature("demo/price", None).await.unwrap();
    store.delete_namespace("demo").await.unwrap();
    assert!(store
        .list_namespaces(NamespaceFilter::new())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_update_namespace_sets_given_fields() {
    let (_db, store) = setup().await;
    create_namespace(&store, "demo", "memory://demo").await;

    store
        .update_namespace(
            "demo",
            NamespaceUpdate::new()
                .description("Demo data")
                .meta(json!({"owner": "research"})),
        )
        .await
        .unwrap();

    let namespaces = store
        .list_namespaces(NamespaceFilter::new().name("demo"))
        .await
        .unwrap();
    assert_eq!(namespaces.get(0, "description"), Some(&json!("Demo data")));
    assert_eq!(namespaces.get(0, "meta"), Some(&json!({"owner": "research"})));
    assert_eq!(namespaces.get(0, "url"), Some(&json!("memory://demo")));

    let err = store
        .update_namespace("ghost", NamespaceUpdate::new().description("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[tokio::test]
async fn test_delete_missing_records_is_not_found() {
    let (_db, store) = setup().await;
    create_namespace(&store, "demo", "memory://demo").await;

    let err = store.delete_namespace("ghost").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { ref name, .. } if name == "ghost"));

    let err = store.delete_feature("demo/ghost", None).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { ref name, .. } if name == "ghost"));
}

#[tokio::test]
async fn test_create_feature_rejects_unknown_partition() {
    let (_db, store) = setup().await;
    create_namespace(&store, "demo", "memory://demo").await;

    let options = FeatureOptions {
        namespace: Some("demo".to_string()),
        partition: Some("hour".to_string()),
        ..Default::default()
    };
    let err = store.create_feature("bad", options).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidArgument(_)));
    assert!(store
        .list_features(FeatureFilter::new().namespace("demo"))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_oversized_frequencies() {
    let err = LoadOptions::from_json(json!({ "freq": "100000000000000000d" })).unwrap_err();
    assert!(matches!(err, StoreError::InvalidArgument(_)));
    let err = LoadOptions::from_json(json!({ "freq": "10000000000000000s" })).unwrap_err();
    assert!(matches!(err, StoreError::InvalidArgument(_)));

    let (_db, store) = setup().await;
    create_namespace(&store, "demo", "memory://demo").await;
    create_feature(&store, "demo", "price").await;
    let frame = value_frame(vec![jan(1), jan(2)], vec![json!(1), json!(2)]);
    store.save(&frame, Some("price"), Some("demo")).await.unwrap();

    let options = LoadOptions::from_json(json!({ "freq": "4294967295w" })).unwrap();
    let loaded = store.load("demo/price", options).await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded.column("demo/price").unwrap(), &[json!(2)]);
}

#[tokio::test]
async fn test_frame_with_short_created_time_is_rejected() {
    let frame = json!({
        "time": [jan(1), jan(2)],
        "created_time": [jan(1)],
        "columns": [{"name": "value", "values": [1, 2]}]
    });
    assert!(serde_json::from_value::<Frame>(frame).is_err());
}

#[tokio::test]
async fn test_create_feature_in_missing_namespace() {
    let (_db, store) = setup().await;
    let err = store
        .create_feature("ghost/price", FeatureOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NamespaceNotFound(ref ns) if ns == "ghost"));
    assert!(store
        .list_features(FeatureFilter::new())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_list_features_columns_and_filters() {
    let (_db, store) = setup().await;
    create_namespace(&store, "demo", "memory://demo").await;
    create_feature(&store, "demo", "price").await;
    create_feature(&store, "demo", "volume").await;

    let table = store
        .list_features(FeatureFilter::new().regex("^pri"))
        .await
        .unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(
        &table.columns()[..4],
        &["namespace", "name", "description", "meta"]
    );
    assert_eq!(table.get(0, "partition"), Some(&json!("date")));

    let filter = FeatureFilter::from_json(json!({ "namespace": "demo" })).unwrap();
    assert_eq!(store.list_features(filter).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_round_trip_through_file_backend() {
    let (_db, store) = setup().await;
    let dir = tempfile::tempdir().unwrap();
    create_namespace(&store, "demo", &file_url(dir.path())).await;
    store
        .create_feature(
            "demo/temperature",
            FeatureOptions::builder().partition("month").build().unwrap(),
        )
        .await
        .unwrap();

    let times: Vec<_> = (1..=10).map(jan).collect();
    let values: Vec<_> = (1..=10).map(|v| json!(v as f64 / 2.0)).collect();
    store
        .save(&value_frame(times.clone(), values.clone()), Some("demo/temperature"), None)
        .await
        .unwrap();

    let loaded = store
        .load(
            "demo/temperature",
            LoadOptions::new().from_date(jan(1)).to_date(jan(10)),
        )
        .await
        .unwrap();
    assert_eq!(loaded.time(), times.as_slice());
    assert_eq!(loaded.column("demo/temperature").unwrap(), values.as_slice());
}

#[tokio::test]
async fn test_daily_and_weekly_features_align() {
    let (_db, store) = setup().await;
    create_namespace(&store, "demo", "memory://align").await;
    create_feature(&store, "demo", "daily").await;
    create_feature(&store, "demo", "weekly").await;

    let days: Vec<_> = (1..=14).map(jan).collect();
    let daily_values: Vec<_> = (1..=14).map(|v| json!(v)).collect();
    store
        .save(&value_frame(days.clone(), daily_values), Some("demo/daily"), None)
        .await
        .unwrap();
    store
        .save(
            &value_frame(vec![jan(1), jan(8)], vec![json!(100), json!(200)]),
            Some("weekly"),
            Some("demo"),
        )
        .await
        .unwrap();

    let frame = store
        .load(vec!["demo/daily", "demo/weekly"], LoadOptions::new())
        .await
        .unwrap();
    assert_eq!(frame.time(), days.as_slice());
    assert_eq!(frame.column_names(), vec!["demo/daily", "demo/weekly"]);

    let weekly = frame.column("demo/weekly").unwrap();
    assert!(weekly[..7].iter().all(|v| *v == json!(100)));
    assert!(weekly[7..].iter().all(|v| *v == json!(200)));
}

#[tokio::test]
async fn test_resampled_load_labels_buckets() {
    let (_db, store) = setup().await;
    create_namespace(&store, "demo", "memory://resample").await;
    create_feature(&store, "demo", "hourly").await;

    let times: Vec<_> = (0..48).map(|h| jan(1) + Duration::hours(h)).collect();
    let values: Vec<_> = (0..48).map(|v| json!(v)).collect();
    store
        .save(&value_frame(times, values), Some("demo/hourly"), None)
        .await
        .unwrap();

    let options = LoadOptions::from_json(json!({ "freq": "1d" })).unwrap();
    let frame = store.load("demo/hourly", options).await.unwrap();
    assert_eq!(frame.time(), &[jan(1), jan(2)]);
    assert_eq!(frame.column("demo/hourly").unwrap(), &[json!(23), json!(47)]);
}

#[tokio::test]
async fn test_time_travel() {
    let (_db, store) = setup().await;
    create_namespace(&store, "demo", "memory://travel").await;
    create_feature(&store, "demo", "price").await;

    let t = jan(5);
    let c1 = jan(6);
    let c2 = jan(7);
    for (created, value) in [(c1, json!("v1")), (c2, json!("v2"))] {
        let frame = value_frame(vec![t], vec![value])
            .with_created_time(vec![created])
            .unwrap();
        store.save(&frame, Some("demo/price"), None).await.unwrap();
    }

    let value_at = |frame: &Frame| frame.value_at(t, "demo/price").cloned();

    for tt in [c1, c1 + Duration::hours(12)] {
        let frame = store
            .load("demo/price", LoadOptions::new().time_travel(tt))
            .await
            .unwrap();
        assert_eq!(value_at(&frame), Some(json!("v1")));
    }

    let frame = store
        .load("demo/price", LoadOptions::new().time_travel(c2))
        .await
        .unwrap();
    assert_eq!(value_at(&frame), Some(json!("v2")));

    let frame = store.load("demo/price", LoadOptions::new()).await.unwrap();
    assert_eq!(value_at(&frame), Some(json!("v2")));
}

#[tokio::test]
async fn test_parallel_and_in_memory_loads_agree() {
    let (_db, store) = setup().await;
    create_namespace(&store, "demo", "memory://modes").await;
    for (i, name) in ["a", "b", "c"].into_iter().enumerate() {
        create_feature(&store, "demo", name).await;
        let offset = i as u32;
        let frame = value_frame(
            vec![jan(1 + offset), jan(4 + offset), jan(9 + offset)],
            vec![json!(i), Value::Null, json!(i * 10)],
        );
        store
            .save(&frame, Some(name), Some("demo"))
            .await
            .unwrap();
    }

    let selector = vec!["demo/a", "demo/b", "demo/c"];
    let in_memory = store
        .load(selector.clone(), LoadOptions::new().mode(LoadMode::InMemory))
        .await
        .unwrap();
    let parallel = store
        .load(selector, LoadOptions::new().mode(LoadMode::Parallel))
        .await
        .unwrap();
    assert_eq!(in_memory, parallel);
}

#[tokio::test]
async fn test_identifier_shapes_resolve_alike() {
    let (_db, store) = setup().await;
    create_namespace(&store, "demo", "memory://ids").await;
    create_feature(&store, "demo", "price").await;
    store
        .save(&value_frame(vec![jan(1)], vec![json!(3)]), Some("demo/price"), None)
        .await
        .unwrap();

    let table = Table::new(["namespace", "name"])
        .with_row(vec![json!("demo"), json!("price")])
        .unwrap();
    let selectors: Vec<FeatureSelector> = vec![
        "demo/price".into(),
        table.into(),
        FeatureSelector::try_from(json!([{ "namespace": "demo", "name": "price" }])).unwrap(),
        FeatureSelector::try_from(json!(["demo/price"])).unwrap(),
    ];

    for selector in selectors {
        let last = store.last(selector).await.unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last.get("demo/price"), Some(&Some(json!(3))));
    }
}

#[tokio::test]
async fn test_save_single_value_column_needs_name() {
    let (_db, store) = setup().await;
    let frame = value_frame(vec![jan(1)], vec![json!(1)]);
    let err = store.save(&frame, None, Some("demo")).await.unwrap_err();
    assert!(matches!(err, StoreError::MissingArgument(ref arg) if arg == "name"));
}

#[tokio::test]
async fn test_multi_column_save_checks_every_feature_first() {
    let (_db, store) = setup().await;
    create_namespace(&store, "demo", "memory://multi").await;
    create_feature(&store, "demo", "a").await;

    let frame = Frame::new(vec![jan(1)])
        .with_column("demo/a", vec![json!(1)])
        .unwrap()
        .with_column("demo/missing", vec![json!(2)])
        .unwrap();
    let err = store.save(&frame, None, None).await.unwrap_err();
    assert!(matches!(err, StoreError::FeatureNotFound { ref name, .. } if name == "missing"));

    let last = store.last("demo/a").await.unwrap();
    assert_eq!(last.get("demo/a"), Some(&None));

    create_feature(&store, "demo", "missing").await;
    store.save(&frame, None, None).await.unwrap();
    let last = store.last(vec!["demo/a", "demo/missing"]).await.unwrap();
    assert_eq!(last.get("demo/a"), Some(&Some(json!(1))));
    assert_eq!(last.get("demo/missing"), Some(&Some(json!(2))));
}

#[tokio::test]
async fn test_load_unknown_feature() {
    let (_db, store) = setup().await;
    create_namespace(&store, "demo", "memory://unknown").await;
    let err = store
        .load("demo/nothing", LoadOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::FeatureNotFound { .. }));

    let err = store.load("nothing", LoadOptions::new()).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidInput(_)));
}

#[tokio::test]
async fn test_ambiguous_update_without_namespace() {
    let (_db, store) = setup().await;
    for ns in ["north", "south"] {
        create_namespace(&store, ns, "memory://regions").await;
        create_feature(&store, ns, "rainfall").await;
    }

    let err = store
        .update_feature("rainfall", None, FeatureUpdate::new().description("mm"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::AmbiguousMatch { count: 2, .. }));

    store
        .update_feature("rainfall", Some("north"), FeatureUpdate::new().description("mm"))
        .await
        .unwrap();
    let table = store
        .list_features(FeatureFilter::new().namespace("north"))
        .await
        .unwrap();
    assert_eq!(table.get(0, "description"), Some(&json!("mm")));
}

#[tokio::test]
async fn test_delete_feature_drops_stored_values() {
    let (_db, store) = setup().await;
    let dir = tempfile::tempdir().unwrap();
    create_namespace(&store, "demo", &file_url(dir.path())).await;
    create_feature(&store, "demo", "price").await;
    store
        .save(&value_frame(vec![jan(1)], vec![json!(1)]), Some("demo/price"), None)
        .await
        .unwrap();
    assert!(dir.path().join("price").exists());

    store.delete_feature("price", Some("demo")).await.unwrap();
    assert!(!dir.path().join("price").exists());

    create_feature(&store, "demo", "price").await;
    let last = store.last("demo/price").await.unwrap();
    assert_eq!(last.get("demo/price"), Some(&None));
}

#[tokio::test]
async fn test_tasks_are_not_implemented() {
    let (_db, store) = setup().await;
    assert!(matches!(
        store.create_task().await,
        Err(StoreError::NotImplemented("create_task"))
    ));
    assert!(matches!(
        store.update_task().await,
        Err(StoreError::NotImplemented(_))
    ));
    assert!(matches!(
        store.delete_task().await,
        Err(StoreError::NotImplemented(_))
    ));
}

#[tokio::test]
async fn test_connect_registers_default_backends() {
    let store = FeatureStore::connect(&StoreConfig::new("sqlite::memory:"))
        .await
        .unwrap();
    assert_eq!(store.backends().schemes().await, vec!["file", "memory"]);

    create_namespace(&store, "demo", "memory://connect").await;
    create_feature(&store, "demo", "price").await;
    let frequency: Frequency = "1h".parse().unwrap();
    let frame = store
        .load("demo/price", LoadOptions::new().freq(frequency))
        .await
        .unwrap();
    assert!(frame.is_empty());
}
