use ironframe::ConfigView;
use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq)]
struct DbConfig {
    host: String,
    port: u16,
}

#[test]
fn parses_nested_struct_from_json_object() {
    let view = ConfigView::from_json_str(
        r#"{"db": {"host": "localhost", "port": 5432}, "debug": true}"#,
    )
    .unwrap();

    let db: DbConfig = view.get("db").unwrap();
    assert_eq!(db, DbConfig { host: "localhost".into(), port: 5432 });

    let debug: bool = view.get("debug").unwrap();
    assert!(debug);
}

#[test]
fn rejects_non_object_root() {
    let err = ConfigView::from_json_str("[1, 2, 3]").unwrap_err();
    assert!(err.to_string().contains("JSON object"));
}

#[test]
fn missing_key_is_an_error_but_get_or_falls_back() {
    let view = ConfigView::new();
    assert!(view.get::<String>("missing").is_err());
    assert_eq!(view.get_or("missing", "fallback".to_string()).unwrap(), "fallback");
}

#[test]
fn set_overrides_and_contains_reports_presence() {
    let mut view = ConfigView::new();
    assert!(!view.contains("retries"));
    view.set("retries", serde_json::json!(3));
    assert!(view.contains("retries"));
    assert_eq!(view.get::<u32>("retries").unwrap(), 3);
}
