//! Purpose: Lock the dump event decoding contract at the public API boundary.
//! Exports: Integration tests only (no runtime exports).
//! Role: Table of valid and invalid lines with the exact diagnostics callers match on.
//! Invariants: Error messages asserted here are part of the stable contract.
//! Invariants: The unsupported-version case is asserted by kind, never by text.

use phant::api::{
    App, CommandMeta, ErrorKind, Event, HostMeta, HttpMeta, Payload, REQUIRED_EVENT_KEYS,
    SourceType, TraceFrame, decode_line, supported_schema_version,
};
use serde_json::{Value, json};

const HTTP_LINE: &str = r#"{"schemaVersion":1,"id":"01JNFKEC8Q4Y8S97R2M5W12Q9H","timestamp":"2026-02-28T11:20:31.331Z","sourceType":"http","projectRoot":"/home/dev/code/example-app","phpSapi":"fpm-fcgi","requestId":"f2a1a3d2-2087-4dc4-9fc4-3f8e75ae3202","http":{"method":"GET","scheme":"https","host":"example.test","path":"/users/42"},"isDd":false,"payloadFormat":"json","payload":{"user":{"id":42}},"trace":[],"host":{"hostname":"dev-linux","pid":48211}}"#;
const CLI_LINE: &str = r#"{"schemaVersion":1,"id":"01JNFKEPA3A4CNV3K2E12YVYTG","timestamp":"2026-02-28T11:21:18.011Z","sourceType":"cli","projectRoot":"/home/dev/code/example-app","phpSapi":"cli","requestId":null,"command":{"name":"artisan","args":["queue:work"]},"isDd":false,"payloadFormat":"json","payload":{"ok":true},"trace":[],"host":{"hostname":"dev-linux","pid":49302}}"#;

fn with(line: &str, edit: impl FnOnce(&mut serde_json::Map<String, Value>)) -> String {
    let mut value: Value = serde_json::from_str(line).expect("fixture json");
    edit(value.as_object_mut().expect("fixture object"));
    value.to_string()
}

#[test]
fn empty_line_is_ignored() {
    let app = App::new();
    let event = app.decode_dump_event_line("   \n").expect("no error");
    assert!(event.is_none());
    assert!(decode_line("").expect("no error").is_none());
}

#[test]
fn valid_http_event() {
    let event = App::new()
        .decode_dump_event_line(HTTP_LINE)
        .expect("valid")
        .expect("event");
    assert_eq!(event.source_type, SourceType::Http);
    assert_eq!(
        event.request_id.as_deref(),
        Some("f2a1a3d2-2087-4dc4-9fc4-3f8e75ae3202")
    );
    let http = event.http.expect("http");
    assert_eq!(http.method, "GET");
    assert_eq!(http.host, "example.test");
    assert_eq!(event.payload.get(), r#"{"user":{"id":42}}"#);
    assert!(event.trace.is_empty());
}

#[test]
fn valid_cli_event_with_null_request_id() {
    let event = decode_line(CLI_LINE).expect("valid").expect("event");
    assert_eq!(event.source_type, SourceType::Cli);
    assert!(event.request_id.is_none());
    assert_eq!(event.command.expect("command").args, vec!["queue:work"]);
}

#[test]
fn worker_and_cron_events_decode() {
    for source in ["worker", "cron"] {
        let line = with(CLI_LINE, |obj| {
            obj.insert("sourceType".to_string(), json!(source));
        });
        let event = decode_line(&line).expect("valid").expect("event");
        assert_eq!(event.source_type.as_str(), source);
    }
}

#[test]
fn removing_any_required_key_names_it() {
    for key in REQUIRED_EVENT_KEYS {
        let line = with(CLI_LINE, |obj| {
            obj.remove(*key);
        });
        let err = decode_line(&line).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingField);
        assert!(
            err.to_string()
                .contains(&format!("missing required dump event field: {key}")),
            "{err}"
        );
    }
}

#[test]
fn invalid_cases() {
    let cases: Vec<(&str, String, &str)> = vec![
        (
            "invalid sourceType",
            with(CLI_LINE, |obj| {
                obj.insert("sourceType".to_string(), json!("job"));
            }),
            "sourceType must be one of: http, cli, worker, cron",
        ),
        (
            "requestId wrong type",
            with(CLI_LINE, |obj| {
                obj.insert("requestId".to_string(), json!(123));
            }),
            "requestId must be null or string",
        ),
        (
            "isDd wrong type",
            with(CLI_LINE, |obj| {
                obj.insert("isDd".to_string(), json!("no"));
            }),
            "isDd must be a boolean",
        ),
        (
            "trace wrong type",
            with(CLI_LINE, |obj| {
                obj.insert("trace".to_string(), json!({}));
            }),
            "trace must be an array",
        ),
        (
            "payloadFormat not json",
            with(CLI_LINE, |obj| {
                obj.insert("payloadFormat".to_string(), json!("text"));
            }),
            "payloadFormat must be json for schemaVersion 1",
        ),
        (
            "http source missing http meta",
            with(HTTP_LINE, |obj| {
                obj.remove("http");
            }),
            "http metadata is required when sourceType is http",
        ),
        (
            "cli source missing command meta",
            with(CLI_LINE, |obj| {
                obj.remove("command");
            }),
            "command metadata is required when sourceType is cli, worker, or cron",
        ),
        (
            "empty id",
            with(CLI_LINE, |obj| {
                obj.insert("id".to_string(), json!(""));
            }),
            "missing required dump event fields",
        ),
        (
            "non-positive pid",
            with(CLI_LINE, |obj| {
                obj.insert("host".to_string(), json!({"hostname": "h", "pid": 0}));
            }),
            "invalid host metadata",
        ),
        (
            "offset timestamp",
            with(CLI_LINE, |obj| {
                obj.insert(
                    "timestamp".to_string(),
                    json!("2026-02-28T12:21:18.011+01:00"),
                );
            }),
            "timestamp must be UTC (Z)",
        ),
        (
            "unparseable timestamp",
            with(CLI_LINE, |obj| {
                obj.insert("timestamp".to_string(), json!("28/02/2026"));
            }),
            "timestamp must be RFC3339Nano",
        ),
        (
            "partial http meta",
            with(HTTP_LINE, |obj| {
                obj.insert("http".to_string(), json!({"method": "GET"}));
            }),
            "http metadata is missing required fields",
        ),
        (
            "unnamed command",
            with(CLI_LINE, |obj| {
                obj.insert("command".to_string(), json!({"args": ["x"]}));
            }),
            "command metadata is missing required field: name",
        ),
    ];

    for (name, line, want) in cases {
        let err = decode_line(&line).unwrap_err();
        assert!(
            err.to_string().contains(want),
            "{name}: expected error containing {want:?}, got {err}"
        );
    }
}

#[test]
fn unsupported_schema_version_is_identified_by_kind() {
    for version in [0, 2, 99] {
        let line = with(CLI_LINE, |obj| {
            obj.insert("schemaVersion".to_string(), json!(version));
        });
        let err = decode_line(&line).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedSchemaVersion);
        assert!(err.is_unsupported_schema_version());
    }
}

#[test]
fn request_id_accepts_any_string() {
    for request_id in ["", "abc", "f2a1a3d2-2087-4dc4-9fc4-3f8e75ae3202"] {
        let line = with(HTTP_LINE, |obj| {
            obj.insert("requestId".to_string(), json!(request_id));
        });
        let event = decode_line(&line).expect("valid").expect("event");
        assert_eq!(event.request_id.as_deref(), Some(request_id));
    }
}

#[test]
fn malformed_payload_surfaces_parser_diagnostic() {
    let line = r#"{"schemaVersion":1,"id":"1","timestamp":"2026-02-28T11:20:31.331Z","sourceType":"cli","projectRoot":"/x","phpSapi":"cli","requestId":null,"command":{"name":"artisan"},"isDd":false,"payloadFormat":"json","payload":,"trace":[],"host":{"hostname":"h","pid":1}}"#;
    let err = decode_line(line).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(err.to_string().contains("expected value"), "{err}");
}

#[test]
fn decode_is_idempotent() {
    let first = decode_line(HTTP_LINE).expect("valid");
    let second = decode_line(HTTP_LINE).expect("valid");
    assert_eq!(first, second);

    let bad = with(CLI_LINE, |obj| {
        obj.insert("isDd".to_string(), json!(1));
    });
    let first = decode_line(&bad).unwrap_err().to_string();
    let second = decode_line(&bad).unwrap_err().to_string();
    assert_eq!(first, second);
}

#[test]
fn constructed_event_survives_wire_round_trip() {
    let event = Event {
        schema_version: supported_schema_version(),
        id: "01JNFKF0ZKQ7P5T3H4Y7W2C8XN".to_string(),
        timestamp: "2026-03-01T08:00:00.5Z".to_string(),
        source_type: SourceType::Http,
        project_root: "/srv/shop".to_string(),
        php_sapi: "fpm-fcgi".to_string(),
        request_id: Some("req-1".to_string()),
        http: Some(HttpMeta {
            method: "POST".to_string(),
            scheme: "https".to_string(),
            host: "shop.test".to_string(),
            path: "/cart".to_string(),
            query: Some("coupon=spring".to_string()),
            status_code: Some(201),
            client_ip: Some("10.0.0.7".to_string()),
            user_agent: Some("curl/8.5.0".to_string()),
        }),
        command: None,
        is_dd: true,
        payload_format: "json".to_string(),
        payload: Payload::from_value(&json!({"cart": [1, 2, 3], "total": 12.5})).expect("payload"),
        trace: vec![
            TraceFrame {
                file: Some("/srv/shop/app/Http/CartController.php".to_string()),
                line: Some(88),
                func: Some("store".to_string()),
            },
            TraceFrame::default(),
        ],
        host: HostMeta {
            hostname: "web-1".to_string(),
            pid: 1234,
        },
    };

    let line = event.to_line().expect("encode");
    let decoded = decode_line(&line).expect("valid").expect("event");
    assert_eq!(decoded, event);
}

#[test]
fn constructed_command_event_survives_wire_round_trip() {
    let event = Event {
        schema_version: supported_schema_version(),
        id: "job-7".to_string(),
        timestamp: "2026-03-01T08:00:00Z".to_string(),
        source_type: SourceType::Cron,
        project_root: "/srv/shop".to_string(),
        php_sapi: "cli".to_string(),
        request_id: None,
        http: None,
        command: Some(CommandMeta {
            name: "artisan".to_string(),
            args: vec!["schedule:run".to_string()],
            cwd: Some("/srv/shop".to_string()),
        }),
        is_dd: false,
        payload_format: "json".to_string(),
        payload: Payload::from_json("[\"ran\"]").expect("payload"),
        trace: Vec::new(),
        host: HostMeta {
            hostname: "worker-2".to_string(),
            pid: 77,
        },
    };

    let line = event.to_line().expect("encode");
    assert!(line.contains("\"requestId\":null"));
    let decoded = decode_line(&line).expect("valid").expect("event");
    assert_eq!(decoded, event);
}

#[test]
fn decoding_from_many_threads_agrees() {
    let handles: Vec<_> = (0..8)
        .map(|_| std::thread::spawn(|| decode_line(HTTP_LINE).expect("valid").expect("event")))
        .collect();
    let expected = decode_line(HTTP_LINE).expect("valid").expect("event");
    for handle in handles {
        assert_eq!(handle.join().expect("thread"), expected);
    }
}

#[test]
fn null_payload_decodes_and_round_trips() {
    let line = with(CLI_LINE, |obj| {
        obj.insert("payload".to_string(), Value::Null);
    });
    let event = decode_line(&line).expect("valid").expect("event");
    assert_eq!(event.payload, Payload::from_json("null").expect("payload"));

    let again = decode_line(&event.to_line().expect("encode"))
        .expect("valid")
        .expect("event");
    assert_eq!(again, event);
}

#[test]
fn repeated_key_last_value_wins() {
    let line = CLI_LINE.replacen(r#""id":"#, r#""id":"dropped","id":"#, 1);
    let event = decode_line(&line).expect("valid").expect("event");
    assert_eq!(event.id, "01JNFKEPA3A4CNV3K2E12YVYTG");
}
