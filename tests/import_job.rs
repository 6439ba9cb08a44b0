//! Import submission and job monitoring against a scripted transport.

mod common;

use std::fs;
use std::io::Cursor;

use serde_json::json;
use vepi::import::{FileSource, CSV_CONTENT_TYPE, DEFAULT_FILE_NAME, FILE_FIELD};
use vepi::table::{Scalar, Table};
use vepi::transport::Method;
use vepi::{ClientConfig, DataLayout, JobStatus, PollOptions, VenaClient, VenaError};

use common::{client, json_body, multipart_body, secs, ManualClock, ScriptedTransport, BASE};

fn actuals() -> Table {
    Table::new(vec![
        ("Value", vec![Scalar::from("1000"), Scalar::from("2000")]),
        ("Account", vec![Scalar::from("3910"), Scalar::from("3910")]),
        ("Period", vec![Scalar::Int(1), Scalar::Int(2)]),
    ])
    .expect("table")
}

#[test]
fn start_with_data_stops_at_first_terminal_status() {
    let transport = ScriptedTransport::new();
    transport
        .json(200, json!({"id": "job-1"}))
        .json(200, json!("COMPLETED"));
    let clock = ManualClock::new();

    let outcome = client(&transport, &clock)
        .start_with_data(&actuals())
        .expect("import");

    assert_eq!(outcome.job_id, "job-1");
    assert_eq!(outcome.status, JobStatus::Succeeded);
    assert_eq!(outcome.polls, 1);
    assert_eq!(transport.request_count(), 2);
    assert_eq!(transport.remaining(), 0);
    assert_eq!(clock.sleeps(), vec![secs(1)]);

    let requests = transport.requests();
    assert_eq!(requests[0].method, Method::Post);
    assert_eq!(
        requests[0].url,
        format!("{BASE}/etl/templates/tpl-1/startWithData")
    );
    assert_eq!(
        json_body(&requests[0]),
        &json!({"input": {"data": [
            {"Value": "1000", "Account": "3910", "Period": 1},
            {"Value": "2000", "Account": "3910", "Period": 2}
        ]}})
    );
    assert_eq!(requests[1].url, format!("{BASE}/etl/jobs/job-1/status"));
}

#[test]
fn record_keys_follow_column_order() {
    let transport = ScriptedTransport::new();
    transport
        .json(200, json!({"id": "job-1"}))
        .json(200, json!("COMPLETED"));
    let clock = ManualClock::new();

    client(&transport, &clock)
        .start_with_data(&actuals())
        .expect("import");

    let sent = json_body(&transport.requests()[0]).to_string();
    assert!(sent.starts_with(r#"{"input":{"data":[{"Value":"1000","Account":"3910","Period":1}"#));
}

#[test]
fn reserved_characters_in_ids_stay_in_their_path_segment() {
    let transport = ScriptedTransport::new();
    transport
        .json(200, json!({"id": "job/1"}))
        .json(200, json!("COMPLETED"));
    let clock = ManualClock::new();
    let config = ClientConfig::new("us1", "api-user", "api-key", "tpl#7").expect("config");

    VenaClient::with_transport(config, &transport)
        .with_clock(&clock)
        .start_with_data(&actuals())
        .expect("import");

    let requests = transport.requests();
    assert_eq!(
        requests[0].url,
        format!("{BASE}/etl/templates/tpl%237/startWithData")
    );
    assert_eq!(requests[1].url, format!("{BASE}/etl/jobs/job%2F1/status"));
}

#[test]
fn every_request_is_authenticated() {
    let transport = ScriptedTransport::new();
    transport
        .json(200, json!({"id": 5}))
        .json(200, json!("COMPLETED"));
    let clock = ManualClock::new();

    client(&transport, &clock)
        .start_with_data(&actuals())
        .expect("import");

    for request in transport.requests() {
        // base64("api-user:api-key")
        assert_eq!(
            request.header_value("authorization"),
            Some("Basic YXBpLXVzZXI6YXBpLWtleQ==")
        );
        assert_eq!(request.header_value("accept"), Some("application/json"));
    }
    assert_eq!(transport.count_path("/etl/jobs/5/status"), 1);
}

#[test]
fn polls_once_per_status_and_sleeps_between() {
    let transport = ScriptedTransport::new();
    transport
        .json(200, json!({"id": "job-2"}))
        .json(200, json!("NOT_STARTED"))
        .json(200, json!("NOT_STARTED"))
        .json(200, json!("COMPLETED"));
    let clock = ManualClock::new();

    let outcome = client(&transport, &clock)
        .start_with_data(&actuals())
        .expect("import");

    assert_eq!(outcome.polls, 3);
    assert_eq!(transport.count_path("/etl/jobs/job-2/status"), 3);
    assert_eq!(clock.sleeps(), vec![secs(1), secs(3), secs(3)]);
    assert_eq!(outcome.elapsed, secs(7));
}

#[test]
fn custom_poll_interval_is_used() {
    let transport = ScriptedTransport::new();
    transport
        .json(200, json!({"id": "job-3"}))
        .json(200, json!({"status": "RUNNING"}))
        .json(200, json!({"status": "COMPLETED", "rowsProcessed": 2}));
    let clock = ManualClock::new();

    let outcome = client(&transport, &clock)
        .with_poll_options(
            PollOptions::default()
                .with_initial_delay(secs(0))
                .with_poll_interval(secs(10)),
        )
        .start_with_data(&actuals())
        .expect("import");

    assert_eq!(clock.sleeps(), vec![secs(0), secs(10)]);
    assert_eq!(outcome.payload["rowsProcessed"], 2);
}

#[test]
fn failed_job_reports_error_detail() {
    let transport = ScriptedTransport::new();
    transport
        .json(200, json!({"id": "job-4"}))
        .json(200, json!("RUNNING"))
        .json(200, json!("ERROR"))
        .json(200, json!({"id": "job-4", "error": "Unknown member '9999' in Account"}));
    let clock = ManualClock::new();

    let err = client(&transport, &clock)
        .start_with_data(&actuals())
        .expect_err("job failed");

    match err {
        VenaError::JobFailed {
            job_id,
            status,
            detail,
        } => {
            assert_eq!(job_id, "job-4");
            assert_eq!(status, JobStatus::Failed);
            assert_eq!(detail.as_deref(), Some("Unknown member '9999' in Account"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(transport.count_path("/etl/jobs/job-4/status"), 2);
    assert_eq!(transport.count_path("/etl/jobs/job-4"), 1);
    assert_eq!(transport.remaining(), 0);
}

#[test]
fn cancelled_job_uses_detail_from_status_payload() {
    let transport = ScriptedTransport::new();
    transport
        .json(200, json!({"id": "job-5"}))
        .json(200, json!({"status": "CANCELLED", "message": "cancelled by admin"}));
    let clock = ManualClock::new();

    let err = client(&transport, &clock)
        .start_with_data(&actuals())
        .expect_err("cancelled");

    assert!(matches!(
        err,
        VenaError::JobFailed { status: JobStatus::Cancelled, ref detail, .. }
            if detail.as_deref() == Some("cancelled by admin")
    ));
    assert_eq!(transport.request_count(), 2);
}

#[test]
fn unavailable_detail_does_not_mask_failure() {
    let transport = ScriptedTransport::new();
    transport
        .json(200, json!({"id": "job-6"}))
        .json(200, json!("ERROR"))
        .text(500, "internal error");
    let clock = ManualClock::new();

    let err = client(&transport, &clock)
        .start_with_data(&actuals())
        .expect_err("failed");

    assert!(matches!(
        err,
        VenaError::JobFailed { status: JobStatus::Failed, detail: None, .. }
    ));
}

#[test]
fn timeout_stops_polling() {
    let transport = ScriptedTransport::new();
    transport.json(200, json!({"id": "job-7"}));
    for _ in 0..10 {
        transport.json(200, json!("RUNNING"));
    }
    let clock = ManualClock::new();

    let err = client(&transport, &clock)
        .with_poll_options(PollOptions::default().with_timeout(secs(10)))
        .start_with_data(&actuals())
        .expect_err("timeout");

    match err {
        VenaError::JobTimeout {
            job_id,
            elapsed,
            last_status,
        } => {
            assert_eq!(job_id, "job-7");
            assert_eq!(elapsed, secs(10));
            assert_eq!(last_status, JobStatus::Running);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Queries at t = 1, 4, 7 and 10 seconds, then nothing more.
    assert_eq!(transport.count_path("/etl/jobs/job-7/status"), 4);
    assert_eq!(transport.remaining(), 6);
    assert_eq!(clock.sleeps(), vec![secs(1), secs(3), secs(3), secs(3)]);
}

#[test]
fn import_dataframe_with_array_layout() {
    let transport = ScriptedTransport::new();
    transport
        .json(200, json!({"id": "job-8"}))
        .json(200, json!("COMPLETED"));
    let clock = ManualClock::new();

    client(&transport, &clock)
        .with_data_layout(DataLayout::Arrays)
        .import_dataframe(&actuals())
        .expect("import");

    assert_eq!(
        json_body(&transport.requests()[0]),
        &json!({"input": {"data": [["1000", "3910", 1], ["2000", "3910", 2]]}})
    );
}

#[test]
fn empty_table_is_rejected_before_any_request() {
    let transport = ScriptedTransport::new();
    let clock = ManualClock::new();
    let empty = Table::with_columns(vec!["Value", "Account"]).expect("table");

    let client = client(&transport, &clock);
    assert!(matches!(
        client.start_with_data(&empty),
        Err(VenaError::InvalidTable(_))
    ));
    assert!(matches!(
        client.start_with_file(&empty),
        Err(VenaError::InvalidTable(_))
    ));
    assert_eq!(transport.request_count(), 0);
}

#[test]
fn rejected_submission_surfaces_status_and_body() {
    let transport = ScriptedTransport::new();
    transport.text(400, "{\"message\":\"Template not found\"}");
    let clock = ManualClock::new();

    let err = client(&transport, &clock)
        .start_with_data(&actuals())
        .expect_err("400");

    match err {
        VenaError::Transport { status, body, .. } => {
            assert_eq!(status, Some(400));
            assert!(body.contains("Template not found"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(transport.request_count(), 1);
    assert!(clock.sleeps().is_empty());
}

#[test]
fn unreachable_host_during_polling() {
    let transport = ScriptedTransport::new();
    transport
        .json(200, json!({"id": "job-9"}))
        .unreachable("connection refused");
    let clock = ManualClock::new();

    let err = client(&transport, &clock)
        .start_with_data(&actuals())
        .expect_err("unreachable");
    assert_eq!(err.http_status(), None);
    assert!(err.to_string().contains("connection refused"));
}

#[test]
fn missing_job_id_is_unexpected_response() {
    let transport = ScriptedTransport::new();
    transport.json(200, json!({"status": "accepted"}));
    let clock = ManualClock::new();

    let err = client(&transport, &clock)
        .start_with_data(&actuals())
        .expect_err("no id");
    assert!(matches!(err, VenaError::UnexpectedResponse { .. }));
}

#[test]
fn start_with_file_uploads_path_contents() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("actuals.csv");
    fs::write(&path, "Value,Account\n1000,3910\n").expect("write");

    let transport = ScriptedTransport::new();
    transport
        .json(200, json!({"id": "job-10"}))
        .json(200, json!("COMPLETED"));
    let clock = ManualClock::new();

    client(&transport, &clock)
        .start_with_file(&path)
        .expect("import");

    let requests = transport.requests();
    assert_eq!(
        requests[0].url,
        format!("{BASE}/etl/templates/tpl-1/startWithFile")
    );
    let part = multipart_body(&requests[0])
        .part(FILE_FIELD)
        .expect("file part");
    assert_eq!(part.file_name.as_deref(), Some("actuals.csv"));
    assert_eq!(part.content_type.as_deref(), Some(CSV_CONTENT_TYPE));
    assert_eq!(part.data, b"Value,Account\n1000,3910\n");
}

#[test]
fn start_with_file_from_stream_with_custom_name() {
    let transport = ScriptedTransport::new();
    transport
        .json(200, json!({"id": "job-11"}))
        .json(200, json!("COMPLETED"));
    let clock = ManualClock::new();
    let mut stream = Cursor::new(b"Entity\nV001\n".to_vec());

    client(&transport, &clock)
        .start_with_file_named(FileSource::Stream(&mut stream), "entities.csv")
        .expect("import");

    let part = multipart_body(&transport.requests()[0])
        .part(FILE_FIELD)
        .cloned()
        .expect("file part");
    assert_eq!(part.file_name.as_deref(), Some("entities.csv"));
    assert_eq!(part.data, b"Entity\nV001\n");
}

#[test]
fn start_with_file_from_table_uses_default_name() {
    let transport = ScriptedTransport::new();
    transport
        .json(200, json!({"id": "job-12"}))
        .json(200, json!("COMPLETED"));
    let clock = ManualClock::new();

    client(&transport, &clock)
        .start_with_file(&actuals())
        .expect("import");

    let part = multipart_body(&transport.requests()[0])
        .part(FILE_FIELD)
        .cloned()
        .expect("file part");
    assert_eq!(part.file_name.as_deref(), Some(DEFAULT_FILE_NAME));
    let restored = vepi::table::from_csv_slice(&part.data).expect("csv");
    assert_eq!(restored.column_names(), actuals().column_names());
}
