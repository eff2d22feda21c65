// Connection-level behaviour against scripted and in-memory transports.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use timely_core::connection::Connection;
use timely_core::decode::Members;
use timely_core::error::{Result, TimelyError, TransportError};
use timely_proto::prelude::{Command, Ele, Format, Opcode, Reply};

use test_helpers::{MemoryStore, MockTransport};

fn seq<const N: usize>(items: [&str; N]) -> Reply {
    items.into_iter().map(Ele::from).collect()
}

#[test]
fn test_exists_is_three_valued() {
    let mock = MockTransport::with_replies([
        Reply::from(Ele::Int(1)),
        Reply::from(Ele::Int(0)),
        Reply::nil(),
    ]);
    let conn = Connection::new(mock.clone());

    assert_eq!(conn.exists("s").unwrap(), Some(true));
    assert_eq!(conn.exists("s").unwrap(), Some(false));
    assert_eq!(conn.exists("s").unwrap(), None);
    assert_eq!(
        mock.last_command(),
        Some(Command::new(Opcode::Exists).arg("s"))
    );
}

#[test]
fn test_set_flattens_fields_in_order() {
    let mock = MockTransport::with_replies([Reply::from(Ele::Int(1))]);
    let conn = Connection::new(mock.clone());

    let written = conn
        .set("s", 5, [("value", Ele::from("7")), ("alpha", Ele::from(3))])
        .unwrap();
    assert_eq!(written, Some(true));
    assert_eq!(
        mock.last_command().unwrap().to_string(),
        "SET s 5 value 7 alpha 3"
    );
}

#[test]
fn test_members_chunks_by_requested_dimensions() {
    let mock = MockTransport::with_replies([seq(["1", "x", "2", "y"])]);
    let conn = Connection::new(mock.clone());

    let members = conn.members("s", Format::Native, ["value", "alpha"]).unwrap();
    assert_eq!(
        members,
        Members::Tuples(vec![
            vec![Ele::from("1"), Ele::from("x")],
            vec![Ele::from("2"), Ele::from("y")],
        ])
    );
    assert_eq!(
        mock.last_command(),
        Some(
            Command::new(Opcode::Members)
                .arg("s")
                .arg(Format::Native)
                .args(["value", "alpha"])
        )
    );
}

#[test]
fn test_members_with_time_counts_leading_time() {
    let mock = MockTransport::with_replies([
        seq(["0", "1", "1000", "2"]),
        seq(["0", "1000"]),
        seq([r#"{"time":0,"value":"1"}"#, r#"{"time":1000,"value":"2"}"#]),
    ]);
    let conn = Connection::new(mock.clone());

    let members = conn
        .members_with_time("s", Format::Native, ["value"])
        .unwrap();
    assert_eq!(
        members,
        Members::Tuples(vec![
            vec![Ele::from("0"), Ele::from("1")],
            vec![Ele::from("1000"), Ele::from("2")],
        ])
    );
    assert_eq!(mock.last_command().unwrap().to_string(), "MEMBERS s native value");

    let times = conn
        .range_with_time("s", Format::Native, 0, 2000, Vec::<String>::new())
        .unwrap();
    assert_eq!(times.len(), 2);
    assert_eq!(mock.last_command().unwrap().to_string(), "RANGE s native 0 2000");

    let documents = conn
        .members_with_time("s", Format::JsonObject, ["value"])
        .unwrap();
    assert!(matches!(documents, Members::Documents(ref docs) if docs.len() == 2));
}

#[test]
fn test_members_without_dimensions_sends_nothing() {
    let mock = MockTransport::new();
    let conn = Connection::new(mock.clone());

    let err = conn
        .members("s", Format::Native, Vec::<String>::new())
        .unwrap_err();
    assert!(matches!(err, TimelyError::InvalidArgument(_)));
    assert!(mock.commands().is_empty());
}

#[test]
fn test_range_passes_encoded_payload_through() {
    let blob = r#"[["0","1"]]"#;
    let mock = MockTransport::with_replies([Reply::from(Ele::from(blob))]);
    let conn = Connection::new(mock.clone());

    let members = conn
        .range("s", Format::JsonArray, 0, 10, ["value", "alpha"])
        .unwrap();
    assert_eq!(members, Members::Encoded(Ele::from(blob)));
    assert_eq!(
        mock.last_command().unwrap().to_string(),
        "RANGE s json.array 0 10 value alpha"
    );
}

#[test]
fn test_single_record_native_scalar_is_wrapped() {
    let mock = MockTransport::with_replies([Reply::from(Ele::from("5"))]);
    let conn = Connection::new(mock);

    let members = conn.members("s", Format::Native, ["value"]).unwrap();
    assert_eq!(members, Members::Tuples(vec![vec![Ele::from("5")]]));
}

#[test]
fn test_get_wraps_scalar_reply() {
    let mock = MockTransport::with_replies([Reply::from(Ele::from("1")), seq(["0", "1"])]);
    let conn = Connection::new(mock);

    assert_eq!(conn.get("s", 0, ["value"]).unwrap(), vec![Ele::from("1")]);
    assert_eq!(
        conn.get("s", 0, ["value", "alpha"]).unwrap(),
        vec![Ele::from("0"), Ele::from("1")]
    );
}

#[test]
fn test_dimensions_and_info() {
    let mock = MockTransport::with_replies([
        Reply::from(Ele::from("value position_lat")),
        seq(["version", "0.1.0", "series", "3"]),
    ]);
    let conn = Connection::new(mock);

    assert_eq!(
        conn.dimensions("s", 0).unwrap(),
        vec!["value", "position_lat"]
    );
    let info = conn.info().unwrap();
    assert_eq!(info.get("series"), Some(&Ele::from("3")));
}

#[test]
fn test_deletes_share_opcode() {
    let mock = MockTransport::with_replies([Reply::from(Ele::Int(1)), Reply::from(Ele::Int(0))]);
    let conn = Connection::new(mock.clone());

    assert_eq!(conn.delete_member("s", 1000).unwrap(), Some(true));
    assert_eq!(conn.delete_series("s").unwrap(), Some(false));
    let commands: Vec<String> = mock.commands().iter().map(Command::to_string).collect();
    assert_eq!(commands, vec!["DELSERIES s 1000", "DELSERIES s"]);
}

#[test]
fn test_store_errors_surface() {
    let mock = MockTransport::new();
    mock.push_error(TransportError::Command("ERR unknown series".to_string()));
    let conn = Connection::new(mock);

    let err = conn.ping().unwrap_err();
    assert!(matches!(
        err,
        TimelyError::Transport(TransportError::Command(ref msg)) if msg == "ERR unknown series"
    ));
    assert_eq!(err.to_string(), "ERR unknown series");
}

#[test]
fn test_with_reconnect_restores_policy() {
    let mock = MockTransport::with_replies([Reply::from(Ele::from("PONG"))]);
    let conn = Connection::new(mock.clone());

    let reply = conn
        .without_reconnect(|session| {
            assert!(!mock.reconnect());
            session.ping()
        })
        .unwrap();
    assert_eq!(reply, Reply::from(Ele::from("PONG")));
    assert!(mock.reconnect());
    assert_eq!(mock.reconnect_changes(), vec![false, true]);
}

#[test]
fn test_with_reconnect_restores_policy_on_error() {
    let mock = MockTransport::new();
    mock.push_error(TransportError::Closed);
    let conn = Connection::new(mock.clone());

    let result = conn.with_reconnect(false, |session| session.exists("s"));
    assert!(result.is_err());
    assert!(mock.reconnect());
}

#[test]
fn test_with_reconnect_restores_policy_on_panic() {
    let mock = MockTransport::new();
    let conn = Connection::new(mock.clone());

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        conn.without_reconnect(|_| panic!("interrupted unit of work"))
    }));
    assert!(outcome.is_err());
    assert!(mock.reconnect());
    assert_eq!(mock.reconnect_changes(), vec![false, true]);

    // The connection is still usable after the panic.
    mock.push(Reply::from(Ele::from("PONG")));
    assert_eq!(conn.ping().unwrap(), Reply::from(Ele::from("PONG")));
}

#[test]
fn test_synchronize_is_exclusive() {
    let conn = Arc::new(Connection::new(MemoryStore::new()));

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let conn = conn.clone();
            thread::spawn(move || {
                for round in 0..25i64 {
                    let value = format!("{worker}-{round}");
                    let read = conn.synchronize(|session| -> Result<Vec<Ele>> {
                        session.set("shared", 0, [("value", value.as_str())])?;
                        session.get("shared", 0, ["value"])
                    });
                    assert_eq!(read.unwrap(), vec![Ele::from("0"), Ele::from(value)]);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_memory_store_roundtrip() {
    let store = MemoryStore::new();
    let conn = Connection::new(store.clone());

    conn.set("s", 0, [("value", "1")]).unwrap();
    conn.set("s", 1000, [("value", "2"), ("alpha", "x")]).unwrap();

    assert_eq!(conn.exists("s").unwrap(), Some(true));
    assert_eq!(conn.dimensions("s", 1000).unwrap(), vec!["value", "alpha"]);
    let members = conn
        .range_with_time("s", Format::Native, 0, 1000, ["value"])
        .unwrap();
    assert_eq!(
        members,
        Members::Tuples(vec![vec![Ele::from("0"), Ele::from("1")]])
    );
    assert_eq!(
        store.commands().last().map(Command::to_string),
        Some("RANGE s native 0 1000 value".to_string())
    );
    assert_eq!(
        store.opcodes(),
        vec![
            Opcode::Set,
            Opcode::Set,
            Opcode::Exists,
            Opcode::Dimensions,
            Opcode::Range
        ]
    );
}
