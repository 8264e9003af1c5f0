//! Blacklist routing over the in-memory transport

mod common;

use std::future::pending;
use std::io::Write;
use std::net::{IpAddr, Ipv4Addr};

use common::{flow_record, flow_schema, unspecified};
use salf::infrastructure::transport::{memory_channel, MemorySink, Outbound};
use salf::{Blacklist, BlacklistError, BlacklistFilter, Record, Schema, TransportError};

fn miner() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7))
}

fn blacklist() -> Blacklist {
    Blacklist::parse("203.0.113.7 3333\n2001:db8::42 14444\n")
}

#[tokio::test]
async fn test_routes_matched_and_unmatched() {
    common::setup_test_logging();
    let (feeder, source) = memory_channel(16);
    let mut filter = BlacklistFilter::new(source, MemorySink::new(), MemorySink::new(), blacklist());

    let hit = flow_record(0.5, miner(), 3333);
    let other_port = flow_record(0.5, miner(), 80);
    let v6_hit = flow_record(0.5, "2001:db8::42".parse().unwrap(), 14444);

    feeder.schema(flow_schema()).await;
    feeder.record(hit.clone()).await;
    feeder.record(other_port.clone()).await;
    feeder.record(v6_hit.clone()).await;
    feeder.record(Record::end_of_stream()).await;

    let report = filter.run(pending()).await.unwrap();
    assert_eq!(report.received, 3);
    assert_eq!(report.matched, 2);
    assert_eq!(report.unmatched, 1);

    assert_eq!(filter.matched_sink().records(), vec![&hit, &v6_hit]);
    assert_eq!(filter.unmatched_sink().records(), vec![&other_port]);

    // both outputs mirror the input layout, the marker is not propagated
    assert_eq!(filter.matched_sink().sent()[0], Outbound::Schema(flow_schema()));
    assert_eq!(filter.unmatched_sink().sent()[0], Outbound::Schema(flow_schema()));
    assert!(filter.unmatched_sink().records().iter().all(|r| !r.is_end_of_stream()));
}

#[tokio::test]
async fn test_custom_field_names() {
    let (feeder, source) = memory_channel(8);
    let mut filter = BlacklistFilter::new(source, MemorySink::new(), MemorySink::new(), blacklist())
        .with_fields("SRC_IP", "SRC_PORT");

    feeder
        .schema(Schema::parse("ipaddr SRC_IP,uint16 SRC_PORT").unwrap())
        .await;
    let mut payload = Ipv4Addr::new(203, 0, 113, 7).to_ipv6_mapped().octets().to_vec();
    payload.extend_from_slice(&3333u16.to_le_bytes());
    feeder.record(Record::new(payload)).await;
    drop(feeder);

    let report = filter.run(pending()).await.unwrap();
    assert_eq!(report.matched, 1);
}

#[tokio::test]
async fn test_missing_destination_fields_are_fatal() {
    let (feeder, source) = memory_channel(4);
    let mut filter = BlacklistFilter::new(source, MemorySink::new(), MemorySink::new(), blacklist());

    feeder.schema(Schema::parse("double FEATURE_OUTPUT_PROBA").unwrap()).await;

    let err = filter.run(pending()).await.unwrap_err();
    assert!(matches!(err, BlacklistError::UnresolvableField(_)));
}

#[tokio::test]
async fn test_record_before_schema_is_fatal() {
    let (feeder, source) = memory_channel(4);
    let mut filter = BlacklistFilter::new(source, MemorySink::new(), MemorySink::new(), blacklist());

    feeder.record(flow_record(0.5, miner(), 3333)).await;

    let err = filter.run(pending()).await.unwrap_err();
    assert!(matches!(err, BlacklistError::MissingSchema));
}

#[tokio::test]
async fn test_short_records_and_timeouts_are_counted() {
    let (feeder, source) = memory_channel(8);
    let mut filter = BlacklistFilter::new(source, MemorySink::new(), MemorySink::new(), blacklist());

    feeder.schema(flow_schema()).await;
    feeder.record(Record::new(vec![1; 12])).await;
    feeder.error(TransportError::Timeout).await;
    feeder.record(flow_record(0.1, unspecified(), 0)).await;
    drop(feeder);

    let report = filter.run(pending()).await.unwrap();
    assert_eq!(report.received, 2);
    assert_eq!(report.malformed, 1);
    assert_eq!(report.timeouts, 1);
    assert_eq!(report.unmatched, 1);
}

#[tokio::test]
async fn test_send_failure_is_fatal() {
    let (feeder, source) = memory_channel(8);
    let matched = MemorySink::failing_with([TransportError::Frame("broken".to_string())]);
    let mut filter = BlacklistFilter::new(source, matched, MemorySink::new(), blacklist());

    feeder.schema(flow_schema()).await;
    feeder.record(flow_record(0.5, miner(), 3333)).await;

    let err = filter.run(pending()).await.unwrap_err();
    assert!(matches!(err, BlacklistError::Transport(TransportError::Frame(_))));
}

#[tokio::test]
async fn test_load_skips_invalid_entries() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# cryptominer pools").unwrap();
    writeln!(file, "203.0.113.7 3333").unwrap();
    writeln!(file, "not-an-ip 3333").unwrap();
    writeln!(file, "198.51.100.1 notaport").unwrap();
    file.flush().unwrap();

    let list = Blacklist::load(file.path()).await.unwrap();
    assert_eq!(list.len(), 1);
    assert!(list.contains(miner(), 3333));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_aborts_stalled_output() {
    let (feeder, source) = memory_channel(8);
    let mut filter = BlacklistFilter::new(source, MemorySink::new(), MemorySink::stalling_sends(), blacklist());

    feeder.schema(flow_schema()).await;
    feeder.record(flow_record(0.5, unspecified(), 443)).await;

    let shutdown = tokio::time::sleep(std::time::Duration::from_millis(100));
    let report = tokio::time::timeout(std::time::Duration::from_secs(2), filter.run(shutdown))
        .await
        .expect("shutdown must interrupt a blocked send")
        .unwrap();

    assert_eq!(report.received, 1);
    assert_eq!(report.unmatched, 0);
    assert!(filter.unmatched_sink().records().is_empty());
    drop(feeder);
}
