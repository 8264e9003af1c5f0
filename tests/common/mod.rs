//! Common test utilities for integration tests
//!
//! Shared fixtures for building schemas and records in the layouts the
//! engines expect.

#![allow(dead_code)]

use std::net::{IpAddr, Ipv6Addr};

use salf::{Record, Schema};

/// Probability field name used throughout the tests
pub const FIELD: &str = "FEATURE_OUTPUT_PROBA";

/// Schema with a single double probability field
pub fn probability_schema() -> Schema {
    Schema::parse(&format!("double {FIELD}")).expect("valid schema")
}

/// Flow schema: probability, destination address and port
pub fn flow_schema() -> Schema {
    Schema::parse(&format!("double {FIELD},ipaddr DST_IP,uint16 DST_PORT")).expect("valid schema")
}

/// Record in the [`probability_schema`] layout
pub fn probability_record(p: f64) -> Record {
    Record::new(p.to_le_bytes().to_vec())
}

/// Record in the [`flow_schema`] layout
pub fn flow_record(p: f64, ip: IpAddr, port: u16) -> Record {
    let v6 = match ip {
        IpAddr::V4(v4) => v4.to_ipv6_mapped(),
        IpAddr::V6(v6) => v6,
    };

    let mut payload = p.to_le_bytes().to_vec();
    payload.extend_from_slice(&v6.octets());
    payload.extend_from_slice(&port.to_le_bytes());
    Record::new(payload)
}

/// Probability carried by a [`probability_record`] or [`flow_record`]
pub fn probability_of(record: &Record) -> f64 {
    let bytes: [u8; 8] = record.payload()[..8].try_into().expect("record holds a double");
    f64::from_le_bytes(bytes)
}

pub fn unspecified() -> IpAddr {
    IpAddr::V6(Ipv6Addr::UNSPECIFIED)
}

/// Setup test logging
///
/// Initializes a tracing subscriber writing to the test harness.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
