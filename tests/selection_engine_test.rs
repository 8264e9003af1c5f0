//! Selection engine behavior over the in-memory transport

mod common;

use std::future::pending;
use std::time::Duration;

use common::{probability_of, probability_record, probability_schema, FIELD};
use salf::domain::ports::UniformSource;
use salf::infrastructure::random::ScriptedUniform;
use salf::infrastructure::transport::{memory_channel, MemorySink, Outbound};
use salf::{
    EngineState, QueryStrategy, Record, Schema, SelectionConfig, SelectionEngine, SelectionError, StrategyKind,
    TransportError,
};

fn config(kind: StrategyKind, budget: f64, threshold: f64, step: f64) -> SelectionConfig {
    SelectionConfig {
        strategy_id: kind.id(),
        budget,
        labeling_threshold: threshold,
        step,
        probability_field: FIELD.to_string(),
        seed: Some(42),
        ..SelectionConfig::default()
    }
}

fn forwarded(sink: &MemorySink) -> Vec<f64> {
    sink.records()
        .into_iter()
        .filter(|r| !r.is_end_of_stream())
        .map(probability_of)
        .collect()
}

#[tokio::test]
async fn test_fixed_uncertainty_forwards_below_threshold() {
    common::setup_test_logging();
    let (feeder, source) = memory_channel(16);
    let cfg = config(StrategyKind::FixedUncertainty, 0.5, 0.3, 0.4);
    let mut engine = SelectionEngine::from_config(source, MemorySink::new(), &cfg);

    feeder.schema(probability_schema()).await;
    for p in [0.1, 0.5, 0.29, 0.3] {
        feeder.record(probability_record(p)).await;
    }
    feeder.record(Record::end_of_stream()).await;

    let report = engine.run(pending()).await.unwrap();
    assert_eq!(forwarded(engine.sink()), vec![0.1, 0.29]);
    assert_eq!(report.stats.received, 4);
    assert_eq!(report.stats.forwarded, 2);
    assert!((report.forwarded_pct - 50.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_variable_uncertainty_adapts_threshold() {
    let (feeder, source) = memory_channel(16);
    let cfg = config(StrategyKind::VariableUncertainty, 0.5, 0.5, 0.4);
    let mut engine = SelectionEngine::from_config(source, MemorySink::new(), &cfg);

    feeder.schema(probability_schema()).await;
    // the first two records are held back by the rate brake (1/1, 1/2)
    for p in [0.2, 0.2, 0.2, 0.8, 0.8] {
        feeder.record(probability_record(p)).await;
    }
    drop(feeder);

    let report = engine.run(pending()).await.unwrap();
    assert_eq!(forwarded(engine.sink()), vec![0.2]);
    assert_eq!(report.stats.received, 5);

    let state = engine.strategy().state().unwrap();
    assert!((state.threshold() - 0.84).abs() < 1e-12);
    assert!((state.success_estimate() - 2.0).abs() < 1e-12);
    assert_eq!(state.processed_count(), 5);
}

#[tokio::test]
async fn test_zero_budget_forwards_nothing() {
    for kind in [
        StrategyKind::Random,
        StrategyKind::VariableUncertainty,
        StrategyKind::UncertaintyRandomized,
    ] {
        let (feeder, source) = memory_channel(128);
        let mut engine = SelectionEngine::from_config(source, MemorySink::new(), &config(kind, 0.0, 0.5, 0.4));

        feeder.schema(probability_schema()).await;
        for i in 0..100 {
            feeder.record(probability_record(f64::from(i) / 100.0)).await;
        }
        drop(feeder);

        let report = engine.run(pending()).await.unwrap();
        assert_eq!(report.stats.received, 100, "{kind}");
        assert_eq!(report.stats.forwarded, 0, "{kind}");
    }
}

#[tokio::test]
async fn test_end_marker_forwarded_once() {
    let (feeder, source) = memory_channel(16);
    let cfg = config(StrategyKind::FixedUncertainty, 0.5, 0.9, 0.4);
    let mut engine = SelectionEngine::from_config(source, MemorySink::new(), &cfg);

    feeder.schema(probability_schema()).await;
    feeder.record(probability_record(0.1)).await;
    feeder.record(Record::end_of_stream()).await;
    // never read: the engine stops at the marker
    feeder.record(probability_record(0.1)).await;
    feeder.record(Record::end_of_stream()).await;

    let report = engine.run(pending()).await.unwrap();
    assert_eq!(report.state, EngineState::Stopped);
    assert!(report.stats.end_marker_forwarded);
    assert_eq!(report.stats.received, 1);

    let markers = engine.sink().records().into_iter().filter(|r| r.is_end_of_stream()).count();
    assert_eq!(markers, 1);
    assert!(engine.sink().records().last().unwrap().is_end_of_stream());
}

#[tokio::test]
async fn test_end_marker_suppressed() {
    let (feeder, source) = memory_channel(16);
    let cfg = SelectionConfig {
        suppress_end_marker: true,
        ..config(StrategyKind::FixedUncertainty, 0.5, 0.9, 0.4)
    };
    let mut engine = SelectionEngine::from_config(source, MemorySink::new(), &cfg);

    feeder.schema(probability_schema()).await;
    feeder.record(probability_record(0.1)).await;
    feeder.record(Record::end_of_stream()).await;

    let report = engine.run(pending()).await.unwrap();
    assert!(!report.stats.end_marker_forwarded);
    assert_eq!(engine.sink().records().len(), 1);
}

#[tokio::test]
async fn test_end_marker_before_schema_stops_cleanly() {
    let (feeder, source) = memory_channel(4);
    let mut engine = SelectionEngine::from_config(source, MemorySink::new(), &SelectionConfig::default());

    feeder.record(Record::new(vec![0])).await;

    let report = engine.run(pending()).await.unwrap();
    assert_eq!(report.state, EngineState::Stopped);
    assert!(report.stats.end_marker_forwarded);
    assert_eq!(report.stats.received, 0);
}

#[tokio::test]
async fn test_record_before_schema_is_fatal() {
    let (feeder, source) = memory_channel(4);
    let mut engine = SelectionEngine::from_config(source, MemorySink::new(), &SelectionConfig::default());

    feeder.record(probability_record(0.1)).await;

    let err = engine.run(pending()).await.unwrap_err();
    assert!(matches!(err, SelectionError::MissingSchema));
    assert_eq!(engine.state(), EngineState::Stopped);
    assert_eq!(engine.sink().flushes(), 1);
}

#[tokio::test]
async fn test_schema_change_without_field_is_fatal() {
    let (feeder, source) = memory_channel(8);
    let cfg = config(StrategyKind::FixedUncertainty, 0.5, 0.9, 0.4);
    let mut engine = SelectionEngine::from_config(source, MemorySink::new(), &cfg);

    feeder.schema(probability_schema()).await;
    feeder.record(probability_record(0.1)).await;
    feeder.schema(Schema::parse("uint16 DST_PORT").unwrap()).await;
    feeder.record(Record::new(vec![80, 0])).await;

    let err = engine.run(pending()).await.unwrap_err();
    assert!(matches!(err, SelectionError::UnresolvableField(_)));
    assert_eq!(engine.state(), EngineState::Stopped);
    assert_eq!(engine.stats().received, 1);
    assert_eq!(engine.stats().forwarded, 1);
}

#[tokio::test]
async fn test_mistyped_probability_field_is_fatal() {
    let (feeder, source) = memory_channel(4);
    let mut engine = SelectionEngine::from_config(source, MemorySink::new(), &SelectionConfig::default());

    feeder.schema(Schema::parse(&format!("uint32 {FIELD}")).unwrap()).await;

    let err = engine.run(pending()).await.unwrap_err();
    assert!(matches!(err, SelectionError::UnresolvableField(_)));
}

#[tokio::test]
async fn test_schema_change_reresolves_offset() {
    let (feeder, source) = memory_channel(8);
    let cfg = config(StrategyKind::FixedUncertainty, 0.5, 0.3, 0.4);
    let mut engine = SelectionEngine::from_config(source, MemorySink::new(), &cfg);

    let moved = Schema::parse(&format!("uint16 DST_PORT,double {FIELD}")).unwrap();
    feeder.schema(probability_schema()).await;
    feeder.record(probability_record(0.1)).await;
    feeder.schema(moved.clone()).await;

    let mut payload = vec![80, 0];
    payload.extend_from_slice(&0.2f64.to_le_bytes());
    feeder.record(Record::new(payload.clone())).await;
    let mut dropped = 443u16.to_le_bytes().to_vec();
    dropped.extend_from_slice(&0.9f64.to_le_bytes());
    feeder.record(Record::new(dropped)).await;
    drop(feeder);

    let report = engine.run(pending()).await.unwrap();
    assert_eq!(report.stats.received, 3);
    assert_eq!(report.stats.forwarded, 2);

    let sent = engine.sink().sent();
    assert_eq!(sent[0], Outbound::Schema(probability_schema()));
    assert_eq!(sent[2], Outbound::Schema(moved));
    assert_eq!(sent[3], Outbound::Record(Record::new(payload)));
}

#[tokio::test]
async fn test_receive_timeouts_are_counted() {
    let (feeder, source) = memory_channel(8);
    let cfg = config(StrategyKind::FixedUncertainty, 0.5, 0.9, 0.4);
    let mut engine = SelectionEngine::from_config(source, MemorySink::new(), &cfg);

    feeder.schema(probability_schema()).await;
    feeder.error(TransportError::Timeout).await;
    feeder.record(probability_record(0.1)).await;
    feeder.error(TransportError::Timeout).await;
    feeder.record(Record::end_of_stream()).await;

    let report = engine.run(pending()).await.unwrap();
    assert_eq!(report.stats.timeouts, 2);
    assert_eq!(report.stats.forwarded, 1);
}

#[tokio::test]
async fn test_receive_failure_is_fatal() {
    let (feeder, source) = memory_channel(4);
    let mut engine = SelectionEngine::from_config(source, MemorySink::new(), &SelectionConfig::default());

    feeder.error(TransportError::Frame("unknown frame tag 0x58".to_string())).await;

    let err = engine.run(pending()).await.unwrap_err();
    assert!(matches!(err, SelectionError::Transport(TransportError::Frame(_))));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_signal_stops_engine() {
    let (feeder, source) = memory_channel(4);
    let cfg = config(StrategyKind::FixedUncertainty, 0.5, 0.9, 0.4);
    let mut engine = SelectionEngine::from_config(source, MemorySink::new(), &cfg);

    feeder.schema(probability_schema()).await;
    feeder.record(probability_record(0.1)).await;

    // the feeder stays alive, so only the signal can end the run
    let report = engine
        .run(tokio::time::sleep(Duration::from_secs(5)))
        .await
        .unwrap();

    assert_eq!(report.state, EngineState::Stopped);
    assert_eq!(report.stats.received, 1);
    assert!(!report.stats.end_marker_forwarded);
    drop(feeder);
}

#[tokio::test]
async fn test_signal_already_fired_wins_over_pending_input() {
    let (feeder, source) = memory_channel(4);
    let mut engine = SelectionEngine::from_config(source, MemorySink::new(), &SelectionConfig::default());

    feeder.schema(probability_schema()).await;
    feeder.record(probability_record(0.1)).await;

    let report = engine.run(std::future::ready(())).await.unwrap();
    assert_eq!(report.stats.received, 0);
    assert!(engine.sink().sent().is_empty());
}

#[tokio::test]
async fn test_randomized_strategy_with_scripted_draws() {
    let uniform: Box<dyn UniformSource> = Box::new(ScriptedUniform::new(vec![0.75, 0.5]));
    let cfg = SelectionConfig {
        deviation: 0.0,
        ..config(StrategyKind::UncertaintyRandomized, 0.5, 0.5, 0.4)
    };
    let strategy = QueryStrategy::from_config(StrategyKind::UncertaintyRandomized, &cfg, uniform);

    let (feeder, source) = memory_channel(8);
    let mut engine = SelectionEngine::new(source, MemorySink::new(), strategy, FIELD);

    feeder.schema(probability_schema()).await;
    for p in [0.2, 0.2, 0.2] {
        feeder.record(probability_record(p)).await;
    }
    drop(feeder);

    let report = engine.run(pending()).await.unwrap();
    // zero deviation: the jitter is exactly 1 and the plain dynamics apply
    assert_eq!(report.stats.forwarded, 1);
    assert_eq!(report.strategy, StrategyKind::UncertaintyRandomized);
}
