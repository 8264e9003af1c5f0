//! End-to-end runs over framed files

mod common;

use std::future::pending;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;

use common::{flow_record, flow_schema, probability_record, probability_schema, unspecified};
use salf::infrastructure::transport::{
    open_sink, open_source, record_frame, schema_frame, FramedSink, FramedSource,
};
use salf::{Inbound, Record, RecordSource, SelectionConfig, SelectionEngine, StrategyKind, TransportError};

async fn read_all(path: &std::path::Path) -> Vec<Inbound> {
    let file = tokio::fs::File::open(path).await.unwrap();
    let mut source = FramedSource::new(file);
    let mut messages = Vec::new();
    loop {
        match source.recv().await {
            Ok(inbound) => messages.push(inbound),
            Err(TransportError::Closed) => break,
            Err(err) => panic!("unexpected error: {err}"),
        }
    }
    messages
}

#[tokio::test]
async fn test_select_over_framed_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.bin");
    let output = dir.path().join("out.bin");

    let mut bytes = schema_frame(&probability_schema()).unwrap();
    for p in [0.1, 0.5, 0.29, 0.3] {
        bytes.extend(record_frame(&probability_record(p)).unwrap());
    }
    bytes.extend(record_frame(&Record::end_of_stream()).unwrap());
    tokio::fs::write(&input, bytes).await.unwrap();

    let config = SelectionConfig {
        strategy_id: StrategyKind::FixedUncertainty.id(),
        labeling_threshold: 0.3,
        ..SelectionConfig::default()
    };
    let source = open_source(input.to_str().unwrap(), None).await.unwrap();
    let sink = open_sink(output.to_str().unwrap(), None).await.unwrap();
    let mut engine = SelectionEngine::from_config(source, sink, &config);

    let report = engine.run(pending()).await.unwrap();
    assert_eq!(report.stats.forwarded, 2);
    drop(engine);

    let messages = read_all(&output).await;
    assert_eq!(
        messages,
        vec![
            Inbound::Schema(probability_schema()),
            Inbound::Record(probability_record(0.1)),
            Inbound::Record(probability_record(0.29)),
            Inbound::Record(Record::end_of_stream()),
        ]
    );
}

#[tokio::test]
async fn test_extra_fields_pass_through_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("flows.bin");
    let output = dir.path().join("selected.bin");

    let record = flow_record(0.05, unspecified(), 8080);
    let mut bytes = schema_frame(&flow_schema()).unwrap();
    bytes.extend(record_frame(&record).unwrap());
    tokio::fs::write(&input, bytes).await.unwrap();

    let config = SelectionConfig {
        strategy_id: StrategyKind::FixedUncertainty.id(),
        ..SelectionConfig::default()
    };
    let source = open_source(input.to_str().unwrap(), None).await.unwrap();
    let sink = open_sink(output.to_str().unwrap(), None).await.unwrap();
    let mut engine = SelectionEngine::from_config(source, sink, &config);

    let report = engine.run(pending()).await.unwrap();
    assert_eq!(report.stats.forwarded, 1);
    assert!(!report.stats.end_marker_forwarded);
    drop(engine);

    assert_eq!(
        read_all(&output).await,
        vec![Inbound::Schema(flow_schema()), Inbound::Record(record)]
    );
}

#[tokio::test]
async fn test_missing_input_file() {
    let err = open_source("/nonexistent/salf/in.bin", None).await.err().unwrap();
    assert!(err.to_string().contains("Failed to open input"));
}

#[tokio::test]
async fn test_selected_record_reaches_live_downstream() {
    let (mut upstream, engine_input) = tokio::io::duplex(4096);
    let (engine_output, downstream) = tokio::io::duplex(4096);

    let config = SelectionConfig {
        strategy_id: StrategyKind::FixedUncertainty.id(),
        labeling_threshold: 0.3,
        ..SelectionConfig::default()
    };
    let mut engine = SelectionEngine::from_config(
        FramedSource::new(engine_input),
        FramedSink::new(engine_output),
        &config,
    );
    let (stop, stopped) = oneshot::channel::<()>();

    let peer = async move {
        upstream.write_all(&schema_frame(&probability_schema()).unwrap()).await.unwrap();
        upstream.write_all(&record_frame(&probability_record(0.1)).unwrap()).await.unwrap();

        // the engine is still running: nothing has reached end of stream
        let mut downstream = FramedSource::new(downstream);
        let schema = tokio::time::timeout(Duration::from_secs(2), downstream.recv())
            .await
            .expect("schema announcement visible downstream")
            .unwrap();
        let record = tokio::time::timeout(Duration::from_secs(2), downstream.recv())
            .await
            .expect("selected record visible downstream")
            .unwrap();

        let _ = stop.send(());
        (schema, record, upstream)
    };

    let (report, (schema, record, _upstream)) = tokio::join!(
        engine.run(async {
            let _ = stopped.await;
        }),
        peer
    );

    assert_eq!(schema, Inbound::Schema(probability_schema()));
    assert_eq!(record, Inbound::Record(probability_record(0.1)));
    assert_eq!(report.unwrap().stats.forwarded, 1);
}
