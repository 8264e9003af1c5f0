//! Selection engine: drives the per-record decision loop.
//!
//! The engine pulls one message at a time from a [`RecordSource`], resolves
//! the probability field whenever a schema is announced, asks the configured
//! [`QueryStrategy`] for a verdict and forwards selected records to the
//! [`RecordSink`]. Records are handled strictly in arrival order.
//!
//! Lifecycle: `Idle -> Running -> Stopping -> Stopped`. A fatal error moves
//! the engine straight to `Stopped`.

use std::future::Future;
use std::pin::Pin;
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};
use uuid::Uuid;

use crate::domain::error::{SelectionError, TransportError};
use crate::domain::models::{
    EngineReport, EngineState, EngineStats, FieldAccessor, FieldKind, Record, Schema, SelectionConfig,
    StrategyKind,
};
use crate::domain::ports::{Inbound, RecordSink, RecordSource};
use crate::infrastructure::random::SeededUniform;

use super::lifecycle::{final_flush, until_shutdown, Wake, IDLE_FLUSH};
use super::query_strategy::QueryStrategy;

/// Field types accepted for the probability field
const PROBABILITY_KINDS: [FieldKind; 2] = [FieldKind::Double, FieldKind::Float];

/// Budget-constrained record selection loop
pub struct SelectionEngine<S, K> {
    source: S,
    sink: K,
    strategy: QueryStrategy,
    probability_field: String,
    suppress_end_marker: bool,
    accessor: Option<FieldAccessor>,
    state: EngineState,
    stats: EngineStats,
    run_id: Uuid,
    unflushed: bool,
    interrupted: bool,
}

impl<S: RecordSource, K: RecordSink> SelectionEngine<S, K> {
    /// Create an engine around an already built strategy
    pub fn new(source: S, sink: K, strategy: QueryStrategy, probability_field: impl Into<String>) -> Self {
        Self {
            source,
            sink,
            strategy,
            probability_field: probability_field.into(),
            suppress_end_marker: false,
            accessor: None,
            state: EngineState::Idle,
            stats: EngineStats::default(),
            run_id: Uuid::new_v4(),
            unflushed: false,
            interrupted: false,
        }
    }

    /// Create an engine from a validated selection configuration
    pub fn from_config(source: S, sink: K, config: &SelectionConfig) -> Self {
        let kind = StrategyKind::from_id(config.strategy_id).unwrap_or(StrategyKind::Random);
        let uniform = Box::new(SeededUniform::from_seed_option(config.seed));
        let strategy = QueryStrategy::from_config(kind, config, uniform);
        Self::new(source, sink, strategy, config.probability_field.clone())
            .suppress_end_marker(config.suppress_end_marker)
    }

    /// Do not propagate the end-of-stream marker downstream
    #[must_use]
    pub const fn suppress_end_marker(mut self, suppress: bool) -> Self {
        self.suppress_end_marker = suppress;
        self
    }

    /// Current lifecycle state
    pub const fn state(&self) -> EngineState {
        self.state
    }

    /// Counters so far
    pub const fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// The configured strategy, with its adaptive state
    pub const fn strategy(&self) -> &QueryStrategy {
        &self.strategy
    }

    /// The output interface
    pub const fn sink(&self) -> &K {
        &self.sink
    }

    /// Identifier attached to every log line of the run
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Run until end of stream, a closed input, or `shutdown` resolving.
    ///
    /// `shutdown` also aborts a send blocked on a stalled output; the record
    /// in flight is then dropped. The sink is flushed on every exit path,
    /// bounded by [`INTERRUPTED_FLUSH_LIMIT`](super::lifecycle::INTERRUPTED_FLUSH_LIMIT)
    /// after an interruption. On a fatal error the engine is left `Stopped`
    /// and [`stats`](Self::stats) still holds the final counters.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<EngineReport, SelectionError>
    where
        F: Future<Output = ()> + Send,
    {
        let started = Instant::now();
        let span = info_span!(
            "selection_engine",
            run_id = %self.run_id,
            strategy = %self.strategy.kind(),
        );

        let result = self.drive(shutdown).instrument(span.clone()).await;

        if let Err(err) = final_flush(self.sink.flush(), self.interrupted).await {
            span.in_scope(|| warn!(error = %err, "failed to flush output on shutdown"));
        }
        self.state = EngineState::Stopped;

        let report = EngineReport::new(self.strategy.kind(), self.state, self.stats, started.elapsed());
        span.in_scope(|| {
            info!(
                received = report.stats.received,
                forwarded = report.stats.forwarded,
                forwarded_pct = report.forwarded_pct,
                timeouts = report.stats.timeouts,
                elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
                "selection engine stopped"
            );
        });

        result.map(|()| report)
    }

    async fn drive<F>(&mut self, shutdown: F) -> Result<(), SelectionError>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        info!(field = %self.probability_field, "waiting for input schema");

        while matches!(self.state, EngineState::Idle | EngineState::Running) {
            let wake = tokio::select! {
                biased;
                () = &mut shutdown => Wake::Shutdown,
                inbound = self.source.recv() => Wake::Inbound(inbound),
                () = tokio::time::sleep(IDLE_FLUSH), if self.unflushed => Wake::Idle,
            };

            let inbound = match wake {
                Wake::Shutdown => {
                    self.interrupt();
                    break;
                }
                Wake::Idle => {
                    self.flush_idle(shutdown.as_mut()).await;
                    continue;
                }
                Wake::Inbound(inbound) => inbound,
            };

            match inbound {
                Ok(Inbound::Schema(schema)) => self.on_schema(&schema, shutdown.as_mut()).await?,
                Ok(Inbound::Record(record)) => self.on_record(&record, shutdown.as_mut()).await?,
                Err(TransportError::Timeout) => {
                    self.stats.timeouts += 1;
                    debug!("receive timeout");
                }
                Err(TransportError::Closed) => {
                    info!("input interface closed");
                    self.state = EngineState::Stopping;
                }
                Err(err) => {
                    error!(error = %err, "receive failed");
                    return Err(err.into());
                }
            }
        }

        Ok(())
    }

    fn interrupt(&mut self) {
        info!("termination requested");
        self.interrupted = true;
        self.state = EngineState::Stopping;
    }

    async fn flush_idle<F>(&mut self, shutdown: Pin<&mut F>)
    where
        F: Future<Output = ()> + Send,
    {
        match until_shutdown(self.sink.flush(), shutdown).await {
            None => self.interrupt(),
            Some(flushed) => {
                self.unflushed = false;
                match flushed {
                    Ok(()) => trace!("output flushed on idle input"),
                    Err(err) => self.absorb_send_error(err),
                }
            }
        }
    }

    async fn on_schema<F>(&mut self, schema: &Schema, shutdown: Pin<&mut F>) -> Result<(), SelectionError>
    where
        F: Future<Output = ()> + Send,
    {
        let accessor = FieldAccessor::resolve(schema, &self.probability_field, &PROBABILITY_KINDS)
            .map_err(|err| {
                error!(error = %err, schema = %schema, "probability field cannot be resolved");
                SelectionError::UnresolvableField(err)
            })?;
        self.accessor = Some(accessor);

        // the output interface carries the same layout as the input
        match until_shutdown(self.sink.announce_schema(schema), shutdown).await {
            None => self.interrupt(),
            Some(Ok(())) => self.unflushed = true,
            Some(Err(err)) => self.absorb_send_error(err),
        }

        match self.state {
            EngineState::Idle => {
                self.state = EngineState::Running;
                info!(schema = %schema, "schema resolved, engine running");
            }
            EngineState::Running => info!(schema = %schema, "schema changed, probability field re-resolved"),
            EngineState::Stopping | EngineState::Stopped => {}
        }
        Ok(())
    }

    async fn on_record<F>(&mut self, record: &Record, shutdown: Pin<&mut F>) -> Result<(), SelectionError>
    where
        F: Future<Output = ()> + Send,
    {
        if record.is_end_of_stream() {
            info!("end-of-stream marker received");
            self.state = EngineState::Stopping;
            if !self.suppress_end_marker && self.forward(record, shutdown).await {
                self.stats.end_marker_forwarded = true;
            }
            return Ok(());
        }

        let Some(accessor) = self.accessor else {
            error!("record received before any schema");
            return Err(SelectionError::MissingSchema);
        };

        self.stats.received += 1;
        let Some(probability) = accessor.read_f64(record) else {
            self.stats.malformed += 1;
            debug!(len = record.len(), "record too short for the probability field, dropped");
            return Ok(());
        };

        let selected = self.strategy.decide(probability);
        trace!(probability, selected, "decision");

        if selected && self.forward(record, shutdown).await {
            self.stats.forwarded += 1;
        }
        Ok(())
    }

    /// Send one record; failures are counted and never stop the loop
    async fn forward<F>(&mut self, record: &Record, shutdown: Pin<&mut F>) -> bool
    where
        F: Future<Output = ()> + Send,
    {
        match until_shutdown(self.sink.send(record), shutdown).await {
            None => {
                self.interrupt();
                debug!("record in flight dropped");
                false
            }
            Some(Ok(())) => {
                self.unflushed = true;
                true
            }
            Some(Err(err)) => {
                self.absorb_send_error(err);
                false
            }
        }
    }

    fn absorb_send_error(&mut self, err: TransportError) {
        match err {
            TransportError::Timeout => {
                self.stats.timeouts += 1;
                debug!("send timeout");
            }
            TransportError::Closed => {
                warn!("output interface closed, stopping");
                self.state = EngineState::Stopping;
            }
            other => {
                self.stats.send_failures += 1;
                warn!(error = %other, "failed to forward record");
            }
        }
    }
}
