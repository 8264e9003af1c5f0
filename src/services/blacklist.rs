//! Destination blacklist filter.
//!
//! Routes every record to one of two outputs depending on whether its
//! `(destination address, destination port)` pair appears in a blacklist.

use std::collections::HashSet;
use std::future::Future;
use std::net::IpAddr;
use std::path::Path;
use std::pin::Pin;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::domain::error::{BlacklistError, TransportError};
use crate::domain::models::{FieldAccessor, FieldKind, FilterReport, Record, Schema};
use crate::domain::ports::{Inbound, RecordSink, RecordSource};

use super::lifecycle::{final_flush, until_shutdown, Wake, IDLE_FLUSH};

// ============================================================================
// Blacklist
// ============================================================================

/// Set of blacklisted `(address, port)` destinations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blacklist {
    entries: HashSet<(IpAddr, u16)>,
}

impl Blacklist {
    /// Parse `IP port` lines. Blank lines and `#` comments are ignored,
    /// malformed lines are skipped with a warning.
    pub fn parse(text: &str) -> Self {
        let mut entries = HashSet::new();

        for (index, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }

            let mut parts = line.split_whitespace();
            let entry = match (parts.next(), parts.next(), parts.next()) {
                (Some(ip), Some(port), None) => ip.parse::<IpAddr>().ok().zip(port.parse::<u16>().ok()),
                _ => None,
            };

            match entry {
                Some(entry) => {
                    entries.insert(entry);
                }
                None => warn!(line = index + 1, entry = line, "skipping invalid blacklist entry"),
            }
        }

        Self { entries }
    }

    /// Read and parse a blacklist file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, BlacklistError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| BlacklistError::Load {
                path: path.display().to_string(),
                source,
            })?;

        let blacklist = Self::parse(&text);
        info!(path = %path.display(), entries = blacklist.len(), "blacklist loaded");
        Ok(blacklist)
    }

    /// Whether `(ip, port)` is blacklisted
    pub fn contains(&self, ip: IpAddr, port: u16) -> bool {
        self.entries.contains(&(ip, port))
    }

    /// Number of distinct entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entry was loaded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(IpAddr, u16)> for Blacklist {
    fn from_iter<T: IntoIterator<Item = (IpAddr, u16)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// Filter
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Accessors {
    ip: FieldAccessor,
    port: FieldAccessor,
}

/// Routing loop over one source and two sinks
pub struct BlacklistFilter<S, M, U> {
    source: S,
    matched: M,
    unmatched: U,
    blacklist: Blacklist,
    ip_field: String,
    port_field: String,
    accessors: Option<Accessors>,
    report: FilterReport,
    stopping: bool,
    unflushed: bool,
    interrupted: bool,
}

impl<S, M, U> BlacklistFilter<S, M, U>
where
    S: RecordSource,
    M: RecordSink,
    U: RecordSink,
{
    /// Route with the default `DST_IP` / `DST_PORT` fields
    pub fn new(source: S, matched: M, unmatched: U, blacklist: Blacklist) -> Self {
        Self {
            source,
            matched,
            unmatched,
            blacklist,
            ip_field: "DST_IP".to_string(),
            port_field: "DST_PORT".to_string(),
            accessors: None,
            report: FilterReport::default(),
            stopping: false,
            unflushed: false,
            interrupted: false,
        }
    }

    /// Override the destination field names
    #[must_use]
    pub fn with_fields(mut self, ip_field: impl Into<String>, port_field: impl Into<String>) -> Self {
        self.ip_field = ip_field.into();
        self.port_field = port_field.into();
        self
    }

    /// Counters so far
    pub const fn report(&self) -> &FilterReport {
        &self.report
    }

    /// Output receiving blacklisted records
    pub const fn matched_sink(&self) -> &M {
        &self.matched
    }

    /// Output receiving every other record
    pub const fn unmatched_sink(&self) -> &U {
        &self.unmatched
    }

    /// Route records until end of stream, a closed transport or `shutdown`
    ///
    /// `shutdown` also aborts a send blocked on a stalled output.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<FilterReport, BlacklistError>
    where
        F: Future<Output = ()> + Send,
    {
        let span = info_span!("blacklist_filter", run_id = %Uuid::new_v4(), entries = self.blacklist.len());
        let result = self.drive(shutdown).instrument(span.clone()).await;

        let matched = final_flush(self.matched.flush(), self.interrupted).await;
        let unmatched = final_flush(self.unmatched.flush(), self.interrupted).await;
        for flushed in [matched, unmatched] {
            if let Err(err) = flushed {
                span.in_scope(|| warn!(error = %err, "failed to flush output on shutdown"));
            }
        }

        span.in_scope(|| {
            info!(
                received = self.report.received,
                matched = self.report.matched,
                unmatched = self.report.unmatched,
                "blacklist filter stopped"
            );
        });
        result.map(|()| self.report)
    }

    async fn drive<F>(&mut self, shutdown: F) -> Result<(), BlacklistError>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        while !self.stopping {
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
                    self.flush_idle(shutdown.as_mut()).await?;
                    continue;
                }
                Wake::Inbound(inbound) => inbound,
            };

            match inbound {
                Ok(Inbound::Schema(schema)) => self.on_schema(&schema, shutdown.as_mut()).await?,
                Ok(Inbound::Record(record)) => self.on_record(&record, shutdown.as_mut()).await?,
                Err(TransportError::Timeout) => self.report.timeouts += 1,
                Err(TransportError::Closed) => {
                    info!("input interface closed");
                    self.stopping = true;
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
        self.stopping = true;
    }

    async fn flush_idle<F>(&mut self, mut shutdown: Pin<&mut F>) -> Result<(), BlacklistError>
    where
        F: Future<Output = ()> + Send,
    {
        let Some(matched) = until_shutdown(self.matched.flush(), shutdown.as_mut()).await else {
            self.interrupt();
            return Ok(());
        };
        self.absorb(matched)?;

        let Some(unmatched) = until_shutdown(self.unmatched.flush(), shutdown).await else {
            self.interrupt();
            return Ok(());
        };
        self.absorb(unmatched)?;

        self.unflushed = false;
        Ok(())
    }

    async fn on_schema<F>(&mut self, schema: &Schema, mut shutdown: Pin<&mut F>) -> Result<(), BlacklistError>
    where
        F: Future<Output = ()> + Send,
    {
        let ip = FieldAccessor::resolve(schema, &self.ip_field, &[FieldKind::Ipaddr])
            .map_err(BlacklistError::UnresolvableField)?;
        let port = FieldAccessor::resolve(schema, &self.port_field, &[FieldKind::Uint16])
            .map_err(BlacklistError::UnresolvableField)?;
        self.accessors = Some(Accessors { ip, port });

        let Some(matched) = until_shutdown(self.matched.announce_schema(schema), shutdown.as_mut()).await else {
            self.interrupt();
            return Ok(());
        };
        self.absorb(matched)?;

        let Some(unmatched) = until_shutdown(self.unmatched.announce_schema(schema), shutdown).await else {
            self.interrupt();
            return Ok(());
        };
        self.absorb(unmatched)?;

        if !self.stopping {
            info!(schema = %schema, "schema resolved");
        }
        Ok(())
    }

    async fn on_record<F>(&mut self, record: &Record, shutdown: Pin<&mut F>) -> Result<(), BlacklistError>
    where
        F: Future<Output = ()> + Send,
    {
        if record.is_end_of_stream() {
            info!("end-of-stream marker received");
            self.stopping = true;
            return Ok(());
        }

        let accessors = self.accessors.ok_or(BlacklistError::MissingSchema)?;
        self.report.received += 1;

        let destination = accessors.ip.read_ip(record).zip(accessors.port.read_u16(record));
        let Some((ip, port)) = destination else {
            self.report.malformed += 1;
            debug!(len = record.len(), "record too short for destination fields, dropped");
            return Ok(());
        };

        let blacklisted = self.blacklist.contains(ip, port);
        let sent = if blacklisted {
            debug!(%ip, port, "blacklisted destination");
            until_shutdown(self.matched.send(record), shutdown).await
        } else {
            until_shutdown(self.unmatched.send(record), shutdown).await
        };

        let Some(sent) = sent else {
            self.interrupt();
            debug!("record in flight dropped");
            return Ok(());
        };

        if self.absorb(sent)? {
            if blacklisted {
                self.report.matched += 1;
            } else {
                self.report.unmatched += 1;
            }
        }
        Ok(())
    }

    /// Timeouts are counted, a closed output stops the filter, anything else is fatal
    fn absorb(&mut self, sent: Result<(), TransportError>) -> Result<bool, BlacklistError> {
        match sent {
            Ok(()) => {
                self.unflushed = true;
                Ok(true)
            }
            Err(TransportError::Timeout) => {
                self.report.timeouts += 1;
                Ok(false)
            }
            Err(TransportError::Closed) => {
                warn!("output interface closed, stopping");
                self.stopping = true;
                Ok(false)
            }
            Err(err) => {
                error!(error = %err, "failed to route record");
                Err(err.into())
            }
        }
    }
}
