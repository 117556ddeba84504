//! Per-meter fan-out of report requests and CSV import.

pub mod request;

use std::{io::Read, sync::Arc, time::Duration};

use consumption_client::domain::ConsumptionRecord;
use time::OffsetDateTime;
use tokio::{sync::Semaphore, task::JoinSet};
use tokio_util::sync::CancellationToken;

use crate::{
    aggregation::{aggregate, OutputSeries},
    calendar::PeriodKind,
    error::ServiceError,
    sinks::RecordSink,
    sources::{read_consumption_csv, RecordSource},
};

pub use request::{parse_timestamp, AggregationRequest, ConsumptionQuery};

#[derive(Debug, Clone)]
pub struct FanOutConfig {
    /// Meters fetched at the same time; values below 1 are treated as 1.
    pub max_concurrent_meters: usize,
    /// Upper bound on a single record-source call. `None` waits forever.
    pub meter_timeout: Option<Duration>,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            max_concurrent_meters: 16,
            meter_timeout: None,
        }
    }
}

pub struct ConsumptionService {
    source: Arc<dyn RecordSource>,
    sink: Arc<dyn RecordSink>,
    fan_out: FanOutConfig,
}

impl ConsumptionService {
    pub fn new(source: Arc<dyn RecordSource>, sink: Arc<dyn RecordSink>, fan_out: FanOutConfig) -> Self {
        Self { source, sink, fan_out }
    }

    /// Validate `query`, then aggregate every requested meter concurrently.
    ///
    /// All-or-nothing: if any meter fails, every successful series is
    /// discarded and one error is returned. Validation failures return before
    /// the record source is touched.
    pub async fn get_consumption(&self, query: &ConsumptionQuery) -> Result<Vec<OutputSeries>, ServiceError> {
        metrics::counter!("consumption_requests_total").increment(1);

        let request = match query.validate() {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, kind_period = %query.kind_period.trim(), "consumption query rejected");
                metrics::counter!("consumption_request_errors_total").increment(1);
                return Err(e);
            }
        };

        let result = self.aggregate_request(&request).await;
        if result.is_err() {
            metrics::counter!("consumption_request_errors_total").increment(1);
        }
        result
    }

    /// Fan out an already validated request.
    ///
    /// Series come back in the order of `request.meter_ids`. When several
    /// meters fail, the error of the failing meter listed first is returned;
    /// cancellations triggered by a failure are never preferred over it.
    pub async fn aggregate_request(&self, request: &AggregationRequest) -> Result<Vec<OutputSeries>, ServiceError> {
        tracing::info!(
            meters = request.meter_ids.len(),
            period_kind = request.period_kind.as_str(),
            "aggregating consumption request"
        );
        let permits = Arc::new(Semaphore::new(self.fan_out.max_concurrent_meters.max(1)));
        let cancel = CancellationToken::new();
        let mut workers = JoinSet::new();

        for (idx, &meter_id) in request.meter_ids.iter().enumerate() {
            let worker = MeterWorker {
                source: Arc::clone(&self.source),
                permits: Arc::clone(&permits),
                cancel: cancel.clone(),
                meter_id,
                start: request.start_date,
                end: request.end_date,
                kind: request.period_kind,
                timeout: self.fan_out.meter_timeout,
            };

            workers.spawn(async move {
                let result = worker.run().await;
                if result.is_err() {
                    worker.cancel.cancel();
                }
                (idx, result)
            });
        }

        let mut series: Vec<Option<OutputSeries>> = vec![None; request.meter_ids.len()];
        let mut failures: Vec<(usize, ServiceError)> = Vec::new();

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((idx, Ok(s))) => series[idx] = Some(s),
                Ok((idx, Err(e))) => failures.push((idx, e)),
                Err(e) => {
                    cancel.cancel();
                    failures.push((usize::MAX, ServiceError::Join(e.to_string())));
                }
            }
        }

        if let Some(err) = first_root_cause(failures) {
            tracing::error!(
                error = %err,
                meters = request.meter_ids.len(),
                period_kind = %request.period_kind,
                "consumption request failed"
            );
            return Err(err);
        }

        Ok(series.into_iter().flatten().collect())
    }

    /// Parse a CSV export and hand every reading to the record sink.
    ///
    /// Returns the number of readings persisted.
    pub async fn import_csv<R: Read>(&self, reader: R) -> Result<usize, ServiceError> {
        let records = read_consumption_csv(reader)?;
        let count = records.len();
        if count == 0 {
            tracing::info!("csv import contained no readings");
            return Ok(0);
        }

        self.sink.persist_records(records).await?;
        tracing::info!(records = count, "csv import done");
        Ok(count)
    }
}

fn first_root_cause(mut failures: Vec<(usize, ServiceError)>) -> Option<ServiceError> {
    failures.sort_by_key(|(idx, e)| (e.is_cancellation(), *idx));
    failures.into_iter().next().map(|(_, e)| e)
}

struct MeterWorker {
    source: Arc<dyn RecordSource>,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
    meter_id: i64,
    start: OffsetDateTime,
    end: OffsetDateTime,
    kind: PeriodKind,
    timeout: Option<Duration>,
}

impl MeterWorker {
    async fn run(&self) -> Result<OutputSeries, ServiceError> {
        let meter_id = self.meter_id;

        let fetched = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ServiceError::Cancelled { meter_id }),
            res = self.fetch() => res,
        };

        let records = match fetched {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(meter_id, error = %e, "error getting consumption records");
                metrics::counter!("consumption_meter_fetch_errors_total").increment(1);
                return Err(e);
            }
        };

        let mut series = aggregate(self.kind, records);
        series.meter_id = meter_id;
        tracing::debug!(meter_id, buckets = series.len(), "meter aggregated");
        Ok(series)
    }

    async fn fetch(&self) -> Result<Vec<ConsumptionRecord>, ServiceError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ServiceError::Join(format!("meter permit unavailable: {e}")))?;

        let call = self.source.fetch_records(self.start, self.end, self.meter_id);
        match self.timeout {
            Some(after) => match tokio::time::timeout(after, call).await {
                Ok(res) => res,
                Err(_) => {
                    metrics::counter!("consumption_meter_timeouts_total").increment(1);
                    Err(ServiceError::Timeout {
                        meter_id: self.meter_id,
                        after,
                    })
                }
            },
            None => call.await,
        }
    }
}
