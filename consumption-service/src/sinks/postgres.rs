use std::{ops::Range, time::Duration};

use consumption_client::{db, domain::ConsumptionRecord};
use sqlx::PgPool;

use crate::{error::ServiceError, sinks::RecordSink};

/// Consecutive index ranges of at most `batch_size` records covering `0..len`.
fn lot_bounds(len: usize, batch_size: usize) -> Vec<Range<usize>> {
    let batch_size = batch_size.max(1);
    (0..len)
        .step_by(batch_size)
        .map(|begin| begin..(begin + batch_size).min(len))
        .collect()
}

/// Writes readings into `user_consumption` in fixed-size lots.
pub struct PgRecordSink {
    pool: PgPool,
    batch_size: usize,
    max_retries: u32,
    retry_backoff: Duration,
    lot_pause: Duration,
}

impl PgRecordSink {
    pub fn new(
        pool: PgPool,
        batch_size: usize,
        max_retries: u32,
        retry_backoff: Duration,
        lot_pause: Duration,
    ) -> Self {
        Self {
            pool,
            batch_size: batch_size.max(1),
            max_retries,
            retry_backoff,
            lot_pause,
        }
    }

    async fn flush_lot(&self, lot: &[ConsumptionRecord]) -> Result<(), ServiceError> {
        let mut attempt: u32 = 0;
        loop {
            match db::insert_consumption_lot(&self.pool, lot).await {
                Ok(inserted) => {
                    metrics::counter!("consumption_records_imported_total").increment(inserted);
                    return Ok(());
                }
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        error = %e,
                        attempt,
                        "consumption lot insert failed, retrying with backoff"
                    );
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "consumption lot insert failed, giving up");
                    metrics::counter!("consumption_sink_errors_total").increment(1);
                    return Err(ServiceError::Sink(e.to_string()));
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl RecordSink for PgRecordSink {
    async fn persist_records(&self, records: Vec<ConsumptionRecord>) -> Result<(), ServiceError> {
        let bounds = lot_bounds(records.len(), self.batch_size);
        let lots = bounds.len();

        for (i, range) in bounds.into_iter().enumerate() {
            tracing::info!(begin = range.start, end = range.end, lots, "inserting consumption lot");
            self.flush_lot(&records[range]).await?;

            if i + 1 < lots && !self.lot_pause.is_zero() {
                tokio::time::sleep(self.lot_pause).await;
            }
        }

        tracing::info!(records = records.len(), "consumption import persisted");
        Ok(())
    }
}
