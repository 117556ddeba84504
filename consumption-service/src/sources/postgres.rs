use consumption_client::{db, domain::ConsumptionRecord};
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::{error::ServiceError, sources::RecordSource};

pub struct PgRecordSource {
    pool: PgPool,
}

impl PgRecordSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RecordSource for PgRecordSource {
    async fn fetch_records(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        meter_id: i64,
    ) -> Result<Vec<ConsumptionRecord>, ServiceError> {
        let rows = db::fetch_consumption_window(&self.pool, meter_id, start, end)
            .await
            .map_err(|e| ServiceError::Source {
                meter_id,
                message: e.to_string(),
            })?;

        tracing::debug!(meter_id, rows = rows.len(), "fetched consumption window");
        Ok(rows)
    }
}
