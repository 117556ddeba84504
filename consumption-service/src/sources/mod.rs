pub mod consumption_csv_file;
pub mod postgres;

use consumption_client::domain::ConsumptionRecord;
use time::OffsetDateTime;

use crate::error::ServiceError;

pub use consumption_csv_file::{read_consumption_csv, ConsumptionCsvFile};
pub use postgres::PgRecordSource;

/// Where readings come from when a report is requested.
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    /// Readings of `meter_id` with `start <= ts <= end`.
    ///
    /// An empty vector, not an error, when nothing matches.
    async fn fetch_records(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        meter_id: i64,
    ) -> Result<Vec<ConsumptionRecord>, ServiceError>;
}
