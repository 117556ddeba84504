pub mod postgres;

use consumption_client::domain::ConsumptionRecord;

use crate::error::ServiceError;

pub use postgres::PgRecordSink;

/// Where imported readings are written.
#[async_trait::async_trait]
pub trait RecordSink: Send + Sync {
    async fn persist_records(&self, records: Vec<ConsumptionRecord>) -> Result<(), ServiceError>;
}
