pub mod aggregation;
pub mod calendar;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod metrics_server;
pub mod observability;
pub mod sinks;
pub mod sources;

pub use aggregation::OutputSeries;
pub use calendar::PeriodKind;
pub use coordinator::{ConsumptionQuery, ConsumptionService, FanOutConfig};
pub use error::ServiceError;
