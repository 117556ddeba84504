pub mod consumption_record;

pub use consumption_record::ConsumptionRecord;
