//! Per-meter aggregation: partition readings by calendar month, bucket each
//! month, sum each bucket and render the result as parallel series.

pub mod partition;
pub mod reduce;

use std::time::Instant;

use consumption_client::domain::ConsumptionRecord;
use serde::Serialize;

use crate::calendar::PeriodKind;

pub use partition::{partition_by_year_and_month, YearMonthPartition};
pub use reduce::{match_and_reduce, BucketAggregate};

/// Aggregated consumption of one meter.
///
/// The five vectors are index-aligned: position `i` of each describes the same
/// bucket. Buckets are in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputSeries {
    pub period: Vec<String>,
    pub meter_id: i64,
    pub active: Vec<f64>,
    pub reactive_inductive: Vec<f64>,
    pub reactive_capacitive: Vec<f64>,
    pub exported: Vec<f64>,
}

impl OutputSeries {
    pub fn len(&self) -> usize {
        self.period.len()
    }

    pub fn is_empty(&self) -> bool {
        self.period.is_empty()
    }

    fn push(&mut self, label: String, agg: &BucketAggregate) {
        self.period.push(label);
        self.active.push(agg.active_energy);
        self.reactive_inductive.push(agg.reactive_energy);
        self.reactive_capacitive.push(agg.capacitive_reactive);
        self.exported.push(agg.exported_energy);
    }
}

/// Run partition, bucketing, match/reduce and labelling for one meter.
///
/// `meter_id` of the result is left at 0; the caller tags it.
pub fn aggregate(kind: PeriodKind, records: Vec<ConsumptionRecord>) -> OutputSeries {
    let started = Instant::now();
    let partition = partition_by_year_and_month(records);

    let mut aggregates: Vec<BucketAggregate> = Vec::new();
    for (year, months) in &partition {
        for (month, readings) in months {
            let buckets = kind.generate_buckets(*month, *year);
            aggregates.extend(match_and_reduce(readings, &buckets));
        }
    }
    aggregates.sort_by_key(|a| a.start_date);

    let mut series = OutputSeries::default();
    for agg in &aggregates {
        let label = kind.format_label(agg.start_date, agg.end_date);
        series.push(label, agg);
    }

    metrics::histogram!("consumption_aggregate_seconds").record(started.elapsed().as_secs_f64());
    series
}
