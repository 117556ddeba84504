use consumption_client::domain::ConsumptionRecord;
use time::OffsetDateTime;

use crate::calendar::TimeBucket;

/// Summed quantities of every reading that fell inside one bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketAggregate {
    pub start_date: OffsetDateTime,
    pub end_date: OffsetDateTime,
    pub active_energy: f64,
    pub reactive_energy: f64,
    pub capacitive_reactive: f64,
    pub exported_energy: f64,
}

impl BucketAggregate {
    fn empty(bucket: &TimeBucket) -> Self {
        Self {
            start_date: bucket.init,
            end_date: bucket.finish,
            active_energy: 0.0,
            reactive_energy: 0.0,
            capacitive_reactive: 0.0,
            exported_energy: 0.0,
        }
    }

    fn add(&mut self, r: &ConsumptionRecord) {
        self.active_energy += r.active_energy;
        self.reactive_energy += r.reactive_energy;
        self.capacitive_reactive += r.capacitive_reactive;
        self.exported_energy += r.solar_exported;
    }
}

/// Assign readings to buckets and sum each bucket.
///
/// One aggregate per bucket that matched at least one reading, in bucket
/// order. Readings sitting exactly on a bucket boundary are dropped.
pub fn match_and_reduce(records: &[ConsumptionRecord], buckets: &[TimeBucket]) -> Vec<BucketAggregate> {
    let mut out = Vec::new();

    for bucket in buckets {
        let matched: Vec<&ConsumptionRecord> = records.iter().filter(|r| bucket.contains(r.ts)).collect();
        if matched.is_empty() {
            continue;
        }

        let mut agg = BucketAggregate::empty(bucket);
        for r in matched {
            agg.add(r);
        }
        out.push(agg);
    }

    tracing::debug!(buckets = buckets.len(), matched = out.len(), "match and reduce done");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn reading(ts: OffsetDateTime, active: f64, reactive: f64, capacitive: f64, solar: f64) -> ConsumptionRecord {
        ConsumptionRecord {
            id: "r".to_string(),
            meter_id: 1,
            active_energy: active,
            reactive_energy: reactive,
            capacitive_reactive: capacitive,
            solar_exported: solar,
            ts,
        }
    }

    #[test]
    fn sums_all_four_quantities() {
        let bucket = TimeBucket {
            init: datetime!(2023-01-01 00:00:00 UTC),
            finish: datetime!(2023-01-31 23:59:59 UTC),
        };
        let records = vec![
            reading(datetime!(2023-01-05 10:00:00 UTC), 20.0, 10.0, 5.0, 15.0),
            reading(datetime!(2023-01-06 10:00:00 UTC), 30.0, 15.0, 7.0, 20.0),
        ];

        let result = match_and_reduce(&records, &[bucket]);

        assert_eq!(result.len(), 1);
        let agg = &result[0];
        assert_eq!(agg.start_date, bucket.init);
        assert_eq!(agg.end_date, bucket.finish);
        assert_eq!(agg.active_energy, 50.0);
        assert_eq!(agg.reactive_energy, 25.0);
        assert_eq!(agg.capacitive_reactive, 12.0);
        assert_eq!(agg.exported_energy, 35.0);
    }

    #[test]
    fn empty_buckets_are_dropped() {
        let buckets = [
            TimeBucket {
                init: datetime!(2022-01-01 00:00:00 UTC),
                finish: datetime!(2022-01-20 00:00:00 UTC),
            },
            TimeBucket {
                init: datetime!(2022-02-01 00:00:00 UTC),
                finish: datetime!(2022-02-28 00:00:00 UTC),
            },
            TimeBucket {
                init: datetime!(2022-05-01 00:00:00 UTC),
                finish: datetime!(2022-05-31 00:00:00 UTC),
            },
        ];
        let records = vec![
            reading(datetime!(2022-01-15 00:00:00 UTC), 1.0, 0.0, 0.0, 0.0),
            reading(datetime!(2022-02-10 00:00:00 UTC), 1.0, 0.0, 0.0, 0.0),
        ];

        let result = match_and_reduce(&records, &buckets);

        assert_eq!(result.len(), 2);
        assert_eq!(result[1].start_date, buckets[1].init);
    }

    #[test]
    fn boundary_readings_match_nothing() {
        let bucket = TimeBucket {
            init: datetime!(2022-01-01 00:00:00 UTC),
            finish: datetime!(2022-01-20 00:00:00 UTC),
        };
        let records = vec![
            reading(bucket.init, 1.0, 1.0, 1.0, 1.0),
            reading(bucket.finish, 1.0, 1.0, 1.0, 1.0),
        ];

        assert!(match_and_reduce(&records, &[bucket]).is_empty());
    }

    #[test]
    fn no_records_no_aggregates() {
        let bucket = TimeBucket {
            init: datetime!(2022-01-01 00:00:00 UTC),
            finish: datetime!(2022-01-02 00:00:00 UTC),
        };
        assert!(match_and_reduce(&[], &[bucket]).is_empty());
    }
}
