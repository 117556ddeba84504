use std::collections::BTreeMap;

use consumption_client::domain::ConsumptionRecord;

/// year -> month (1..=12) -> readings of that month, ascending by timestamp.
pub type YearMonthPartition = BTreeMap<i32, BTreeMap<u8, Vec<ConsumptionRecord>>>;

/// Group readings by the `(year, month)` of their timestamp.
///
/// Months are isolated per year: January 2022 and January 2023 land in
/// different vectors. Both map levels iterate in calendar order.
pub fn partition_by_year_and_month(mut records: Vec<ConsumptionRecord>) -> YearMonthPartition {
    let mut out = YearMonthPartition::new();
    if records.is_empty() {
        return out;
    }

    records.sort_by_key(|r| r.ts);

    for record in records {
        let year = record.ts.year();
        let month = u8::from(record.ts.month());
        out.entry(year).or_default().entry(month).or_default().push(record);
    }

    out
}
