use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, Duration, OffsetDateTime,
    PrimitiveDateTime, UtcOffset,
};

use crate::{calendar::PeriodKind, error::ServiceError};

/// Parse a timestamp as it arrives in query strings and CSV exports.
///
/// Accepted shapes, all normalized to UTC:
/// - `2023-01-02` (midnight)
/// - `2023-01-02 13:45:00`
/// - `2023-01-02 13:45:00+00`
/// - RFC3339
pub fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, ServiceError> {
    let s = raw.trim();

    if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
        return Ok(ts.to_offset(UtcOffset::UTC));
    }
    let with_offset =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]");
    if let Ok(ts) = OffsetDateTime::parse(s, with_offset) {
        return Ok(ts.to_offset(UtcOffset::UTC));
    }
    if let Ok(ts) = PrimitiveDateTime::parse(s, format_description!("[year]-[month]-[day] [hour]:[minute]:[second]")) {
        return Ok(ts.assume_utc());
    }
    if let Ok(d) = Date::parse(s, format_description!("[year]-[month]-[day]")) {
        return Ok(d.midnight().assume_utc());
    }

    Err(ServiceError::Validation(format!("invalid date '{s}'")))
}

/// Raw report parameters, as received from the request surface.
#[derive(Debug, Clone, Default)]
pub struct ConsumptionQuery {
    /// Comma-separated meter ids, e.g. `"1,2,3"`.
    pub meter_ids: String,
    pub start_date: String,
    pub end_date: String,
    /// `monthly`, `weekly` or `daily`, any case.
    pub kind_period: String,
}

impl ConsumptionQuery {
    pub fn new(
        meter_ids: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
        kind_period: impl Into<String>,
    ) -> Self {
        Self {
            meter_ids: meter_ids.into(),
            start_date: start_date.into(),
            end_date: end_date.into(),
            kind_period: kind_period.into(),
        }
    }

    /// Check every parameter and build the typed request.
    ///
    /// The end date is moved to the last second of its calendar day.
    pub fn validate(&self) -> Result<AggregationRequest, ServiceError> {
        let start_date = parse_timestamp(&self.start_date)?;
        let end_date = parse_timestamp(&self.end_date)?;
        if start_date > end_date {
            return Err(ServiceError::Validation(format!(
                "start date must not be after end date ({} > {})",
                self.start_date.trim(),
                self.end_date.trim()
            )));
        }
        let end_of_day = end_date
            .checked_add(Duration::DAY - Duration::SECOND)
            .ok_or_else(|| ServiceError::Validation(format!("end date out of range '{}'", self.end_date.trim())))?;

        let meter_ids = parse_meter_ids(&self.meter_ids)?;
        let period_kind: PeriodKind = self.kind_period.parse()?;

        AggregationRequest::new(meter_ids, start_date, end_of_day, period_kind)
    }
}

fn parse_meter_ids(raw: &str) -> Result<Vec<i64>, ServiceError> {
    if raw.trim().is_empty() {
        return Err(ServiceError::Validation("meter id list is empty".to_string()));
    }

    raw.split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<i64>()
                .map_err(|e| ServiceError::Validation(format!("invalid meter id '{part}': {e}")))
        })
        .collect()
}

/// A validated report request.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationRequest {
    pub meter_ids: Vec<i64>,
    pub start_date: OffsetDateTime,
    pub end_date: OffsetDateTime,
    pub period_kind: PeriodKind,
}

impl AggregationRequest {
    pub fn new(
        meter_ids: Vec<i64>,
        start_date: OffsetDateTime,
        end_date: OffsetDateTime,
        period_kind: PeriodKind,
    ) -> Result<Self, ServiceError> {
        if meter_ids.is_empty() {
            return Err(ServiceError::Validation("meter id list is empty".to_string()));
        }
        if start_date > end_date {
            return Err(ServiceError::Validation("start date must not be after end date".to_string()));
        }

        Ok(Self {
            meter_ids,
            start_date,
            end_date,
            period_kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn parse_timestamp_accepts_supported_shapes() {
        assert_eq!(parse_timestamp("2023-01-02").unwrap(), datetime!(2023-01-02 00:00:00 UTC));
        assert_eq!(
            parse_timestamp(" 2023-01-02 13:45:10 ").unwrap(),
            datetime!(2023-01-02 13:45:10 UTC)
        );
        assert_eq!(
            parse_timestamp("2023-01-02 13:45:10+00").unwrap(),
            datetime!(2023-01-02 13:45:10 UTC)
        );
        assert_eq!(
            parse_timestamp("2023-01-02T13:45:10-05:00").unwrap(),
            datetime!(2023-01-02 18:45:10 UTC)
        );
    }

    #[test]
    fn parse_timestamp_rejects_garbage() {
        assert!(matches!(parse_timestamp("yesterday"), Err(ServiceError::Validation(_))));
        assert!(matches!(parse_timestamp("2023-13-01"), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn validate_builds_request_with_end_of_day() {
        let query = ConsumptionQuery::new("1, 2,3", "2023-01-01", "2023-01-31", " Weekly");

        let req = query.validate().unwrap();

        assert_eq!(req.meter_ids, vec![1, 2, 3]);
        assert_eq!(req.start_date, datetime!(2023-01-01 00:00:00 UTC));
        assert_eq!(req.end_date, datetime!(2023-01-31 23:59:59 UTC));
        assert_eq!(req.period_kind, PeriodKind::Weekly);
    }

    #[test]
    fn validate_rejects_inverted_dates() {
        let query = ConsumptionQuery::new("1", "2023-02-01", "2023-01-01", "daily");
        assert!(matches!(query.validate(), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn same_day_window_is_valid() {
        let query = ConsumptionQuery::new("1", "2023-02-01", "2023-02-01", "daily");
        let req = query.validate().unwrap();
        assert_eq!(req.end_date, datetime!(2023-02-01 23:59:59 UTC));
    }

    #[test]
    fn last_representable_day_is_a_valid_end_date() {
        let query = ConsumptionQuery::new("1", "9999-12-30", "9999-12-31", "daily");

        let req = query.validate().unwrap();

        assert_eq!(req.end_date, datetime!(9999-12-31 23:59:59 UTC));
    }

    #[test]
    fn end_of_day_past_calendar_range_is_rejected() {
        let query = ConsumptionQuery::new("1", "9999-12-30", "9999-12-31 12:00:00", "daily");
        assert!(matches!(query.validate(), Err(ServiceError::Validation(msg)) if msg.contains("out of range")));
    }

    #[test]
    fn validate_rejects_bad_meter_ids() {
        for ids in ["", "  ", "1,,2", "1,abc", "1.5"] {
            let query = ConsumptionQuery::new(ids, "2023-01-01", "2023-01-31", "daily");
            assert!(
                matches!(query.validate(), Err(ServiceError::Validation(_))),
                "meter ids {ids:?} should be rejected"
            );
        }
    }

    #[test]
    fn validate_rejects_unknown_period() {
        let query = ConsumptionQuery::new("1", "2023-01-01", "2023-01-31", "yearly");
        assert!(matches!(query.validate(), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn request_requires_meters() {
        let start = datetime!(2023-01-01 00:00:00 UTC);
        assert!(AggregationRequest::new(Vec::new(), start, start, PeriodKind::Daily).is_err());
    }
}
