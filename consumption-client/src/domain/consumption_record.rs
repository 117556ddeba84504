use time::OffsetDateTime;

/// One meter reading as stored in `user_consumption`.
///
/// The four energy quantities are unit-less; `solar_exported` is the energy
/// the premise pushed back to the grid.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsumptionRecord {
    pub id: String,
    pub meter_id: i64,
    pub active_energy: f64,
    pub reactive_energy: f64,
    pub capacitive_reactive: f64,
    pub solar_exported: f64,
    pub ts: OffsetDateTime,
}
