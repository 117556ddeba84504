use anyhow::Result;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::domain::ConsumptionRecord;

/// Fetch every reading of a single meter with `start <= ts <= end`.
///
/// Returns an empty vector when no rows match.
pub async fn fetch_consumption_window(
    pool: &PgPool,
    meter_id: i64,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> Result<Vec<ConsumptionRecord>> {
    let rows = sqlx::query_as::<_, ConsumptionRecord>(
        r#"
        SELECT
            id,
            meter_id,
            active_energy,
            reactive_energy,
            capacitive_reactive,
            solar AS solar_exported,
            date  AS ts
        FROM user_consumption
        WHERE date BETWEEN $1 AND $2
          AND meter_id = $3
        ORDER BY date
        "#,
    )
    .bind(start)
    .bind(end)
    .bind(meter_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Insert one lot of readings in a single multi-row statement.
///
/// Callers are expected to keep lots well below the Postgres bind limit
/// (65535 parameters, seven per row).
pub async fn insert_consumption_lot(pool: &PgPool, lot: &[ConsumptionRecord]) -> Result<u64> {
    if lot.is_empty() {
        return Ok(0);
    }

    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO user_consumption (id, meter_id, active_energy, reactive_energy, capacitive_reactive, solar, date) ",
    );

    builder.push_values(lot, |mut b, r| {
        b.push_bind(&r.id)
            .push_bind(r.meter_id)
            .push_bind(r.active_energy)
            .push_bind(r.reactive_energy)
            .push_bind(r.capacitive_reactive)
            .push_bind(r.solar_exported)
            .push_bind(r.ts);
    });

    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected())
}
