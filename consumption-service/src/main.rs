use std::{env, sync::Arc, time::Duration};

use anyhow::{bail, Result};
use consumption_service::{
    config::AppConfig,
    metrics_server,
    observability,
    sinks::PgRecordSink,
    sources::PgRecordSource,
    ConsumptionQuery,
    ConsumptionService,
};
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 5 {
        bail!("usage: consumption-service <meter_ids> <start_date> <end_date> <monthly|weekly|daily>");
    }
    let query = ConsumptionQuery::new(&args[1], &args[2], &args[3], &args[4]);

    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;

    let import_cfg = &cfg.import;
    let service = ConsumptionService::new(
        Arc::new(PgRecordSource::new(pool.clone())),
        Arc::new(PgRecordSink::new(
            pool,
            import_cfg.batch_size,
            import_cfg.max_retries,
            Duration::from_millis(import_cfg.retry_backoff_ms),
            Duration::from_millis(import_cfg.lot_pause_ms),
        )),
        cfg.aggregation.fan_out(),
    );

    let series = service.get_consumption(&query).await?;
    println!("{}", serde_json::to_string_pretty(&series)?);

    Ok(())
}
