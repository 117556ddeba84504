use anyhow::{bail, Result};
use consumption_service::{
    config::AppConfig,
    observability,
    sinks::PgRecordSink,
    sources::{ConsumptionCsvFile, PgRecordSource},
    ConsumptionService,
};
use sqlx::postgres::PgPoolOptions;
use std::{env, sync::Arc, time::Duration};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: import_consumption_csv <csv_file_path>");
    }
    let file_path = &args[1];

    // Point CONSUMPTION_CONFIG at an import-specific file to tune lot sizes.
    let cfg = AppConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;

    let import_cfg = &cfg.import;
    let sink = PgRecordSink::new(
        pool.clone(),
        import_cfg.batch_size,
        import_cfg.max_retries,
        Duration::from_millis(import_cfg.retry_backoff_ms),
        Duration::from_millis(import_cfg.lot_pause_ms),
    );

    let service = ConsumptionService::new(
        Arc::new(PgRecordSource::new(pool)),
        Arc::new(sink),
        cfg.aggregation.fan_out(),
    );

    let csv = ConsumptionCsvFile::new(file_path);
    let file = csv.open()?;
    let imported = service.import_csv(file).await?;
    tracing::info!(imported, path = %file_path, "consumption csv imported");

    Ok(())
}
