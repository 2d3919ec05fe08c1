use anyhow::{Context, Result};
use nyc311_etl::{
    config::Config,
    ingest::{self, LoadOptions},
    report,
    sink::MySqlSink,
};
use std::{fs::File, io::BufReader};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    // ─── 2) read configuration once ──────────────────────────────────
    let cfg = Config::from_env();
    info!(
        source = %cfg.source_path.display(),
        chunk_size = cfg.chunk_size,
        db_host = %cfg.db_host,
        db_name = %cfg.db_name,
        "import starting"
    );

    // ─── 3) write phase: scoped source + sink, released before reads ─
    let total = {
        let file = File::open(&cfg.source_path)
            .with_context(|| format!("opening {}", cfg.source_path.display()))?;
        let mut sink = MySqlSink::connect(&cfg)
            .await
            .context("connecting to destination")?;
        let opts = LoadOptions {
            chunk_size: cfg.chunk_size,
            report_every: cfg.report_every,
        };
        let result = ingest::load(BufReader::new(file), &mut sink, &opts).await;
        sink.close().await;
        result.context("import failed")?
    };
    info!(rows = total, "rows loaded into MySQL");

    // ─── 4) reporting phase: its own connection, ad hoc aggregates ───
    let pool = report::connect(&cfg).await?;

    let monthly = report::monthly_counts(&pool).await?;
    emit("monthly_counts", &monthly)?;
    emit("seasonal_totals", &report::seasonal_totals(&monthly))?;
    emit(
        "top_complaint_types",
        &report::top_complaint_types(&pool, 10).await?,
    )?;
    emit("borough_breakdown", &report::borough_breakdown(&pool).await?)?;
    emit("year_over_year", &report::year_over_year(&pool).await?)?;

    pool.close().await;
    info!("all done");
    Ok(())
}

/// Print one report as JSON lines prefixed with its name.
fn emit<T: serde::Serialize>(name: &str, rows: &[T]) -> Result<()> {
    info!(report = name, rows = rows.len(), "report ready");
    for row in rows {
        println!("{}\t{}", name, serde_json::to_string(row)?);
    }
    Ok(())
}
