//! Read-only consumers of the loaded `service_requests` table. Each report
//! is one aggregate query plus typed rows; no state, no retries, errors
//! propagate to the caller.

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{FromRow, MySqlPool};
use std::collections::BTreeMap;

use crate::config::Config;

/// Open the read-phase connection pool. Separate from the write-phase
/// connection, which must already be closed.
pub async fn connect(cfg: &Config) -> Result<MySqlPool> {
    MySqlPoolOptions::new()
        .max_connections(1)
        .connect(&cfg.database_url())
        .await
        .context("connecting for reporting")
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MonthlyCount {
    pub year: i64,
    pub month: i64,
    pub complaint_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeasonTotal {
    pub year: i64,
    pub season: Season,
    pub complaint_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ComplaintTypeCount {
    pub complaint_type: String,
    pub complaint_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BoroughCount {
    pub borough: String,
    pub complaint_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct YearOverYear {
    pub year: i64,
    pub month: i64,
    pub complaint_count: i64,
    pub prev_year_count: i64,
    /// Percent change against the same month last year, rounded to two
    /// decimal places. `None` when last year's count was zero.
    pub pct_change: Option<f64>,
}

/// Complaints grouped by year and month, in chronological order.
pub async fn monthly_counts(pool: &MySqlPool) -> Result<Vec<MonthlyCount>> {
    sqlx::query_as(
        "SELECT CAST(YEAR(created_date) AS SIGNED) AS year,
                CAST(MONTH(created_date) AS SIGNED) AS month,
                COUNT(*) AS complaint_count
         FROM service_requests
         WHERE created_date IS NOT NULL
         GROUP BY year, month
         ORDER BY year, month",
    )
    .fetch_all(pool)
    .await
    .context("querying monthly counts")
}

/// Dec/Jan/Feb = Winter, then quarters in month order. Months outside 1..=12
/// have no season.
pub fn season_of(month: i64) -> Option<Season> {
    match month {
        12 | 1 | 2 => Some(Season::Winter),
        3..=5 => Some(Season::Spring),
        6..=8 => Some(Season::Summer),
        9..=11 => Some(Season::Fall),
        _ => None,
    }
}

/// Roll monthly counts up into per-year season totals.
pub fn seasonal_totals(monthly: &[MonthlyCount]) -> Vec<SeasonTotal> {
    let mut totals: BTreeMap<(i64, Season), i64> = BTreeMap::new();
    for row in monthly {
        if let Some(season) = season_of(row.month) {
            *totals.entry((row.year, season)).or_insert(0) += row.complaint_count;
        }
    }
    totals
        .into_iter()
        .map(|((year, season), complaint_count)| SeasonTotal {
            year,
            season,
            complaint_count,
        })
        .collect()
}

/// The `limit` most frequent complaint types, descending.
pub async fn top_complaint_types(pool: &MySqlPool, limit: i64) -> Result<Vec<ComplaintTypeCount>> {
    sqlx::query_as(
        "SELECT complaint_type, COUNT(*) AS complaint_count
         FROM service_requests
         GROUP BY complaint_type
         ORDER BY complaint_count DESC
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("querying complaint types")
}

/// Complaint counts per borough, descending, excluding null/empty borough.
pub async fn borough_breakdown(pool: &MySqlPool) -> Result<Vec<BoroughCount>> {
    sqlx::query_as(
        "SELECT borough, COUNT(*) AS complaint_count
         FROM service_requests
         WHERE borough IS NOT NULL AND borough <> ''
         GROUP BY borough
         ORDER BY complaint_count DESC",
    )
    .fetch_all(pool)
    .await
    .context("querying borough breakdown")
}

#[derive(Debug, FromRow)]
struct YearOverYearRow {
    year: i64,
    month: i64,
    complaint_count: i64,
    prev_year_count: i64,
}

/// Each (year, month) count next to the same month one year earlier, with
/// the percent change computed client-side. Months without a prior-year
/// observation are excluded by the query.
pub async fn year_over_year(pool: &MySqlPool) -> Result<Vec<YearOverYear>> {
    let rows: Vec<YearOverYearRow> = sqlx::query_as(
        "WITH yearly AS (
             SELECT CAST(YEAR(created_date) AS SIGNED) AS year,
                    CAST(MONTH(created_date) AS SIGNED) AS month,
                    COUNT(*) AS complaint_count,
                    LAG(COUNT(*)) OVER (
                        PARTITION BY MONTH(created_date)
                        ORDER BY YEAR(created_date)
                    ) AS prev_year_count
             FROM service_requests
             WHERE created_date IS NOT NULL
             GROUP BY year, month
         )
         SELECT year, month, complaint_count, prev_year_count
         FROM yearly
         WHERE prev_year_count IS NOT NULL
         ORDER BY year, month",
    )
    .fetch_all(pool)
    .await
    .context("querying year-over-year trends")?;

    Ok(rows
        .into_iter()
        .map(|r| YearOverYear {
            year: r.year,
            month: r.month,
            complaint_count: r.complaint_count,
            prev_year_count: r.prev_year_count,
            pct_change: pct_change(r.complaint_count, r.prev_year_count),
        })
        .collect())
}

fn pct_change(current: i64, previous: i64) -> Option<f64> {
    if previous == 0 {
        return None;
    }
    let pct = (current - previous) as f64 / previous as f64 * 100.0;
    Some((pct * 100.0).round() / 100.0)
}
