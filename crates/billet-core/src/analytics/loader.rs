//! Concurrent loading of the five dashboard breakdowns

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::{category_breakdown, material_breakdown, summarize, time_series, top_clients};
use crate::db::Database;
use crate::error::Result;
use crate::models::Analytics;
use crate::window::TimeRange;

/// Run one breakdown on the blocking pool with its own pooled connection
///
/// A failed query, a bad number or a panicked task all degrade to `None`;
/// the caller substitutes an empty value so the other breakdowns still show.
async fn run_load<T, F>(breakdown: &'static str, db: Database, load: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce(&Database) -> Result<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || load(&db)).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            warn!(breakdown, error = %e, "Failed to load analytics breakdown");
            None
        }
        Err(e) => {
            warn!(breakdown, error = %e, "Analytics task panicked");
            None
        }
    }
}

/// Compute every dashboard breakdown for `range`, relative to `now`
///
/// The five loads are independent and run concurrently. Any one of them
/// failing yields its empty default while the rest are returned as usual.
pub async fn load_analytics(db: &Database, range: TimeRange, now: DateTime<Utc>) -> Analytics {
    let since = range.lower_bound(now);
    debug!(range = %range, since = ?since, "Loading analytics");

    let (summary, series, categories, materials, clients) = tokio::join!(
        run_load("summary", db.clone(), move |db| {
            let invoices = db.analytics_invoice_rows(since)?;
            let items = db.analytics_item_rows(since)?;
            summarize(&invoices, &items)
        }),
        run_load("time_series", db.clone(), move |db| {
            time_series(&db.analytics_invoice_rows(since)?)
        }),
        run_load("categories", db.clone(), move |db| {
            category_breakdown(&db.analytics_item_rows(since)?)
        }),
        run_load("materials", db.clone(), move |db| {
            material_breakdown(&db.analytics_material_rows(since)?)
        }),
        run_load("top_clients", db.clone(), move |db| {
            top_clients(&db.analytics_invoice_rows(since)?)
        }),
    );

    Analytics {
        range,
        since,
        generated_at: now,
        summary: summary.unwrap_or_default(),
        time_series: series.unwrap_or_default(),
        categories: categories.unwrap_or_default(),
        materials: materials.unwrap_or_default(),
        top_clients: clients.unwrap_or_default(),
    }
}
