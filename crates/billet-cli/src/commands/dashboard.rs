//! Dashboard command: analytics for a time range

use anyhow::Result;
use chrono::Utc;

use billet_core::db::Database;
use billet_core::models::Analytics;
use billet_core::{load_analytics, DashboardView, TimeRange};

use super::truncate;

pub async fn cmd_dashboard(db: &Database, range: TimeRange, json: bool) -> Result<()> {
    let mut view = DashboardView::new();
    let ticket = view.begin_refresh(range);
    let analytics = load_analytics(db, ticket.range(), Utc::now()).await;
    view.commit(ticket, analytics);

    let Some(analytics) = view.analytics() else {
        anyhow::bail!("Dashboard refresh was superseded");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(analytics)?);
        return Ok(());
    }

    print_analytics(analytics);
    Ok(())
}

fn print_analytics(analytics: &Analytics) {
    let summary = &analytics.summary;

    println!();
    println!("╭─────────────────────────────────────────╮");
    println!("│           📊 Billet Dashboard           │");
    println!("╰─────────────────────────────────────────╯");
    match analytics.since {
        Some(since) => println!("  Range: {} (since {})", analytics.range.label(), since),
        None => println!("  Range: {}", analytics.range.label()),
    }
    println!();
    println!("  Invoices:        {}", summary.total_invoices);
    println!("  Revenue:         {:.2}", summary.total_revenue);
    println!("  Average value:   {:.2}", summary.avg_invoice_value);
    println!("  Items sold:      {}", summary.total_items_sold);
    println!(
        "  Status:          {} paid, {} sent, {} draft",
        summary.paid_count, summary.sent_count, summary.draft_count
    );

    if summary.total_invoices == 0 {
        println!();
        println!("  No invoices in this range.");
        return;
    }

    println!();
    println!("  📅 Revenue by day");
    for point in &analytics.time_series {
        println!(
            "     {}  {:>3} invoices  {:>12.2}",
            point.period, point.invoice_count, point.revenue
        );
    }

    if !analytics.categories.is_empty() {
        println!();
        println!("  🗂️  Categories");
        for category in &analytics.categories {
            println!(
                "     {:<24} {:>8} items  {:>12.2}",
                truncate(&category.category, 24),
                category.item_count,
                category.revenue
            );
        }
    }

    if !analytics.materials.is_empty() {
        println!();
        println!("  🪵 Top materials");
        for material in &analytics.materials {
            println!(
                "     {:<24} {:>10} {:<8} cost {:>10.2}  ({} uses)",
                truncate(&material.material_name, 24),
                material.total_qty,
                material.unit,
                material.total_cost,
                material.usage_count
            );
        }
    }

    if !analytics.top_clients.is_empty() {
        println!();
        println!("  👥 Top clients");
        for client in &analytics.top_clients {
            println!(
                "     {:<24} {:>3} invoices  {:>12.2}",
                truncate(&client.client_name, 24),
                client.invoice_count,
                client.total_revenue
            );
        }
    }
    println!();
}
