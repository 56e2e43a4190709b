//! Z-Report snapshot builder.
//!
//! Aggregates the day's completed transactions, lottery flows, and the
//! drawer float into the read-only snapshot the reconciliation workflow
//! consumes. Lottery sales and payouts move the expected-cash figure
//! but never the sales summary; they are pass-through cash.

use crate::db::DatabaseExt;
use crate::models::{CashReconciliation, LotterySummary, SalesSummary, ZReportSnapshot};
use crate::reconcile::round_cents;
use rusqlite::Connection;
use tauri::AppHandle;

pub fn build_snapshot(conn: &Connection, date: &str) -> Result<ZReportSnapshot, String> {
    let (total_sales, total_transactions): (f64, i64) = conn
        .query_row(
            "SELECT COALESCE(SUM(total), 0), COUNT(*) FROM transactions
             WHERE date(created_at, 'localtime') = ?1 AND status = 'completed'",
            [date],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .map_err(|e| e.to_string())?;

    let cash_sales: f64 = sales_by_method(conn, date, "cash")?;
    let card_sales: f64 = sales_by_method(conn, date, "card")?;

    let (lottery_sales, lottery_sales_count) = lottery_by_kind(conn, date, "SALE")?;
    let (lottery_payouts, lottery_payouts_count) = lottery_by_kind(conn, date, "PAYOUT")?;

    // Latest float opened for the date; no drawer session means no float.
    let opening: f64 = conn
        .query_row(
            "SELECT opening_cash FROM drawer_sessions
             WHERE date = ?1 ORDER BY opened_at DESC LIMIT 1",
            [date],
            |row| row.get(0),
        )
        .unwrap_or(0.0);

    let expected = round_cents(opening + cash_sales + lottery_sales - lottery_payouts);

    let lottery = if lottery_sales_count > 0 || lottery_payouts_count > 0 {
        Some(LotterySummary {
            sales: round_cents(lottery_sales),
            sales_count: lottery_sales_count,
            payouts: round_cents(lottery_payouts),
            payouts_count: lottery_payouts_count,
            net: round_cents(lottery_sales - lottery_payouts),
        })
    } else {
        None
    };

    Ok(ZReportSnapshot {
        date: date.to_string(),
        summary: SalesSummary {
            total_sales: round_cents(total_sales),
            cash_sales: round_cents(cash_sales),
            card_sales: round_cents(card_sales),
            total_transactions,
        },
        cash_reconciliation: CashReconciliation {
            opening,
            sales: round_cents(cash_sales),
            lottery_sales: (lottery_sales > 0.0).then(|| round_cents(lottery_sales)),
            lottery_payouts: (lottery_payouts > 0.0).then(|| round_cents(lottery_payouts)),
            expected,
        },
        lottery,
    })
}

fn sales_by_method(conn: &Connection, date: &str, method: &str) -> Result<f64, String> {
    conn.query_row(
        "SELECT COALESCE(SUM(total), 0) FROM transactions
         WHERE date(created_at, 'localtime') = ?1
           AND status = 'completed'
           AND payment_method = ?2",
        [date, method],
        |row| row.get(0),
    )
    .map_err(|e| e.to_string())
}

fn lottery_by_kind(conn: &Connection, date: &str, kind: &str) -> Result<(f64, i64), String> {
    conn.query_row(
        "SELECT COALESCE(SUM(amount), 0), COUNT(*) FROM lottery_transactions
         WHERE date(created_at, 'localtime') = ?1 AND kind = ?2",
        [date, kind],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .map_err(|e| e.to_string())
}

#[tauri::command]
pub fn get_z_report(app: AppHandle, date: Option<String>) -> Result<ZReportSnapshot, String> {
    let db = app.db();
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let date = date.unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());

    build_snapshot(&conn, &date)
}
