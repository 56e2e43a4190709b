//! Register and lottery transaction recording. These feed the Z-Report
//! aggregation; nothing here touches the reconciliation session.

use crate::db::DatabaseExt;
use crate::models::{CreateTransaction, LotteryTransaction, Transaction};
use crate::reconcile::round_cents;
use rusqlite::Connection;
use tauri::AppHandle;

pub fn insert_transaction(conn: &Connection, tx: CreateTransaction) -> Result<Transaction, String> {
    if tx.payment_method != "cash" && tx.payment_method != "card" {
        return Err(format!("Unknown payment method: {}", tx.payment_method));
    }
    if tx.subtotal < 0.0 || tx.tax < 0.0 {
        return Err("Transaction amounts cannot be negative".to_string());
    }

    let total = round_cents(tx.subtotal + tx.tax);

    conn.execute(
        "INSERT INTO transactions (subtotal, tax, total, payment_method, status)
         VALUES (?1, ?2, ?3, ?4, 'completed')",
        rusqlite::params![tx.subtotal, tx.tax, total, tx.payment_method],
    )
    .map_err(|e| e.to_string())?;

    let id = conn.last_insert_rowid();

    let created_at: String = conn
        .query_row(
            "SELECT created_at FROM transactions WHERE id = ?1",
            [id],
            |row| row.get(0),
        )
        .map_err(|e| e.to_string())?;

    Ok(Transaction {
        id,
        subtotal: tx.subtotal,
        tax: tx.tax,
        total,
        payment_method: tx.payment_method,
        status: "completed".to_string(),
        created_at,
    })
}

pub fn insert_lottery(
    conn: &Connection,
    kind: &str,
    amount: f64,
) -> Result<LotteryTransaction, String> {
    if kind != "SALE" && kind != "PAYOUT" {
        return Err(format!("Unknown lottery transaction kind: {kind}"));
    }
    if amount <= 0.0 {
        return Err("Lottery amount must be positive".to_string());
    }

    conn.execute(
        "INSERT INTO lottery_transactions (kind, amount) VALUES (?1, ?2)",
        rusqlite::params![kind, amount],
    )
    .map_err(|e| e.to_string())?;

    let id = conn.last_insert_rowid();

    let created_at: String = conn
        .query_row(
            "SELECT created_at FROM lottery_transactions WHERE id = ?1",
            [id],
            |row| row.get(0),
        )
        .map_err(|e| e.to_string())?;

    Ok(LotteryTransaction {
        id,
        kind: kind.to_string(),
        amount,
        created_at,
    })
}

#[tauri::command]
pub fn record_transaction(app: AppHandle, tx: CreateTransaction) -> Result<Transaction, String> {
    let db = app.db();
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    insert_transaction(&conn, tx)
}

#[tauri::command]
pub fn record_lottery_transaction(
    app: AppHandle,
    kind: String,
    amount: f64,
) -> Result<LotteryTransaction, String> {
    let db = app.db();
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    insert_lottery(&conn, &kind, amount)
}

#[tauri::command]
pub fn get_today_transactions(app: AppHandle) -> Result<Vec<Transaction>, String> {
    let db = app.db();
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let mut stmt = conn
        .prepare(
            "SELECT id, subtotal, tax, total, payment_method, status, created_at
             FROM transactions
             WHERE date(created_at, 'localtime') = date('now', 'localtime')
             ORDER BY created_at DESC",
        )
        .map_err(|e| e.to_string())?;

    let transactions = stmt
        .query_map([], |row| {
            Ok(Transaction {
                id: row.get(0)?,
                subtotal: row.get(1)?,
                tax: row.get(2)?,
                total: row.get(3)?,
                payment_method: row.get(4)?,
                status: row.get::<_, Option<String>>(5)?
                    .unwrap_or_else(|| "completed".to_string()),
                created_at: row.get(6)?,
            })
        })
        .map_err(|e| e.to_string())?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;

    Ok(transactions)
}
