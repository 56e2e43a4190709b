//! Drawer float and the append-only drawer activity ledger.

use crate::db::DatabaseExt;
use crate::models::{ActivitySummary, CreateDrawerActivity, DrawerActivity, DrawerActivityLog,
    DrawerSession};
use rusqlite::Connection;
use tauri::AppHandle;
use tracing::warn;

pub const ACTIVITY_TYPES: &[&str] = &[
    "SALE_OPEN",
    "NO_SALE",
    "CASH_DROP",
    "PAID_IN",
    "PAID_OUT",
    "TIP_PAYOUT",
    "REFUND",
    "MANAGER_OVERRIDE",
    "END_OF_DAY",
];

pub const NO_SALE_REASONS: &[&str] = &[
    "make_change",
    "verify_cash",
    "error_correction",
    "give_receipt",
    "cash_drop",
    "manager_request",
    "other",
];

// Too many no-sale opens in a day is a theft signal worth flagging.
const NO_SALE_ALERT_THRESHOLD: i64 = 5;
const NO_SALE_CRITICAL_THRESHOLD: i64 = 10;

pub fn validate_activity(kind: &str, reason: Option<&str>) -> Result<(), String> {
    if !ACTIVITY_TYPES.contains(&kind) {
        return Err(format!("Unknown drawer activity type: {kind}"));
    }
    if kind == "NO_SALE" {
        match reason {
            Some(r) if NO_SALE_REASONS.contains(&r) => Ok(()),
            Some(r) => Err(format!("Unknown no-sale reason: {r}")),
            None => Err("Reason required for no-sale drawer open".to_string()),
        }
    } else {
        Ok(())
    }
}

pub fn insert_activity(
    conn: &Connection,
    kind: &str,
    reason: Option<&str>,
    note: Option<&str>,
    amount: Option<f64>,
) -> Result<DrawerActivity, String> {
    validate_activity(kind, reason)?;

    conn.execute(
        "INSERT INTO drawer_activity (type, reason, note, amount) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![kind, reason, note, amount],
    )
    .map_err(|e| e.to_string())?;

    let id = conn.last_insert_rowid();

    let created_at: String = conn
        .query_row(
            "SELECT created_at FROM drawer_activity WHERE id = ?1",
            [id],
            |row| row.get(0),
        )
        .map_err(|e| e.to_string())?;

    Ok(DrawerActivity {
        id,
        kind: kind.to_string(),
        reason: reason.map(String::from),
        note: note.map(String::from),
        amount,
        created_at,
    })
}

pub fn open_session(conn: &Connection, date: &str, opening_cash: f64) -> Result<DrawerSession, String> {
    if opening_cash < 0.0 {
        return Err("Opening cash cannot be negative".to_string());
    }

    // One float at a time
    let open_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM drawer_sessions WHERE status = 'open'",
            [],
            |row| row.get(0),
        )
        .map_err(|e| e.to_string())?;

    if open_count > 0 {
        return Err("A drawer session is already open. Close it first.".to_string());
    }

    conn.execute(
        "INSERT INTO drawer_sessions (date, opening_cash, status) VALUES (?1, ?2, 'open')",
        rusqlite::params![date, opening_cash],
    )
    .map_err(|e| e.to_string())?;

    let id = conn.last_insert_rowid();

    let opened_at: String = conn
        .query_row(
            "SELECT opened_at FROM drawer_sessions WHERE id = ?1",
            [id],
            |row| row.get(0),
        )
        .map_err(|e| e.to_string())?;

    Ok(DrawerSession {
        id,
        date: date.to_string(),
        opening_cash,
        status: "open".to_string(),
        opened_at,
        closed_at: None,
    })
}

pub fn close_open_session(conn: &Connection) -> Result<(), String> {
    conn.execute(
        "UPDATE drawer_sessions SET status = 'closed', closed_at = CURRENT_TIMESTAMP
         WHERE status = 'open'",
        [],
    )
    .map_err(|e| e.to_string())?;
    Ok(())
}

#[tauri::command]
pub fn open_drawer_session(app: AppHandle, opening_cash: f64) -> Result<DrawerSession, String> {
    let db = app.db();
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let today = chrono::Local::now().format("%Y-%m-%d").to_string();

    open_session(&conn, &today, opening_cash)
}

#[tauri::command]
pub fn log_drawer_activity(
    app: AppHandle,
    activity: CreateDrawerActivity,
) -> Result<DrawerActivity, String> {
    let db = app.db();
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let logged = insert_activity(
        &conn,
        &activity.kind,
        activity.reason.as_deref(),
        activity.note.as_deref(),
        activity.amount,
    )?;

    if activity.kind == "NO_SALE" {
        check_no_sale_alert(&conn);
    }

    Ok(logged)
}

fn check_no_sale_alert(conn: &Connection) {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM drawer_activity
             WHERE type = 'NO_SALE'
               AND date(created_at, 'localtime') = date('now', 'localtime')",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if count >= NO_SALE_CRITICAL_THRESHOLD {
        warn!(no_sale_count = count, "Critical no-sale drawer open volume today");
    } else if count >= NO_SALE_ALERT_THRESHOLD {
        warn!(no_sale_count = count, "Elevated no-sale drawer open volume today");
    }
}

#[tauri::command]
pub fn get_drawer_activity(
    app: AppHandle,
    date: Option<String>,
) -> Result<DrawerActivityLog, String> {
    let db = app.db();
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let date = date.unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());

    let mut stmt = conn
        .prepare(
            "SELECT id, type, reason, note, amount, created_at
             FROM drawer_activity
             WHERE date(created_at, 'localtime') = ?1
             ORDER BY created_at DESC
             LIMIT 100",
        )
        .map_err(|e| e.to_string())?;

    let activities: Vec<DrawerActivity> = stmt
        .query_map([&date], |row| {
            Ok(DrawerActivity {
                id: row.get(0)?,
                kind: row.get(1)?,
                reason: row.get(2)?,
                note: row.get(3)?,
                amount: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .map_err(|e| e.to_string())?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;

    let count_of = |kind: &str| activities.iter().filter(|a| a.kind == kind).count() as i64;

    let summary = ActivitySummary {
        total_opens: activities.len() as i64,
        no_sale_count: count_of("NO_SALE"),
        sale_opens: count_of("SALE_OPEN"),
        refunds: count_of("REFUND"),
        cash_drops: count_of("CASH_DROP"),
    };

    Ok(DrawerActivityLog {
        activities,
        summary,
    })
}
