//! End-of-day reconciliation workflow commands.
//!
//! A single station runs a single close at a time, so the controller is
//! one mutex-guarded slot holding the active [`ReconciliationSession`].
//! Commands drive the engine's state machine; the finalize path is the
//! only one that writes to the ledger, and it holds the slot lock for
//! the whole write so a double-tap cannot produce two entries.

use std::collections::HashMap;
use std::sync::Mutex;

use tauri::{AppHandle, State};
use tracing::{info, warn};

use crate::commands::{drawer, zreport};
use crate::db::DatabaseExt;
use crate::models::DrawerActivity;
use crate::reconcile::{
    Denomination, ReconciliationSession, SessionView, Step, VarianceReason, US_DENOMINATIONS,
};

#[derive(Default)]
pub struct Reconciler(pub Mutex<Option<ReconciliationSession>>);

fn with_session<T>(
    state: &State<Reconciler>,
    f: impl FnOnce(&mut ReconciliationSession) -> Result<T, String>,
) -> Result<T, String> {
    let mut slot = state.0.lock().map_err(|e| e.to_string())?;
    let session = slot
        .as_mut()
        .ok_or("No reconciliation in progress".to_string())?;
    f(session)
}

#[tauri::command]
pub fn begin_reconciliation(
    app: AppHandle,
    state: State<Reconciler>,
) -> Result<SessionView, String> {
    let mut slot = state.0.lock().map_err(|e| e.to_string())?;

    if let Some(existing) = slot.as_ref() {
        if existing.step() != Step::Complete {
            return Err("A reconciliation is already in progress".to_string());
        }
    }

    let date = chrono::Local::now().format("%Y-%m-%d").to_string();

    // The snapshot is required for every downstream decision; if it
    // cannot be built no session exists and the caller may retry.
    let snapshot = {
        let db = app.db();
        let conn = db.conn.lock().map_err(|e| e.to_string())?;
        zreport::build_snapshot(&conn, &date)?
    };

    info!(
        date = %date,
        expected = snapshot.cash_reconciliation.expected,
        "reconciliation started"
    );

    let session = ReconciliationSession::new(snapshot);
    let view = session.view();
    *slot = Some(session);

    Ok(view)
}

#[tauri::command]
pub fn get_reconciliation(state: State<Reconciler>) -> Result<SessionView, String> {
    with_session(&state, |s| Ok(s.view()))
}

#[tauri::command]
pub fn set_drawer_count(
    state: State<Reconciler>,
    counts: HashMap<String, i64>,
) -> Result<SessionView, String> {
    with_session(&state, |s| {
        s.set_drawer_count(counts)?;
        Ok(s.view())
    })
}

#[tauri::command]
pub fn set_cash_input(state: State<Reconciler>, input: String) -> Result<SessionView, String> {
    with_session(&state, |s| {
        s.set_cash_input(input)?;
        Ok(s.view())
    })
}

#[tauri::command]
pub fn set_entry_mode(
    state: State<Reconciler>,
    use_calculator: bool,
) -> Result<SessionView, String> {
    with_session(&state, |s| {
        s.set_entry_mode(use_calculator)?;
        Ok(s.view())
    })
}

#[tauri::command]
pub fn set_variance_reason(
    state: State<Reconciler>,
    reason: String,
    detail: Option<String>,
) -> Result<SessionView, String> {
    let reason = VarianceReason::from_label(&reason)
        .ok_or_else(|| format!("Unknown variance reason: {reason}"))?;

    with_session(&state, |s| {
        s.set_reason(reason, detail)?;
        Ok(s.view())
    })
}

#[tauri::command]
pub fn advance_step(state: State<Reconciler>) -> Result<SessionView, String> {
    with_session(&state, |s| {
        s.advance()?;
        Ok(s.view())
    })
}

#[tauri::command]
pub fn step_back(state: State<Reconciler>) -> Result<SessionView, String> {
    with_session(&state, |s| {
        s.back()?;
        Ok(s.view())
    })
}

#[tauri::command]
pub fn finalize_close(
    app: AppHandle,
    state: State<Reconciler>,
) -> Result<DrawerActivity, String> {
    let mut slot = state.0.lock().map_err(|e| e.to_string())?;
    let session = slot
        .as_mut()
        .ok_or("No reconciliation in progress".to_string())?;

    // Claims the one allowed write; a repeat activation fails here.
    let event = session.begin_finalize()?;

    let result = (|| -> Result<DrawerActivity, String> {
        let db = app.db();
        let conn = db.conn.lock().map_err(|e| e.to_string())?;
        let activity = drawer::insert_activity(
            &conn,
            &event.kind,
            None,
            Some(&event.note),
            Some(event.amount),
        )?;
        drawer::close_open_session(&conn)?;
        Ok(activity)
    })();

    match result {
        Ok(activity) => {
            session.complete_finalize();
            info!(amount = event.amount, note = %event.note, "day closed");
            Ok(activity)
        }
        Err(e) => {
            // Stay in review with everything intact so the user can retry.
            session.fail_finalize();
            warn!(error = %e, "day close submission failed");
            Err(e)
        }
    }
}

/// The drawer calculator's unit set, for the frontend to render.
#[tauri::command]
pub fn get_denominations() -> Vec<Denomination> {
    US_DENOMINATIONS.to_vec()
}

#[tauri::command]
pub fn cancel_reconciliation(state: State<Reconciler>) -> Result<(), String> {
    let mut slot = state.0.lock().map_err(|e| e.to_string())?;

    if let Some(session) = slot.as_ref() {
        if session.is_submitting() {
            return Err("A close is in progress".to_string());
        }
    }

    *slot = None;
    Ok(())
}
