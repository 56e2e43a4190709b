mod commands;
mod db;
mod models;
mod reconcile;

#[cfg(test)]
mod tests;

use commands::{drawer, sales, session, zreport};
use db::Database;
use tauri::Manager;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_fs::init())
        .setup(|app| {
            // Initialize database
            let db = Database::new(app.handle()).expect("Failed to create database");
            db.initialize().expect("Failed to initialize database");
            app.manage(db);

            // One reconciliation session slot per station
            app.manage(session::Reconciler::default());

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Sales
            sales::record_transaction,
            sales::record_lottery_transaction,
            sales::get_today_transactions,
            // Drawer
            drawer::open_drawer_session,
            drawer::log_drawer_activity,
            drawer::get_drawer_activity,
            // Z-Report
            zreport::get_z_report,
            // Reconciliation workflow
            session::get_denominations,
            session::begin_reconciliation,
            session::get_reconciliation,
            session::set_drawer_count,
            session::set_cash_input,
            session::set_entry_mode,
            session::set_variance_reason,
            session::advance_step,
            session::step_back,
            session::finalize_close,
            session::cancel_reconciliation,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
