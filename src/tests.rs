//! Integration tests for the reconciliation engine and database operations
//! These tests use an in-memory SQLite database to test business logic

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use std::collections::HashMap;

    use crate::commands::{drawer, sales, zreport};
    use crate::models::{CreateTransaction, ZReportSnapshot};
    use crate::reconcile::{
        close_note, compose_reason, drawer_total, evaluate_variance, parse_cash_input,
        round_cents, EntryMode, ReconciliationSession, Step, VarianceReason, US_DENOMINATIONS,
    };

    /// Create a test database with schema
    fn setup_test_db() -> Connection {
        let conn = Connection::open_in_memory().expect("Failed to create in-memory database");

        conn.execute_batch(
            "
            CREATE TABLE transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subtotal REAL NOT NULL,
                tax REAL NOT NULL DEFAULT 0,
                total REAL NOT NULL,
                payment_method TEXT NOT NULL,
                status TEXT DEFAULT 'completed',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE lottery_transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                amount REAL NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE drawer_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date DATE NOT NULL,
                opening_cash REAL NOT NULL,
                status TEXT DEFAULT 'open',
                opened_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                closed_at DATETIME
            );

            CREATE TABLE drawer_activity (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                type TEXT NOT NULL,
                reason TEXT,
                note TEXT,
                amount REAL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            ",
        )
        .expect("Failed to create schema");

        conn
    }

    /// The business date rows created with CURRENT_TIMESTAMP land on
    fn local_date(conn: &Connection) -> String {
        conn.query_row("SELECT date('now', 'localtime')", [], |row| row.get(0))
            .unwrap()
    }

    /// Seed a day's trading: $75 cash + $75 card sales, a $200 float,
    /// and lottery activity of $300 sold / $120 paid out
    fn seed_test_data(conn: &Connection) {
        let date = local_date(conn);
        drawer::open_session(conn, &date, 200.0).unwrap();

        for (subtotal, tax, method) in [
            (46.30, 3.70, "cash"),
            (23.15, 1.85, "cash"),
            (69.44, 5.56, "card"),
        ] {
            sales::insert_transaction(
                conn,
                CreateTransaction {
                    subtotal,
                    tax,
                    payment_method: method.to_string(),
                },
            )
            .unwrap();
        }

        sales::insert_lottery(conn, "SALE", 180.0).unwrap();
        sales::insert_lottery(conn, "SALE", 120.0).unwrap();
        sales::insert_lottery(conn, "PAYOUT", 120.0).unwrap();
    }

    fn snapshot_with_expected(expected: f64) -> ZReportSnapshot {
        use crate::models::{CashReconciliation, SalesSummary};

        ZReportSnapshot {
            date: "2026-08-29".to_string(),
            summary: SalesSummary {
                total_sales: 0.0,
                cash_sales: 0.0,
                card_sales: 0.0,
                total_transactions: 0,
            },
            cash_reconciliation: CashReconciliation {
                opening: 0.0,
                sales: 0.0,
                lottery_sales: None,
                lottery_payouts: None,
                expected,
            },
            lottery: None,
        }
    }

    fn counts(pairs: &[(&str, i64)]) -> HashMap<String, i64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    // ===== DENOMINATION CALCULATOR TESTS =====

    #[test]
    fn test_drawer_total_exact_sum() {
        let c = counts(&[("hundreds", 1), ("tens", 2), ("ones", 3), ("quarters", 2)]);
        let total = drawer_total(US_DENOMINATIONS, &c);
        assert_eq!(total, 123.50);
    }

    #[test]
    fn test_drawer_total_empty_is_zero() {
        assert_eq!(drawer_total(US_DENOMINATIONS, &HashMap::new()), 0.0);
    }

    #[test]
    fn test_drawer_total_clamps_negative_and_ignores_unknown_keys() {
        let c = counts(&[("twenties", -4), ("ones", 7), ("doubloons", 99)]);
        assert_eq!(drawer_total(US_DENOMINATIONS, &c), 7.0);
    }

    #[test]
    fn test_drawer_total_coins_only() {
        let c = counts(&[("quarters", 3), ("dimes", 2), ("nickels", 1), ("pennies", 4)]);
        let total = drawer_total(US_DENOMINATIONS, &c);
        assert!((total - 1.04).abs() < 1e-9);
    }

    #[test]
    fn test_parse_cash_input() {
        assert_eq!(parse_cash_input("523.17"), 523.17);
        assert_eq!(parse_cash_input("$1,234.50"), 1234.50);
        assert_eq!(parse_cash_input(""), 0.0);
        assert_eq!(parse_cash_input("cash"), 0.0);
        assert_eq!(parse_cash_input("12.34.56"), 0.0);
    }

    // ===== VARIANCE EVALUATOR TESTS =====

    #[test]
    fn test_variance_is_counted_minus_expected() {
        let check = evaluate_variance(523.17, 500.00);
        assert!((check.variance - 23.17).abs() < 1e-9);
        assert!(check.requires_reason);
    }

    #[test]
    fn test_tolerance_boundary_is_strict() {
        // Exactly $5.00 over needs no reason; a cent more does
        assert!(!evaluate_variance(105.00, 100.0).requires_reason);
        assert!(evaluate_variance(105.01, 100.0).requires_reason);
    }

    #[test]
    fn test_shortage_held_to_same_tolerance_as_overage() {
        assert!(evaluate_variance(80.0, 100.0).requires_reason);
        assert!(!evaluate_variance(95.0, 100.0).requires_reason);
        assert!(evaluate_variance(120.0, 100.0).requires_reason);
    }

    #[test]
    fn test_variance_percent_guarded_when_no_expected_cash() {
        let check = evaluate_variance(42.0, 0.0);
        assert_eq!(check.variance, 42.0);
        assert_eq!(check.variance_percent, 0.0);
    }

    #[test]
    fn test_variance_reason_label_round_trip() {
        for reason in VarianceReason::ALL {
            assert_eq!(VarianceReason::from_label(reason.label()), Some(*reason));
        }
        assert_eq!(VarianceReason::from_label("Gremlins"), None);
    }

    #[test]
    fn test_compose_reason() {
        assert_eq!(
            compose_reason(VarianceReason::TillShortage, "noted"),
            "Till shortage - noted"
        );
        assert_eq!(
            compose_reason(VarianceReason::CountingError, ""),
            "Counting error"
        );
        assert_eq!(
            compose_reason(VarianceReason::Other, "   "),
            "Other"
        );
    }

    // ===== CLOSE NOTE TESTS =====

    #[test]
    fn test_close_note_round_trip() {
        let note = close_note(523.17, 523.17 - 500.00, "Till shortage - noted");
        assert_eq!(
            note,
            "EOD Close - Counted: $523.17, Variance: $23.17 - Till shortage - noted"
        );
    }

    #[test]
    fn test_close_note_omits_zero_variance_and_empty_reason() {
        assert_eq!(close_note(455.00, 0.0, ""), "EOD Close - Counted: $455.00");
    }

    #[test]
    fn test_close_note_variance_only() {
        assert_eq!(
            close_note(97.00, -3.0, ""),
            "EOD Close - Counted: $97.00, Variance: $-3.00"
        );
    }

    #[test]
    fn test_close_note_drops_sub_cent_variance_noise() {
        // Full-precision variance that rounds to zero cents is not shown
        assert_eq!(
            close_note(100.0, 0.0001, ""),
            "EOD Close - Counted: $100.00"
        );
    }

    // ===== WORKFLOW STATE MACHINE TESTS =====

    #[test]
    fn test_within_tolerance_goes_straight_to_review() {
        let mut session = ReconciliationSession::new(snapshot_with_expected(123.50));
        session
            .set_drawer_count(counts(&[("hundreds", 1), ("tens", 2), ("ones", 3), ("quarters", 2)]))
            .unwrap();

        assert_eq!(session.advance().unwrap(), Step::Review);
    }

    #[test]
    fn test_over_tolerance_requires_reason_to_proceed() {
        let mut session = ReconciliationSession::new(snapshot_with_expected(100.0));
        session.set_cash_input("150".to_string()).unwrap();

        assert_eq!(session.advance().unwrap(), Step::Discrepancy);
        assert!(session.advance().is_err());

        session
            .set_reason(VarianceReason::CashDropNotRecorded, None)
            .unwrap();
        assert_eq!(session.advance().unwrap(), Step::Review);
    }

    #[test]
    fn test_back_from_discrepancy_preserves_counts() {
        let mut session = ReconciliationSession::new(snapshot_with_expected(100.0));
        session.set_drawer_count(counts(&[("fifties", 3)])).unwrap();

        assert_eq!(session.advance().unwrap(), Step::Discrepancy);
        assert_eq!(session.back().unwrap(), Step::Count);
        assert_eq!(session.counted_total(), 150.0);
    }

    #[test]
    fn test_review_back_routes_through_visited_discrepancy() {
        let mut session = ReconciliationSession::new(snapshot_with_expected(100.0));
        session.set_cash_input("200".to_string()).unwrap();
        session.advance().unwrap(); // discrepancy
        session.set_reason(VarianceReason::Other, None).unwrap();
        session.advance().unwrap(); // review

        assert_eq!(session.back().unwrap(), Step::Discrepancy);
    }

    #[test]
    fn test_review_back_skips_unvisited_discrepancy() {
        let mut session = ReconciliationSession::new(snapshot_with_expected(100.0));
        session.set_cash_input("102".to_string()).unwrap();
        session.advance().unwrap(); // review, within tolerance

        assert_eq!(session.back().unwrap(), Step::Count);
    }

    #[test]
    fn test_zero_expected_zero_counted_proceeds_clean() {
        let mut session = ReconciliationSession::new(snapshot_with_expected(0.0));

        let check = session.variance_check();
        assert_eq!(check.variance, 0.0);
        assert!(!check.requires_reason);

        assert_eq!(session.advance().unwrap(), Step::Review);
        assert_eq!(session.view().expected, 0.0);
    }

    #[test]
    fn test_mode_switch_discards_other_entry() {
        let mut session = ReconciliationSession::new(snapshot_with_expected(100.0));

        session.set_drawer_count(counts(&[("hundreds", 2)])).unwrap();
        assert_eq!(session.counted_total(), 200.0);

        // To direct mode: calculator breakdown is gone
        session.set_entry_mode(false).unwrap();
        assert_eq!(session.counted_total(), 0.0);

        session.set_cash_input("75.25".to_string()).unwrap();
        assert_eq!(session.counted_total(), 75.25);

        // Back to calculator: the typed total is gone too
        session.set_entry_mode(true).unwrap();
        assert_eq!(session.counted_total(), 0.0);
        assert!(matches!(session.view().entry, EntryMode::Calculator { .. }));
    }

    #[test]
    fn test_amounts_locked_outside_count_step() {
        let mut session = ReconciliationSession::new(snapshot_with_expected(100.0));
        session.set_cash_input("100".to_string()).unwrap();
        session.advance().unwrap(); // review

        assert!(session.set_cash_input("999".to_string()).is_err());
        assert!(session.set_drawer_count(HashMap::new()).is_err());
        assert!(session.set_entry_mode(true).is_err());
    }

    #[test]
    fn test_finalize_at_most_once() {
        let mut session = ReconciliationSession::new(snapshot_with_expected(100.0));
        session.set_cash_input("100".to_string()).unwrap();
        session.advance().unwrap();

        let first = session.begin_finalize();
        assert!(first.is_ok());

        // Second activation while the first is in flight is rejected
        assert!(session.begin_finalize().is_err());

        // A failed submission re-enables finalize without losing state
        session.fail_finalize();
        assert_eq!(session.step(), Step::Review);
        assert_eq!(session.counted_total(), 100.0);
        assert!(session.begin_finalize().is_ok());

        // Success is terminal
        session.complete_finalize();
        assert_eq!(session.step(), Step::Complete);
        assert!(session.begin_finalize().is_err());
        assert!(session.advance().is_err());
    }

    #[test]
    fn test_finalize_event_payload() {
        let mut session = ReconciliationSession::new(snapshot_with_expected(500.0));
        session.set_cash_input("523.17".to_string()).unwrap();
        session.advance().unwrap(); // discrepancy
        session
            .set_reason(VarianceReason::TillShortage, Some("noted".to_string()))
            .unwrap();
        session.advance().unwrap(); // review

        let event = session.begin_finalize().unwrap();
        assert_eq!(event.kind, "END_OF_DAY");
        assert_eq!(event.amount, 523.17);
        assert_eq!(
            event.note,
            "EOD Close - Counted: $523.17, Variance: $23.17 - Till shortage - noted"
        );
    }

    #[test]
    fn test_finalize_only_from_review() {
        let mut session = ReconciliationSession::new(snapshot_with_expected(100.0));
        assert!(session.begin_finalize().is_err());
    }

    // ===== Z-REPORT SNAPSHOT TESTS =====

    #[test]
    fn test_snapshot_aggregates_day_sales() {
        let conn = setup_test_db();
        seed_test_data(&conn);

        let snapshot = zreport::build_snapshot(&conn, &local_date(&conn)).unwrap();

        assert_eq!(snapshot.summary.total_sales, 150.0);
        assert_eq!(snapshot.summary.cash_sales, 75.0);
        assert_eq!(snapshot.summary.card_sales, 75.0);
        assert_eq!(snapshot.summary.total_transactions, 3);
    }

    #[test]
    fn test_snapshot_lottery_moves_expected_cash_not_sales() {
        let conn = setup_test_db();
        seed_test_data(&conn);

        let snapshot = zreport::build_snapshot(&conn, &local_date(&conn)).unwrap();

        // Expected = 200 opening + 75 cash + 300 lottery sales - 120 payouts
        assert_eq!(snapshot.cash_reconciliation.expected, 455.0);
        assert_eq!(snapshot.cash_reconciliation.lottery_sales, Some(300.0));
        assert_eq!(snapshot.cash_reconciliation.lottery_payouts, Some(120.0));

        let lottery = snapshot.lottery.expect("lottery summary present");
        assert_eq!(lottery.sales, 300.0);
        assert_eq!(lottery.sales_count, 2);
        assert_eq!(lottery.payouts, 120.0);
        assert_eq!(lottery.payouts_count, 1);
        assert_eq!(lottery.net, 180.0);

        // Pass-through: the sales summary is untouched by lottery flows
        assert_eq!(snapshot.summary.total_sales, 150.0);
    }

    #[test]
    fn test_snapshot_empty_day() {
        let conn = setup_test_db();

        let snapshot = zreport::build_snapshot(&conn, &local_date(&conn)).unwrap();

        assert_eq!(snapshot.summary.total_transactions, 0);
        assert_eq!(snapshot.cash_reconciliation.opening, 0.0);
        assert_eq!(snapshot.cash_reconciliation.expected, 0.0);
        assert!(snapshot.lottery.is_none());
        assert!(snapshot.cash_reconciliation.lottery_sales.is_none());
    }

    #[test]
    fn test_snapshot_excludes_refunded_transactions() {
        let conn = setup_test_db();
        seed_test_data(&conn);
        conn.execute(
            "UPDATE transactions SET status = 'refunded' WHERE payment_method = 'card'",
            [],
        )
        .unwrap();

        let snapshot = zreport::build_snapshot(&conn, &local_date(&conn)).unwrap();
        assert_eq!(snapshot.summary.total_sales, 75.0);
        assert_eq!(snapshot.summary.card_sales, 0.0);
        assert_eq!(snapshot.summary.total_transactions, 2);
    }

    // ===== DRAWER SESSION TESTS =====

    #[test]
    fn test_only_one_open_drawer_session() {
        let conn = setup_test_db();
        let date = local_date(&conn);

        drawer::open_session(&conn, &date, 150.0).unwrap();
        let second = drawer::open_session(&conn, &date, 200.0);
        assert!(second.is_err(), "Should not allow two open drawer sessions");
    }

    #[test]
    fn test_open_session_rejects_negative_float() {
        let conn = setup_test_db();
        assert!(drawer::open_session(&conn, &local_date(&conn), -1.0).is_err());
    }

    #[test]
    fn test_close_open_session() {
        let conn = setup_test_db();
        let date = local_date(&conn);
        drawer::open_session(&conn, &date, 150.0).unwrap();

        drawer::close_open_session(&conn).unwrap();

        let (status, closed_at): (String, Option<String>) = conn
            .query_row(
                "SELECT status, closed_at FROM drawer_sessions LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(status, "closed");
        assert!(closed_at.is_some());

        // Closing the float re-enables opening a fresh one
        assert!(drawer::open_session(&conn, &date, 150.0).is_ok());
    }

    // ===== DRAWER ACTIVITY TESTS =====

    #[test]
    fn test_insert_activity() {
        let conn = setup_test_db();

        let activity =
            drawer::insert_activity(&conn, "CASH_DROP", None, Some("Safe drop"), Some(300.0))
                .unwrap();
        assert_eq!(activity.kind, "CASH_DROP");
        assert_eq!(activity.amount, Some(300.0));

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM drawer_activity", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_activity_validation() {
        let conn = setup_test_db();

        assert!(drawer::insert_activity(&conn, "COFFEE_BREAK", None, None, None).is_err());
        assert!(drawer::insert_activity(&conn, "NO_SALE", None, None, None).is_err());
        assert!(drawer::insert_activity(&conn, "NO_SALE", Some("vibes"), None, None).is_err());
        assert!(
            drawer::insert_activity(&conn, "NO_SALE", Some("make_change"), None, None).is_ok()
        );
    }

    // ===== SALES RECORDING TESTS =====

    #[test]
    fn test_insert_transaction_computes_total() {
        let conn = setup_test_db();

        let tx = sales::insert_transaction(
            &conn,
            CreateTransaction {
                subtotal: 19.99,
                tax: 1.60,
                payment_method: "cash".to_string(),
            },
        )
        .unwrap();

        assert_eq!(tx.total, 21.59);
        assert_eq!(tx.status, "completed");
    }

    #[test]
    fn test_insert_transaction_validation() {
        let conn = setup_test_db();

        let bad_method = sales::insert_transaction(
            &conn,
            CreateTransaction {
                subtotal: 10.0,
                tax: 0.0,
                payment_method: "barter".to_string(),
            },
        );
        assert!(bad_method.is_err());

        let negative = sales::insert_transaction(
            &conn,
            CreateTransaction {
                subtotal: -5.0,
                tax: 0.0,
                payment_method: "cash".to_string(),
            },
        );
        assert!(negative.is_err());
    }

    #[test]
    fn test_insert_lottery_validation() {
        let conn = setup_test_db();

        assert!(sales::insert_lottery(&conn, "SALE", 25.0).is_ok());
        assert!(sales::insert_lottery(&conn, "JACKPOT", 25.0).is_err());
        assert!(sales::insert_lottery(&conn, "PAYOUT", 0.0).is_err());
    }

    // ===== END-TO-END CLOSE =====

    #[test]
    fn test_full_day_close_writes_one_ledger_entry() {
        let conn = setup_test_db();
        seed_test_data(&conn);

        let snapshot = zreport::build_snapshot(&conn, &local_date(&conn)).unwrap();
        let mut session = ReconciliationSession::new(snapshot);

        // Count comes up $20 short of the expected $455
        session.set_cash_input("435".to_string()).unwrap();
        assert_eq!(session.advance().unwrap(), Step::Discrepancy);
        session
            .set_reason(VarianceReason::LotteryPayoutDiscrepancy, None)
            .unwrap();
        assert_eq!(session.advance().unwrap(), Step::Review);

        let event = session.begin_finalize().unwrap();
        drawer::insert_activity(&conn, &event.kind, None, Some(&event.note), Some(event.amount))
            .unwrap();
        drawer::close_open_session(&conn).unwrap();
        session.complete_finalize();

        let (kind, amount, note): (String, f64, String) = conn
            .query_row(
                "SELECT type, amount, note FROM drawer_activity WHERE type = 'END_OF_DAY'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(kind, "END_OF_DAY");
        assert_eq!(amount, 435.0);
        assert_eq!(
            note,
            "EOD Close - Counted: $435.00, Variance: $-20.00 - Lottery payout discrepancy"
        );

        let eod_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM drawer_activity WHERE type = 'END_OF_DAY'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(eod_count, 1);
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(1.005), 1.0); // binary 1.005 sits just below
        assert_eq!(round_cents(2.675000001), 2.68);
        assert_eq!(round_cents(-3.456), -3.46);
    }
}
