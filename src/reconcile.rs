//! Drawer reconciliation engine: denomination math, variance policy,
//! close-note construction, and the end-of-day workflow state machine.
//!
//! Everything here is pure and synchronous. Persistence (the drawer
//! activity ledger) and snapshot building live in the command layer;
//! this module only decides what a close looks like and whether the
//! workflow may move forward.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{DrawerCloseEvent, ZReportSnapshot};

/// Closes with |variance| above this (in dollars, strict) require an
/// explanation before they may proceed.
pub const VARIANCE_TOLERANCE: f64 = 5.0;

pub const END_OF_DAY: &str = "END_OF_DAY";

/// One currency unit the drawer calculator knows about. The set in use
/// is configuration; [`US_DENOMINATIONS`] is the default.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Denomination {
    pub key: &'static str,
    pub label: &'static str,
    pub value: f64,
}

pub const US_DENOMINATIONS: &[Denomination] = &[
    Denomination { key: "hundreds", label: "$100", value: 100.0 },
    Denomination { key: "fifties", label: "$50", value: 50.0 },
    Denomination { key: "twenties", label: "$20", value: 20.0 },
    Denomination { key: "tens", label: "$10", value: 10.0 },
    Denomination { key: "fives", label: "$5", value: 5.0 },
    Denomination { key: "ones", label: "$1", value: 1.0 },
    Denomination { key: "quarters", label: "25¢", value: 0.25 },
    Denomination { key: "dimes", label: "10¢", value: 0.10 },
    Denomination { key: "nickels", label: "5¢", value: 0.05 },
    Denomination { key: "pennies", label: "1¢", value: 0.01 },
];

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Sum a drawer count at full precision. Absent keys count as zero and
/// negative counts are clamped to zero; keys outside the configured
/// denomination set contribute nothing. Never fails.
pub fn drawer_total(denominations: &[Denomination], counts: &HashMap<String, i64>) -> f64 {
    denominations
        .iter()
        .map(|d| {
            let n = counts.get(d.key).copied().unwrap_or(0).max(0);
            d.value * n as f64
        })
        .sum()
}

/// Parse a free-typed cash amount. Strips everything that is not a
/// digit or a period, then parses; empty or unparseable input is 0.
pub fn parse_cash_input(input: &str) -> f64 {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse().unwrap_or(0.0)
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VarianceCheck {
    /// counted - expected; positive is an overage, negative a shortage.
    pub variance: f64,
    pub requires_reason: bool,
    /// Display-only; 0 when there is no expected cash to compare against.
    pub variance_percent: f64,
}

/// Classify counted vs. expected cash. Overage and shortage are held to
/// the same absolute tolerance; being over is not implicitly fine.
pub fn evaluate_variance(counted: f64, expected: f64) -> VarianceCheck {
    let variance = counted - expected;
    VarianceCheck {
        variance,
        requires_reason: variance.abs() > VARIANCE_TOLERANCE,
        variance_percent: if expected > 0.0 {
            (variance / expected) * 100.0
        } else {
            0.0
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarianceReason {
    #[serde(rename = "Counting error")]
    CountingError,
    #[serde(rename = "Cash drop not recorded")]
    CashDropNotRecorded,
    #[serde(rename = "Change given incorrectly")]
    ChangeGivenIncorrectly,
    #[serde(rename = "Lottery payout discrepancy")]
    LotteryPayoutDiscrepancy,
    #[serde(rename = "Till shortage")]
    TillShortage,
    #[serde(rename = "Other")]
    Other,
}

impl VarianceReason {
    pub const ALL: &'static [VarianceReason] = &[
        VarianceReason::CountingError,
        VarianceReason::CashDropNotRecorded,
        VarianceReason::ChangeGivenIncorrectly,
        VarianceReason::LotteryPayoutDiscrepancy,
        VarianceReason::TillShortage,
        VarianceReason::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            VarianceReason::CountingError => "Counting error",
            VarianceReason::CashDropNotRecorded => "Cash drop not recorded",
            VarianceReason::ChangeGivenIncorrectly => "Change given incorrectly",
            VarianceReason::LotteryPayoutDiscrepancy => "Lottery payout discrepancy",
            VarianceReason::TillShortage => "Till shortage",
            VarianceReason::Other => "Other",
        }
    }

    pub fn from_label(label: &str) -> Option<VarianceReason> {
        Self::ALL.iter().copied().find(|r| r.label() == label)
    }
}

/// Join the selected reason with optional free text. The two are kept
/// as separate fields for the whole session and only concatenated here.
pub fn compose_reason(reason: VarianceReason, detail: &str) -> String {
    let detail = detail.trim();
    if detail.is_empty() {
        reason.label().to_string()
    } else {
        format!("{} - {}", reason.label(), detail)
    }
}

/// Build the ledger note for a close. Fixed segment order: counted
/// total, then variance only when non-zero at cent precision, then the
/// reason note only when present.
pub fn close_note(counted: f64, variance: f64, reason_note: &str) -> String {
    let counted = round_cents(counted);
    let variance = round_cents(variance);

    let mut note = format!("EOD Close - Counted: ${counted:.2}");
    if variance != 0.0 {
        note.push_str(&format!(", Variance: ${variance:.2}"));
    }
    if !reason_note.is_empty() {
        note.push_str(&format!(" - {reason_note}"));
    }
    note
}

/// How the counted total is being entered. The modes are mutually
/// exclusive per session; replacing one discards the other's values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum EntryMode {
    Calculator { counts: HashMap<String, i64> },
    Direct { input: String },
}

impl EntryMode {
    fn calculator() -> EntryMode {
        EntryMode::Calculator {
            counts: HashMap::new(),
        }
    }

    fn direct() -> EntryMode {
        EntryMode::Direct {
            input: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Count,
    Discrepancy,
    Review,
    Complete,
}

/// Serializable projection of a session for the frontend. Money fields
/// are rounded to cents here, at the presentation boundary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub step: Step,
    pub entry: EntryMode,
    pub counted_total: f64,
    pub expected: f64,
    pub variance: f64,
    pub variance_percent: f64,
    pub within_tolerance: bool,
    pub requires_reason: bool,
    pub can_advance: bool,
    pub reason: Option<VarianceReason>,
    pub reason_detail: String,
    pub submitting: bool,
    pub snapshot: ZReportSnapshot,
}

/// One in-progress end-of-day close. Single use: created with a fetched
/// snapshot, destroyed on cancel or after completion. The owning
/// controller (the command layer's session slot) is the only holder.
#[derive(Debug)]
pub struct ReconciliationSession {
    snapshot: ZReportSnapshot,
    denominations: &'static [Denomination],
    entry: EntryMode,
    reason: Option<VarianceReason>,
    reason_detail: String,
    step: Step,
    visited_discrepancy: bool,
    submitting: bool,
}

impl ReconciliationSession {
    pub fn new(snapshot: ZReportSnapshot) -> ReconciliationSession {
        ReconciliationSession {
            snapshot,
            denominations: US_DENOMINATIONS,
            entry: EntryMode::calculator(),
            reason: None,
            reason_detail: String::new(),
            step: Step::Count,
            visited_discrepancy: false,
            submitting: false,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn snapshot(&self) -> &ZReportSnapshot {
        &self.snapshot
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Full-precision counted total for the active entry mode.
    pub fn counted_total(&self) -> f64 {
        match &self.entry {
            EntryMode::Calculator { counts } => drawer_total(self.denominations, counts),
            EntryMode::Direct { input } => parse_cash_input(input),
        }
    }

    pub fn expected(&self) -> f64 {
        self.snapshot.cash_reconciliation.expected
    }

    pub fn variance_check(&self) -> VarianceCheck {
        evaluate_variance(self.counted_total(), self.expected())
    }

    fn editable(&self) -> Result<(), String> {
        if self.step != Step::Count {
            return Err("drawer amounts can only be edited in the count step".to_string());
        }
        Ok(())
    }

    /// Replace the calculator counts. Switches to calculator mode,
    /// discarding any directly typed total.
    pub fn set_drawer_count(&mut self, counts: HashMap<String, i64>) -> Result<(), String> {
        self.editable()?;
        self.entry = EntryMode::Calculator { counts };
        Ok(())
    }

    /// Replace the directly typed total. Switches to direct mode,
    /// discarding any calculator breakdown.
    pub fn set_cash_input(&mut self, input: String) -> Result<(), String> {
        self.editable()?;
        self.entry = EntryMode::Direct { input };
        Ok(())
    }

    /// Toggle entry mode, resetting the newly active mode's values.
    pub fn set_entry_mode(&mut self, use_calculator: bool) -> Result<(), String> {
        self.editable()?;
        let already = matches!(
            (&self.entry, use_calculator),
            (EntryMode::Calculator { .. }, true) | (EntryMode::Direct { .. }, false)
        );
        if !already {
            self.entry = if use_calculator {
                EntryMode::calculator()
            } else {
                EntryMode::direct()
            };
        }
        Ok(())
    }

    pub fn set_reason(
        &mut self,
        reason: VarianceReason,
        detail: Option<String>,
    ) -> Result<(), String> {
        match self.step {
            Step::Count | Step::Discrepancy => {
                self.reason = Some(reason);
                self.reason_detail = detail.unwrap_or_default();
                Ok(())
            }
            _ => Err("the variance reason can no longer be changed".to_string()),
        }
    }

    /// Move forward one step. From the count step the route depends on
    /// the variance; leaving the discrepancy step demands a reason.
    pub fn advance(&mut self) -> Result<Step, String> {
        match self.step {
            Step::Count => {
                if self.variance_check().requires_reason {
                    self.visited_discrepancy = true;
                    self.step = Step::Discrepancy;
                } else {
                    self.step = Step::Review;
                }
                Ok(self.step)
            }
            Step::Discrepancy => {
                if self.reason.is_none() {
                    return Err("a variance reason is required before continuing".to_string());
                }
                self.step = Step::Review;
                Ok(self.step)
            }
            Step::Review => Err("finalize the close to leave the review step".to_string()),
            Step::Complete => Err("the session is already complete".to_string()),
        }
    }

    /// Move backward, preserving all entered amounts.
    pub fn back(&mut self) -> Result<Step, String> {
        match self.step {
            Step::Discrepancy => {
                self.step = Step::Count;
                Ok(self.step)
            }
            Step::Review => {
                if self.submitting {
                    return Err("a close is in progress".to_string());
                }
                self.step = if self.visited_discrepancy {
                    Step::Discrepancy
                } else {
                    Step::Count
                };
                Ok(self.step)
            }
            Step::Count => Err("already at the first step".to_string()),
            Step::Complete => Err("the session is already complete".to_string()),
        }
    }

    /// Claim the single allowed ledger write and build its payload.
    /// Fails if the session is not in review or a write is already in
    /// flight; the caller must report back with [`complete_finalize`]
    /// or [`fail_finalize`].
    ///
    /// [`complete_finalize`]: ReconciliationSession::complete_finalize
    /// [`fail_finalize`]: ReconciliationSession::fail_finalize
    pub fn begin_finalize(&mut self) -> Result<DrawerCloseEvent, String> {
        if self.step != Step::Review {
            return Err("the close can only be finalized from the review step".to_string());
        }
        if self.submitting {
            return Err("a close is already in progress".to_string());
        }
        self.submitting = true;

        let counted = self.counted_total();
        let check = self.variance_check();
        let reason_note = self
            .reason
            .map(|r| compose_reason(r, &self.reason_detail))
            .unwrap_or_default();

        Ok(DrawerCloseEvent {
            kind: END_OF_DAY.to_string(),
            amount: round_cents(counted),
            note: close_note(counted, check.variance, &reason_note),
        })
    }

    /// The ledger write succeeded; the session becomes terminal.
    pub fn complete_finalize(&mut self) {
        self.submitting = false;
        self.step = Step::Complete;
    }

    /// The ledger write failed; stay in review with everything intact
    /// so the user can retry.
    pub fn fail_finalize(&mut self) {
        self.submitting = false;
    }

    pub fn view(&self) -> SessionView {
        let check = self.variance_check();
        let can_advance = match self.step {
            Step::Count => true,
            Step::Discrepancy => self.reason.is_some(),
            Step::Review => !self.submitting,
            Step::Complete => false,
        };

        SessionView {
            step: self.step,
            entry: self.entry.clone(),
            counted_total: round_cents(self.counted_total()),
            expected: round_cents(self.expected()),
            variance: round_cents(check.variance),
            variance_percent: check.variance_percent,
            within_tolerance: !check.requires_reason,
            requires_reason: check.requires_reason,
            can_advance,
            reason: self.reason,
            reason_detail: self.reason_detail.clone(),
            submitting: self.submitting,
            snapshot: self.snapshot.clone(),
        }
    }
}
