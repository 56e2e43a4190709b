use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub payment_method: String, // "cash" or "card"
    pub status: String,         // "completed" or "refunded"
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransaction {
    pub subtotal: f64,
    pub tax: f64,
    pub payment_method: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LotteryTransaction {
    pub id: i64,
    pub kind: String, // "SALE" or "PAYOUT"
    pub amount: f64,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DrawerSession {
    pub id: i64,
    pub date: String,
    pub opening_cash: f64,
    pub status: String, // "open" or "closed"
    pub opened_at: String,
    pub closed_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DrawerActivity {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub reason: Option<String>,
    pub note: Option<String>,
    pub amount: Option<f64>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDrawerActivity {
    #[serde(rename = "type")]
    pub kind: String,
    pub reason: Option<String>,
    pub note: Option<String>,
    pub amount: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub total_opens: i64,
    pub no_sale_count: i64,
    pub sale_opens: i64,
    pub refunds: i64,
    pub cash_drops: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawerActivityLog {
    pub activities: Vec<DrawerActivity>,
    pub summary: ActivitySummary,
}

/// Day-level sales figures shown on the close screen. Lottery flows are
/// deliberately absent here; they are pass-through cash, not revenue.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub total_sales: f64,
    pub cash_sales: f64,
    pub card_sales: f64,
    pub total_transactions: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CashReconciliation {
    pub opening: f64,
    pub sales: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lottery_sales: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lottery_payouts: Option<f64>,
    /// opening + cash sales + lottery sales - lottery payouts, rounded to cents.
    pub expected: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LotterySummary {
    pub sales: f64,
    pub sales_count: i64,
    pub payouts: f64,
    pub payouts_count: i64,
    pub net: f64,
}

/// Read-only end-of-day snapshot, fetched once when a reconciliation
/// session starts and immutable for its lifetime.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ZReportSnapshot {
    pub date: String,
    pub summary: SalesSummary,
    pub cash_reconciliation: CashReconciliation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lottery: Option<LotterySummary>,
}

/// Outbound ledger entry for a completed day close. The only durable
/// artifact the reconciliation workflow produces.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DrawerCloseEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: f64,
    pub note: String,
}
