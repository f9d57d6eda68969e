use crate::api::OrderApi;
use crate::config::Accounts;
use crate::index::OrderRef;
use crate::order::{LineItem, OrderDetail, OrderId};
use crate::ExportError;

/// Sales channel written on every row; the integration only sees web orders.
pub const CHANNEL: &str = "SITE";

/// One line of the export: an ordered item or one of its complements.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    pub order_id: OrderId,
    pub date: String,
    pub item: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub subtotal: f64,
    pub customer: String,
    pub account: String,
    pub channel: &'static str,
    pub payment_method: String,
    pub status: &'static str,
}

/// Fetch every referenced order and flatten it into rows.
///
/// Rows follow the order of `refs`, and within an order the order of the
/// items and complements in the platform's response.
pub fn expand(
    api: &impl OrderApi,
    refs: &[OrderRef],
    accounts: &Accounts,
) -> Result<Vec<OutputRow>, ExportError> {
    let mut rows = Vec::new();
    for order_ref in refs {
        let account = accounts
            .get(&order_ref.account)
            .ok_or_else(|| ExportError::UnknownAccount(order_ref.account.clone()))?;
        let raw = api.fetch_order_detail(account.token(), &order_ref.order_id)?;
        let detail = OrderDetail::try_from(raw)?;
        rows.extend(order_rows(&detail, account.name()));
    }
    Ok(rows)
}

/// Flatten one order: each item is followed by the complements chosen for it.
pub fn order_rows(detail: &OrderDetail, account: &str) -> Vec<OutputRow> {
    let date = detail.placed_at.format("%d/%m/%Y %H:%M:%S").to_string();
    let customer = detail.customer.to_uppercase();
    let account = title_case(account);
    let payment_method = detail.payment_method.to_uppercase();

    let row = |line: &LineItem| OutputRow {
        order_id: detail.id.clone(),
        date: date.clone(),
        item: line.title.clone(),
        quantity: line.quantity,
        unit_price: line.price.value(),
        subtotal: line.subtotal(),
        customer: customer.clone(),
        account: account.clone(),
        channel: CHANNEL,
        payment_method: payment_method.clone(),
        status: detail.status.label(),
    };

    let mut rows = Vec::new();
    for item in &detail.items {
        rows.push(row(&item.line));
        for category in &item.complement_categories {
            rows.extend(category.complements.iter().map(row));
        }
    }
    rows
}

/// Upper-case the first letter of every word and lower-case the rest. Any
/// non-letter starts a new word.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            word_start = false;
        } else {
            out.push(c);
            word_start = true;
        }
    }
    out
}
