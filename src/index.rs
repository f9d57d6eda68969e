use chrono::NaiveDate;
use std::collections::HashSet;
use std::ops::Range;

use crate::api::{OrderApi, RemoteCallError};
use crate::config::Accounts;
use crate::order::OrderId;

/// Orders requested per listing call.
pub const PAGE_SIZE: u32 = 50;

/// Which listing pages are requested after the first one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PagePolicy {
    /// Pages `2..pages`, leaving the last page unfetched. This is what the
    /// export has always done, so it stays the default until the numbers
    /// downstream have been reconciled against a complete run.
    #[default]
    Legacy,
    /// Pages `2..=pages`.
    Complete,
}

impl PagePolicy {
    /// Page numbers to request once the first page reported `total` orders.
    pub fn remaining_pages(self, total: u64, page_size: u32) -> Range<u32> {
        if total <= u64::from(page_size) {
            return 2..2;
        }
        let pages = u32::try_from(total.div_ceil(u64::from(page_size))).unwrap_or(u32::MAX);
        match self {
            PagePolicy::Legacy => 2..pages,
            PagePolicy::Complete => 2..pages.saturating_add(1),
        }
    }
}

/// An order found in the listing, tagged with the store it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRef {
    pub order_id: OrderId,
    pub account: String,
}

/// Collect the ids of every order created on `date`, account by account.
///
/// Ids keep the order in which the platform listed them. An id listed twice
/// for the same account (which happens when orders arrive between page
/// requests) is kept only once.
pub fn fetch_all_order_ids(
    api: &impl OrderApi,
    accounts: &Accounts,
    date: NaiveDate,
    policy: PagePolicy,
) -> Result<Vec<OrderRef>, RemoteCallError> {
    let mut refs = Vec::new();
    for account in accounts.iter() {
        let mut seen = HashSet::new();
        let mut push_page = |ids: Vec<OrderId>| {
            for order_id in ids {
                if seen.insert(order_id.clone()) {
                    refs.push(OrderRef {
                        order_id,
                        account: account.name().to_string(),
                    });
                } else {
                    log::warn!(
                        "order {} listed more than once for {}, skipping",
                        order_id,
                        account.name()
                    );
                }
            }
        };

        let first = api.fetch_order_list(account.token(), date, PAGE_SIZE, None)?;
        let total = first.paging.total;
        push_page(first.orders.into_iter().map(|o| o.id).collect());

        for page in policy.remaining_pages(total, PAGE_SIZE) {
            let listing = api.fetch_order_list(account.token(), date, PAGE_SIZE, Some(page))?;
            push_page(listing.orders.into_iter().map(|o| o.id).collect());
        }

        log::info!("{}: {} orders listed, {} unique", account.name(), total, seen.len());
    }
    Ok(refs)
}
