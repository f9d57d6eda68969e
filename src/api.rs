use chrono::NaiveDate;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::order::{OrderEnvelope, OrderId, OrderPage, RawOrder};

/// Failure of a single call to the delivery platform.
#[derive(Debug, thiserror::Error)]
pub enum RemoteCallError {
    /// The platform answered with anything other than 201 Created.
    #[error("remote call failed: status code {0}")]
    Status(u16),
    #[error("remote call failed: network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("remote call failed: unexpected response body: {0}")]
    Decode(#[source] serde_json::Error),
}

/// The two endpoints the export reads from.
pub trait OrderApi {
    /// List one page of the orders created on `date`. Without `page` the
    /// platform returns the first one.
    fn fetch_order_list(
        &self,
        token: &str,
        date: NaiveDate,
        page_size: u32,
        page: Option<u32>,
    ) -> Result<OrderPage, RemoteCallError>;

    fn fetch_order_detail(&self, token: &str, order_id: &OrderId)
        -> Result<RawOrder, RemoteCallError>;
}

/// Blocking HTTP client for the platform's integration API.
///
/// Both endpoints take a form-encoded POST and answer 201 on success. No
/// retries are attempted and the transport's default timeout applies.
pub struct ApiClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn post<T: DeserializeOwned>(
        &self,
        url: &str,
        form: &[(&str, String)],
    ) -> Result<T, RemoteCallError> {
        let response = self
            .http
            .post(url)
            .form(form)
            .send()
            .map_err(RemoteCallError::Network)?;

        let status = response.status();
        if status != StatusCode::CREATED {
            return Err(RemoteCallError::Status(status.as_u16()));
        }
        let body = response.bytes().map_err(RemoteCallError::Network)?;
        serde_json::from_slice(&body).map_err(RemoteCallError::Decode)
    }
}

impl OrderApi for ApiClient {
    fn fetch_order_list(
        &self,
        token: &str,
        date: NaiveDate,
        page_size: u32,
        page: Option<u32>,
    ) -> Result<OrderPage, RemoteCallError> {
        let mut form = vec![
            ("token_account", token.to_string()),
            ("created_at", date.format("%Y-%m-%d").to_string()),
            ("limit", page_size.to_string()),
        ];
        if let Some(page) = page {
            form.push(("page", page.to_string()));
        }
        log::debug!("listing orders for {} (page {:?})", date, page);
        self.post(&format!("{}/order", self.base_url), &form)
    }

    fn fetch_order_detail(
        &self,
        token: &str,
        order_id: &OrderId,
    ) -> Result<RawOrder, RemoteCallError> {
        log::debug!("fetching order {}", order_id);
        let envelope: OrderEnvelope = self.post(
            &format!("{}/order/{}", self.base_url, order_id),
            &[("token_account", token.to_string())],
        )?;
        Ok(envelope.order)
    }
}

#[cfg(test)]
pub mod fake {
    //! In-memory stand-in for the platform, recording every call made.

    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        List { token: String, page: Option<u32> },
        Detail { token: String, order_id: String },
    }

    #[derive(Default)]
    pub struct FakeApi {
        /// Listing responses per token, keyed by page number (first page = 1).
        pub pages: HashMap<(String, u32), serde_json::Value>,
        pub details: HashMap<String, serde_json::Value>,
        /// Answer every call with this status instead of 201.
        pub fail_with: Option<u16>,
        pub calls: RefCell<Vec<Call>>,
    }

    impl FakeApi {
        pub fn with_page(mut self, token: &str, page: u32, body: serde_json::Value) -> Self {
            self.pages.insert((token.to_string(), page), body);
            self
        }

        pub fn with_detail(mut self, order_id: &str, body: serde_json::Value) -> Self {
            self.details.insert(order_id.to_string(), body);
            self
        }

        pub fn pages_requested(&self, token: &str) -> Vec<u32> {
            self.calls
                .borrow()
                .iter()
                .filter_map(|c| match c {
                    Call::List { token: t, page } if t == token => Some(page.unwrap_or(1)),
                    _ => None,
                })
                .collect()
        }
    }

    impl OrderApi for FakeApi {
        fn fetch_order_list(
            &self,
            token: &str,
            _date: NaiveDate,
            _page_size: u32,
            page: Option<u32>,
        ) -> Result<OrderPage, RemoteCallError> {
            self.calls.borrow_mut().push(Call::List {
                token: token.to_string(),
                page,
            });
            if let Some(code) = self.fail_with {
                return Err(RemoteCallError::Status(code));
            }
            let body = self
                .pages
                .get(&(token.to_string(), page.unwrap_or(1)))
                .cloned()
                .unwrap_or_else(|| serde_json::json!({"Orders": [], "paging": {"total": 0}}));
            serde_json::from_value(body).map_err(RemoteCallError::Decode)
        }

        fn fetch_order_detail(
            &self,
            token: &str,
            order_id: &OrderId,
        ) -> Result<RawOrder, RemoteCallError> {
            self.calls.borrow_mut().push(Call::Detail {
                token: token.to_string(),
                order_id: order_id.to_string(),
            });
            if let Some(code) = self.fail_with {
                return Err(RemoteCallError::Status(code));
            }
            let body = self
                .details
                .get(order_id.as_str())
                .cloned()
                .ok_or(RemoteCallError::Status(404))?;
            let envelope: OrderEnvelope =
                serde_json::from_value(body).map_err(RemoteCallError::Decode)?;
            Ok(envelope.order)
        }
    }
}
