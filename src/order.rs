use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::status::{OrderStatus, UnknownStatusCode};

/// Order identifier as handed out by the platform.
///
/// The listing endpoint has been seen sending both integers and strings, so
/// both are accepted and kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OrderId(String);

#[cfg(test)]
impl OrderId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for OrderId {
    fn deserialize<D>(deserializer: D) -> Result<OrderId, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Integer(i64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Integer(n) => OrderId(n.to_string()),
            Raw::Text(s) => OrderId(s),
        })
    }
}

/// One page of the order listing.
#[derive(Debug, Deserialize)]
pub struct OrderPage {
    #[serde(rename = "Orders", default)]
    pub orders: Vec<OrderSummary>,
    pub paging: Paging,
}

#[derive(Debug, Deserialize)]
pub struct OrderSummary {
    pub id: OrderId,
}

#[derive(Debug, Deserialize)]
pub struct Paging {
    pub total: u64,
}

/// Body of the order detail endpoint.
#[derive(Debug, Deserialize)]
pub struct OrderEnvelope {
    #[serde(rename = "Order")]
    pub order: RawOrder,
}

// The detail payload is deserialized as-is and only then converted into
// `OrderDetail`, so that a missing price or a bad date surfaces as its own
// error kind rather than as a generic JSON error.
#[derive(Debug, Clone, Deserialize)]
pub struct RawOrder {
    pub id: OrderId,
    pub date: String,
    pub name: String,
    pub payment_method: String,
    pub status: i64,
    #[serde(rename = "ItemOrder", default)]
    pub items: Vec<RawItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawItem {
    pub title: String,
    pub quantity: u32,
    pub price_un: Option<f64>,
    pub price: Option<f64>,
    #[serde(rename = "ComplementCategories", default)]
    pub complement_categories: Vec<RawComplementCategory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawComplementCategory {
    #[serde(rename = "Complements", default)]
    pub complements: Vec<RawItem>,
}

/// Unit price of an item or complement.
///
/// Depending on the shape of the response the platform puts it under
/// `price_un` or under `price`; `price_un` wins when both are present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnitPrice {
    Unit(f64),
    Listed(f64),
}

impl UnitPrice {
    pub fn value(self) -> f64 {
        match self {
            UnitPrice::Unit(v) | UnitPrice::Listed(v) => v,
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct LineItem {
    pub title: String,
    pub quantity: u32,
    pub price: UnitPrice,
}

impl LineItem {
    /// Unit price times quantity, rounded to cents.
    pub fn subtotal(&self) -> f64 {
        round_cents(self.price.value() * f64::from(self.quantity))
    }
}

#[derive(Debug, PartialEq)]
pub struct ComplementCategory {
    pub complements: Vec<LineItem>,
}

#[derive(Debug, PartialEq)]
pub struct Item {
    pub line: LineItem,
    pub complement_categories: Vec<ComplementCategory>,
}

/// A fully validated order, ready to be flattened into rows.
#[derive(Debug, PartialEq)]
pub struct OrderDetail {
    pub id: OrderId,
    pub placed_at: NaiveDateTime,
    pub customer: String,
    pub payment_method: String,
    pub status: OrderStatus,
    pub items: Vec<Item>,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("order {order}: item {title:?} has neither price_un nor price")]
    MissingPriceField { order: OrderId, title: String },
    #[error("order {order}: cannot parse date {value:?}")]
    DateParse { order: OrderId, value: String },
    #[error("order {order}: {source}")]
    UnknownStatus {
        order: OrderId,
        #[source]
        source: UnknownStatusCode,
    },
}

impl TryFrom<RawOrder> for OrderDetail {
    type Error = OrderError;

    fn try_from(raw: RawOrder) -> Result<Self, Self::Error> {
        let placed_at = parse_order_date(&raw.date).ok_or_else(|| OrderError::DateParse {
            order: raw.id.clone(),
            value: raw.date.clone(),
        })?;
        let status = OrderStatus::try_from(raw.status).map_err(|source| {
            OrderError::UnknownStatus {
                order: raw.id.clone(),
                source,
            }
        })?;
        let items = raw
            .items
            .into_iter()
            .map(|item| convert_item(&raw.id, item))
            .collect::<Result<_, _>>()?;

        Ok(OrderDetail {
            id: raw.id,
            placed_at,
            customer: raw.name,
            payment_method: raw.payment_method,
            status,
            items,
        })
    }
}

fn convert_item(order: &OrderId, raw: RawItem) -> Result<Item, OrderError> {
    let RawItem {
        title,
        quantity,
        price_un,
        price,
        complement_categories,
    } = raw;
    let complement_categories = complement_categories
        .into_iter()
        .map(|category| {
            let complements = category
                .complements
                .into_iter()
                .map(|c| convert_line(order, c.title, c.quantity, c.price_un, c.price))
                .collect::<Result<_, _>>()?;
            Ok(ComplementCategory { complements })
        })
        .collect::<Result<_, OrderError>>()?;

    Ok(Item {
        line: convert_line(order, title, quantity, price_un, price)?,
        complement_categories,
    })
}

// Complements nested under a complement are not part of the platform's
// format and are ignored.
fn convert_line(
    order: &OrderId,
    title: String,
    quantity: u32,
    price_un: Option<f64>,
    price: Option<f64>,
) -> Result<LineItem, OrderError> {
    let price = match (price_un, price) {
        (Some(unit), _) => UnitPrice::Unit(unit),
        (None, Some(listed)) => UnitPrice::Listed(listed),
        (None, None) => {
            return Err(OrderError::MissingPriceField {
                order: order.clone(),
                title,
            })
        }
    };
    Ok(LineItem {
        title,
        quantity,
        price,
    })
}

/// Parse the timestamps the platform sends.
///
/// Offsets are dropped and the wall-clock time is kept as written. A bare
/// date is read as midnight.
pub fn parse_order_date(s: &str) -> Option<NaiveDateTime> {
    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.naive_local());
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Round to two decimal places, halves to even, on the exact value of the
/// float. `{:.2}` formats the exact binary value, so 2.675 (stored just below
/// it) becomes 2.67 and the exact tie 0.125 becomes 0.12.
pub fn round_cents(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn raw_order(json: serde_json::Value) -> RawOrder {
        serde_json::from_value(json).unwrap()
    }

    #[test_case(serde_json::json!(42), "42"; "integer id")]
    #[test_case(serde_json::json!("42"), "42"; "string id")]
    fn test_order_id(value: serde_json::Value, expected: &str) {
        let id: OrderId = serde_json::from_value(value).unwrap();
        assert_eq!(id.as_str(), expected);
    }

    #[test]
    fn test_parse_order_page() {
        let page: OrderPage = serde_json::from_str(
            r#"{"Orders": [{"id": 1, "other": "ignored"}, {"id": "2"}], "paging": {"total": 2}}"#,
        )
        .unwrap();
        let ids: Vec<_> = page.orders.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(page.paging.total, 2);
    }

    #[test_case("2024-01-05T10:30:00", "2024-01-05 10:30:00"; "iso")]
    #[test_case("2024-01-05 10:30:00", "2024-01-05 10:30:00"; "space separated")]
    #[test_case("2024-01-05T10:30:00.250", "2024-01-05 10:30:00.250"; "fractional seconds")]
    #[test_case("2024-01-05T10:30:00-03:00", "2024-01-05 10:30:00"; "rfc3339 keeps wall clock")]
    #[test_case("2024-01-05 10:30:00-0300", "2024-01-05 10:30:00"; "compact offset")]
    #[test_case("2024-01-05 10:30", "2024-01-05 10:30:00"; "no seconds")]
    #[test_case("2024-01-05", "2024-01-05 00:00:00"; "date only")]
    fn test_parse_order_date(s: &str, expected: &str) {
        let expected = NaiveDateTime::parse_from_str(expected, "%Y-%m-%d %H:%M:%S%.f").unwrap();
        assert_eq!(parse_order_date(s), Some(expected));
    }

    #[test_case(""; "empty")]
    #[test_case("yesterday"; "words")]
    #[test_case("2024-13-05 10:30:00"; "bad month")]
    fn test_parse_order_date_invalid(s: &str) {
        assert_eq!(parse_order_date(s), None);
    }

    #[test]
    fn test_price_un_preferred() {
        let order = raw_order(serde_json::json!({
            "id": 1, "date": "2024-01-05T10:30:00", "name": "a", "payment_method": "pix",
            "status": 0,
            "ItemOrder": [{"title": "Soda", "quantity": 1, "price_un": 4.5, "price": 9.0}]
        }));
        let detail = OrderDetail::try_from(order).unwrap();
        assert_eq!(detail.items[0].line.price, UnitPrice::Unit(4.5));
    }

    #[test]
    fn test_price_fallback() {
        let order = raw_order(serde_json::json!({
            "id": 1, "date": "2024-01-05T10:30:00", "name": "a", "payment_method": "pix",
            "status": 0,
            "ItemOrder": [{"title": "Soda", "quantity": 1, "price": 9.0}]
        }));
        let detail = OrderDetail::try_from(order).unwrap();
        assert_eq!(detail.items[0].line.price, UnitPrice::Listed(9.0));
    }

    #[test]
    fn test_missing_price_in_complement() {
        let order = raw_order(serde_json::json!({
            "id": 7, "date": "2024-01-05T10:30:00", "name": "a", "payment_method": "pix",
            "status": 0,
            "ItemOrder": [{
                "title": "Burger", "quantity": 1, "price": 10.0,
                "ComplementCategories": [{"Complements": [{"title": "Bacon", "quantity": 1}]}]
            }]
        }));
        assert_eq!(
            OrderDetail::try_from(order),
            Err(OrderError::MissingPriceField {
                order: OrderId::new("7"),
                title: "Bacon".into(),
            })
        );
    }

    #[test]
    fn test_bad_date() {
        let order = raw_order(serde_json::json!({
            "id": 7, "date": "not a date", "name": "a", "payment_method": "pix", "status": 0
        }));
        assert!(matches!(
            OrderDetail::try_from(order),
            Err(OrderError::DateParse { .. })
        ));
    }

    #[test]
    fn test_unknown_status() {
        let order = raw_order(serde_json::json!({
            "id": 7, "date": "2024-01-05T10:30:00", "name": "a", "payment_method": "pix",
            "status": 9
        }));
        assert_eq!(
            OrderDetail::try_from(order),
            Err(OrderError::UnknownStatus {
                order: OrderId::new("7"),
                source: UnknownStatusCode(9),
            })
        );
    }

    #[test_case(10.0, 2, 20.0)]
    #[test_case(3.333, 3, 10.0)]
    #[test_case(0.0, 5, 0.0)]
    #[test_case(12.49, 7, 87.43)]
    #[test_case(0.125, 1, 0.12; "exact tie goes to even")]
    #[test_case(0.625, 1, 0.62; "another exact tie goes to even")]
    #[test_case(2.675, 1, 2.67; "stored just below the half")]
    #[test_case(1.005, 1, 1.0; "stored just below the half cent")]
    fn test_subtotal(price: f64, quantity: u32, expected: f64) {
        let line = LineItem {
            title: "x".into(),
            quantity,
            price: UnitPrice::Listed(price),
        };
        assert_eq!(line.subtotal(), expected);
    }
}
