/// Order status as reported by the delivery platform.
///
/// The platform sends a bare integer; only codes 0 through 7 are defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    New,
    Confirmed,
    Delivered,
    CanceledByRestaurant,
    Shipped,
    CanceledBySystem,
    RefundedByRestaurant,
    RefundedBySystem,
}

impl OrderStatus {
    /// Label written to the export, in the language the stores work in.
    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::New => "Novo Pedido",
            OrderStatus::Confirmed => "Confirmado",
            OrderStatus::Delivered => "Entregue",
            OrderStatus::CanceledByRestaurant => "Cancelado (restaurante)",
            OrderStatus::Shipped => "Enviado",
            OrderStatus::CanceledBySystem => "Cancelado Automaticamente (sistema)",
            OrderStatus::RefundedByRestaurant => "Cancelado com Pagamento Estornado (restaurante)",
            OrderStatus::RefundedBySystem => "Cancelado Automaticamente, com Pagamento Estornado",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown status code {0}")]
pub struct UnknownStatusCode(pub i64);

impl TryFrom<i64> for OrderStatus {
    type Error = UnknownStatusCode;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => OrderStatus::New,
            1 => OrderStatus::Confirmed,
            2 => OrderStatus::Delivered,
            3 => OrderStatus::CanceledByRestaurant,
            4 => OrderStatus::Shipped,
            5 => OrderStatus::CanceledBySystem,
            6 => OrderStatus::RefundedByRestaurant,
            7 => OrderStatus::RefundedBySystem,
            other => return Err(UnknownStatusCode(other)),
        })
    }
}
