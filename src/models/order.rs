use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{SeatKey, ShowingRef};

/// Билет в том виде, в каком его прислал клиент. Ничего не проверено:
/// ряд, место и цена приходят как есть, тип проверяет валидатор.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketRequest {
    #[serde(default)]
    pub film: Option<String>,
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub daytime: Option<String>,
    #[serde(default)]
    pub row: Option<Value>,
    #[serde(default)]
    pub seat: Option<Value>,
    #[serde(default)]
    pub price: Option<Value>,
}

/// Билет после валидации: все поля на месте, координаты положительные.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidTicket {
    pub film: String,
    pub session: String,
    pub daytime: String,
    pub row: u32,
    pub seat: u32,
    pub price: f64,
}

impl ValidTicket {
    pub fn showing(&self) -> ShowingRef {
        ShowingRef::new(self.film.clone(), self.daytime.clone())
    }

    pub fn seat_key(&self) -> SeatKey {
        SeatKey::encode(self.row, self.seat)
    }

    /// Выдаётся только после того, как место подтверждено в хранилище.
    pub fn issue(self) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            film: self.film,
            session: self.session,
            daytime: self.daytime,
            row: self.row,
            seat: self.seat,
            price: self.price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub film: String,
    pub session: String,
    pub daytime: String,
    pub row: u32,
    pub seat: u32,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub total: usize,
    pub items: Vec<Ticket>,
}

impl Order {
    pub fn assemble(items: Vec<Ticket>) -> Self {
        Order { total: items.len(), items }
    }
}
