use serde_json::Value;
use tracing::debug;

use crate::error::ValidationError;
use crate::models::{TicketRequest, ValidTicket};

/// Проверяет все билеты и превращает их в [`ValidTicket`].
///
/// Просматриваются все билеты, для каждого фиксируется первая нарушенная проверка;
/// наружу уходит ошибка самого раннего из некорректных билетов.
pub fn validate_tickets(tickets: &[TicketRequest]) -> Result<Vec<ValidTicket>, ValidationError> {
    if tickets.is_empty() {
        return Err(ValidationError::EmptyBatch);
    }

    let mut valid = Vec::with_capacity(tickets.len());
    let mut first_error = None;
    let mut rejected = 0usize;

    for (index, ticket) in tickets.iter().enumerate() {
        match validate_ticket(index, ticket) {
            Ok(ticket) => valid.push(ticket),
            Err(err) => {
                rejected += 1;
                first_error.get_or_insert(err);
            }
        }
    }

    match first_error {
        Some(err) => {
            debug!(rejected, total = tickets.len(), error = %err, "Order rejected by validation");
            Err(err)
        }
        None => Ok(valid),
    }
}

fn validate_ticket(index: usize, ticket: &TicketRequest) -> Result<ValidTicket, ValidationError> {
    let present = |value: &Option<String>| value.as_deref().filter(|s| !s.trim().is_empty()).map(str::to_owned);

    let (Some(film), Some(session), Some(daytime)) =
        (present(&ticket.film), present(&ticket.session), present(&ticket.daytime))
    else {
        return Err(ValidationError::MissingReference { index });
    };

    // ряд и место - только целые числа, цена - любое конечное число
    let integer = |value: &Option<Value>| value.as_ref().and_then(Value::as_i64);
    let number = |value: &Option<Value>| value.as_ref().and_then(Value::as_f64).filter(|n| n.is_finite());

    let (Some(row), Some(seat), Some(price)) = (integer(&ticket.row), integer(&ticket.seat), number(&ticket.price))
    else {
        return Err(ValidationError::MalformedSeatOrPrice { index });
    };

    let coordinates = (u32::try_from(row), u32::try_from(seat));
    let (Ok(row_num @ 1..), Ok(seat_num @ 1..)) = coordinates else {
        return Err(ValidationError::InvalidSeatCoordinates { index, row, seat });
    };

    Ok(ValidTicket { film, session, daytime, row: row_num, seat: seat_num, price })
}
