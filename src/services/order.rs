// Заказ создаётся целиком или не создаётся вовсе

use futures::future::try_join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{BookingError, StoreError, ValidationError};
use crate::models::{Order, SeatKey, Showing, ShowingRef, TicketRequest, ValidTicket};
use crate::repository::FilmsRepository;
use crate::services::validator::validate_tickets;

#[derive(Clone)]
pub struct OrderService {
    films: Arc<dyn FilmsRepository>,
}

/// Места одного сеанса из заказа.
#[derive(Debug, Default)]
struct ShowingGroup {
    /// (позиция билета в запросе, ряд, место)
    tickets: Vec<(usize, u32, u32)>,
    seats: BTreeSet<SeatKey>,
    duplicates: BTreeSet<SeatKey>,
}

impl OrderService {
    pub fn new(films: Arc<dyn FilmsRepository>) -> Self {
        Self { films }
    }

    pub async fn create(&self, tickets: Vec<TicketRequest>) -> Result<Order, BookingError> {
        info!("Creating order with {} tickets", tickets.len());
        let tickets = validate_tickets(&tickets)?;

        // Резерв и откат идут в отдельной задаче: если клиент бросит запрос,
        // откат всё равно доработает и не оставит мест без билетов.
        let service = self.clone();
        let order = tokio::spawn(async move { service.book(tickets).await })
            .await
            .map_err(|e| BookingError::Internal(format!("booking task failed: {}", e)))??;

        debug!("Order created with {} items", order.total);
        Ok(order)
    }

    async fn book(&self, tickets: Vec<ValidTicket>) -> Result<Order, BookingError> {
        let groups = group_by_showing(&tickets)?;

        // Сеансы только читаются, поэтому ищем их параллельно
        let showings = try_join_all(groups.iter().map(|(showing, group)| self.check_group(showing, group))).await?;
        debug!(showings = showings.len(), "Showings resolved");

        let mut committed: Vec<(&ShowingRef, &BTreeSet<SeatKey>)> = Vec::with_capacity(groups.len());
        for (showing, group) in &groups {
            match self.films.reserve(showing, &group.seats).await {
                Ok(()) => committed.push((showing, &group.seats)),
                Err(err) => {
                    let err = reservation_error(showing, err);
                    self.rollback(&committed).await;
                    return Err(err);
                }
            }
        }

        let items = tickets.into_iter().map(ValidTicket::issue).collect();
        Ok(Order::assemble(items))
    }

    /// Проверяет, что сеанс существует и все места группы помещаются в зал.
    async fn check_group(&self, showing: &ShowingRef, group: &ShowingGroup) -> Result<Showing, BookingError> {
        let resolved = self.films.resolve_showing(showing).await?;
        if let Some(&(index, row, seat)) = group.tickets.iter().find(|&&(_, row, seat)| !resolved.contains_seat(row, seat)) {
            return Err(ValidationError::InvalidSeatCoordinates { index, row: row.into(), seat: seat.into() }.into());
        }
        Ok(resolved)
    }

    async fn rollback(&self, committed: &[(&ShowingRef, &BTreeSet<SeatKey>)]) {
        for (showing, seats) in committed.iter().rev() {
            match self.films.release(showing, seats).await {
                Ok(()) => info!(%showing, seats = seats.len(), "Rolled back reservation"),
                Err(err) => error!(
                    %showing,
                    seats = ?seats.iter().map(SeatKey::as_str).collect::<Vec<_>>(),
                    error = ?err,
                    "Rollback failed, seats stay taken without tickets"
                ),
            }
        }
    }
}

fn group_by_showing(tickets: &[ValidTicket]) -> Result<BTreeMap<ShowingRef, ShowingGroup>, BookingError> {
    let mut groups: BTreeMap<ShowingRef, ShowingGroup> = BTreeMap::new();
    for (index, ticket) in tickets.iter().enumerate() {
        let group = groups.entry(ticket.showing()).or_default();
        let key = ticket.seat_key();
        if !group.seats.insert(key.clone()) {
            group.duplicates.insert(key);
        }
        group.tickets.push((index, ticket.row, ticket.seat));
    }

    // Одно место дважды в одном заказе - такой же конфликт, как с чужим заказом
    if let Some((showing, group)) = groups.iter().find(|(_, g)| !g.duplicates.is_empty()) {
        warn!(%showing, "Order requests the same seat twice");
        return Err(BookingError::SeatsAlreadyTaken {
            showing: showing.clone(),
            seats: group.duplicates.iter().cloned().collect(),
        });
    }
    Ok(groups)
}

fn reservation_error(showing: &ShowingRef, err: StoreError) -> BookingError {
    match err {
        StoreError::SeatConflict(seats) => {
            warn!(%showing, seats = ?seats, "Seats already taken");
            BookingError::SeatsAlreadyTaken { showing: showing.clone(), seats }
        }
        other => other.into(),
    }
}
