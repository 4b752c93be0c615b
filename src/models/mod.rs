pub mod film;
pub mod order;
pub mod seat;

pub use film::{Film, FilmDocument, Showing, ShowingRef};
pub use order::{Order, Ticket, TicketRequest, ValidTicket};
pub use seat::SeatKey;
