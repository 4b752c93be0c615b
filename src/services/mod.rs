pub mod order;
pub mod validator;

pub use order::OrderService;
pub use validator::validate_tickets;
