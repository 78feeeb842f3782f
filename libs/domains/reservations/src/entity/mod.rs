//! Sea-ORM entities.
//!
//! `reservations` and `reservation_states` belong to this domain. `users` and
//! `products` are owned elsewhere and only read here.

pub mod product;
pub mod reservation;
pub mod reservation_state;
pub mod user;
