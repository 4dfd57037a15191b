pub mod admin;
pub mod bookings;
pub mod driver;
pub mod rooms;
pub mod trips;
