pub mod booking;
pub mod cab;
pub mod driver;
pub mod payment_transaction;
pub mod room;
pub mod trip;
pub mod user;
