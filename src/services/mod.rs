pub mod booking;
pub mod dispatch;
pub mod fleet;
pub mod ledger;
pub mod notify;
pub mod payment;
pub mod room_status;
pub mod rooms;
pub mod sweep;
pub mod trip;
