pub mod availability;
pub mod booking;
pub mod fees;
pub mod lifecycle;
pub mod wizard;
