pub mod account;
pub mod booking;
pub mod notification;
pub mod ride;
