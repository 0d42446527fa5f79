pub mod chat;
pub mod doctor;
pub mod index;
pub mod onboard;
pub mod route;
