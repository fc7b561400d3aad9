pub mod auth;
pub mod lectures;
pub mod links;
pub mod meetings;
pub mod users;
