pub mod handlers;
pub mod pagination;
