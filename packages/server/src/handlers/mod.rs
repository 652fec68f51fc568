pub mod auth;
pub mod category;
pub mod chat;
pub mod comment;
pub mod profile;
pub mod story;
