pub mod category;
pub mod comment;
pub mod follow;
pub mod like;
pub mod message;
pub mod profile;
pub mod reply;
pub mod story;
pub mod user;
