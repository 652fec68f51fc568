mod common;

mod chat;
mod comment;
mod profile;
mod story;
