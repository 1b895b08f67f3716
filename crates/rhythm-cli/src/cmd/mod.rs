pub mod action;
pub mod config;
pub mod init;
pub mod member;
pub mod note;
pub mod recording;
pub mod statuses;
pub mod ui;
