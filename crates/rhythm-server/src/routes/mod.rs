pub mod actions;
pub mod config;
pub mod events;
pub mod members;
pub mod notes;
pub mod recordings;
pub mod statuses;
pub mod watchers;
