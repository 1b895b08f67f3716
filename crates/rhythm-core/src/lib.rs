pub mod action;
pub mod cache;
pub mod circle;
pub mod config;
pub mod display;
pub mod editor;
pub mod error;
pub mod io;
pub mod note;
pub mod order;
pub mod paths;
pub mod persist;
pub mod recording;
pub mod types;
pub mod viewer;
pub mod watcher;

pub use error::{Result, RhythmError};
