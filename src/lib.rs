pub mod api;
pub mod cli;
pub mod config;
pub mod models;
pub mod tracker;

pub use api::{ApiError, HttpApi, TriviaApi};
pub use config::Config;
pub use tracker::{SessionSnapshot, SessionTracker, TrackerError};
