pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod face;
pub mod models;
pub mod retry;
pub mod services;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
