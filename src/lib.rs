pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
pub mod store;
pub mod utils;

pub use error::AppError;
pub use startup::{AppState, Application};
