use thiserror::Error;

pub mod database;
pub mod gpx_util;
mod data_manager;
mod history;

pub use data_manager::*;
pub use history::*;

pub const DATA_DIR: &str = "data/";
pub const DATABASE_FILE: &str = "history.db";

#[derive(Debug, Error)]
pub enum DataManagerError {
    #[error("database error: {0}")]
    Database(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("gpx error: {0}")]
    Gpx(String),
}
