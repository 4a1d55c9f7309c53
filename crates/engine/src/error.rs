//! Errors the engine can surface.
//!
//! Structural failures ([`DbCorruption`], [`JournalParse`], [`ConfigInvalid`])
//! abort the current operation; observational ones ([`PriceFetch`]) are logged
//! by the caller and reports continue with stale data.
//!
//! [`DbCorruption`]: EngineError::DbCorruption
//! [`JournalParse`]: EngineError::JournalParse
//! [`ConfigInvalid`]: EngineError::ConfigInvalid
//! [`PriceFetch`]: EngineError::PriceFetch
use thiserror::Error;

use crate::sheet::SheetError;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
    #[error("journal parse error at {file}:{line}: {message}")]
    JournalParse {
        file: String,
        line: u32,
        message: String,
    },
    #[error("price fetch failed for {commodity}: {message}")]
    PriceFetch { commodity: String, message: String },
    #[error("database corrupted: {0}")]
    DbCorruption(String),
    #[error("\"{0}\" not found")]
    KeyNotFound(String),
    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),
    #[error(transparent)]
    Sheet(#[from] SheetError),
    #[error("cancelled")]
    Cancelled,
}
