//! Error types for the lineup optimizer

use thiserror::Error;

use crate::solver::SolverError;


pub type Result<T> = std::result::Result<T, OptimizerError>;

#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("Invalid team: {team}")]
    InvalidTeam { team: String },

    #[error("Invalid position: {position}")]
    InvalidPosition { position: String },

    #[error("Invalid exposure for {name}: {message}")]
    InvalidExposure { name: String, message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Player not found: {name}")]
    PlayerNotFound { name: String },

    #[error("Player {name} is already locked")]
    PlayerAlreadyLocked { name: String },

    #[error("Player {name} is not locked")]
    PlayerNotLocked { name: String },

    #[error("Player {name} is removed from the pool")]
    PlayerRemoved { name: String },

    #[error("Can't lock {name}: locked salary {salary} exceeds budget {budget}")]
    BudgetExceeded {
        name: String,
        salary: f64,
        budget: f64,
    },

    #[error("Can't lock {name}: no available slot")]
    NoSlotAvailable { name: String },

    #[error("Can't generate lineups: generated {generated} of {requested}: {source}")]
    GenerateLineup {
        generated: usize,
        requested: usize,
        #[source]
        source: SolverError,
    },

    #[error("Unable to build lineup: {message}")]
    LineupAssembly { message: String },

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl OptimizerError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        OptimizerError::InvalidConfig {
            message: message.into(),
        }
    }
}
