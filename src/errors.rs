//! Typed error hierarchy for sprintboard.
//!
//! One enum per subsystem:
//! - `ApiError`: REST gateway failures (transport, status, decoding)
//! - `StoreError`: entity store failures
//! - `DivisionError`: AI division / analysis failures
//! - `WorkflowError`: divide workflow transition failures
//! - `SelectionError`: candidate selection before a division

use thiserror::Error;

use crate::divide::Step;

/// Errors from the REST gateway.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned {status}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Failed to decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl ApiError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

/// Errors from the entity store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Invalid request: {0}")]
    BadRequest(String),
}

/// Errors from the AI division service.
#[derive(Debug, Error)]
pub enum DivisionError {
    #[error("Division request for task {task_id} failed: {source}")]
    Request {
        task_id: i64,
        #[source]
        source: ApiError,
    },

    #[error("Task analysis failed: {0}")]
    Analysis(#[source] ApiError),

    #[error("{0}")]
    Other(String),
}

/// Errors from the divide workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("No divide workflow is open")]
    Closed,

    #[error("Cannot {action} while in {step} step")]
    InvalidTransition { step: Step, action: &'static str },

    #[error("The division queue is empty")]
    EmptyQueue,

    #[error("Task {id} is not in the queue")]
    UnknownTask { id: i64 },

    #[error("Generated task {index} does not exist on the current item")]
    UnknownGenerated { index: usize },

    #[error("Cannot navigate to item {index}")]
    NavigationOutOfRange { index: usize },

    #[error("A commit is already in progress")]
    CommitInProgress,

    #[error(transparent)]
    Division(#[from] DivisionError),
}

/// Errors from the candidate selection session.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("No hay tareas en el backlog para analizar.")]
    NoBacklog,

    #[error("Selecciona al menos una tarea para dividir.")]
    NothingSelected,

    #[error("Task {id} is not a candidate")]
    UnknownTask { id: i64 },

    #[error(transparent)]
    Division(#[from] DivisionError),
}
