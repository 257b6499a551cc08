//! Session errors and the coarse error codes surfaced to callers

use super::state::CaptureState;
use crate::reader::ReaderError;
use crate::storage::StorageError;
use crate::writer::WriterError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of the last session-level failure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[default]
    Success,
    InitializationFailed,
    CaptureFailed,
    WriterError,
    ReaderError,
    InvalidConfig,
    InsufficientResources,
    PermissionDenied,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Success => "success",
            ErrorCode::InitializationFailed => "initialization_failed",
            ErrorCode::CaptureFailed => "capture_failed",
            ErrorCode::WriterError => "writer_error",
            ErrorCode::ReaderError => "reader_error",
            ErrorCode::InvalidConfig => "invalid_config",
            ErrorCode::InsufficientResources => "insufficient_resources",
            ErrorCode::PermissionDenied => "permission_denied",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum SessionError {
    NotInitialized,
    /// Operation not allowed in the current capture state
    InvalidTransition {
        operation: &'static str,
        state: CaptureState,
    },
    InvalidConfig(String),
    Reader(ReaderError),
    Writer(WriterError),
    Storage(StorageError),
    /// Worker threads could not be spawned
    Resources(String),
    /// The platform refused a capture or overlay surface
    PermissionDenied(String),
}

impl SessionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::NotInitialized => ErrorCode::InitializationFailed,
            SessionError::InvalidTransition { .. } => ErrorCode::CaptureFailed,
            SessionError::InvalidConfig(_) => ErrorCode::InvalidConfig,
            SessionError::Reader(ReaderError::CaptureFailed(_)) => ErrorCode::CaptureFailed,
            SessionError::Reader(_) => ErrorCode::ReaderError,
            SessionError::Writer(WriterError::OverlayFailed) => ErrorCode::PermissionDenied,
            SessionError::Writer(_) => ErrorCode::WriterError,
            SessionError::Storage(_) => ErrorCode::InvalidConfig,
            SessionError::Resources(_) => ErrorCode::InsufficientResources,
            SessionError::PermissionDenied(_) => ErrorCode::PermissionDenied,
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotInitialized => write!(f, "Session is not initialized"),
            SessionError::InvalidTransition { operation, state } => {
                write!(f, "Cannot {} while {}", operation, state)
            }
            SessionError::InvalidConfig(msg) => write!(f, "Invalid recording configuration: {}", msg),
            SessionError::Reader(err) => write!(f, "Reader error: {}", err),
            SessionError::Writer(err) => write!(f, "Writer error: {}", err),
            SessionError::Storage(err) => write!(f, "Storage error: {}", err),
            SessionError::Resources(msg) => write!(f, "Insufficient resources: {}", msg),
            SessionError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Reader(err) => Some(err),
            SessionError::Writer(err) => Some(err),
            SessionError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ReaderError> for SessionError {
    fn from(err: ReaderError) -> Self {
        SessionError::Reader(err)
    }
}

impl From<WriterError> for SessionError {
    fn from(err: WriterError) -> Self {
        SessionError::Writer(err)
    }
}

impl From<StorageError> for SessionError {
    fn from(err: StorageError) -> Self {
        SessionError::Storage(err)
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
