// SPDX-License-Identifier: MIT

//! Custom error type that carries a process exit code (spec §6).
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! directly, allowing `main()` to handle process termination in one place.

use std::fmt;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

impl From<oa_supervisor::SupervisorError> for ExitError {
    fn from(err: oa_supervisor::SupervisorError) -> Self {
        Self::new(err.kind().exit_code(), err.to_string())
    }
}
