//! CLI error handling with user-friendly messages.

use findcab::service::ServiceError;
use std::fmt;
use std::io;
use std::process;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(io::Error),
    /// Failed to open or initialize a storage backend
    Backend(ServiceError),
    /// Failed to build the async runtime
    Runtime(io::Error),
    /// Failed to bind the listen address
    Bind { addr: String, error: io::Error },
    /// The HTTP server stopped with an error
    Serve(io::Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Backend(_) => {
                eprintln!();
                eprintln!("Check that the database path is writable, or start with");
                eprintln!("--backend memory to run without persistence.");
            }
            CliError::Bind { .. } => {
                eprintln!();
                eprintln!("Is another findcab instance already running on that port?");
                eprintln!("Pick a different one with --port.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Backend(e) => write!(f, "Failed to open backend: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Bind { addr, error } => {
                write!(f, "Failed to bind '{}': {}", addr, error)
            }
            CliError::Serve(e) => write!(f, "Server error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::LoggingInit(e) => Some(e),
            CliError::Backend(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Bind { error, .. } => Some(error),
            CliError::Serve(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_bind() {
        let err = CliError::Bind {
            addr: "0.0.0.0:8080".to_string(),
            error: io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        };
        let message = err.to_string();
        assert!(message.contains("0.0.0.0:8080"));
        assert!(message.contains("address in use"));
    }

    #[test]
    fn test_source_is_preserved() {
        let err = CliError::Backend(ServiceError::backend("unreachable"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
