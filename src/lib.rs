#![warn(clippy::pedantic)]

pub mod builders;
pub mod cli;
pub mod django_app;
pub mod http_server;
pub mod kubernetes;

/*
 * ============================================================================
 * Error
 * ============================================================================
 */
#[derive(Debug)]
pub enum Error {
    InvalidSpec(String),
    Kube(kube::Error),
    MissingObjectKey(&'static str),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidSpec(reason) => write!(f, "invalid spec: {reason}"),
            Error::Kube(error) => write!(f, "kube: {error}"),
            Error::MissingObjectKey(key) => write!(f, "missing object key: {key}"),
        }
    }
}

/*
 * ============================================================================
 * Result
 * ============================================================================
 */
pub type Result<T, E = Error> = std::result::Result<T, E>;
