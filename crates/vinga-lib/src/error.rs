//! Error types for provider access, the counter catalog, hierarchy
//! resolution, config emission and check evaluation

use crate::models::{EntityKind, MoRef};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    /// Session could not be established (network, TLS, bad credentials)
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The provider answered with a method fault
    #[error("{fault} ({status}): {message}")]
    Fault {
        status: u16,
        fault: String,
        message: String,
    },

    #[error("unexpected response: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("counter '{0}' is not available on this provider")]
    UnknownCounter(String),

    #[error("cache I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("host '{host}' has a parent of unknown kind '{kind}'")]
    UnknownParentKind { host: String, kind: String },

    #[error("{object} has no '{property}' property")]
    MissingProperty { object: String, property: String },

    #[error("could not find the datacenter enclosing {0}")]
    DatacenterNotFound(MoRef),
}

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("{kind} '{name}' not found")]
    EntityNotFound { kind: EntityKind, name: String },

    #[error("virtual machine '{name}' is {state}")]
    EntityNotRunning { name: String, state: String },

    #[error("counter '{counter}' is not supported for {kind} entities")]
    UnsupportedCounter { kind: EntityKind, counter: String },

    #[error("no samples returned for {counter} between {start} and {end}; check clock drift between the provider and this host")]
    EmptyMetricWindow {
        counter: String,
        start: String,
        end: String,
    },

    #[error("{entity} has no usable '{property}' value")]
    MissingProperty { entity: String, property: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}
