//! vSphere discovery and monitoring library
//!
//! This crate provides the core functionality for:
//! - Property traversal and metric queries against vCenter / ESXi
//! - Performance counter catalog with an on-disk cache
//! - Reconstruction of the datacenter / cluster / host / VM hierarchy
//! - Check evaluation with threshold classification
//! - Icinga / Nagios configuration emission

pub mod catalog;
pub mod check;
pub mod emitter;
pub mod error;
pub mod fetcher;
pub mod hierarchy;
pub mod models;
pub mod observability;
pub mod provider;
pub mod session;

pub use catalog::{CounterCatalog, FileCacheStore, SystemClock};
pub use check::{CheckEvaluator, CheckOutcome, CheckRequest, Severity};
pub use emitter::{emit, write_artifacts, ConfigArtifact, DefaultThresholds, EmitterConfig};
pub use error::{CatalogError, CheckError, EmitError, HierarchyError, ProviderError};
pub use fetcher::PropertyFetcher;
pub use hierarchy::{Hierarchy, Inventory};
pub use models::*;
pub use observability::StructuredLogger;
pub use provider::{ConnectParams, InfrastructureProvider, VimClient};
pub use session::Session;
