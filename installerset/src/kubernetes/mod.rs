//! Kubernetes integration for Installerset
//!
//! Provides the phased installer and its collaborators:
//! - Manifest loading and order-preserving filtering
//! - Kind predicates and the phase classification table
//! - The installer (phase operations and readiness probes)
//! - Deployment availability evaluation
//! - kube-rs backed apply/read collaborators (feature `kubernetes`)

pub mod error;
pub mod types;

pub mod manifest;
pub mod phase;
pub mod predicate;

pub mod cluster;
pub mod installer;
pub mod readiness;

#[cfg(feature = "kubernetes")]
pub mod client;
