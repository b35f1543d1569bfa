//! Multi-tenant exam-prep backend.
//!
//! One service fronts three sibling exam products. Each tenant keeps its own
//! MySQL database behind a pluggable transport (direct TCP, SSH tunnel or an
//! HTTP proxy RPC). Stripe checkout plus webhook reconciliation turn payments
//! into access tokens, and those tokens gate question delivery, practice
//! sessions and progress reporting.

pub mod access;
pub mod config;
pub mod email;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod payments;
pub mod questions;
pub mod reconcile;
pub mod store;
pub mod tenant;
pub mod token;
