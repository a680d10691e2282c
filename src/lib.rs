//! Lead Intake API Library
//!
//! Receives solar-energy lead submissions, validates them and registers them in
//! Pipefy: find the sales agent, find or create the customer, and open one sales
//! card per customer.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers and router.
//! - `intake`: The lead intake workflow.
//! - `models`: Submission, Pipefy and response models.
//! - `pipefy_client`: Pipefy GraphQL client and its capability trait.
//! - `validation`: Submission validation and phone normalization.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod intake;
pub mod models;
pub mod pipefy_client;
pub mod validation;
