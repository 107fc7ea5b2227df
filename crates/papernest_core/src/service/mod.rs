//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep the command-line layer decoupled from storage details.

pub mod ordering_service;
pub mod paper_service;
pub mod project_service;
