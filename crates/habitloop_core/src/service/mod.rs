//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate collaborator calls into use-case level APIs.
//! - Keep UI layers decoupled from storage and task execution details.

pub mod habit_list_coordinator;
