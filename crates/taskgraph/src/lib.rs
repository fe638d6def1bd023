//! Taskgraph - a task dependency graph engine.
//!
//! Tracks tasks and directed "depends-on" edges between them. Edge insertion
//! is cycle-checked, each task's status is derived from the statuses of its
//! prerequisites, and the graph can be exported and queried for
//! visualization.
//!
//! The [`service::DependencyService`] is the entry point: it owns the
//! in-memory [`graph::DependencyGraph`], persists through a
//! [`store::TaskStore`], and runs the [`resolver`] after every
//! status-affecting mutation.

#![forbid(unsafe_code)]

// Public modules for library usage
pub mod domain;
pub mod error;
pub mod graph;
pub mod query;
pub mod resolver;
pub mod service;
pub mod store;

// Public CLI module (needed by binary)
pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod output;
