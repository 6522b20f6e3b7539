//! Hierarchical command routing and dispatch for unix command-line tools.
//!
//! A [`core::dispatcher::Dispatcher`] parses a colon-separated command path
//! (`admin:status`), routes it through a tree of
//! [`core::controller::Controller`]s, resolves abbreviated segments against a
//! prefix index, and executes the resolved command.

pub mod cli;
pub mod constants;
pub mod core;
