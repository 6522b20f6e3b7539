// src/core/mod.rs

pub mod command;
pub mod controller;
pub mod dispatcher;
pub mod name;
pub mod prefix_index;
pub mod registry;
