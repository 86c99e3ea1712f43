//! Study Planner — guided wizard that turns a few answers into a
//! personalized study schedule document.

pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod presenter;
pub mod routes;
pub mod wizard;
