//! Terminal front end for the day planner.
mod app;
mod commands;
mod config;
mod effects;
mod logging;
mod persistence;
mod ui;

pub use app::run_app;
