//! Command handlers

pub mod artifact;
pub mod config;
