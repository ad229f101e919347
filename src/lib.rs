// src/lib.rs

//! Career Events Refresh Library
//!
//! Pulls career events from configured providers, verifies registration
//! links and publishes a deduplicated event set.

pub mod dedupe;
pub mod error;
pub mod health;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod storage;
pub mod utils;
pub mod verify;
