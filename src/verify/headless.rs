// src/verify/headless.rs

//! Stage C: rendered-page verification.
//!
//! No browser backend is wired in; every check answers "unavailable".
//! The pipeline records that answer as a note and never rejects on it.

use crate::verify::live::CheckOutcome;

pub const UNAVAILABLE: &str = "unavailable";

#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessVerifier;

impl HeadlessVerifier {
    pub fn new() -> Self {
        Self
    }

    pub async fn verify(&self, url: &str) -> CheckOutcome {
        log::debug!("Headless check skipped for {}: no renderer", url);
        CheckOutcome::failed(UNAVAILABLE)
    }
}
