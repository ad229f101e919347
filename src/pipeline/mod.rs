//! Pipeline entry points for refresh operations.
//!
//! - `RefreshJob::run`: One end-to-end events refresh
//! - `run_validate`: Check configuration and provider toggles
//! - `run_health`: Show persisted provider health

pub mod publish_guard;
pub mod refresh;
pub mod validate;

pub use publish_guard::{GuardResult, PublishGuard, PublishGuardConfig, withdraw_dead};
pub use refresh::{RefreshJob, RefreshOptions, print_summary};
pub use validate::{ProviderStatus, provider_statuses, run_health, run_validate};
