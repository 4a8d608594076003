//! # Application Module
//!
//! Application services orchestrating the domain and outbound ports.

pub mod locks;
pub mod orchestrator;
pub mod repository;
pub mod service;
pub mod view_model;

pub use locks::{ActionLockGuard, ActionLocks};
pub use orchestrator::ActionOrchestrator;
pub use repository::{CampaignRepository, RefreshCounts, RefreshStats};
pub use service::CampaignClient;
pub use view_model::{build_views, CampaignView};
