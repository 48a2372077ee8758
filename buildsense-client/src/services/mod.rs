pub mod debug_log;
pub mod maintenance_service;
pub mod merge;
pub mod store_service;
pub mod subscription;

pub use debug_log::{DebugListener, DebugLog};
pub use maintenance_service::{CleanupReport, MaintenanceService};
pub use merge::{BuildingMerger, MergeInput};
pub use store_service::StoreService;
pub use subscription::Subscription;
