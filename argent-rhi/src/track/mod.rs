pub mod manager;
pub mod states;
pub mod table;
pub mod usage;

pub use manager::{InitialStateChange, ResourceStateManager, SafetyChecks, TrackingError};
pub use states::SubresourceStates;
pub use table::ResourceStateTable;
pub use usage::{UsageIndices, UsageSlot};
