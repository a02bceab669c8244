pub mod inference;
pub mod intervals;
pub mod minutes;
pub mod policy;
pub mod tracker;

pub use inference::{reconstruct, Reconstruction, ReconstructStats};
pub use intervals::build_intervals;
pub use minutes::{audit_minutes, MinutesAuditRow};
pub use policy::{policy_for, LongestIdlePolicy, LowestPlayerIdPolicy, SwapChoice, SwapContext, SwapOutPolicy};
pub use tracker::CourtTracker;
