pub mod orchestrator;
pub mod popup;
pub mod service;
pub mod tabs;

pub use orchestrator::{AnalysisState, InvocationReport, Orchestrator, RunOutcome};
pub use popup::PopupController;
pub use service::{BackgroundHandle, BackgroundService};
pub use tabs::{TabMessenger, TabRegistry};
