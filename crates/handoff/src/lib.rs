//! Hand-off to external apps and voice command routing.

pub mod intent;
pub mod launcher;
pub mod taxi;

pub use intent::{match_department, Command, CommandInterpreter, Department};
pub use launcher::{AppLauncher, DryRunLauncher, ExternalApp};
pub use taxi::{HandoffOutcome, TaxiHandoff};
