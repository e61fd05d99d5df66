mod commands;
mod history;

use crate::selection::Snapshot;

pub use crate::error::CommandError;
pub use commands::Edit;
pub use history::SelectionHistory;

/// Result type for history operations
pub type CommandResult = Result<(), CommandError>;

/// Result of applying an edit to a snapshot
pub type EditResult = Result<Snapshot, CommandError>;
