mod merge;
mod sync;

pub use merge::cmd_merge;
pub use sync::{SyncArgs, cmd_sync};
