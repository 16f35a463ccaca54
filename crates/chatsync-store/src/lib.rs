pub mod directory;
pub mod log;
pub mod reconcile;
pub mod session;
pub mod store;

pub use directory::{RefreshOutcome, RefreshTicket, ThreadDirectory};
pub use log::{MessageLogCache, SyncOutcome, SyncTicket};
pub use reconcile::{merge, MergeReport, Merged, OrderPolicy};
pub use session::SessionState;
pub use store::ChatStore;
