// Application layer: controllers driving the data service.
// AccountDirectory is the root; it owns Ledger and BulkEntry and refreshes
// balances when either signals a transaction mutation.

pub mod bulk;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod outcome;
pub mod signal;

pub use bulk::*;
pub use directory::*;
pub use error::*;
pub use ledger::*;
pub use outcome::*;
pub use signal::*;
