// core.rs splits the ledger into the block model, the chain itself, the
// linkage walk and the thread-safe handle.
pub mod block;
pub mod chain;
pub mod shared;
pub mod validation;

pub use block::*;
pub use chain::*;
pub use shared::*;
pub use validation::*;
