// Thin re-export module: the chain implementation lives in `ledger/chain.rs`
// so block structure and chain management can grow into separate submodules.

pub mod chain;
pub use chain::*;
