//! Message consumption pipelines.
//!
//! Each pipeline drains its own delivery feed sequentially; the two run as
//! independent tasks sharing one [`ledger::LedgerStore`].

pub mod compensation;
pub mod update;

pub use compensation::CompensationPipeline;
pub use update::UpdatePipeline;
