//! Pull-model (Volcano) executors over the storage core.
//!
//! Each executor yields rows one at a time through `next`; a plan is a
//! tree of executors pulling from their children.

mod dml;
mod filter;
mod join;
mod scan;

pub use dml::{DeleteExecutor, InsertExecutor};
pub use filter::FilterExecutor;
pub use join::NestedLoopJoinExecutor;
pub use scan::SeqScanExecutor;

use crate::row::Row;
use loam_common::Result;

/// Pull-model executor interface.
pub trait Executor {
    /// Prepares the executor. Default: nothing to do.
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Produces the next row, or `None` when exhausted.
    fn next(&mut self) -> Result<Option<Row>>;

    /// Releases resources. Default: nothing to do.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
