//! Sequential scan over a table heap.

use crate::executor::Executor;
use crate::row::{Row, Schema};
use loam_common::Result;
use loam_storage::{TableHeap, TableIter};

/// Scans every live tuple of the heap in page order, decoding rows.
pub struct SeqScanExecutor<'a> {
    schema: &'a Schema,
    iter: TableIter<'a>,
}

impl<'a> SeqScanExecutor<'a> {
    pub fn new(heap: &'a TableHeap, schema: &'a Schema) -> Self {
        Self {
            schema,
            iter: heap.iter(),
        }
    }
}

impl Executor for SeqScanExecutor<'_> {
    fn next(&mut self) -> Result<Option<Row>> {
        match self.iter.next() {
            Some(Ok((tuple, _rid))) => Ok(Some(Row::decode(&tuple, self.schema)?)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}
