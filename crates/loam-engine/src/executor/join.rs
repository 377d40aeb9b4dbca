//! Nested-loop join: for every left row, rescan the right heap.

use crate::executor::Executor;
use crate::row::{Row, Schema};
use loam_common::{LoamError, Result};
use loam_storage::{TableHeap, TableIter};

/// Equi-join of a child executor against a heap.
///
/// Pulls one left row at a time and walks the entire right heap for each,
/// emitting the concatenation whenever the join fields compare equal.
pub struct NestedLoopJoinExecutor<'a> {
    left: Box<dyn Executor + 'a>,
    left_schema: &'a Schema,
    right_heap: &'a TableHeap,
    right_schema: &'a Schema,
    left_field: String,
    right_field: String,
    current_left: Option<Row>,
    right_iter: Option<TableIter<'a>>,
}

impl<'a> NestedLoopJoinExecutor<'a> {
    pub fn new(
        left: Box<dyn Executor + 'a>,
        left_schema: &'a Schema,
        right_heap: &'a TableHeap,
        right_schema: &'a Schema,
        left_field: String,
        right_field: String,
    ) -> Self {
        Self {
            left,
            left_schema,
            right_heap,
            right_schema,
            left_field,
            right_field,
            current_left: None,
            right_iter: None,
        }
    }
}

impl Executor for NestedLoopJoinExecutor<'_> {
    fn init(&mut self) -> Result<()> {
        self.left.init()
    }

    fn next(&mut self) -> Result<Option<Row>> {
        let left_idx = self
            .left_schema
            .column_index(&self.left_field)
            .ok_or_else(|| {
                LoamError::Execution(format!("unknown join column '{}'", self.left_field))
            })?;
        let right_idx = self
            .right_schema
            .column_index(&self.right_field)
            .ok_or_else(|| {
                LoamError::Execution(format!("unknown join column '{}'", self.right_field))
            })?;

        loop {
            if self.current_left.is_none() {
                match self.left.next()? {
                    Some(row) => {
                        self.current_left = Some(row);
                        self.right_iter = Some(self.right_heap.iter());
                    }
                    None => return Ok(None),
                }
            }

            let step = match self.right_iter.as_mut() {
                Some(iter) => iter.next(),
                None => None,
            };
            match step {
                Some(Ok((tuple, _rid))) => {
                    let right_row = Row::decode(&tuple, self.right_schema)?;
                    if let Some(left_row) = &self.current_left {
                        if left_row.values[left_idx] == right_row.values[right_idx] {
                            let mut values = left_row.values.clone();
                            values.extend(right_row.values);
                            return Ok(Some(Row::new(values)));
                        }
                    }
                }
                Some(Err(e)) => return Err(e),
                None => {
                    // Right side exhausted: advance the left side.
                    self.current_left = None;
                    self.right_iter = None;
                }
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.left.close()
    }
}
