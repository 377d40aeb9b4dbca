//! Insert and delete executors.

use crate::executor::filter::matches;
use crate::executor::Executor;
use crate::row::{Row, Schema, Value};
use loam_common::{LoamError, Result};
use loam_storage::{BTreeIndex, TableHeap};
use loam_sql::WhereClause;

/// Primary-key insert: index probe, heap insert, index insert.
///
/// The probe must miss; finding the key is a uniqueness violation and
/// nothing is written. Emits the inserted row once, then `None`.
pub struct InsertExecutor<'a> {
    heap: &'a TableHeap,
    index: &'a mut BTreeIndex,
    schema: &'a Schema,
    row: Option<Row>,
}

impl<'a> InsertExecutor<'a> {
    pub fn new(
        heap: &'a TableHeap,
        index: &'a mut BTreeIndex,
        schema: &'a Schema,
        row: Row,
    ) -> Self {
        Self {
            heap,
            index,
            schema,
            row: Some(row),
        }
    }
}

impl Executor for InsertExecutor<'_> {
    fn next(&mut self) -> Result<Option<Row>> {
        let row = match self.row.take() {
            Some(row) => row,
            None => return Ok(None),
        };

        let key = row.key()?;
        match self.index.search(key) {
            Ok(_) => return Err(LoamError::DuplicateKey(key)),
            Err(LoamError::KeyNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let bytes = row.encode(self.schema)?;
        let rid = self.heap.insert_tuple(&bytes)?;
        self.index.insert(key, rid)?;

        Ok(Some(row))
    }
}

/// Delete by scan-and-match: tombstones every row satisfying the WHERE
/// clause (or every row when there is none).
///
/// The index is not updated; a stale index entry resolves to a missing
/// tuple on fetch. Emits a single row holding the deleted count.
pub struct DeleteExecutor<'a> {
    heap: &'a TableHeap,
    schema: &'a Schema,
    clause: Option<WhereClause>,
    done: bool,
}

impl<'a> DeleteExecutor<'a> {
    pub fn new(heap: &'a TableHeap, schema: &'a Schema, clause: Option<WhereClause>) -> Self {
        Self {
            heap,
            schema,
            clause,
            done: false,
        }
    }
}

impl Executor for DeleteExecutor<'_> {
    fn next(&mut self) -> Result<Option<Row>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;

        let column = match &self.clause {
            Some(clause) => Some(self.schema.column_index(&clause.column).ok_or_else(|| {
                LoamError::Execution(format!("unknown column '{}'", clause.column))
            })?),
            None => None,
        };

        // Collect victims first, then tombstone them.
        let mut victims = Vec::new();
        for item in self.heap.iter() {
            let (tuple, rid) = item?;
            let row = Row::decode(&tuple, self.schema)?;
            let hit = match (&self.clause, column) {
                (Some(clause), Some(idx)) => matches(&row.values[idx], clause.op, &clause.value),
                _ => true,
            };
            if hit {
                victims.push(rid);
            }
        }

        let mut deleted = 0i64;
        for rid in victims {
            if self.heap.delete_tuple(rid)? {
                deleted += 1;
            }
        }

        Ok(Some(Row::new(vec![Value::Int(deleted)])))
    }
}
