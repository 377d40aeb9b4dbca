//! Predicate filter over a child executor.

use crate::executor::Executor;
use crate::row::{Row, Schema, Value};
use loam_common::{LoamError, Result};
use loam_sql::{CompareOp, Literal, WhereClause};

/// Emits only the child rows satisfying a WHERE clause.
pub struct FilterExecutor<'a> {
    child: Box<dyn Executor + 'a>,
    schema: &'a Schema,
    clause: WhereClause,
}

impl<'a> FilterExecutor<'a> {
    pub fn new(child: Box<dyn Executor + 'a>, schema: &'a Schema, clause: WhereClause) -> Self {
        Self {
            child,
            schema,
            clause,
        }
    }
}

/// Evaluates `value op literal`; mismatched types never match.
pub(crate) fn matches(value: &Value, op: CompareOp, literal: &Literal) -> bool {
    match (value, literal) {
        (Value::Int(v), Literal::Int(l)) => match op {
            CompareOp::Eq => v == l,
            CompareOp::Lt => v < l,
            CompareOp::Gt => v > l,
        },
        (Value::Text(v), Literal::Text(l)) => match op {
            CompareOp::Eq => v == l,
            CompareOp::Lt => v.as_str() < l.as_str(),
            CompareOp::Gt => v.as_str() > l.as_str(),
        },
        _ => false,
    }
}

impl Executor for FilterExecutor<'_> {
    fn init(&mut self) -> Result<()> {
        self.child.init()
    }

    fn next(&mut self) -> Result<Option<Row>> {
        let column = self
            .schema
            .column_index(&self.clause.column)
            .ok_or_else(|| {
                LoamError::Execution(format!("unknown column '{}'", self.clause.column))
            })?;

        loop {
            let row = match self.child.next()? {
                Some(row) => row,
                None => return Ok(None),
            };
            if matches(&row.values[column], self.clause.op, &self.clause.value) {
                return Ok(Some(row));
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.child.close()
    }
}
