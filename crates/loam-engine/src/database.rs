//! Database facade: wires the storage stack together and executes
//! parsed statements against the single table.

use crate::executor::{
    DeleteExecutor, Executor, FilterExecutor, InsertExecutor, NestedLoopJoinExecutor,
    SeqScanExecutor,
};
use crate::row::{Row, Schema, Value};
use loam_common::{DatabaseConfig, LoamError, PageId, Result};
use loam_sql::{parse_statement, SelectStatement, Statement};
use loam_storage::{BTreeIndex, BufferPool, DiskManager, TableHeap};
use std::sync::Arc;

/// Result of executing one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// CREATE TABLE registered the schema.
    Created,
    /// INSERT stored one row.
    Inserted,
    /// SELECT produced rows.
    Rows(Vec<Row>),
    /// DELETE tombstoned this many rows.
    Deleted(i64),
}

/// A single-table database: one heap, one primary-key index, one schema.
///
/// The heap and index are created when the database opens; CREATE TABLE
/// attaches the schema. Durability is explicit: call `flush` to write
/// buffered pages out.
pub struct Database {
    pool: Arc<BufferPool>,
    heap: TableHeap,
    index: BTreeIndex,
    table: Option<(String, Schema)>,
}

impl Database {
    /// Opens (or creates) the database file and its storage stack.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;

        let disk = Arc::new(DiskManager::open(&config.path)?);
        let pool = Arc::new(BufferPool::new(config.buffer_pool_capacity, disk));
        let heap = TableHeap::new(Arc::clone(&pool), PageId::INVALID)?;
        let index = BTreeIndex::new(Arc::clone(&pool), PageId::INVALID)?;

        Ok(Self {
            pool,
            heap,
            index,
            table: None,
        })
    }

    /// Parses and executes one SQL statement.
    pub fn execute(&mut self, sql: &str) -> Result<QueryResult> {
        let statement = parse_statement(sql)?;
        self.execute_statement(statement)
    }

    /// Executes an already parsed statement.
    pub fn execute_statement(&mut self, statement: Statement) -> Result<QueryResult> {
        match statement {
            Statement::CreateTable(create) => {
                if self.table.is_some() {
                    return Err(LoamError::Execution("a table already exists".to_string()));
                }
                let schema = Schema::new(create.columns)?;
                self.table = Some((create.table, schema));
                Ok(QueryResult::Created)
            }
            Statement::Insert(insert) => {
                let schema = self.require_table(&insert.table)?;
                let values: Vec<Value> = insert.values.iter().map(Value::from_literal).collect();
                let row = Row::new(values);

                let mut exec = InsertExecutor::new(&self.heap, &mut self.index, &schema, row);
                exec.next()?;
                Ok(QueryResult::Inserted)
            }
            Statement::Select(select) => {
                let schema = self.require_table(&select.table)?;
                let rows = self.run_select(&select, &schema)?;
                Ok(QueryResult::Rows(rows))
            }
            Statement::Delete(delete) => {
                let schema = self.require_table(&delete.table)?;
                let mut exec = DeleteExecutor::new(&self.heap, &schema, delete.where_clause);
                let count = match exec.next()? {
                    Some(row) => match row.values.first() {
                        Some(Value::Int(n)) => *n,
                        _ => 0,
                    },
                    None => 0,
                };
                Ok(QueryResult::Deleted(count))
            }
        }
    }

    fn run_select(&self, select: &SelectStatement, schema: &Schema) -> Result<Vec<Row>> {
        // A join doubles the output columns; WHERE and projection resolve
        // against the plan's output schema.
        let joined_schema = match &select.join {
            Some(join) => {
                let known = self
                    .table
                    .as_ref()
                    .map(|(name, _)| name == &join.table)
                    .unwrap_or(false);
                if !known {
                    return Err(LoamError::Execution(format!(
                        "unknown table '{}'",
                        join.table
                    )));
                }
                let mut columns = schema.columns().to_vec();
                columns.extend(schema.columns().to_vec());
                Some(Schema::new(columns)?)
            }
            None => None,
        };
        let output_schema = joined_schema.as_ref().unwrap_or(schema);

        let mut plan: Box<dyn Executor + '_> = Box::new(SeqScanExecutor::new(&self.heap, schema));

        if let Some(join) = &select.join {
            plan = Box::new(NestedLoopJoinExecutor::new(
                plan,
                schema,
                &self.heap,
                schema,
                join.left_field.clone(),
                join.right_field.clone(),
            ));
        }

        if let Some(clause) = &select.where_clause {
            plan = Box::new(FilterExecutor::new(plan, output_schema, clause.clone()));
        }

        plan.init()?;
        let mut rows = Vec::new();
        while let Some(row) = plan.next()? {
            rows.push(project(row, select, output_schema)?);
        }
        plan.close()?;
        Ok(rows)
    }

    fn require_table(&self, name: &str) -> Result<Schema> {
        match &self.table {
            Some((table, schema)) if table == name => Ok(schema.clone()),
            Some((table, _)) => Err(LoamError::Execution(format!(
                "unknown table '{name}' (have '{table}')"
            ))),
            None => Err(LoamError::Execution("no table exists yet".to_string())),
        }
    }

    /// Direct access to the heap (tests and tooling).
    pub fn heap(&self) -> &TableHeap {
        &self.heap
    }

    /// Direct access to the index (tests and tooling).
    pub fn index(&self) -> &BTreeIndex {
        &self.index
    }

    /// Writes all buffered dirty pages to disk.
    pub fn flush(&self) -> Result<()> {
        self.pool.flush_all()
    }
}

/// Applies the SELECT field list to a row.
fn project(row: Row, select: &SelectStatement, schema: &Schema) -> Result<Row> {
    if select.fields.iter().any(|f| f == "*") {
        return Ok(row);
    }
    let mut values = Vec::with_capacity(select.fields.len());
    for field in &select.fields {
        let idx = schema
            .column_index(field)
            .ok_or_else(|| LoamError::Execution(format!("unknown column '{field}'")))?;
        values.push(row.values[idx].clone());
    }
    Ok(Row::new(values))
}
