//! Execution engine for LoamDB.
//!
//! This crate provides:
//! - Row representation and the on-heap row codec
//! - Pull-model executors: scan, filter, nested-loop join, insert, delete
//! - The `Database` facade wiring parser, executors, and storage

pub mod database;
pub mod executor;
pub mod row;

pub use database::{Database, QueryResult};
pub use executor::{
    DeleteExecutor, Executor, FilterExecutor, InsertExecutor, NestedLoopJoinExecutor,
    SeqScanExecutor,
};
pub use row::{Row, Schema, Value};
