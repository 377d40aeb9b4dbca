//! SQL surface for LoamDB: a hand-written lexer and a recursive-descent
//! parser producing a small statement AST.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{
    ColumnDef, CompareOp, CreateTableStatement, DeleteStatement, FieldType, InsertStatement,
    JoinClause, Literal, SelectStatement, Statement, WhereClause,
};
pub use lexer::{Keyword, Lexer, Token};
pub use parser::{parse_statement, Parser};
