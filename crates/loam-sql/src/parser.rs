//! Recursive-descent parser over the lexer's token stream.

use crate::ast::{
    ColumnDef, CompareOp, CreateTableStatement, DeleteStatement, FieldType, InsertStatement,
    JoinClause, Literal, SelectStatement, Statement, WhereClause,
};
use crate::lexer::{Keyword, Lexer, Token};
use loam_common::{LoamError, Result};

/// Recursive-descent parser with a current/peek token window.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    cur: Token,
    peek: Token,
}

impl<'a> Parser<'a> {
    /// Creates a parser over the input, priming the token window.
    pub fn new(input: &'a str) -> Result<Self> {
        let mut lexer = Lexer::new(input);
        let cur = lexer.next_token()?;
        let peek = lexer.next_token()?;
        Ok(Self { lexer, cur, peek })
    }

    /// Parses one statement.
    pub fn parse(&mut self) -> Result<Statement> {
        match self.cur {
            Token::Keyword(Keyword::Create) => self.parse_create().map(Statement::CreateTable),
            Token::Keyword(Keyword::Insert) => self.parse_insert().map(Statement::Insert),
            Token::Keyword(Keyword::Select) => self.parse_select().map(Statement::Select),
            Token::Keyword(Keyword::Delete) => self.parse_delete().map(Statement::Delete),
            ref other => Err(LoamError::Parse(format!("unexpected {other}"))),
        }
    }

    fn advance(&mut self) -> Result<()> {
        self.cur = std::mem::replace(&mut self.peek, self.lexer.next_token()?);
        Ok(())
    }

    fn expect_keyword(&mut self, kw: Keyword) -> Result<()> {
        if self.cur == Token::Keyword(kw) {
            self.advance()
        } else {
            Err(LoamError::Parse(format!(
                "expected {kw:?}, found {}",
                self.cur
            )))
        }
    }

    fn expect_symbol(&mut self, symbol: char) -> Result<()> {
        if self.cur == Token::Symbol(symbol) {
            self.advance()
        } else {
            Err(LoamError::Parse(format!(
                "expected '{symbol}', found {}",
                self.cur
            )))
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.cur.clone() {
            Token::Ident(name) => {
                self.advance()?;
                Ok(name)
            }
            other => Err(LoamError::Parse(format!(
                "expected identifier, found {other}"
            ))),
        }
    }

    /// `ident` or `ident.ident`, returned in dotted form.
    fn parse_qualified_name(&mut self) -> Result<String> {
        let mut name = self.expect_ident()?;
        if self.cur == Token::Symbol('.') {
            self.advance()?;
            let column = self.expect_ident()?;
            name = format!("{name}.{column}");
        }
        Ok(name)
    }

    fn parse_literal(&mut self) -> Result<Literal> {
        let lit = match &self.cur {
            Token::Integer(n) => Literal::Int(*n),
            Token::String(s) => Literal::Text(s.clone()),
            other => {
                return Err(LoamError::Parse(format!("expected literal, found {other}")));
            }
        };
        self.advance()?;
        Ok(lit)
    }

    // CREATE TABLE name (col type, ...)
    fn parse_create(&mut self) -> Result<CreateTableStatement> {
        self.expect_keyword(Keyword::Create)?;
        self.expect_keyword(Keyword::Table)?;
        let table = self.expect_ident()?;
        self.expect_symbol('(')?;

        let mut columns = Vec::new();
        loop {
            let name = self.expect_ident()?;
            let field_type = match self.cur {
                Token::Keyword(Keyword::Int) => FieldType::Int,
                Token::Keyword(Keyword::Varchar) => FieldType::Varchar,
                ref other => {
                    return Err(LoamError::Parse(format!(
                        "expected column type, found {other}"
                    )));
                }
            };
            self.advance()?;
            columns.push(ColumnDef { name, field_type });

            if self.cur == Token::Symbol(',') {
                self.advance()?;
            } else {
                break;
            }
        }
        self.expect_symbol(')')?;

        if columns.is_empty() {
            return Err(LoamError::Parse("table needs at least one column".to_string()));
        }
        Ok(CreateTableStatement { table, columns })
    }

    // INSERT INTO name VALUES (lit, ...)
    fn parse_insert(&mut self) -> Result<InsertStatement> {
        self.expect_keyword(Keyword::Insert)?;
        self.expect_keyword(Keyword::Into)?;
        let table = self.expect_ident()?;
        self.expect_keyword(Keyword::Values)?;
        self.expect_symbol('(')?;

        let mut values = Vec::new();
        loop {
            values.push(self.parse_literal()?);
            if self.cur == Token::Symbol(',') {
                self.advance()?;
            } else {
                break;
            }
        }
        self.expect_symbol(')')?;

        Ok(InsertStatement { table, values })
    }

    // SELECT fields FROM name [JOIN table ON a = b] [WHERE ...]
    fn parse_select(&mut self) -> Result<SelectStatement> {
        self.expect_keyword(Keyword::Select)?;

        let mut fields = Vec::new();
        loop {
            match &self.cur {
                Token::Symbol('*') => {
                    fields.push("*".to_string());
                    self.advance()?;
                }
                Token::Ident(_) => {
                    fields.push(self.parse_qualified_name()?);
                }
                other => {
                    return Err(LoamError::Parse(format!("expected field, found {other}")));
                }
            }
            if self.cur == Token::Symbol(',') {
                self.advance()?;
            } else {
                break;
            }
        }

        self.expect_keyword(Keyword::From)?;
        let table = self.expect_ident()?;

        let join = if self.cur == Token::Keyword(Keyword::Join) {
            self.advance()?;
            let join_table = self.expect_ident()?;
            self.expect_keyword(Keyword::On)?;
            let left_field = self.parse_qualified_name()?;
            self.expect_symbol('=')?;
            let right_field = self.parse_qualified_name()?;
            Some(JoinClause {
                table: join_table,
                left_field,
                right_field,
            })
        } else {
            None
        };

        let where_clause = self.parse_optional_where()?;

        Ok(SelectStatement {
            table,
            fields,
            join,
            where_clause,
        })
    }

    // DELETE FROM name [WHERE ...]
    fn parse_delete(&mut self) -> Result<DeleteStatement> {
        self.expect_keyword(Keyword::Delete)?;
        self.expect_keyword(Keyword::From)?;
        let table = self.expect_ident()?;
        let where_clause = self.parse_optional_where()?;
        Ok(DeleteStatement {
            table,
            where_clause,
        })
    }

    fn parse_optional_where(&mut self) -> Result<Option<WhereClause>> {
        if self.cur != Token::Keyword(Keyword::Where) {
            return Ok(None);
        }
        self.advance()?;

        let column = self.parse_qualified_name()?;
        let op = match self.cur {
            Token::Symbol('=') => CompareOp::Eq,
            Token::Symbol('<') => CompareOp::Lt,
            Token::Symbol('>') => CompareOp::Gt,
            ref other => {
                return Err(LoamError::Parse(format!(
                    "expected comparison operator, found {other}"
                )));
            }
        };
        self.advance()?;
        let value = self.parse_literal()?;

        Ok(Some(WhereClause { column, op, value }))
    }
}

/// Parses a single statement from the input text.
pub fn parse_statement(input: &str) -> Result<Statement> {
    Parser::new(input)?.parse()
}
