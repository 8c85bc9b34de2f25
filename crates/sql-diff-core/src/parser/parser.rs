//! Recursive descent parser for DDL.

use super::error::ParseError;
use crate::ast::{
    ColumnConstraint, ColumnConstraintDef, ColumnDef, CommentOnStatement, CommentTarget,
    CreateIndexStatement, CreateTableStatement, DataType, ForeignKeyRef, IndexColumn, IndexDef,
    IndexKind, LobSize, ObjectName, ReferentialAction, Statement, TableConstraint,
    TableConstraintDef, TableOption,
};
use crate::lexer::{Keyword, Lexer, Span, Token, TokenKind};

/// Parses every statement in `sql`.
///
/// # Errors
///
/// Returns a `ParseError` for malformed input or for constructs that cannot
/// be reduced to the schema model.
pub fn parse(sql: &str) -> Result<Vec<Statement>, ParseError> {
    Parser::new(sql).parse_statements()
}

/// A data type as parsed, before it is attached to a column.
struct ParsedType {
    data_type: DataType,
    text: String,
    /// `SERIAL` family: implies auto-increment.
    serial: bool,
}

/// DDL parser.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    input: &'a str,
    current: Token,
    previous: Token,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given input.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Self {
            lexer,
            input,
            current,
            previous: Token::new(TokenKind::Eof, Span::new(0, 0)),
        }
    }

    /// Parses all `;`-separated statements until end of input.
    ///
    /// # Errors
    ///
    /// Returns the first `ParseError` encountered.
    pub fn parse_statements(&mut self) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();
        loop {
            while self.check(&TokenKind::Semicolon) {
                self.advance();
            }
            if self.current.is_eof() {
                break;
            }
            statements.push(self.parse_statement()?);
            if !self.check(&TokenKind::Semicolon) && !self.current.is_eof() {
                return Err(self.unexpected("';' or end of input"));
            }
        }
        Ok(statements)
    }

    /// Parses a single DDL statement.
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` if the input is not a supported DDL statement.
    pub fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let start = self.current.span;
        if self.check_keyword(Keyword::Comment) {
            return Ok(Statement::CommentOn(self.parse_comment_on(start)?));
        }
        if !self.check_keyword(Keyword::Create) {
            return Err(match &self.current.kind {
                TokenKind::Error(message) => ParseError::new(message.clone(), self.current.span),
                _ => ParseError::unsupported(
                    "only CREATE TABLE, CREATE INDEX and COMMENT ON statements are supported",
                    self.current.span,
                ),
            });
        }
        self.advance();

        if self.check_word("OR") {
            return Err(ParseError::unsupported(
                "CREATE OR REPLACE",
                self.current.span,
            ));
        }

        let temporary =
            if self.check_keyword(Keyword::Temporary) || self.check_keyword(Keyword::Temp) {
                self.advance();
                true
            } else {
                false
            };

        match self.current.as_keyword() {
            Some(Keyword::Table) => {
                self.advance();
                Ok(Statement::CreateTable(
                    self.parse_create_table(start, temporary)?,
                ))
            }
            Some(Keyword::Unique | Keyword::Index | Keyword::Fulltext | Keyword::Spatial)
                if !temporary =>
            {
                Ok(Statement::CreateIndex(self.parse_create_index(start)?))
            }
            _ => Err(self.unexpected("TABLE or INDEX")),
        }
    }

    // ------------------------------------------------------------
    // CREATE TABLE
    // ------------------------------------------------------------

    fn parse_create_table(
        &mut self,
        start: Span,
        temporary: bool,
    ) -> Result<CreateTableStatement, ParseError> {
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.parse_object_name()?;

        if self.check_keyword(Keyword::Like) {
            return Err(ParseError::unsupported(
                "CREATE TABLE ... LIKE",
                self.current.span,
            ));
        }
        if self.check_keyword(Keyword::As) || self.check_keyword(Keyword::Select) {
            return Err(ParseError::unsupported(
                "CREATE TABLE ... AS SELECT",
                self.current.span,
            ));
        }

        self.expect(&TokenKind::LeftParen)?;
        let mut columns = Vec::new();
        let mut constraints = Vec::new();
        let mut indexes = Vec::new();
        loop {
            self.parse_table_element(&mut columns, &mut constraints, &mut indexes)?;
            if !self.continue_list() {
                break;
            }
        }
        self.expect(&TokenKind::RightParen)?;

        if columns.is_empty() {
            return Err(ParseError::new(
                format!("table {name} defines no columns"),
                start.to(self.previous.span),
            ));
        }

        let options = self.parse_table_options()?;

        Ok(CreateTableStatement {
            name,
            temporary,
            if_not_exists,
            columns,
            constraints,
            indexes,
            options,
            span: start.to(self.previous.span),
        })
    }

    fn parse_table_element(
        &mut self,
        columns: &mut Vec<ColumnDef>,
        constraints: &mut Vec<TableConstraintDef>,
        indexes: &mut Vec<IndexDef>,
    ) -> Result<(), ParseError> {
        let start = self.current.span;
        match self.current.as_keyword() {
            Some(Keyword::Constraint) => {
                self.advance();
                let name = if self.starts_constraint_body() {
                    None
                } else {
                    Some(self.expect_name()?)
                };
                let kind = self.parse_table_constraint_body()?;
                constraints.push(TableConstraintDef {
                    name,
                    kind,
                    span: start.to(self.previous.span),
                });
            }
            Some(Keyword::Primary | Keyword::Foreign | Keyword::Check) => {
                let kind = self.parse_table_constraint_body()?;
                constraints.push(TableConstraintDef {
                    name: None,
                    kind,
                    span: start.to(self.previous.span),
                });
            }
            Some(Keyword::Unique) => {
                self.advance();
                let keyed = self.check_keyword(Keyword::Key) || self.check_keyword(Keyword::Index);
                if keyed {
                    self.advance();
                }
                if keyed || !self.check(&TokenKind::LeftParen) {
                    indexes.push(self.parse_index_rest(start, IndexKind::Unique)?);
                } else {
                    let columns = self.parse_index_columns()?;
                    constraints.push(TableConstraintDef {
                        name: None,
                        kind: TableConstraint::Unique(columns),
                        span: start.to(self.previous.span),
                    });
                }
            }
            Some(Keyword::Index | Keyword::Key) => {
                self.advance();
                indexes.push(self.parse_index_rest(start, IndexKind::Plain)?);
            }
            Some(kw @ (Keyword::Fulltext | Keyword::Spatial)) => {
                self.advance();
                if self.check_keyword(Keyword::Key) || self.check_keyword(Keyword::Index) {
                    self.advance();
                }
                let kind = if kw == Keyword::Fulltext {
                    IndexKind::Fulltext
                } else {
                    IndexKind::Spatial
                };
                indexes.push(self.parse_index_rest(start, kind)?);
            }
            Some(Keyword::Like) => {
                return Err(ParseError::unsupported(
                    "LIKE inside CREATE TABLE",
                    self.current.span,
                ));
            }
            _ => columns.push(self.parse_column_def()?),
        }
        Ok(())
    }

    fn starts_constraint_body(&self) -> bool {
        matches!(
            self.current.as_keyword(),
            Some(Keyword::Primary | Keyword::Unique | Keyword::Foreign | Keyword::Check)
        )
    }

    /// Parses `PRIMARY KEY (...)`, `UNIQUE (...)`, `FOREIGN KEY (...)
    /// REFERENCES ...` or `CHECK (...)`.
    fn parse_table_constraint_body(&mut self) -> Result<TableConstraint, ParseError> {
        match self.current.as_keyword() {
            Some(Keyword::Primary) => {
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                self.parse_index_method()?;
                let columns = self.parse_index_columns()?;
                self.parse_index_method()?;
                Ok(TableConstraint::PrimaryKey(columns))
            }
            Some(Keyword::Unique) => {
                self.advance();
                if self.check_keyword(Keyword::Key) || self.check_keyword(Keyword::Index) {
                    self.advance();
                }
                if !self.check(&TokenKind::LeftParen) && !self.check_keyword(Keyword::Using) {
                    // MySQL repeats the name after UNIQUE KEY; the CONSTRAINT name wins.
                    self.expect_name()?;
                }
                self.parse_index_method()?;
                let columns = self.parse_index_columns()?;
                self.parse_index_method()?;
                Ok(TableConstraint::Unique(columns))
            }
            Some(Keyword::Foreign) => {
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                if !self.check(&TokenKind::LeftParen) {
                    self.expect_name()?;
                }
                let columns = self.parse_name_list()?;
                let references = self.parse_references()?;
                Ok(TableConstraint::ForeignKey {
                    columns,
                    references,
                })
            }
            Some(Keyword::Check) => {
                self.advance();
                let expression = self.parse_parenthesized_text()?;
                self.parse_check_enforcement()?;
                Ok(TableConstraint::Check(expression))
            }
            _ => Err(self.unexpected("PRIMARY KEY, UNIQUE, FOREIGN KEY or CHECK")),
        }
    }

    /// MySQL `[NOT] ENFORCED` after a CHECK.
    fn parse_check_enforcement(&mut self) -> Result<(), ParseError> {
        if self.check_word("ENFORCED") {
            self.advance();
        } else if self.check_keyword(Keyword::Not) {
            let span = self.current.span;
            self.advance();
            if self.check_word("ENFORCED") {
                return Err(ParseError::unsupported("NOT ENFORCED check", span));
            }
            return Err(self.unexpected("ENFORCED"));
        }
        Ok(())
    }

    /// Parses the part of an inline index after its introducing keywords.
    fn parse_index_rest(&mut self, start: Span, kind: IndexKind) -> Result<IndexDef, ParseError> {
        let name = if self.check(&TokenKind::LeftParen) || self.check_keyword(Keyword::Using) {
            None
        } else {
            Some(self.expect_name()?)
        };
        let mut method = self.parse_index_method()?;
        let columns = self.parse_index_columns()?;
        if method.is_none() {
            method = self.parse_index_method()?;
        }
        if self.check_keyword(Keyword::Comment) {
            return Err(ParseError::unsupported("index COMMENT", self.current.span));
        }
        Ok(IndexDef {
            name,
            kind,
            method,
            columns,
            span: start.to(self.previous.span),
        })
    }

    fn parse_index_method(&mut self) -> Result<Option<String>, ParseError> {
        if !self.check_keyword(Keyword::Using) {
            return Ok(None);
        }
        self.advance();
        let method = self.expect_word()?;
        Ok(Some(method.to_ascii_uppercase()))
    }

    /// Parses `(col [(len)] [ASC|DESC], ...)`.
    fn parse_index_columns(&mut self) -> Result<Vec<IndexColumn>, ParseError> {
        self.expect(&TokenKind::LeftParen)?;
        let mut columns = Vec::new();
        loop {
            if self.check(&TokenKind::LeftParen) {
                return Err(ParseError::unsupported(
                    "expression in index column list",
                    self.current.span,
                ));
            }
            let name = self.expect_name()?;
            let length = if self.check(&TokenKind::LeftParen) {
                self.advance();
                let TokenKind::Integer(n) = self.current.kind else {
                    return Err(ParseError::unsupported(
                        "expression in index column list",
                        self.current.span,
                    ));
                };
                let length = u32::try_from(n)
                    .map_err(|_| ParseError::new("prefix length too large", self.current.span))?;
                self.advance();
                self.expect(&TokenKind::RightParen)?;
                Some(length)
            } else {
                None
            };
            let descending = if self.check_keyword(Keyword::Desc) {
                self.advance();
                true
            } else {
                if self.check_keyword(Keyword::Asc) {
                    self.advance();
                }
                false
            };
            columns.push(IndexColumn {
                name,
                length,
                descending,
            });
            if !self.continue_list() {
                break;
            }
        }
        self.expect(&TokenKind::RightParen)?;
        Ok(columns)
    }

    /// Parses `REFERENCES table [(cols)] [ON DELETE a] [ON UPDATE a] ...`.
    fn parse_references(&mut self) -> Result<ForeignKeyRef, ParseError> {
        self.expect_keyword(Keyword::References)?;
        let table = self.parse_object_name()?;
        let columns = if self.check(&TokenKind::LeftParen) {
            self.parse_name_list()?
        } else {
            Vec::new()
        };

        let mut on_delete = None;
        let mut on_update = None;
        loop {
            match self.current.as_keyword() {
                Some(Keyword::On) => {
                    self.advance();
                    if self.check_keyword(Keyword::Delete) {
                        self.advance();
                        on_delete = Some(self.parse_referential_action()?);
                    } else if self.check_keyword(Keyword::Update) {
                        self.advance();
                        on_update = Some(self.parse_referential_action()?);
                    } else {
                        return Err(self.unexpected("DELETE or UPDATE"));
                    }
                }
                Some(Keyword::Match) => {
                    self.advance();
                    if self.check_keyword(Keyword::Simple) {
                        self.advance();
                    } else {
                        return Err(ParseError::unsupported(
                            "MATCH FULL / MATCH PARTIAL foreign keys",
                            self.current.span,
                        ));
                    }
                }
                Some(Keyword::Deferrable) => {
                    return Err(ParseError::unsupported(
                        "DEFERRABLE foreign keys",
                        self.current.span,
                    ));
                }
                Some(Keyword::Not) if self.peek_is_keyword(Keyword::Deferrable) => {
                    self.advance();
                    self.advance();
                }
                Some(Keyword::Initially) => {
                    self.advance();
                    if self.check_keyword(Keyword::Immediate) {
                        self.advance();
                    } else {
                        return Err(ParseError::unsupported(
                            "INITIALLY DEFERRED foreign keys",
                            self.current.span,
                        ));
                    }
                }
                _ => break,
            }
        }

        Ok(ForeignKeyRef {
            table,
            columns,
            on_delete,
            on_update,
        })
    }

    fn parse_referential_action(&mut self) -> Result<ReferentialAction, ParseError> {
        let action = match self.current.as_keyword() {
            Some(Keyword::Cascade) => ReferentialAction::Cascade,
            Some(Keyword::Restrict) => ReferentialAction::Restrict,
            Some(Keyword::Set) => {
                self.advance();
                if self.check_keyword(Keyword::Null) {
                    ReferentialAction::SetNull
                } else if self.check_keyword(Keyword::Default) {
                    ReferentialAction::SetDefault
                } else {
                    return Err(self.unexpected("NULL or DEFAULT"));
                }
            }
            Some(Keyword::No) => {
                self.advance();
                if !self.check_keyword(Keyword::Action) {
                    return Err(self.unexpected("ACTION"));
                }
                ReferentialAction::NoAction
            }
            _ => return Err(self.unexpected("CASCADE, RESTRICT, SET NULL, SET DEFAULT or NO ACTION")),
        };
        self.advance();
        Ok(action)
    }

    /// Parses trailing table options until `;` or end of input.
    fn parse_table_options(&mut self) -> Result<Vec<TableOption>, ParseError> {
        let mut options = Vec::new();
        loop {
            if self.check(&TokenKind::Comma) {
                self.advance();
                continue;
            }
            if self.check(&TokenKind::Semicolon) || self.current.is_eof() {
                break;
            }

            let name = match self.current.as_keyword() {
                Some(Keyword::Without) => {
                    self.advance();
                    self.expect_word_eq("ROWID")?;
                    options.push(TableOption {
                        name: "WITHOUT ROWID".to_string(),
                        value: None,
                    });
                    continue;
                }
                Some(Keyword::Partition) => {
                    return Err(ParseError::unsupported(
                        "table partitioning",
                        self.current.span,
                    ));
                }
                Some(Keyword::Default) => {
                    self.advance();
                    continue;
                }
                Some(Keyword::Character) => {
                    self.advance();
                    self.expect_keyword(Keyword::Set)?;
                    "CHARSET".to_string()
                }
                Some(Keyword::Charset) => {
                    self.advance();
                    "CHARSET".to_string()
                }
                _ if self.check_word("STRICT") => {
                    self.advance();
                    options.push(TableOption {
                        name: "STRICT".to_string(),
                        value: None,
                    });
                    continue;
                }
                _ if self.check_word("WITH") || self.check_word("INHERITS") => {
                    return Err(ParseError::unsupported(
                        "PostgreSQL storage parameters and inheritance",
                        self.current.span,
                    ));
                }
                _ => {
                    let word = self.expect_word()?;
                    word.to_ascii_uppercase()
                }
            };

            if self.check(&TokenKind::Eq) {
                self.advance();
            }
            let value = self.parse_option_value()?;
            options.push(TableOption {
                name,
                value: Some(value),
            });
        }
        Ok(options)
    }

    fn parse_option_value(&mut self) -> Result<String, ParseError> {
        let value = match &self.current.kind {
            TokenKind::String(s) | TokenKind::QuotedIdentifier(s) | TokenKind::Identifier(s) => {
                s.clone()
            }
            TokenKind::Keyword(kw) => kw.as_str().to_string(),
            TokenKind::Integer(n) => n.to_string(),
            _ => return Err(self.unexpected("table option value")),
        };
        self.advance();
        Ok(value)
    }

    // ------------------------------------------------------------
    // Columns
    // ------------------------------------------------------------

    fn parse_column_def(&mut self) -> Result<ColumnDef, ParseError> {
        let start = self.current.span;
        let name = self.expect_name()?;
        let parsed = self.parse_data_type()?;

        let mut unsigned = false;
        let mut charset = None;
        let mut collation = None;
        let mut constraints = Vec::new();
        if parsed.serial {
            constraints.push(ColumnConstraintDef {
                name: None,
                kind: ColumnConstraint::AutoIncrement,
                span: start,
            });
        }

        loop {
            let clause_start = self.current.span;
            match self.current.as_keyword() {
                Some(Keyword::Unsigned) => {
                    self.advance();
                    unsigned = true;
                }
                Some(Keyword::Zerofill) => {
                    self.advance();
                    unsigned = true;
                }
                Some(Keyword::Signed) => self.advance(),
                Some(Keyword::Character) => {
                    self.advance();
                    self.expect_keyword(Keyword::Set)?;
                    charset = Some(self.expect_word()?);
                }
                Some(Keyword::Charset) => {
                    self.advance();
                    charset = Some(self.expect_word()?);
                }
                Some(Keyword::Collate) => {
                    self.advance();
                    collation = Some(self.parse_option_value()?);
                }
                Some(Keyword::Constraint) => {
                    self.advance();
                    let constraint_name = self.expect_name()?;
                    let Some(kind) = self.parse_column_constraint()? else {
                        return Err(self.unexpected("constraint after CONSTRAINT name"));
                    };
                    constraints.push(ColumnConstraintDef {
                        name: Some(constraint_name),
                        kind,
                        span: clause_start.to(self.previous.span),
                    });
                }
                Some(Keyword::As) => {
                    return Err(ParseError::unsupported(
                        "generated column",
                        self.current.span,
                    ));
                }
                _ => match self.parse_column_constraint()? {
                    Some(kind) => constraints.push(ColumnConstraintDef {
                        name: None,
                        kind,
                        span: clause_start.to(self.previous.span),
                    }),
                    None => break,
                },
            }
        }

        if !self.check(&TokenKind::Comma) && !self.check(&TokenKind::RightParen) {
            return Err(self.unexpected(&format!("',' or ')' after column {name}")));
        }

        Ok(ColumnDef {
            name,
            data_type: parsed.data_type,
            type_text: parsed.text,
            unsigned,
            charset,
            collation,
            constraints,
            span: start.to(self.previous.span),
        })
    }

    /// Parses one column constraint, or returns `None` if the current token
    /// does not start one.
    fn parse_column_constraint(&mut self) -> Result<Option<ColumnConstraint>, ParseError> {
        let constraint = match self.current.as_keyword() {
            Some(Keyword::Not) => {
                self.advance();
                self.expect_keyword(Keyword::Null)?;
                ColumnConstraint::NotNull
            }
            Some(Keyword::Null) => {
                self.advance();
                ColumnConstraint::Null
            }
            Some(Keyword::Default) => {
                self.advance();
                ColumnConstraint::Default(self.capture_expression()?)
            }
            Some(Keyword::Primary) => {
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                if self.check_keyword(Keyword::Asc) || self.check_keyword(Keyword::Desc) {
                    self.advance();
                }
                ColumnConstraint::PrimaryKey
            }
            Some(Keyword::Key) => {
                self.advance();
                ColumnConstraint::PrimaryKey
            }
            Some(Keyword::Unique) => {
                self.advance();
                if self.check_keyword(Keyword::Key) {
                    self.advance();
                }
                ColumnConstraint::Unique
            }
            Some(Keyword::AutoIncrement | Keyword::Autoincrement) => {
                self.advance();
                ColumnConstraint::AutoIncrement
            }
            Some(Keyword::Generated) => {
                self.parse_identity()?;
                ColumnConstraint::AutoIncrement
            }
            Some(Keyword::Identity) => {
                self.advance();
                if self.check(&TokenKind::LeftParen) {
                    self.parse_parenthesized_text()?;
                }
                ColumnConstraint::AutoIncrement
            }
            Some(Keyword::Comment) => {
                self.advance();
                ColumnConstraint::Comment(self.expect_string()?)
            }
            Some(Keyword::References) => ColumnConstraint::References(self.parse_references()?),
            Some(Keyword::Check) => {
                self.advance();
                let expression = self.parse_parenthesized_text()?;
                self.parse_check_enforcement()?;
                ColumnConstraint::Check(expression)
            }
            Some(Keyword::On) => {
                self.advance();
                self.expect_keyword(Keyword::Update)?;
                ColumnConstraint::OnUpdate(self.capture_expression()?)
            }
            _ => return Ok(None),
        };
        Ok(Some(constraint))
    }

    /// `GENERATED {ALWAYS | BY DEFAULT} AS IDENTITY [(options)]`.
    fn parse_identity(&mut self) -> Result<(), ParseError> {
        let span = self.current.span;
        self.expect_keyword(Keyword::Generated)?;
        if self.check_keyword(Keyword::Always) {
            self.advance();
        } else {
            self.expect_keyword(Keyword::By)?;
            self.expect_keyword(Keyword::Default)?;
        }
        self.expect_keyword(Keyword::As)?;
        if !self.check_keyword(Keyword::Identity) {
            return Err(ParseError::unsupported("generated column", span));
        }
        self.advance();
        if self.check(&TokenKind::LeftParen) {
            self.parse_parenthesized_text()?;
        }
        Ok(())
    }

    fn parse_data_type(&mut self) -> Result<ParsedType, ParseError> {
        let start = self.current.span;
        let Some(word) = self.current.word().map(str::to_ascii_uppercase) else {
            return Err(self.unexpected("data type"));
        };
        self.advance();

        let mut serial = false;
        let mut data_type = match word.as_str() {
            "TINYINT" | "INT1" => DataType::Tinyint(self.parse_optional_length()?),
            "SMALLINT" | "INT2" => DataType::Smallint(self.parse_optional_length()?),
            "MEDIUMINT" | "MIDDLEINT" | "INT3" => {
                DataType::Mediumint(self.parse_optional_length()?)
            }
            "INT" | "INTEGER" | "INT4" => DataType::Integer(self.parse_optional_length()?),
            "BIGINT" | "INT8" => DataType::Bigint(self.parse_optional_length()?),
            "SMALLSERIAL" | "SERIAL2" => {
                serial = true;
                DataType::Smallint(None)
            }
            "SERIAL" | "SERIAL4" => {
                serial = true;
                DataType::Integer(None)
            }
            "BIGSERIAL" | "SERIAL8" => {
                serial = true;
                DataType::Bigint(None)
            }
            "BOOL" | "BOOLEAN" => DataType::Boolean,
            "DECIMAL" | "NUMERIC" | "DEC" | "FIXED" => {
                let (precision, scale) = self.parse_optional_precision_scale()?;
                DataType::Decimal { precision, scale }
            }
            "FLOAT" => match self.parse_optional_precision_scale()? {
                (precision, None) => DataType::Float(precision),
                (precision, Some(s)) => {
                    DataType::Custom(format!("FLOAT({},{s})", precision.unwrap_or_default()))
                }
            },
            "REAL" | "FLOAT4" => DataType::Real,
            "FLOAT8" => DataType::Double,
            "DOUBLE" => {
                if self.check_word("PRECISION") {
                    self.advance();
                }
                match self.parse_optional_precision_scale()? {
                    (None, _) => DataType::Double,
                    (Some(p), Some(s)) => DataType::Custom(format!("DOUBLE({p},{s})")),
                    (Some(p), None) => DataType::Custom(format!("DOUBLE({p})")),
                }
            }
            "CHAR" | "CHARACTER" | "NCHAR" | "BPCHAR" => {
                if self.check_word("VARYING") {
                    self.advance();
                    DataType::Varchar(self.parse_optional_length()?)
                } else {
                    DataType::Char(self.parse_optional_length()?)
                }
            }
            "VARCHAR" | "NVARCHAR" | "VARCHAR2" => DataType::Varchar(self.parse_optional_length()?),
            "TINYTEXT" => DataType::Text(LobSize::Tiny),
            "TEXT" | "CLOB" => DataType::Text(LobSize::Regular),
            "MEDIUMTEXT" => DataType::Text(LobSize::Medium),
            "LONGTEXT" => DataType::Text(LobSize::Long),
            "ENUM" => DataType::Enum(self.parse_string_list()?),
            "SET" => DataType::Set(self.parse_string_list()?),
            "BINARY" => DataType::Binary(self.parse_optional_length()?),
            "VARBINARY" => DataType::Varbinary(self.parse_optional_length()?),
            "BYTEA" => DataType::Varbinary(None),
            "TINYBLOB" => DataType::Blob(LobSize::Tiny),
            "BLOB" => DataType::Blob(LobSize::Regular),
            "MEDIUMBLOB" => DataType::Blob(LobSize::Medium),
            "LONGBLOB" => DataType::Blob(LobSize::Long),
            "DATE" => DataType::Date,
            "TIME" | "TIMETZ" => {
                let precision = self.parse_optional_length()?;
                let with_time_zone = word == "TIMETZ" || self.parse_time_zone_suffix()?;
                DataType::Time {
                    precision,
                    with_time_zone,
                }
            }
            "TIMESTAMP" | "TIMESTAMPTZ" => {
                let precision = self.parse_optional_length()?;
                let with_time_zone = word == "TIMESTAMPTZ" || self.parse_time_zone_suffix()?;
                DataType::Timestamp {
                    precision,
                    with_time_zone,
                }
            }
            "DATETIME" => DataType::Datetime(self.parse_optional_length()?),
            "YEAR" => {
                self.parse_optional_length()?;
                DataType::Year
            }
            "JSON" => DataType::Json,
            "UUID" => DataType::Uuid,
            _ => {
                if self.check(&TokenKind::LeftParen) {
                    let args = self.parse_parenthesized_text()?;
                    DataType::Custom(format!("{word}({})", collapse_whitespace(&args)))
                } else {
                    DataType::Custom(word)
                }
            }
        };

        while self.check(&TokenKind::LeftBracket) {
            self.advance();
            if matches!(self.current.kind, TokenKind::Integer(_)) {
                self.advance();
            }
            self.expect(&TokenKind::RightBracket)?;
            data_type = DataType::Array(Box::new(data_type));
        }

        let text = start
            .to(self.previous.span)
            .slice(self.input)
            .map_or_else(|| data_type.to_sql(), collapse_whitespace);

        Ok(ParsedType {
            data_type,
            text,
            serial,
        })
    }

    /// `WITH TIME ZONE` / `WITHOUT TIME ZONE` after TIME or TIMESTAMP.
    fn parse_time_zone_suffix(&mut self) -> Result<bool, ParseError> {
        let with = if self.check_word("WITH") {
            true
        } else if self.check_keyword(Keyword::Without) {
            false
        } else {
            return Ok(false);
        };
        self.advance();
        self.expect_word_eq("TIME")?;
        self.expect_word_eq("ZONE")?;
        Ok(with)
    }

    /// Parses optional `(n)`.
    fn parse_optional_length(&mut self) -> Result<Option<u32>, ParseError> {
        if !self.check(&TokenKind::LeftParen) {
            return Ok(None);
        }
        self.advance();
        let length = self.expect_u32("length")?;
        self.expect(&TokenKind::RightParen)?;
        Ok(Some(length))
    }

    /// Parses optional `(p)` or `(p, s)`.
    fn parse_optional_precision_scale(
        &mut self,
    ) -> Result<(Option<u32>, Option<u32>), ParseError> {
        if !self.check(&TokenKind::LeftParen) {
            return Ok((None, None));
        }
        self.advance();
        let precision = self.expect_u32("precision")?;
        let scale = if self.check(&TokenKind::Comma) {
            self.advance();
            Some(self.expect_u32("scale")?)
        } else {
            None
        };
        self.expect(&TokenKind::RightParen)?;
        Ok((Some(precision), scale))
    }

    /// Parses `('a', 'b', ...)` for ENUM and SET.
    fn parse_string_list(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect(&TokenKind::LeftParen)?;
        let mut values = Vec::new();
        loop {
            values.push(self.expect_string()?);
            if !self.continue_list() {
                break;
            }
        }
        self.expect(&TokenKind::RightParen)?;
        Ok(values)
    }

    // ------------------------------------------------------------
    // CREATE INDEX / COMMENT ON
    // ------------------------------------------------------------

    fn parse_create_index(&mut self, start: Span) -> Result<CreateIndexStatement, ParseError> {
        let mut unique = false;
        let mut method = None;
        match self.current.as_keyword() {
            Some(Keyword::Unique) => {
                unique = true;
                self.advance();
            }
            Some(Keyword::Fulltext) => {
                method = Some("FULLTEXT".to_string());
                self.advance();
            }
            Some(Keyword::Spatial) => {
                method = Some("SPATIAL".to_string());
                self.advance();
            }
            _ => {}
        }
        self.expect_keyword(Keyword::Index)?;
        if self.check_word("CONCURRENTLY") {
            self.advance();
        }
        self.parse_if_not_exists()?;

        if self.check_keyword(Keyword::On) {
            return Err(ParseError::new(
                "index name is required",
                self.current.span,
            ));
        }
        let name = self.expect_name()?;
        if let Some(m) = self.parse_index_method()? {
            method = Some(m);
        }
        self.expect_keyword(Keyword::On)?;
        let table = self.parse_object_name()?;
        if let Some(m) = self.parse_index_method()? {
            method = Some(m);
        }
        let columns = self.parse_index_columns()?;
        if let Some(m) = self.parse_index_method()? {
            method = Some(m);
        }
        if self.check_word("WHERE") || self.check_word("INCLUDE") {
            return Err(ParseError::unsupported(
                "partial or covering index",
                self.current.span,
            ));
        }

        Ok(CreateIndexStatement {
            name,
            table,
            unique,
            method,
            columns,
            span: start.to(self.previous.span),
        })
    }

    fn parse_comment_on(&mut self, start: Span) -> Result<CommentOnStatement, ParseError> {
        self.expect_keyword(Keyword::Comment)?;
        self.expect_keyword(Keyword::On)?;
        let target = match self.current.as_keyword() {
            Some(Keyword::Table) => {
                self.advance();
                CommentTarget::Table(self.parse_object_name()?)
            }
            Some(Keyword::Column) => {
                self.advance();
                let mut parts = vec![self.expect_name()?];
                while self.check(&TokenKind::Dot) {
                    self.advance();
                    parts.push(self.expect_name()?);
                }
                let column = match parts.len() {
                    2 | 3 => parts.pop().unwrap_or_default(),
                    _ => {
                        return Err(ParseError::new(
                            "COMMENT ON COLUMN needs table.column",
                            start.to(self.previous.span),
                        ));
                    }
                };
                let name = parts.pop().unwrap_or_default();
                let schema = parts.pop();
                CommentTarget::Column {
                    table: ObjectName { schema, name },
                    column,
                }
            }
            _ => {
                return Err(ParseError::unsupported(
                    "COMMENT ON objects other than tables and columns",
                    self.current.span,
                ));
            }
        };
        self.expect_keyword(Keyword::Is)?;
        let comment = if self.check_keyword(Keyword::Null) {
            self.advance();
            None
        } else {
            Some(self.expect_string()?)
        };
        Ok(CommentOnStatement {
            target,
            comment,
            span: start.to(self.previous.span),
        })
    }

    // ------------------------------------------------------------
    // Shared pieces
    // ------------------------------------------------------------

    fn parse_if_not_exists(&mut self) -> Result<bool, ParseError> {
        if !self.check_keyword(Keyword::If) {
            return Ok(false);
        }
        self.advance();
        self.expect_keyword(Keyword::Not)?;
        self.expect_keyword(Keyword::Exists)?;
        Ok(true)
    }

    fn parse_object_name(&mut self) -> Result<ObjectName, ParseError> {
        let first = self.expect_name()?;
        if self.check(&TokenKind::Dot) {
            self.advance();
            let name = self.expect_name()?;
            return Ok(ObjectName {
                schema: Some(first),
                name,
            });
        }
        Ok(ObjectName::bare(first))
    }

    /// Parses `(a, b, ...)`.
    fn parse_name_list(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect(&TokenKind::LeftParen)?;
        let mut names = Vec::new();
        loop {
            names.push(self.expect_name()?);
            if !self.continue_list() {
                break;
            }
        }
        self.expect(&TokenKind::RightParen)?;
        Ok(names)
    }

    /// Captures a balanced `( ... )` group and returns the inner text.
    fn parse_parenthesized_text(&mut self) -> Result<String, ParseError> {
        let open = self.current.span;
        self.expect(&TokenKind::LeftParen)?;
        let mut depth = 0usize;
        loop {
            match &self.current.kind {
                TokenKind::Eof => return Err(self.unexpected("')'")),
                TokenKind::Error(message) => {
                    return Err(ParseError::new(message.clone(), self.current.span));
                }
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen if depth == 0 => break,
                TokenKind::RightParen => depth -= 1,
                _ => {}
            }
            self.advance();
        }
        let close = self.current.span;
        self.advance();
        Ok(self.input[open.end..close.start].trim().to_string())
    }

    /// Captures a DEFAULT or ON UPDATE expression verbatim, up to the next
    /// column clause, `,` or the closing `)` of the table body.
    fn capture_expression(&mut self) -> Result<String, ParseError> {
        let start = self.current.span.start;
        let mut end = start;
        let mut depth = 0usize;
        let mut consumed = 0usize;
        let mut after_cast = false;
        loop {
            match &self.current.kind {
                TokenKind::Eof | TokenKind::Semicolon => break,
                TokenKind::Error(message) => {
                    return Err(ParseError::new(message.clone(), self.current.span));
                }
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen if depth == 0 => break,
                TokenKind::RightParen => depth -= 1,
                TokenKind::Comma if depth == 0 => break,
                TokenKind::Keyword(kw)
                    if depth == 0 && consumed > 0 && !after_cast && starts_column_clause(*kw) =>
                {
                    break;
                }
                _ => {}
            }
            after_cast = matches!(self.current.kind, TokenKind::DoubleColon);
            end = self.current.span.end;
            consumed += 1;
            self.advance();
        }
        if consumed == 0 {
            return Err(self.unexpected("expression"));
        }
        Ok(self.input[start..end].to_string())
    }

    // --- Helper methods ---

    /// Advances to the next token.
    fn advance(&mut self) {
        self.previous = std::mem::replace(&mut self.current, self.lexer.next_token());
    }

    /// Checks if the current token matches the given kind.
    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    /// Checks if the current token is the given keyword.
    fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(&self.current.kind, TokenKind::Keyword(kw) if *kw == keyword)
    }

    /// Checks if the current token is the unquoted word `word`.
    fn check_word(&self, word: &str) -> bool {
        matches!(&self.current.kind, TokenKind::Identifier(name) if name.eq_ignore_ascii_case(word))
    }

    /// Looks one token ahead for a keyword without consuming anything.
    fn peek_is_keyword(&self, keyword: Keyword) -> bool {
        self.lexer.clone().next_token().as_keyword() == Some(keyword)
    }

    /// Consumes a `,` separator, returning whether one was present.
    fn continue_list(&mut self) -> bool {
        if self.check(&TokenKind::Comma) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match &self.current.kind {
            TokenKind::Error(message) => ParseError::new(message.clone(), self.current.span),
            found => ParseError::unexpected(expected, found, self.current.span),
        }
    }

    /// Expects the current token to be the given kind.
    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&kind.describe()))
        }
    }

    /// Expects the current token to be the given keyword.
    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), ParseError> {
        if self.check_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(keyword.as_str()))
        }
    }

    /// Expects an object name: an identifier, a quoted identifier, or a
    /// non-reserved keyword (returned as written).
    fn expect_name(&mut self) -> Result<String, ParseError> {
        let name = match &self.current.kind {
            TokenKind::Identifier(name) | TokenKind::QuotedIdentifier(name) => name.clone(),
            TokenKind::Keyword(kw) if !kw.is_reserved() => self
                .current
                .span
                .slice(self.input)
                .unwrap_or(kw.as_str())
                .to_string(),
            _ => return Err(self.unexpected("identifier")),
        };
        self.advance();
        Ok(name)
    }

    /// Expects any word (identifier or keyword) and returns it as written.
    fn expect_word(&mut self) -> Result<String, ParseError> {
        let word = match &self.current.kind {
            TokenKind::Identifier(name) | TokenKind::QuotedIdentifier(name) => name.clone(),
            TokenKind::Keyword(kw) => kw.as_str().to_string(),
            _ => return Err(self.unexpected("word")),
        };
        self.advance();
        Ok(word)
    }

    fn expect_word_eq(&mut self, word: &str) -> Result<(), ParseError> {
        if self.check_word(word) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(word))
        }
    }

    fn expect_string(&mut self) -> Result<String, ParseError> {
        match &self.current.kind {
            TokenKind::String(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            _ => Err(self.unexpected("string literal")),
        }
    }

    fn expect_u32(&mut self, what: &str) -> Result<u32, ParseError> {
        match self.current.kind {
            TokenKind::Integer(n) => {
                let value = u32::try_from(n)
                    .map_err(|_| ParseError::new(format!("{what} out of range"), self.current.span))?;
                self.advance();
                Ok(value)
            }
            _ => Err(self.unexpected(what)),
        }
    }
}

/// Keywords that end a captured DEFAULT / ON UPDATE expression.
const fn starts_column_clause(keyword: Keyword) -> bool {
    matches!(
        keyword,
        Keyword::Not
            | Keyword::Null
            | Keyword::Default
            | Keyword::Primary
            | Keyword::Key
            | Keyword::Unique
            | Keyword::References
            | Keyword::Check
            | Keyword::Constraint
            | Keyword::Comment
            | Keyword::Collate
            | Keyword::Character
            | Keyword::Charset
            | Keyword::AutoIncrement
            | Keyword::Autoincrement
            | Keyword::Generated
            | Keyword::On
    )
}

/// Collapses runs of whitespace into single spaces.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_table(sql: &str) -> CreateTableStatement {
        match parse(sql).unwrap().remove(0) {
            Statement::CreateTable(t) => t,
            other => panic!("expected CREATE TABLE, got {other:?}"),
        }
    }

    #[test]
    fn test_simple_create_table() {
        let t = create_table("CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(100))");
        assert_eq!(t.name, ObjectName::bare("users"));
        assert_eq!(t.columns.len(), 2);
        assert_eq!(t.columns[1].data_type, DataType::Varchar(Some(100)));
        assert_eq!(t.columns[1].type_text, "VARCHAR(100)");
        assert_eq!(t.columns[0].constraints[0].kind, ColumnConstraint::PrimaryKey);
    }

    #[test]
    fn test_default_capture_stops_at_next_clause() {
        let t = create_table(
            "CREATE TABLE t (a TIMESTAMP DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP, \
             b VARCHAR(10) DEFAULT 'x'::character varying NOT NULL, c INT DEFAULT -1)",
        );
        let kinds: Vec<_> = t.columns[0].constraints.iter().map(|c| &c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                &ColumnConstraint::Default("CURRENT_TIMESTAMP".to_string()),
                &ColumnConstraint::OnUpdate("CURRENT_TIMESTAMP".to_string()),
            ]
        );
        assert_eq!(
            t.columns[1].constraints[0].kind,
            ColumnConstraint::Default("'x'::character varying".to_string())
        );
        assert_eq!(t.columns[1].constraints[1].kind, ColumnConstraint::NotNull);
        assert_eq!(
            t.columns[2].constraints[0].kind,
            ColumnConstraint::Default("-1".to_string())
        );
    }

    #[test]
    fn test_mysql_table_with_keys_and_options() {
        let t = create_table(
            "CREATE TABLE `orders` (
                `id` BIGINT(20) UNSIGNED NOT NULL AUTO_INCREMENT,
                `user_id` INT NOT NULL COMMENT 'owner',
                `sku` VARCHAR(32) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin,
                PRIMARY KEY (`id`),
                UNIQUE KEY `uk_sku` (`sku`),
                KEY `idx_user` (`user_id`) USING BTREE,
                CONSTRAINT `fk_user` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`) ON DELETE CASCADE
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COMMENT='orders'",
        );
        assert!(t.columns[0].unsigned);
        assert_eq!(t.columns[0].data_type, DataType::Bigint(Some(20)));
        assert_eq!(t.columns[2].charset.as_deref(), Some("utf8mb4"));
        assert_eq!(t.columns[2].collation.as_deref(), Some("utf8mb4_bin"));
        assert_eq!(t.indexes.len(), 2);
        assert_eq!(t.indexes[0].kind, IndexKind::Unique);
        assert_eq!(t.indexes[1].method.as_deref(), Some("BTREE"));
        assert_eq!(t.constraints.len(), 2);
        assert_eq!(t.constraints[1].name.as_deref(), Some("fk_user"));
        assert_eq!(
            t.options,
            vec![
                TableOption {
                    name: "ENGINE".into(),
                    value: Some("InnoDB".into())
                },
                TableOption {
                    name: "CHARSET".into(),
                    value: Some("utf8mb4".into())
                },
                TableOption {
                    name: "COMMENT".into(),
                    value: Some("orders".into())
                },
            ]
        );
    }

    #[test]
    fn test_postgres_types_and_identity() {
        let t = create_table(
            "CREATE TABLE public.events (
                id BIGINT GENERATED BY DEFAULT AS IDENTITY,
                seq SERIAL,
                at TIMESTAMP(3) WITH TIME ZONE,
                tags TEXT[],
                payload JSONB
            )",
        );
        assert_eq!(t.name.schema.as_deref(), Some("public"));
        assert_eq!(
            t.columns[0].constraints[0].kind,
            ColumnConstraint::AutoIncrement
        );
        assert_eq!(t.columns[1].data_type, DataType::Integer(None));
        assert_eq!(
            t.columns[1].constraints[0].kind,
            ColumnConstraint::AutoIncrement
        );
        assert_eq!(
            t.columns[2].data_type,
            DataType::Timestamp {
                precision: Some(3),
                with_time_zone: true
            }
        );
        assert_eq!(
            t.columns[3].data_type,
            DataType::Array(Box::new(DataType::Text(LobSize::Regular)))
        );
        assert_eq!(t.columns[4].data_type, DataType::Custom("JSONB".into()));
    }

    #[test]
    fn test_unique_constraint_vs_unique_index() {
        let t = create_table("CREATE TABLE t (a INT, b INT, UNIQUE (a), UNIQUE KEY uk_b (b))");
        assert_eq!(t.constraints.len(), 1);
        assert!(matches!(t.constraints[0].kind, TableConstraint::Unique(_)));
        assert_eq!(t.indexes.len(), 1);
        assert_eq!(t.indexes[0].name.as_deref(), Some("uk_b"));
    }

    #[test]
    fn test_keyword_column_names() {
        let t = create_table("CREATE TABLE t (comment TEXT, action INT, \"key\" INT)");
        let names: Vec<_> = t.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["comment", "action", "key"]);
    }

    #[test]
    fn test_create_index_and_comment_on() {
        let statements = parse(
            "CREATE UNIQUE INDEX idx_email ON users USING btree (email DESC);
             COMMENT ON COLUMN public.users.email IS 'login';
             COMMENT ON TABLE users IS NULL;",
        )
        .unwrap();
        assert_eq!(statements.len(), 3);
        let Statement::CreateIndex(index) = &statements[0] else {
            panic!("expected CREATE INDEX");
        };
        assert!(index.unique);
        assert_eq!(index.method.as_deref(), Some("BTREE"));
        assert!(index.columns[0].descending);
        let Statement::CommentOn(comment) = &statements[1] else {
            panic!("expected COMMENT ON");
        };
        assert_eq!(
            comment.target,
            CommentTarget::Column {
                table: ObjectName {
                    schema: Some("public".into()),
                    name: "users".into()
                },
                column: "email".into()
            }
        );
        let Statement::CommentOn(table_comment) = &statements[2] else {
            panic!("expected COMMENT ON");
        };
        assert_eq!(table_comment.comment, None);
    }

    #[test]
    fn test_sqlite_flags() {
        let t = create_table(
            "CREATE TABLE kv (k TEXT PRIMARY KEY, v BLOB) WITHOUT ROWID, STRICT",
        );
        let names: Vec<_> = t.options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["WITHOUT ROWID", "STRICT"]);
    }

    #[test]
    fn test_unsupported_constructs_fail_explicitly() {
        for sql in [
            "CREATE TABLE t AS SELECT 1",
            "CREATE TABLE t (a INT GENERATED ALWAYS AS (1) STORED)",
            "CREATE TABLE t (a INT) PARTITION BY HASH (a)",
            "CREATE INDEX i ON t (a) WHERE a > 0",
            "DROP TABLE t",
        ] {
            let err = parse(sql).unwrap_err();
            assert!(err.message.contains("unsupported"), "{sql}: {err}");
        }
    }

    #[test]
    fn test_error_position() {
        let sql = "CREATE TABLE t (\n  id INT,\n  name VARCHAR(10) BOGUS\n)";
        let err = parse(sql).unwrap_err();
        assert_eq!(err.line_col(sql), (3, 20));
        assert_eq!(err.position(), sql.find("BOGUS").unwrap());
    }
}
