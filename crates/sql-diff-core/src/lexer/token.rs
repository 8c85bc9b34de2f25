//! Token types for the DDL lexer.

use super::Span;

/// Keywords recognized by the DDL grammar.
///
/// Data type names are deliberately not keywords: the parser reads them as
/// plain words so that columns named `date`, `text` or `year` keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    // Statements
    Create,
    Table,
    Index,
    Comment,
    Is,
    Temporary,
    Temp,
    If,
    Not,
    Exists,
    Like,
    As,
    Select,

    // Keys and constraints
    Primary,
    Key,
    Unique,
    Foreign,
    References,
    Constraint,
    Check,
    Default,
    Null,
    Fulltext,
    Spatial,
    Using,
    Match,
    Full,
    Partial,
    Simple,
    Deferrable,
    Initially,
    Deferred,
    Immediate,

    // Referential actions
    On,
    Delete,
    Update,
    Cascade,
    Restrict,
    Set,
    No,
    Action,

    // Column attributes
    AutoIncrement,
    Autoincrement,
    Generated,
    Always,
    By,
    Identity,
    Unsigned,
    Signed,
    Zerofill,
    Collate,
    Character,
    Charset,
    Stored,
    Virtual,

    // Index columns and table options
    Asc,
    Desc,
    Without,
    Column,
    Partition,
}

impl Keyword {
    /// Attempts to parse a keyword from a string (case-insensitive).
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        let keyword = match s.to_ascii_uppercase().as_str() {
            "CREATE" => Self::Create,
            "TABLE" => Self::Table,
            "INDEX" => Self::Index,
            "COMMENT" => Self::Comment,
            "IS" => Self::Is,
            "TEMPORARY" => Self::Temporary,
            "TEMP" => Self::Temp,
            "IF" => Self::If,
            "NOT" => Self::Not,
            "EXISTS" => Self::Exists,
            "LIKE" => Self::Like,
            "AS" => Self::As,
            "SELECT" => Self::Select,
            "PRIMARY" => Self::Primary,
            "KEY" => Self::Key,
            "UNIQUE" => Self::Unique,
            "FOREIGN" => Self::Foreign,
            "REFERENCES" => Self::References,
            "CONSTRAINT" => Self::Constraint,
            "CHECK" => Self::Check,
            "DEFAULT" => Self::Default,
            "NULL" => Self::Null,
            "FULLTEXT" => Self::Fulltext,
            "SPATIAL" => Self::Spatial,
            "USING" => Self::Using,
            "MATCH" => Self::Match,
            "FULL" => Self::Full,
            "PARTIAL" => Self::Partial,
            "SIMPLE" => Self::Simple,
            "DEFERRABLE" => Self::Deferrable,
            "INITIALLY" => Self::Initially,
            "DEFERRED" => Self::Deferred,
            "IMMEDIATE" => Self::Immediate,
            "ON" => Self::On,
            "DELETE" => Self::Delete,
            "UPDATE" => Self::Update,
            "CASCADE" => Self::Cascade,
            "RESTRICT" => Self::Restrict,
            "SET" => Self::Set,
            "NO" => Self::No,
            "ACTION" => Self::Action,
            "AUTO_INCREMENT" => Self::AutoIncrement,
            "AUTOINCREMENT" => Self::Autoincrement,
            "GENERATED" => Self::Generated,
            "ALWAYS" => Self::Always,
            "BY" => Self::By,
            "IDENTITY" => Self::Identity,
            "UNSIGNED" => Self::Unsigned,
            "SIGNED" => Self::Signed,
            "ZEROFILL" => Self::Zerofill,
            "COLLATE" => Self::Collate,
            "CHARACTER" => Self::Character,
            "CHARSET" => Self::Charset,
            "STORED" => Self::Stored,
            "VIRTUAL" => Self::Virtual,
            "ASC" => Self::Asc,
            "DESC" => Self::Desc,
            "WITHOUT" => Self::Without,
            "COLUMN" => Self::Column,
            "PARTITION" => Self::Partition,
            _ => return None,
        };
        Some(keyword)
    }

    /// Returns the keyword as it is written in SQL.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Table => "TABLE",
            Self::Index => "INDEX",
            Self::Comment => "COMMENT",
            Self::Is => "IS",
            Self::Temporary => "TEMPORARY",
            Self::Temp => "TEMP",
            Self::If => "IF",
            Self::Not => "NOT",
            Self::Exists => "EXISTS",
            Self::Like => "LIKE",
            Self::As => "AS",
            Self::Select => "SELECT",
            Self::Primary => "PRIMARY",
            Self::Key => "KEY",
            Self::Unique => "UNIQUE",
            Self::Foreign => "FOREIGN",
            Self::References => "REFERENCES",
            Self::Constraint => "CONSTRAINT",
            Self::Check => "CHECK",
            Self::Default => "DEFAULT",
            Self::Null => "NULL",
            Self::Fulltext => "FULLTEXT",
            Self::Spatial => "SPATIAL",
            Self::Using => "USING",
            Self::Match => "MATCH",
            Self::Full => "FULL",
            Self::Partial => "PARTIAL",
            Self::Simple => "SIMPLE",
            Self::Deferrable => "DEFERRABLE",
            Self::Initially => "INITIALLY",
            Self::Deferred => "DEFERRED",
            Self::Immediate => "IMMEDIATE",
            Self::On => "ON",
            Self::Delete => "DELETE",
            Self::Update => "UPDATE",
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::Set => "SET",
            Self::No => "NO",
            Self::Action => "ACTION",
            Self::AutoIncrement => "AUTO_INCREMENT",
            Self::Autoincrement => "AUTOINCREMENT",
            Self::Generated => "GENERATED",
            Self::Always => "ALWAYS",
            Self::By => "BY",
            Self::Identity => "IDENTITY",
            Self::Unsigned => "UNSIGNED",
            Self::Signed => "SIGNED",
            Self::Zerofill => "ZEROFILL",
            Self::Collate => "COLLATE",
            Self::Character => "CHARACTER",
            Self::Charset => "CHARSET",
            Self::Stored => "STORED",
            Self::Virtual => "VIRTUAL",
            Self::Asc => "ASC",
            Self::Desc => "DESC",
            Self::Without => "WITHOUT",
            Self::Column => "COLUMN",
            Self::Partition => "PARTITION",
        }
    }

    /// Reserved keywords cannot be used as bare (unquoted) object names.
    #[must_use]
    pub const fn is_reserved(&self) -> bool {
        matches!(
            self,
            Self::Create
                | Self::Table
                | Self::Index
                | Self::Not
                | Self::Like
                | Self::As
                | Self::Select
                | Self::Primary
                | Self::Key
                | Self::Unique
                | Self::Foreign
                | Self::References
                | Self::Constraint
                | Self::Check
                | Self::Default
                | Self::Null
                | Self::Fulltext
                | Self::Spatial
                | Self::Using
                | Self::On
                | Self::Set
                | Self::Collate
                | Self::Character
                | Self::Generated
                | Self::Partition
        )
    }
}

/// The kind of token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Integer literal (e.g., 42)
    Integer(i64),
    /// Float literal (e.g., 3.14)
    Float(f64),
    /// String literal with quotes removed and escapes resolved
    String(String),
    /// Blob literal (e.g., X'1234')
    Blob(Vec<u8>),

    // Names
    /// Bare identifier
    Identifier(String),
    /// Identifier written in double quotes, backticks or brackets
    QuotedIdentifier(String),
    /// SQL keyword
    Keyword(Keyword),

    // Operators
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// %
    Percent,
    /// =
    Eq,
    /// != or <>
    NotEq,
    /// <
    Lt,
    /// <=
    LtEq,
    /// >
    Gt,
    /// >=
    GtEq,
    /// ||
    Concat,
    /// &
    BitAnd,
    /// |
    BitOr,
    /// ~
    BitNot,
    /// <<
    LeftShift,
    /// >>
    RightShift,

    // Delimiters
    /// (
    LeftParen,
    /// )
    RightParen,
    /// [
    LeftBracket,
    /// ]
    RightBracket,
    /// ,
    Comma,
    /// ;
    Semicolon,
    /// .
    Dot,
    /// :
    Colon,
    /// ::
    DoubleColon,

    // Special
    /// End of input
    Eof,
    /// Invalid/unknown token
    Error(String),
}

impl TokenKind {
    /// Short human description used in error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Integer(n) => format!("number {n}"),
            Self::Float(f) => format!("number {f}"),
            Self::String(s) => format!("string '{s}'"),
            Self::Blob(_) => "blob literal".to_string(),
            Self::Identifier(name) => format!("identifier {name}"),
            Self::QuotedIdentifier(name) => format!("identifier \"{name}\""),
            Self::Keyword(kw) => format!("keyword {}", kw.as_str()),
            Self::Eof => "end of input".to_string(),
            Self::Error(message) => message.clone(),
            other => format!("{other:?}"),
        }
    }
}

/// A token with its span in the source code.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The location in the source code.
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns true if this is an EOF token.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Returns the keyword if this is a keyword token.
    #[must_use]
    pub const fn as_keyword(&self) -> Option<Keyword> {
        match &self.kind {
            TokenKind::Keyword(kw) => Some(*kw),
            _ => None,
        }
    }

    /// Returns the text of a word-like token: identifiers and keywords.
    ///
    /// Keywords are returned in their canonical upper-case spelling.
    #[must_use]
    pub fn word(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Identifier(name) => Some(name),
            TokenKind::Keyword(kw) => Some(kw.as_str()),
            _ => None,
        }
    }
}
