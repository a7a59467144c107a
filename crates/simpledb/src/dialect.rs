//! SQL dialects: parameter token syntax, literal quoting and name comparison.

use crate::error::{DbError, DbResult};
use crate::value::Value;
use std::borrow::Cow;

/// How parameter names are compared within one formatting pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameComparer {
    CaseSensitive,
    CaseInsensitive,
}

impl NameComparer {
    /// Lookup key for `name` under this comparer.
    pub fn key<'a>(&self, name: &'a str) -> Cow<'a, str> {
        match self {
            NameComparer::CaseSensitive => Cow::Borrowed(name),
            NameComparer::CaseInsensitive => Cow::Owned(name.to_lowercase()),
        }
    }

    pub fn names_equal(&self, a: &str, b: &str) -> bool {
        self.key(a) == self.key(b)
    }
}

/// Lexical rules of one target SQL engine.
///
/// Token rendering must be a pure function of its input; anonymous names use
/// invariant decimal digits.
pub trait Dialect: Send + Sync + std::fmt::Debug {
    /// Character that introduces a parameter token (`@` for T-SQL).
    fn prefix(&self) -> char;

    fn comparer(&self) -> NameComparer;

    /// Query returning the identity generated by the last insert.
    fn last_insert_id_sql(&self) -> &str;

    fn named_token(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len() + 1);
        out.push(self.prefix());
        out.push_str(name);
        out
    }

    /// Name given to the anonymous parameter with this ordinal.
    ///
    /// Both the literal-args path and the template formatter name their
    /// anonymous parameters through this one strategy, each with its own
    /// counter.
    fn anonymous_name(&self, ordinal: usize) -> String {
        ordinal.to_string()
    }

    fn anonymous_token(&self, ordinal: usize) -> String {
        self.named_token(&self.anonymous_name(ordinal))
    }

    /// Inline `value` as SQL literal text.
    fn render_literal(&self, value: &Value) -> DbResult<String> {
        render_standard_literal(value)
    }
}

/// Literal rendering shared by the built-in dialects.
///
/// Only NULL, integers and text are supported; everything else is rejected
/// rather than guessed at.
pub fn render_standard_literal(value: &Value) -> DbResult<String> {
    match value {
        Value::Null => Ok("NULL".to_string()),
        Value::I16(_) | Value::I32(_) | Value::I64(_) => Ok(value.to_string()),
        Value::Text(s) => {
            let mut out = String::with_capacity(s.len() + 2);
            out.push('\'');
            for c in s.chars() {
                if c == '\'' {
                    out.push('\'');
                }
                out.push(c);
            }
            out.push('\'');
            Ok(out)
        }
        other => Err(DbError::UnsupportedLiteral { kind: other.kind() }),
    }
}

/// A dialect described entirely by configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardDialect {
    pub name: &'static str,
    pub prefix: char,
    pub comparer: NameComparer,
    pub last_insert_id_sql: Cow<'static, str>,
}

impl StandardDialect {
    /// SQL Server / T-SQL: `@name`, case-insensitive names.
    pub fn tsql() -> Self {
        Self {
            name: "tsql",
            prefix: '@',
            comparer: NameComparer::CaseInsensitive,
            last_insert_id_sql: Cow::Borrowed("SELECT @@IDENTITY"),
        }
    }

    /// PostgreSQL. Tokens use `@name` and are rewritten to `$n` by the
    /// Postgres connection before they reach the server.
    pub fn postgres() -> Self {
        Self {
            name: "postgres",
            prefix: '@',
            comparer: NameComparer::CaseSensitive,
            last_insert_id_sql: Cow::Borrowed("SELECT lastval()"),
        }
    }

    pub fn sqlite() -> Self {
        Self {
            name: "sqlite",
            prefix: '@',
            comparer: NameComparer::CaseInsensitive,
            last_insert_id_sql: Cow::Borrowed("SELECT last_insert_rowid()"),
        }
    }

    pub fn mysql() -> Self {
        Self {
            name: "mysql",
            prefix: '@',
            comparer: NameComparer::CaseInsensitive,
            last_insert_id_sql: Cow::Borrowed("SELECT LAST_INSERT_ID()"),
        }
    }

    /// Look up a preset by name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "tsql" | "sqlserver" | "mssql" => Some(Self::tsql()),
            "postgres" | "postgresql" => Some(Self::postgres()),
            "sqlite" => Some(Self::sqlite()),
            "mysql" => Some(Self::mysql()),
            _ => None,
        }
    }

    pub fn with_prefix(mut self, prefix: char) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn with_comparer(mut self, comparer: NameComparer) -> Self {
        self.comparer = comparer;
        self
    }
}

impl Default for StandardDialect {
    fn default() -> Self {
        Self::tsql()
    }
}

impl Dialect for StandardDialect {
    fn prefix(&self) -> char {
        self.prefix
    }

    fn comparer(&self) -> NameComparer {
        self.comparer
    }

    fn last_insert_id_sql(&self) -> &str {
        &self.last_insert_id_sql
    }
}
