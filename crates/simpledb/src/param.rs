//! Parameter model: bound parameters, mutator configurations and arguments.
//!
//! A caller hands either a plain [`Value`] or a [`ParamConfig`] wherever a
//! value is expected; both are carried as an [`Arg`]. A `ParamConfig` is an
//! ordered list of independent options applied left-to-right onto a fresh
//! [`Parameter`], so a later option overrides an earlier one for the same
//! field.
//!
//! ```ignore
//! use simpledb::{param, DbType};
//!
//! let p = param().name("code").value("ABC").db_type(DbType::AnsiString).size(3);
//! db.execute(("UPDATE t SET c = @code", vec![p.into()])).await?;
//! ```

use crate::error::{DbError, DbResult};
use crate::value::Value;

/// Provider-neutral type hint for a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbType {
    Boolean,
    Int16,
    Int32,
    Int64,
    Single,
    Double,
    Decimal,
    String,
    AnsiString,
    Binary,
    Guid,
    Date,
    DateTime,
    DateTimeOffset,
    Json,
}

/// A bound parameter handed to the connection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
    pub db_type: Option<DbType>,
    pub size: Option<i32>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
}

impl Parameter {
    /// A parameter carrying `value` and no name yet.
    pub fn unnamed(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn named(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }
}

/// Caller-chosen names are ASCII letters, digits and `_`, so a prefixed token
/// reads back as a single identifier.
pub(crate) fn check_name(name: &str) -> DbResult<()> {
    if name.is_empty() {
        return Err(DbError::invalid_argument("parameter name must not be empty"));
    }
    if !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return Err(DbError::invalid_argument(format!(
            "parameter name '{name}' may only contain ASCII letters, digits and '_'"
        )));
    }
    Ok(())
}

/// One recognized parameter option.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamOption {
    Name(String),
    Value(Value),
    Type(DbType),
    Size(i32),
    Precision(u8),
    Scale(u8),
}

impl ParamOption {
    /// Apply this option to `param`, overwriting the field it controls.
    pub fn apply(&self, param: &mut Parameter) {
        match self {
            ParamOption::Name(name) => param.name = name.clone(),
            ParamOption::Value(value) => param.value = value.clone(),
            ParamOption::Type(ty) => param.db_type = Some(*ty),
            ParamOption::Size(size) => param.size = Some(*size),
            ParamOption::Precision(p) => param.precision = Some(*p),
            ParamOption::Scale(s) => param.scale = Some(*s),
        }
    }
}

/// An ordered list of parameter options.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamConfig {
    options: Vec<ParamOption>,
}

/// Start an empty parameter configuration.
pub fn param() -> ParamConfig {
    ParamConfig::default()
}

impl ParamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw option.
    pub fn with(mut self, option: ParamOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn name(self, name: impl Into<String>) -> Self {
        self.with(ParamOption::Name(name.into()))
    }

    pub fn value(self, value: impl Into<Value>) -> Self {
        self.with(ParamOption::Value(value.into()))
    }

    pub fn db_type(self, ty: DbType) -> Self {
        self.with(ParamOption::Type(ty))
    }

    pub fn size(self, size: i32) -> Self {
        self.with(ParamOption::Size(size))
    }

    pub fn precision(self, precision: u8) -> Self {
        self.with(ParamOption::Precision(precision))
    }

    pub fn scale(self, scale: u8) -> Self {
        self.with(ParamOption::Scale(scale))
    }

    pub fn options(&self) -> &[ParamOption] {
        &self.options
    }

    /// Run every option, in order, against `param`.
    pub fn apply_to(&self, param: &mut Parameter) {
        for option in &self.options {
            option.apply(param);
        }
    }

    /// Build a fresh parameter from this configuration.
    pub fn to_parameter(&self) -> Parameter {
        let mut param = Parameter::default();
        self.apply_to(&mut param);
        param
    }
}

/// An argument supplied where a parameter value is expected.
///
/// Two args are equal when they are structurally equal: same kind, same
/// value, and for configurations the same options in the same order.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Value(Value),
    Config(ParamConfig),
}

impl From<ParamConfig> for Arg {
    fn from(cfg: ParamConfig) -> Self {
        Arg::Config(cfg)
    }
}

impl<T: Into<Value>> From<Option<T>> for Arg {
    fn from(v: Option<T>) -> Self {
        Arg::Value(v.into())
    }
}

macro_rules! impl_from_for_arg {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Arg {
                fn from(v: $ty) -> Self {
                    Arg::Value(v.into())
                }
            }
        )*
    };
}

impl_from_for_arg! {
    Value,
    (),
    bool,
    i16,
    i32,
    i64,
    f32,
    f64,
    String,
    &str,
    Vec<u8>,
    &[u8],
    uuid::Uuid,
    chrono::NaiveDate,
    chrono::NaiveDateTime,
    chrono::DateTime<chrono::Utc>,
    serde_json::Value,
}

/// Parameter sink: turns an argument into a fresh parameter.
///
/// The template formatter calls this once per bound slot or list element and
/// decides the final name afterwards; a factory only has to carry the value
/// and any configured hints across.
pub trait ParameterFactory {
    fn create(&mut self, arg: &Arg) -> Parameter;
}

impl<F> ParameterFactory for F
where
    F: FnMut(&Arg) -> Parameter,
{
    fn create(&mut self, arg: &Arg) -> Parameter {
        self(arg)
    }
}

/// Factory producing plain [`Parameter`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultParameterFactory;

impl ParameterFactory for DefaultParameterFactory {
    fn create(&mut self, arg: &Arg) -> Parameter {
        match arg {
            Arg::Value(v) => Parameter::unnamed(v.clone()),
            Arg::Config(cfg) => cfg.to_parameter(),
        }
    }
}
