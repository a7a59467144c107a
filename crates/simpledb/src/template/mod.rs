//! Parameterized SQL templates.
//!
//! A [`Template`] is a positional format string plus one [`Slot`] per
//! placeholder. Formatting it (see [`TemplateFormatter`]) produces the final
//! command text and the ordered parameter list in a single pass.
//!
//! # Example
//!
//! ```ignore
//! use simpledb::{template, named, list, reference};
//!
//! let ids = vec![1, 2, 3];
//! let t = template!(
//!     "SELECT * FROM orders WHERE customer_id = {} AND id IN {} OR parent_id = {}",
//!     named("customer", 42),
//!     list(ids).separator(",").before("(").after(")"),
//!     reference("customer"),
//! );
//! // SELECT * FROM orders WHERE customer_id = @customer AND id IN (@0,@1,@2) OR parent_id = @customer
//! ```
//!
//! Placeholders are `{0}`, `{1}`, … or `{}` for "the next slot"; `{{` and
//! `}}` produce literal braces.

mod format;


pub use format::{FormattedCommand, TemplateFormatter};

use crate::param::{Arg, ParamConfig};
use crate::value::Value;

/// An immutable SQL template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    format: String,
    slots: Vec<Slot>,
}

impl Template {
    pub fn new(format: impl Into<String>, slots: Vec<Slot>) -> Self {
        Self {
            format: format.into(),
            slots,
        }
    }

    /// A template with no slots whose text is taken verbatim (braces are
    /// escaped, so `{` in the SQL stays `{`).
    pub fn text(sql: &str) -> Self {
        Self {
            format: sql.replace('{', "{{").replace('}', "}}"),
            slots: Vec::new(),
        }
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }
}

/// One placeholder's content.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// Inlined through the dialect's literal rules; never bound.
    Literal(Value),
    /// Bound under a caller-supplied name; reusable with an equal argument.
    Named { name: String, arg: Arg },
    /// Token of a name bound earlier in the same pass.
    Reference(String),
    /// Formatted recursively and spliced in as text.
    Nested(Template),
    /// Expanded into a sequence of fresh anonymous parameters.
    List(ListSlot),
    /// Bound anonymously.
    Value(Arg),
}

/// A list of values expanded into `before p0 sep p1 sep … after`.
///
/// An empty list renders as nothing at all, including `before`/`after`.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSlot {
    pub values: Vec<Arg>,
    pub separator: String,
    pub before: Option<String>,
    pub after: Option<String>,
}

impl ListSlot {
    pub fn new<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Arg>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            separator: ", ".to_string(),
            before: None,
            after: None,
        }
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn before(mut self, before: impl Into<String>) -> Self {
        self.before = Some(before.into());
        self
    }

    pub fn after(mut self, after: impl Into<String>) -> Self {
        self.after = Some(after.into());
        self
    }

    /// Wrap in parentheses, for `IN (...)`.
    pub fn parenthesized(self) -> Self {
        self.before("(").after(")")
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Slot inlining `value` as a literal.
pub fn literal(value: impl Into<Value>) -> Slot {
    Slot::Literal(value.into())
}

/// Slot binding `arg` under `name`.
pub fn named(name: impl Into<String>, arg: impl Into<Arg>) -> Slot {
    Slot::Named {
        name: name.into(),
        arg: arg.into(),
    }
}

/// Slot referring to a name bound earlier in the pass.
pub fn reference(name: impl Into<String>) -> Slot {
    Slot::Reference(name.into())
}

/// List slot over `values`.
pub fn list<I, T>(values: I) -> ListSlot
where
    I: IntoIterator<Item = T>,
    T: Into<Arg>,
{
    ListSlot::new(values)
}

/// Conversion used by [`template!`](crate::template!) for each slot argument.
pub trait IntoSlot {
    fn into_slot(self) -> Slot;
}

impl IntoSlot for Slot {
    fn into_slot(self) -> Slot {
        self
    }
}

impl IntoSlot for ListSlot {
    fn into_slot(self) -> Slot {
        Slot::List(self)
    }
}

impl IntoSlot for Template {
    fn into_slot(self) -> Slot {
        Slot::Nested(self)
    }
}

impl IntoSlot for Arg {
    fn into_slot(self) -> Slot {
        Slot::Value(self)
    }
}

impl IntoSlot for ParamConfig {
    fn into_slot(self) -> Slot {
        Slot::Value(Arg::Config(self))
    }
}

impl<T: Into<Value>> IntoSlot for Option<T> {
    fn into_slot(self) -> Slot {
        Slot::Value(Arg::Value(self.into()))
    }
}

macro_rules! impl_into_slot_for_values {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoSlot for $ty {
                fn into_slot(self) -> Slot {
                    Slot::Value(Arg::Value(self.into()))
                }
            }
        )*
    };
}

impl_into_slot_for_values! {
    Value,
    bool,
    i16,
    i32,
    i64,
    f32,
    f64,
    String,
    &str,
    Vec<u8>,
    uuid::Uuid,
    chrono::NaiveDate,
    chrono::NaiveDateTime,
    chrono::DateTime<chrono::Utc>,
    serde_json::Value,
}

/// Build a [`Template`] from a format string and slot arguments.
///
/// Each argument may be a [`Slot`] (see [`named`], [`literal`],
/// [`reference`]), a [`ListSlot`], a nested [`Template`], or any value,
/// which becomes an anonymously bound parameter.
#[macro_export]
macro_rules! template {
    ($format:expr $(,)?) => {
        $crate::template::Template::new($format, ::std::vec::Vec::new())
    };
    ($format:expr, $($slot:expr),+ $(,)?) => {
        $crate::template::Template::new(
            $format,
            ::std::vec![$($crate::template::IntoSlot::into_slot($slot)),+],
        )
    };
}
