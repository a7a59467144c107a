//! Command construction: literal text + positional args, or a template.

use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};
use crate::param::{Arg, DefaultParameterFactory, Parameter, ParameterFactory, check_name};
use crate::template::{Template, TemplateFormatter};
use std::time::Duration;

/// Where a command's text and parameters come from.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandSource {
    /// SQL text plus positional arguments. Unnamed arguments are named by
    /// their position through the dialect's anonymous naming.
    Text { text: String, args: Vec<Arg> },
    Template(Template),
}

impl CommandSource {
    pub fn text(text: impl Into<String>) -> Self {
        CommandSource::Text {
            text: text.into(),
            args: Vec::new(),
        }
    }

    /// Append a positional argument. No-op on a template source.
    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        if let CommandSource::Text { args, .. } = &mut self {
            args.push(arg.into());
        }
        self
    }
}

impl From<&str> for CommandSource {
    fn from(text: &str) -> Self {
        CommandSource::text(text)
    }
}

impl From<String> for CommandSource {
    fn from(text: String) -> Self {
        CommandSource::text(text)
    }
}

impl From<Template> for CommandSource {
    fn from(template: Template) -> Self {
        CommandSource::Template(template)
    }
}

impl From<(&str, Vec<Arg>)> for CommandSource {
    fn from((text, args): (&str, Vec<Arg>)) -> Self {
        CommandSource::Text {
            text: text.to_string(),
            args,
        }
    }
}

impl From<(String, Vec<Arg>)> for CommandSource {
    fn from((text, args): (String, Vec<Arg>)) -> Self {
        CommandSource::Text { text, args }
    }
}

/// Per-command execution options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandOptions {
    pub timeout: Option<Duration>,
}

impl CommandOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Options for row-returning commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub command: CommandOptions,
    /// Stream rows instead of buffering them all before returning.
    pub unbuffered: bool,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffered() -> Self {
        Self::default()
    }

    pub fn unbuffered() -> Self {
        Self {
            unbuffered: true,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.command.timeout = Some(timeout);
        self
    }

    pub fn with_unbuffered(mut self, unbuffered: bool) -> Self {
        self.unbuffered = unbuffered;
        self
    }
}

/// A fully built command, ready for a connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub text: String,
    pub parameters: Vec<Parameter>,
    pub options: CommandOptions,
}

impl Command {
    /// Look up a parameter by exact name.
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Builds [`Command`]s for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct CommandBuilder<'d> {
    dialect: &'d dyn Dialect,
}

impl<'d> CommandBuilder<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self { dialect }
    }

    pub fn build(&self, source: CommandSource, options: CommandOptions) -> DbResult<Command> {
        self.build_with(source, options, &mut DefaultParameterFactory)
    }

    /// Like [`build`](Self::build), creating parameters through `factory`.
    pub fn build_with(
        &self,
        source: CommandSource,
        options: CommandOptions,
        factory: &mut dyn ParameterFactory,
    ) -> DbResult<Command> {
        let (text, parameters) = match source {
            CommandSource::Text { text, args } => {
                if text.trim().is_empty() {
                    return Err(DbError::invalid_argument("command text must not be empty"));
                }
                let comparer = self.dialect.comparer();
                let mut parameters: Vec<Parameter> = Vec::with_capacity(args.len());
                for (i, arg) in args.iter().enumerate() {
                    let mut param = factory.create(arg);
                    if param.has_name() {
                        check_name(&param.name)?;
                    } else {
                        param.name = self.dialect.anonymous_name(i);
                    }
                    if parameters.iter().any(|p| comparer.names_equal(&p.name, &param.name)) {
                        return Err(DbError::parameter_conflict(param.name));
                    }
                    parameters.push(param);
                }
                (text, parameters)
            }
            CommandSource::Template(template) => {
                let formatted = TemplateFormatter::new(self.dialect).format(&template, factory)?;
                if formatted.text.trim().is_empty() {
                    return Err(DbError::invalid_argument(
                        "template rendered empty command text",
                    ));
                }
                (formatted.text, formatted.parameters)
            }
        };

        Ok(Command {
            text,
            parameters,
            options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::StandardDialect;
    use crate::param::param;
    use crate::template::named;
    use crate::template;
    use crate::value::Value;

    #[test]
    fn literal_args_are_named_by_position() {
        let dialect = StandardDialect::tsql();
        let cmd = CommandBuilder::new(&dialect)
            .build(
                ("SELECT * FROM t WHERE a = @0 AND b = @1", vec![Arg::from(10), Arg::from("x")]).into(),
                CommandOptions::default(),
            )
            .unwrap();
        assert_eq!(cmd.parameters.len(), 2);
        assert_eq!(cmd.parameters[0].name, "0");
        assert_eq!(cmd.parameters[1].value, Value::Text("x".into()));
    }

    #[test]
    fn configured_name_wins_over_position() {
        let dialect = StandardDialect::tsql();
        let source = CommandSource::text("UPDATE t SET c = @code WHERE id = @1")
            .arg(param().name("code").value("AB").size(2))
            .arg(7);
        let cmd = CommandBuilder::new(&dialect)
            .build(source, CommandOptions::default())
            .unwrap();
        assert_eq!(cmd.parameters[0].name, "code");
        assert_eq!(cmd.parameters[0].size, Some(2));
        assert_eq!(cmd.parameters[1].name, "1");
    }

    #[test]
    fn duplicate_literal_names_conflict() {
        let dialect = StandardDialect::tsql();
        let builder = CommandBuilder::new(&dialect);

        // A configured name can collide with a later positional name.
        let source = CommandSource::text("SELECT @1, @1")
            .arg(param().name("1").value(5))
            .arg(7);
        let err = builder.build(source, CommandOptions::default()).unwrap_err();
        assert!(matches!(err, DbError::ParameterConflict { ref name } if name == "1"));

        let source = CommandSource::text("SELECT @a")
            .arg(param().name("a").value(1))
            .arg(param().name("A").value(1));
        assert!(builder.build(source, CommandOptions::default()).unwrap_err().is_parameter_conflict());

        let postgres = StandardDialect::postgres();
        let source = CommandSource::text("SELECT @a, @A")
            .arg(param().name("a").value(1))
            .arg(param().name("A").value(2));
        let cmd = CommandBuilder::new(&postgres)
            .build(source, CommandOptions::default())
            .unwrap();
        assert_eq!(cmd.parameters.len(), 2);
    }

    #[test]
    fn configured_names_must_be_identifiers() {
        let dialect = StandardDialect::tsql();
        let source = CommandSource::text("SELECT @my-name").arg(param().name("my-name").value(1));
        let err = CommandBuilder::new(&dialect)
            .build(source, CommandOptions::default())
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidArgument(_)));
    }

    #[test]
    fn blank_text_is_rejected() {
        let dialect = StandardDialect::tsql();
        let builder = CommandBuilder::new(&dialect);
        for text in ["", "   \n"] {
            let err = builder.build(text.into(), CommandOptions::default()).unwrap_err();
            assert!(matches!(err, DbError::InvalidArgument(_)));
        }
        let err = builder
            .build(template!("").into(), CommandOptions::default())
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidArgument(_)));
    }

    #[test]
    fn template_source_is_formatted() {
        let dialect = StandardDialect::tsql();
        let cmd = CommandBuilder::new(&dialect)
            .build(
                template!("SELECT * FROM T WHERE Id={0}", named("id", 5)).into(),
                CommandOptions::new().with_timeout(Duration::from_secs(3)),
            )
            .unwrap();
        assert_eq!(cmd.text, "SELECT * FROM T WHERE Id=@id");
        assert_eq!(cmd.parameter("id").map(|p| &p.value), Some(&Value::I32(5)));
        assert_eq!(cmd.options.timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn template_errors_surface_before_any_command_exists() {
        let dialect = StandardDialect::tsql();
        let err = CommandBuilder::new(&dialect)
            .build(
                template!("{} {}", named("a", 1), named("a", 2)).into(),
                CommandOptions::default(),
            )
            .unwrap_err();
        assert!(err.is_parameter_conflict());
    }

    #[test]
    fn query_options_constructors() {
        let opts = QueryOptions::unbuffered().with_timeout(Duration::from_millis(50));
        assert!(opts.unbuffered);
        assert_eq!(opts.command.timeout, Some(Duration::from_millis(50)));
        assert!(!QueryOptions::buffered().unbuffered);
    }
}
