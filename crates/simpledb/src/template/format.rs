use super::{ListSlot, Slot, Template};
use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};
use crate::param::{Arg, Parameter, ParameterFactory, check_name};
use std::collections::HashMap;

/// Finished command text and its parameters, in binding order.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedCommand {
    pub text: String,
    pub parameters: Vec<Parameter>,
}

/// Renders [`Template`]s for one dialect.
///
/// The formatter itself is stateless; all bookkeeping (the name table and
/// the anonymous ordinal counter) lives in a single formatting pass, so the
/// same formatter can be shared freely.
#[derive(Debug, Clone, Copy)]
pub struct TemplateFormatter<'d> {
    dialect: &'d dyn Dialect,
}

impl<'d> TemplateFormatter<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self { dialect }
    }

    /// Format `template`, creating each parameter through `factory`.
    ///
    /// Any error aborts the whole pass; no partial output is returned.
    pub fn format(
        &self,
        template: &Template,
        factory: &mut dyn ParameterFactory,
    ) -> DbResult<FormattedCommand> {
        let mut pass = Pass {
            dialect: self.dialect,
            factory,
            names: HashMap::new(),
            parameters: Vec::new(),
            ordinal: 0,
        };
        let text = pass.render(template)?;
        Ok(FormattedCommand {
            text,
            parameters: pass.parameters,
        })
    }
}

struct Bound {
    index: usize,
    arg: Arg,
    /// Anonymous and list parameters are never shared or referenced.
    anonymous: bool,
}

struct Pass<'d, 'f> {
    dialect: &'d dyn Dialect,
    factory: &'f mut dyn ParameterFactory,
    /// Comparer key -> bound parameter. Shared across nested templates.
    names: HashMap<String, Bound>,
    parameters: Vec<Parameter>,
    ordinal: usize,
}

impl Pass<'_, '_> {
    fn render(&mut self, template: &Template) -> DbResult<String> {
        let mut rendered = Vec::with_capacity(template.slots.len());
        for slot in &template.slots {
            rendered.push(self.render_slot(slot)?);
        }
        substitute(&template.format, &rendered)
    }

    fn render_slot(&mut self, slot: &Slot) -> DbResult<String> {
        match slot {
            Slot::Literal(value) => self.dialect.render_literal(value),
            Slot::Named { name, arg } => self.bind_named(name, arg, None),
            Slot::Reference(name) => self.resolve(name),
            Slot::Nested(inner) => self.render(inner),
            Slot::List(list) => self.render_list(list),
            Slot::Value(arg) => {
                let param = self.factory.create(arg);
                if param.has_name() {
                    let name = param.name.clone();
                    self.bind_named(&name, arg, Some(param))
                } else {
                    self.bind_anonymous(arg, param)
                }
            }
        }
    }

    fn bind_named(&mut self, name: &str, arg: &Arg, created: Option<Parameter>) -> DbResult<String> {
        check_name(name)?;

        let key = self.dialect.comparer().key(name).into_owned();
        if let Some(bound) = self.names.get(&key) {
            if bound.anonymous || bound.arg != *arg {
                return Err(DbError::parameter_conflict(name));
            }
            return Ok(self.dialect.named_token(&self.parameters[bound.index].name));
        }

        let mut param = match created {
            Some(param) => param,
            None => self.factory.create(arg),
        };
        param.name = name.to_string();
        Ok(self.register(key, arg, param, false))
    }

    fn bind_anonymous(&mut self, arg: &Arg, mut param: Parameter) -> DbResult<String> {
        let name = self.dialect.anonymous_name(self.ordinal);
        self.ordinal += 1;

        let key = self.dialect.comparer().key(&name).into_owned();
        if self.names.contains_key(&key) {
            // A caller-named parameter already owns this ordinal's name.
            return Err(DbError::parameter_conflict(name));
        }
        param.name = name;
        Ok(self.register(key, arg, param, true))
    }

    fn register(&mut self, key: String, arg: &Arg, param: Parameter, anonymous: bool) -> String {
        let token = self.dialect.named_token(&param.name);
        self.names.insert(
            key,
            Bound {
                index: self.parameters.len(),
                arg: arg.clone(),
                anonymous,
            },
        );
        self.parameters.push(param);
        token
    }

    fn resolve(&self, name: &str) -> DbResult<String> {
        let key = self.dialect.comparer().key(name);
        match self.names.get(key.as_ref()) {
            Some(bound) if !bound.anonymous => {
                Ok(self.dialect.named_token(&self.parameters[bound.index].name))
            }
            _ => Err(DbError::unresolved_reference(name)),
        }
    }

    fn render_list(&mut self, list: &ListSlot) -> DbResult<String> {
        if list.values.is_empty() {
            return Ok(String::new());
        }

        let mut out = String::new();
        if let Some(before) = &list.before {
            out.push_str(before);
        }
        for (i, arg) in list.values.iter().enumerate() {
            if i > 0 {
                out.push_str(&list.separator);
            }
            // List elements are always fresh, whatever name they carry.
            let param = self.factory.create(arg);
            let token = self.bind_anonymous(arg, param)?;
            out.push_str(&token);
        }
        if let Some(after) = &list.after {
            out.push_str(after);
        }
        Ok(out)
    }
}

/// Positional substitution: `{i}` takes `rendered[i]`, `{}` takes the next
/// slot in sequence, `{{`/`}}` are literal braces.
pub(crate) fn substitute(format: &str, rendered: &[String]) -> DbResult<String> {
    let mut out = String::with_capacity(format.len() + rendered.iter().map(String::len).sum::<usize>());
    let mut chars = format.char_indices().peekable();
    let mut next_implicit = 0usize;

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    out.push('{');
                    continue;
                }

                let mut spec = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    spec.push(c);
                }
                if !closed {
                    return Err(DbError::invalid_argument(format!(
                        "unclosed '{{' at byte {pos} in template format"
                    )));
                }

                let spec = spec.trim();
                let index = if spec.is_empty() {
                    let i = next_implicit;
                    next_implicit += 1;
                    i
                } else {
                    spec.parse::<usize>().map_err(|_| {
                        DbError::invalid_argument(format!(
                            "invalid placeholder '{{{spec}}}' at byte {pos} in template format"
                        ))
                    })?
                };

                let text = rendered.get(index).ok_or_else(|| {
                    DbError::invalid_argument(format!(
                        "placeholder {{{index}}} has no slot (template has {} slots)",
                        rendered.len()
                    ))
                })?;
                out.push_str(text);
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                    out.push('}');
                } else {
                    return Err(DbError::invalid_argument(format!(
                        "unmatched '}}' at byte {pos} in template format"
                    )));
                }
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}
