//! Named-token to `$n` placeholder rewriting.
//!
//! A lexical scan only: quoted strings, quoted identifiers, comments and
//! dollar-quoted bodies are skipped; everything else is copied through.

use crate::param::Parameter;

#[derive(Clone)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

/// Rewritten SQL plus the parameters it references, in `$1..$n` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Rewritten {
    pub sql: String,
    /// Indices into the command's parameter list; `$k` binds `order[k - 1]`.
    pub order: Vec<usize>,
}

/// Replace every `<prefix><name>` token that names one of `params` with a
/// positional `$k`. Tokens naming no parameter (`@@IDENTITY`, session
/// variables) are left alone. Parameters never referenced are not bound.
pub(crate) fn rewrite_named_placeholders(sql: &str, prefix: char, params: &[Parameter]) -> Rewritten {
    let mut out = String::with_capacity(sql.len());
    let mut order: Vec<usize> = Vec::new();
    let mut state = State::Normal;
    let bytes = sql.as_bytes();
    let prefix_is_ascii = prefix.is_ascii();
    let prefix_byte = prefix as u32 as u8;
    let mut copied = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                _ if is_line_comment_start(bytes, idx) => state = State::LineComment,
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' => {
                    if let Some((tag, end)) = try_start_dollar_quote(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = end;
                    }
                }
                _ if prefix_is_ascii && b == prefix_byte => {
                    let doubled = idx > 0 && bytes[idx - 1] == prefix_byte;
                    let name_end = scan_identifier(bytes, idx + 1);
                    if !doubled && name_end > idx + 1 {
                        let name = &sql[idx + 1..name_end];
                        if let Some(param_index) = find_parameter(params, name) {
                            let position = match order.iter().position(|&i| i == param_index) {
                                Some(p) => p,
                                None => {
                                    order.push(param_index);
                                    order.len() - 1
                                }
                            };
                            out.push_str(&sql[copied..idx]);
                            out.push('$');
                            out.push_str(&(position + 1).to_string());
                            copied = name_end;
                        }
                        idx = name_end;
                        continue;
                    }
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }

    out.push_str(&sql[copied..]);
    Rewritten { sql: out, order }
}

/// Exact name first, then ASCII case-insensitive.
fn find_parameter(params: &[Parameter], name: &str) -> Option<usize> {
    params
        .iter()
        .position(|p| p.name == name)
        .or_else(|| params.iter().position(|p| p.name.eq_ignore_ascii_case(name)))
}

fn scan_identifier(bytes: &[u8], start: usize) -> usize {
    let mut idx = start;
    while idx < bytes.len() && (bytes[idx].is_ascii_alphanumeric() || bytes[idx] == b'_') {
        idx += 1;
    }
    idx
}

fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

/// `$tag$` opening a dollar-quoted body; returns the tag and the index of
/// the closing `$` of the opener.
fn try_start_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut idx = start + 1;
    while idx < bytes.len() && bytes[idx] != b'$' {
        let b = bytes[idx];
        if !(b.is_ascii_alphabetic() || b == b'_' || (idx > start + 1 && b.is_ascii_digit())) {
            return None;
        }
        idx += 1;
    }
    if idx < bytes.len() {
        let tag = std::str::from_utf8(&bytes[start + 1..idx]).ok()?.to_string();
        Some((tag, idx))
    } else {
        None
    }
}

fn matches_tag(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    end < bytes.len() && &bytes[idx + 1..end] == tag.as_bytes() && bytes[end] == b'$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(names: &[&str]) -> Vec<Parameter> {
        names.iter().map(|n| Parameter::named(*n, 0)).collect()
    }

    #[test]
    fn rewrites_in_first_use_order() {
        let p = params(&["id", "name"]);
        let r = rewrite_named_placeholders("SELECT * FROM t WHERE name = @name AND id = @id OR id2 = @id", '@', &p);
        assert_eq!(r.sql, "SELECT * FROM t WHERE name = $1 AND id = $2 OR id2 = $2");
        assert_eq!(r.order, vec![1, 0]);
    }

    #[test]
    fn anonymous_names_and_lists() {
        let p = params(&["0", "1", "2"]);
        let r = rewrite_named_placeholders("SELECT * FROM t WHERE id IN (@0,@1,@2)", '@', &p);
        assert_eq!(r.sql, "SELECT * FROM t WHERE id IN ($1,$2,$3)");
        assert_eq!(r.order, vec![0, 1, 2]);
    }

    #[test]
    fn skips_quotes_comments_and_dollar_bodies() {
        let p = params(&["a"]);
        let sql = "SELECT '@a', \"@a\", $$ @a $$, $fn$ @a $fn$ -- @a\n /* @a /* @a */ */ @a";
        let r = rewrite_named_placeholders(sql, '@', &p);
        assert_eq!(
            r.sql,
            "SELECT '@a', \"@a\", $$ @a $$, $fn$ @a $fn$ -- @a\n /* @a /* @a */ */ $1"
        );
    }

    #[test]
    fn unknown_tokens_and_operators_pass_through() {
        let p = params(&["q"]);
        let r = rewrite_named_placeholders(
            "SELECT @@IDENTITY, @session, doc @> '{}' AND tsv @@ @q AND x = $1",
            '@',
            &p,
        );
        assert_eq!(
            r.sql,
            "SELECT @@IDENTITY, @session, doc @> '{}' AND tsv @@ $1 AND x = $1"
        );
        assert_eq!(r.order, vec![0]);
    }

    #[test]
    fn unreferenced_parameters_are_not_bound() {
        let p = params(&["unused", "id"]);
        let r = rewrite_named_placeholders("DELETE FROM t WHERE id = @ID", '@', &p);
        assert_eq!(r.sql, "DELETE FROM t WHERE id = $1");
        assert_eq!(r.order, vec![1]);
    }

    #[test]
    fn other_prefixes() {
        let p = params(&["id"]);
        let r = rewrite_named_placeholders("SELECT x::int FROM t WHERE id = :id", ':', &p);
        assert_eq!(r.sql, "SELECT x::int FROM t WHERE id = $1");
    }
}
