// doc.rs — Structural document tree for generated source
//
// Code generation builds a `Doc` tree of text, concatenation, line breaks and
// indentation, and renders it to a string as the very last step. Helpers
// cover the target constructs the generator needs: quoted keys, inline
// arrays, multi-line object literals, method calls, constructor calls, and
// anonymous functions with named or destructured parameters.
//
// Preconditions: none.
// Postconditions: `Doc::render` output uses 2-space indentation and contains
//                 no trailing whitespace.
// Failure modes: none (pure string formatting).
// Side effects: none.

const INDENT: &str = "  ";

#[derive(Debug, Clone, PartialEq)]
pub enum Doc {
    Nil,
    Text(String),
    /// Hard line break; the next text is prefixed by the current indent.
    Line,
    Concat(Vec<Doc>),
    /// Raises the indent level for line breaks inside the child.
    Indent(Box<Doc>),
}

/// Parameter binding of an anonymous function.
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    /// `(a, b) => ...`
    Named(Vec<String>),
    /// `([a, b]) => ...`: one tuple argument destructured by position.
    Destructure(Vec<String>),
}

impl Params {
    /// Names bound inside the body, in positional order.
    pub fn names(&self) -> &[String] {
        match self {
            Params::Named(names) | Params::Destructure(names) => names,
        }
    }
}

impl Doc {
    pub fn render(&self) -> String {
        let mut r = Renderer {
            out: String::with_capacity(4096),
            depth: 0,
            at_line_start: true,
        };
        r.walk(self);
        r.out
    }
}

struct Renderer {
    out: String,
    depth: usize,
    at_line_start: bool,
}

impl Renderer {
    fn walk(&mut self, doc: &Doc) {
        match doc {
            Doc::Nil => {}
            Doc::Text(s) => {
                if s.is_empty() {
                    return;
                }
                if self.at_line_start {
                    for _ in 0..self.depth {
                        self.out.push_str(INDENT);
                    }
                    self.at_line_start = false;
                }
                self.out.push_str(s);
            }
            Doc::Line => {
                self.out.push('\n');
                self.at_line_start = true;
            }
            Doc::Concat(parts) => {
                for part in parts {
                    self.walk(part);
                }
            }
            Doc::Indent(inner) => {
                self.depth += 1;
                self.walk(inner);
                self.depth -= 1;
            }
        }
    }
}

// ── Primitive constructors ─────────────────────────────────────────────────

pub fn text(s: impl Into<String>) -> Doc {
    Doc::Text(s.into())
}

pub fn line() -> Doc {
    Doc::Line
}

pub fn concat(parts: impl IntoIterator<Item = Doc>) -> Doc {
    Doc::Concat(parts.into_iter().collect())
}

pub fn nest(doc: Doc) -> Doc {
    Doc::Indent(Box::new(doc))
}

/// `// text` followed by a line break.
pub fn comment(s: &str) -> Doc {
    concat([text(format!("// {}", s)), line()])
}

/// A statement: the doc followed by `;` and a line break.
pub fn statement(doc: Doc) -> Doc {
    concat([doc, text(";"), line()])
}

/// Interleave `sep` between `docs`.
pub fn join(docs: impl IntoIterator<Item = Doc>, sep: &str) -> Doc {
    let mut parts = Vec::new();
    for (i, d) in docs.into_iter().enumerate() {
        if i > 0 {
            parts.push(text(sep));
        }
        parts.push(d);
    }
    Doc::Concat(parts)
}

// ── Literals ───────────────────────────────────────────────────────────────

/// Quote a string as a double-quoted literal (valid JSON and JavaScript).
pub fn quote_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

pub fn quote(s: &str) -> Doc {
    text(quote_str(s))
}

/// Inline array literal: `[a, b]`.
pub fn array(items: impl IntoIterator<Item = Doc>) -> Doc {
    concat([text("["), join(items, ", "), text("]")])
}

/// Multi-line object literal with one `key: value,` entry per line, or `{}`
/// when there are no entries.
pub fn assoc(entries: impl IntoIterator<Item = (Doc, Doc)>) -> Doc {
    let body: Vec<Doc> = entries
        .into_iter()
        .map(|(k, v)| concat([k, text(": "), v, text(","), line()]))
        .collect();
    if body.is_empty() {
        return text("{}");
    }
    concat([text("{"), line(), nest(Doc::Concat(body)), text("}")])
}

/// `obj[key]` with a quoted key.
pub fn index(obj: &str, key: &str) -> Doc {
    concat([text(obj), text("["), quote(key), text("]")])
}

// ── Calls and functions ────────────────────────────────────────────────────

/// `callee(a, b)`.
pub fn call(callee: Doc, args: impl IntoIterator<Item = Doc>) -> Doc {
    concat([callee, text("("), join(args, ", "), text(")")])
}

/// `receiver.method(a, b)`.
pub fn method_call(receiver: Doc, method: &str, args: impl IntoIterator<Item = Doc>) -> Doc {
    call(concat([receiver, text("."), text(method)]), args)
}

/// `new ctor(a, b)`.
pub fn new_object(ctor: &str, args: impl IntoIterator<Item = Doc>) -> Doc {
    concat([text("new "), call(text(ctor), args)])
}

/// Anonymous function: `(a) => body` or `([a, b]) => body`.
pub fn lambda(params: &Params, body: Doc) -> Doc {
    let head = match params {
        Params::Named(names) => format!("({})", names.join(", ")),
        Params::Destructure(names) => format!("([{}])", names.join(", ")),
    };
    concat([text(head), text(" => "), body])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_indent_and_no_trailing_whitespace() {
        let doc = concat([
            text("a {"),
            line(),
            nest(concat([text("b"), line(), line(), text("c"), line()])),
            text("}"),
        ]);
        assert_eq!(doc.render(), "a {\n  b\n\n  c\n}");
    }

    #[test]
    fn empty_assoc_is_braces() {
        assert_eq!(assoc(Vec::new()).render(), "{}");
    }

    #[test]
    fn assoc_entries_have_trailing_commas() {
        let doc = assoc(vec![(quote("t"), text("1")), (quote("u"), text("2"))]);
        assert_eq!(doc.render(), "{\n  \"t\": 1,\n  \"u\": 2,\n}");
    }

    #[test]
    fn quote_escapes() {
        assert_eq!(quote_str("a\"b\\c\n"), "\"a\\\"b\\\\c\\n\"");
        assert_eq!(quote_str("\u{1}"), "\"\\u0001\"");
    }

    #[test]
    fn lambda_forms() {
        let named = lambda(&Params::Named(vec!["t".into()]), text("t"));
        assert_eq!(named.render(), "(t) => t");
        let destructured = lambda(
            &Params::Destructure(vec!["x0".into(), "x1".into()]),
            text("x1"),
        );
        assert_eq!(destructured.render(), "([x0, x1]) => x1");
    }

    #[test]
    fn calls() {
        let doc = method_call(index("inputs", "a"), "push", [text("tuple")]);
        assert_eq!(doc.render(), "inputs[\"a\"].push(tuple)");
        let doc = new_object("runtime.Table", [text("0")]);
        assert_eq!(doc.render(), "new runtime.Table(0)");
        assert_eq!(array(Vec::new()).render(), "[]");
    }
}
