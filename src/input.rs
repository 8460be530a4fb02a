//! Parsed token shapes.
use std::fmt;

/// A parsed input. Produced once by the tokenizer and never mutated.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum Input {
    /// A plain word, e.g. `hello` or `"hello world"`.
    Single(String),
    /// `[a, b, c]`
    List(Vec<Input>),
    /// `{key=value, other=value}`. Entries keep their written order.
    Map(Vec<(Input, Input)>),
}

/// Characters which must be quoted or escaped to be read back as a plain word.
const SPECIAL_CHARS: &str = "\"'\\[]{},=";

fn needs_quotes(s: &str) -> bool {
    s.is_empty() || s.chars().any(|ch| ch.is_whitespace() || SPECIAL_CHARS.contains(ch))
}

impl Input {
    pub fn single<S: Into<String>>(s: S) -> Input {
        Input::Single(s.into())
    }

    pub fn as_single(&self) -> Option<&str> {
        match self {
            Input::Single(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Input]> {
        match self {
            Input::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Input, Input)]> {
        match self {
            Input::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// A short name of the shape, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Input::Single(_) => "single",
            Input::List(_) => "list",
            Input::Map(_) => "map",
        }
    }

    /// Renders the input back in the tokenizer syntax. Tokenizing the
    /// returned string yields this input again.
    pub fn to_literal(&self) -> String {
        let mut buf = String::new();
        self.write_literal(&mut buf);
        buf
    }

    fn write_literal(&self, buf: &mut String) {
        match self {
            Input::Single(s) if needs_quotes(s) => {
                buf.push('"');
                for ch in s.chars() {
                    if ch == '"' || ch == '\\' {
                        buf.push('\\');
                    }
                    buf.push(ch);
                }
                buf.push('"');
            }
            Input::Single(s) => buf.push_str(s),
            Input::List(items) => {
                buf.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        buf.push_str(", ");
                    }
                    item.write_literal(buf);
                }
                buf.push(']');
            }
            Input::Map(entries) => {
                buf.push('{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        buf.push_str(", ");
                    }
                    key.write_literal(buf);
                    buf.push('=');
                    value.write_literal(buf);
                }
                buf.push('}');
            }
        }
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Single(s) => write!(f, "{}", s),
            _ => write!(f, "{}", self.to_literal()),
        }
    }
}
