use std::fmt;

use regex::Regex;

/// The name (or an alias) of a command.
#[derive(Debug, Clone)]
pub enum CommandName {
    Exact(String),
    /// Matches a word if the whole word matches the expression.
    Pattern(Regex),
}

impl CommandName {
    pub fn exact<S: Into<String>>(name: S) -> CommandName {
        CommandName::Exact(name.into())
    }

    /// `^` and `$` are added around `pattern`: `a\d+` does not match `xa1`.
    pub fn pattern(pattern: &str) -> Result<CommandName, regex::Error> {
        Ok(CommandName::Pattern(Regex::new(&format!("^(?:{})$", pattern))?))
    }

    pub fn is_pattern(&self) -> bool {
        matches!(self, CommandName::Pattern(_))
    }

    pub fn matches(&self, word: &str) -> bool {
        match self {
            CommandName::Exact(name) => name == word,
            CommandName::Pattern(regex) => regex.is_match(word),
        }
    }

    /// The written form: the name itself or the pattern without the anchors.
    pub fn as_str(&self) -> &str {
        match self {
            CommandName::Exact(name) => name,
            CommandName::Pattern(regex) => {
                let s = regex.as_str();
                s.get(4..s.len() - 2).unwrap_or(s)
            }
        }
    }
}

impl PartialEq for CommandName {
    fn eq(&self, other: &CommandName) -> bool {
        self.is_pattern() == other.is_pattern() && self.as_str() == other.as_str()
    }
}

impl Eq for CommandName {}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandName::Exact(name) => write!(f, "{}", name),
            CommandName::Pattern(_) => write!(f, "/{}/", self.as_str()),
        }
    }
}

impl From<&str> for CommandName {
    fn from(name: &str) -> CommandName {
        CommandName::Exact(name.to_owned())
    }
}

impl From<String> for CommandName {
    fn from(name: String) -> CommandName {
        CommandName::Exact(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn matching() {
        let exact = CommandName::exact("a");
        let pattern = CommandName::pattern(r"a\d+").unwrap();
        assert!(exact.matches("a"));
        assert!(!exact.matches("a1"));
        assert!(pattern.matches("a12"));
        assert!(!pattern.matches("a"));
        assert!(!pattern.matches("xa1"));
        assert!(!pattern.matches("a1x"));
    }

    #[test]
    fn display() {
        assert_eq!(CommandName::exact("say").to_string(), "say");
        assert_eq!(CommandName::pattern(r"a\d+").unwrap().to_string(), r"/a\d+/");
        assert_eq!(
            CommandName::pattern("x|y").unwrap(),
            CommandName::pattern("x|y").unwrap()
        );
        assert!(CommandName::exact("x") != CommandName::pattern("x").unwrap());
    }

    #[test]
    fn alternation_is_anchored_as_a_whole() {
        let name = CommandName::pattern("ab|cd").unwrap();
        assert!(name.matches("ab"));
        assert!(!name.matches("abcd"));
    }
}
