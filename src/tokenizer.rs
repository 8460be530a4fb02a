use thiserror::Error;

use crate::input::Input;

/// A top-level input with its location in the source line. Offsets are in
/// characters, not bytes.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Token {
    pub input: Input,
    pub start: usize,
    pub end: usize,
    /// Where the first quoted part of the text starts, in characters. `None`
    /// if nothing was quoted. Quoted tokens are never separators, and only
    /// the value of `--name=value` may be quoted.
    pub quoted: Option<usize>,
}

impl Token {
    /// The leading characters of the text that were written without quotes.
    pub fn bare_prefix(&self) -> Option<&str> {
        let word = self.input.as_single()?;
        match self.quoted {
            None => Some(word),
            Some(n) => Some(word.char_indices().nth(n).map_or(word, |(i, _)| &word[..i])),
        }
    }

    /// Returns the plain text of the token if it is an unquoted single word.
    pub fn bare_word(&self) -> Option<&str> {
        if self.quoted.is_some() {
            None
        } else {
            self.input.as_single()
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum TokenizeError {
    #[error("unterminated quote at column {position}: `{partial}`")]
    UnterminatedQuote { partial: String, position: usize },
    #[error("unterminated list at column {position}: `{partial}`")]
    UnterminatedList { partial: String, position: usize },
    #[error("unterminated map at column {position}: `{partial}`")]
    UnterminatedMap { partial: String, position: usize },
    #[error("expected `=` after a map key at column {position}: `{partial}`")]
    ExpectedAssignment { partial: String, position: usize },
    #[error("unexpected `{ch}` at column {position}: `{partial}`")]
    UnexpectedCharacter {
        ch: char,
        partial: String,
        position: usize,
    },
}

impl TokenizeError {
    pub fn position(&self) -> usize {
        match self {
            TokenizeError::UnterminatedQuote { position, .. }
            | TokenizeError::UnterminatedList { position, .. }
            | TokenizeError::UnterminatedMap { position, .. }
            | TokenizeError::ExpectedAssignment { position, .. }
            | TokenizeError::UnexpectedCharacter { position, .. } => *position,
        }
    }

    pub fn partial(&self) -> &str {
        match self {
            TokenizeError::UnterminatedQuote { partial, .. }
            | TokenizeError::UnterminatedList { partial, .. }
            | TokenizeError::UnterminatedMap { partial, .. }
            | TokenizeError::ExpectedAssignment { partial, .. }
            | TokenizeError::UnexpectedCharacter { partial, .. } => partial,
        }
    }
}

/// Where a word is being read. Decides which characters end it.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Context {
    TopLevel,
    ListElement,
    MapKey,
    MapValue,
}

impl Context {
    fn is_delimiter(self, c: char) -> bool {
        match self {
            Context::TopLevel => false,
            Context::ListElement => matches!(c, ',' | ']'),
            Context::MapKey => matches!(c, '=' | ',' | '}'),
            Context::MapValue => matches!(c, ',' | '}'),
        }
    }
}

struct InputReader<I: Iterator<Item = char>> {
    input: I,
    char_offset: usize,
    push_back_stack: Vec<char>,
}

impl<I: Iterator<Item = char>> InputReader<I> {
    pub fn new(input: I) -> InputReader<I> {
        InputReader {
            input,
            char_offset: 0,
            push_back_stack: Vec::new(),
        }
    }

    pub fn char_offset(&self) -> usize {
        self.char_offset
    }

    /// Returns the next character without consuming it.
    pub fn peek(&mut self) -> Option<char> {
        if let Some(c) = self.push_back_stack.last() {
            Some(*c)
        } else {
            let c = self.input.next()?;
            self.push_back_stack.push(c);
            Some(c)
        }
    }

    pub fn consume(&mut self) -> Option<char> {
        let ret = if let Some(c) = self.push_back_stack.pop() {
            Some(c)
        } else {
            self.input.next()
        };

        if ret.is_some() {
            self.char_offset += 1;
        }

        ret
    }

    /// Pushes a character back. It will be returned by the next `peek` or
    /// `consume`.
    pub fn unconsume(&mut self, c: char) {
        self.push_back_stack.push(c);
        self.char_offset -= 1;
    }
}

/// Splits a line into top-level inputs.
pub struct Tokenizer<'a> {
    source: &'a str,
    input: InputReader<std::str::Chars<'a>>,
    halted: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Tokenizer<'a> {
        Tokenizer {
            source,
            input: InputReader::new(source.chars()),
            halted: false,
        }
    }

    fn next_token(&mut self) -> Option<Result<Token, TokenizeError>> {
        if self.halted {
            return None;
        }

        self.skip_whitespace();
        self.input.peek()?;

        let ret = self.do_next_token();
        if ret.is_err() {
            self.halted = true;
        }

        Some(ret)
    }

    fn do_next_token(&mut self) -> Result<Token, TokenizeError> {
        let start = self.input.char_offset();
        let (input, quoted) = self.visit_value(Context::TopLevel, start)?;

        // `[a]b` is not a word.
        if let Some(c) = self.input.peek() {
            if !c.is_whitespace() {
                self.input.consume();
                return Err(self.unexpected(c, start));
            }
        }

        Ok(Token {
            input,
            start,
            end: self.input.char_offset(),
            quoted,
        })
    }

    fn visit_value(&mut self, context: Context, start: usize) -> Result<(Input, Option<usize>), TokenizeError> {
        match self.input.peek() {
            Some('[') => {
                self.input.consume();
                Ok((self.visit_list(start)?, None))
            }
            Some('{') => {
                self.input.consume();
                Ok((self.visit_map(start)?, None))
            }
            _ => self.visit_word(context, start),
        }
    }

    fn visit_word(&mut self, context: Context, start: usize) -> Result<(Input, Option<usize>), TokenizeError> {
        let mut word = String::new();
        // Whitespace inside list and map elements is kept only if something
        // follows it.
        let mut pending_spaces = String::new();
        let mut quoted = None;
        while let Some(c) = self.input.consume() {
            match c {
                c if c.is_whitespace() && context == Context::TopLevel => {
                    self.input.unconsume(c);
                    break;
                }
                c if c.is_whitespace() => {
                    pending_spaces.push(c);
                }
                c if context.is_delimiter(c) => {
                    self.input.unconsume(c);
                    break;
                }
                '"' | '\'' => {
                    word.push_str(&pending_spaces);
                    pending_spaces.clear();
                    quoted.get_or_insert_with(|| word.chars().count());
                    self.visit_quoted(c, &mut word, start)?;
                }
                '\\' => {
                    word.push_str(&pending_spaces);
                    pending_spaces.clear();
                    let ch = self.input.consume().unwrap_or('\\' /* backslash at EOF */);
                    word.push(ch);
                }
                _ => {
                    word.push_str(&pending_spaces);
                    pending_spaces.clear();
                    word.push(c);
                }
            }
        }

        Ok((Input::Single(word), quoted))
    }

    /// Reads a quoted string. `self.input` should be positioned right after
    /// the opening quote.
    fn visit_quoted(&mut self, quote: char, word: &mut String, start: usize) -> Result<(), TokenizeError> {
        loop {
            match self.input.consume() {
                Some(c) if c == quote => return Ok(()),
                Some('\\') => match self.input.consume() {
                    Some(ch) => word.push(ch),
                    None => break,
                },
                Some(c) => word.push(c),
                None => break,
            }
        }

        Err(TokenizeError::UnterminatedQuote {
            partial: self.partial(start),
            position: self.input.char_offset(),
        })
    }

    fn visit_list(&mut self, start: usize) -> Result<Input, TokenizeError> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.input.peek() {
                Some(']') => {
                    // An empty list or a trailing comma.
                    self.input.consume();
                    break;
                }
                None => return Err(self.unterminated_list(start)),
                _ => {}
            }

            items.push(self.visit_element(Context::ListElement, start)?);

            self.skip_whitespace();
            match self.input.consume() {
                Some(',') => continue,
                Some(']') => break,
                Some(c) => return Err(self.unexpected(c, start)),
                None => return Err(self.unterminated_list(start)),
            }
        }

        Ok(Input::List(items))
    }

    fn visit_map(&mut self, start: usize) -> Result<Input, TokenizeError> {
        let mut entries = Vec::new();
        loop {
            self.skip_whitespace();
            match self.input.peek() {
                Some('}') => {
                    self.input.consume();
                    break;
                }
                None => return Err(self.unterminated_map(start)),
                _ => {}
            }

            let key = self.visit_element(Context::MapKey, start)?;

            self.skip_whitespace();
            match self.input.consume() {
                Some('=') => {}
                Some(_) => {
                    return Err(TokenizeError::ExpectedAssignment {
                        partial: self.partial(start),
                        position: self.input.char_offset() - 1,
                    })
                }
                None => return Err(self.unterminated_map(start)),
            }

            self.skip_whitespace();
            let value = self.visit_element(Context::MapValue, start)?;
            entries.push((key, value));

            self.skip_whitespace();
            match self.input.consume() {
                Some(',') => continue,
                Some('}') => break,
                Some(c) => return Err(self.unexpected(c, start)),
                None => return Err(self.unterminated_map(start)),
            }
        }

        Ok(Input::Map(entries))
    }

    /// Reads one element of a list or a map. Empty unquoted elements such as
    /// the middle of `[a,,b]` are rejected.
    fn visit_element(&mut self, context: Context, start: usize) -> Result<Input, TokenizeError> {
        let (input, quoted) = self.visit_value(context, start)?;
        if input == Input::Single(String::new()) && quoted.is_none() {
            return match self.input.consume() {
                Some(c) => Err(self.unexpected(c, start)),
                None if context == Context::ListElement => Err(self.unterminated_list(start)),
                None => Err(self.unterminated_map(start)),
            };
        }

        Ok(input)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.input.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.input.consume();
        }
    }

    /// The source text from `start` to the current position.
    fn partial(&self, start: usize) -> String {
        self.source
            .chars()
            .skip(start)
            .take(self.input.char_offset() - start)
            .collect()
    }

    /// Builds an error for `c`, which has just been consumed.
    fn unexpected(&self, c: char, start: usize) -> TokenizeError {
        TokenizeError::UnexpectedCharacter {
            ch: c,
            partial: self.partial(start),
            position: self.input.char_offset() - 1,
        }
    }

    fn unterminated_list(&self, start: usize) -> TokenizeError {
        TokenizeError::UnterminatedList {
            partial: self.partial(start),
            position: self.input.char_offset(),
        }
    }

    fn unterminated_map(&self, start: usize) -> TokenizeError {
        TokenizeError::UnterminatedMap {
            partial: self.partial(start),
            position: self.input.char_offset(),
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Token, TokenizeError>;

    fn next(&mut self) -> Option<Result<Token, TokenizeError>> {
        self.next_token()
    }
}

pub fn tokenize(raw: &str) -> Result<Vec<Token>, TokenizeError> {
    Tokenizer::new(raw).collect()
}

/// A restartable cursor over tokens. `save` and `restore` let the parser try
/// an alternative and come back without tokenizing again.
#[derive(Debug, Clone)]
pub struct TokenCursor {
    tokens: Vec<Token>,
    pos: usize,
    source_len: usize,
}

impl TokenCursor {
    pub fn parse(raw: &str) -> Result<TokenCursor, TokenizeError> {
        Ok(TokenCursor {
            tokens: tokenize(raw)?,
            pos: 0,
            source_len: raw.chars().count(),
        })
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    pub fn has_next(&self) -> bool {
        self.pos < self.tokens.len()
    }

    pub fn save(&self) -> usize {
        self.pos
    }

    pub fn restore(&mut self, mark: usize) {
        debug_assert!(mark <= self.tokens.len());
        self.pos = mark;
    }

    pub fn remaining(&self) -> &[Token] {
        &self.tokens[self.pos..]
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// The character offset in the source line where the next token starts,
    /// or the end of the line.
    pub fn offset(&self) -> usize {
        self.peek().map(|t| t.start).unwrap_or(self.source_len)
    }
}
