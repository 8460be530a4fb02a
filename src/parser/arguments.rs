//! Binds the tokens following a command to its declared arguments.
use std::sync::Arc;

use regex::Regex;

use super::{is_separator, ParseFail, ParseState};
use crate::argument::{Argument, Value};
use crate::command::{ArgumentContainer, Command, CommandContainer, CommandId};
use crate::input::Input;
use crate::tokenizer::{Token, TokenCursor};

lazy_static! {
    static ref LONG_NAME: Regex = Regex::new(r"^--([^=]+)(?:=(.*))?$").unwrap();
    static ref SHORT_NAMES: Regex = Regex::new(r"^-[A-Za-z]+$").unwrap();
}

enum Named {
    /// `--name` or `--name=value`.
    Long { name: String, value: Option<String> },
    /// `-xyz`
    Short(Vec<char>),
}

fn named(token: &Token) -> Option<Named> {
    let word = token.input.as_single()?;
    if let Some(caps) = LONG_NAME.captures(word) {
        // `--name="a b"` is named, `"--name=a"` is not.
        let name_end = caps.get(2).map_or(word.len(), |m| m.start());
        if token.bare_prefix()?.len() < name_end {
            return None;
        }

        return Some(Named::Long {
            name: caps[1].to_owned(),
            value: caps.get(2).map(|m| m.as_str().to_owned()),
        });
    }

    let word = token.bare_word()?;
    if SHORT_NAMES.is_match(word) {
        return Some(Named::Short(word.chars().skip(1).collect()));
    }

    None
}

/// A token an argument may take as its value.
fn is_value(token: &Token) -> bool {
    !is_separator(token) && named(token).is_none()
}

pub(super) struct ArgumentParser<'a> {
    id: CommandId,
    command: Arc<Command>,
    cursor: &'a mut TokenCursor,
    parsed: &'a [CommandContainer],
    slots: Vec<Option<ArgumentContainer>>,
}

impl<'a> ArgumentParser<'a> {
    pub fn new(
        id: CommandId,
        command: Arc<Command>,
        cursor: &'a mut TokenCursor,
        parsed: &'a [CommandContainer],
    ) -> ArgumentParser<'a> {
        let slots = vec![None; command.arguments.len()];
        ArgumentParser {
            id,
            command,
            cursor,
            parsed,
            slots,
        }
    }

    pub fn parse(mut self) -> Result<CommandContainer, ParseFail> {
        let mut positional = 0;
        loop {
            let token = match self.cursor.peek() {
                Some(token) if !is_separator(token) => token.clone(),
                _ => break,
            };

            if let Some(named) = named(&token) {
                self.cursor.advance();
                self.bind_named(named, token.input)?;
                continue;
            }

            let index = match self.next_positional(positional) {
                Some(index) => index,
                // Every argument is bound. What is left starts another command.
                None => break,
            };

            positional = index + 1;
            if self.command.arguments[index].multiple {
                self.bind_many(index, token)?;
            } else {
                self.bind_one(index, token)?;
            }
        }

        self.finish()
    }

    fn argument(&self, index: usize) -> Arc<Argument> {
        self.command.arguments[index].clone()
    }

    fn state(&self) -> ParseState {
        ParseState {
            parsed: self.parsed.to_vec(),
            arguments: self.slots.iter().flatten().cloned().collect(),
            position: self.cursor.offset(),
        }
    }

    fn next_positional(&self, from: usize) -> Option<usize> {
        (from..self.slots.len()).find(|i| self.slots[*i].is_none())
    }

    /// An argument a name may still refer to: unbound, or holding its default.
    fn find_named<P: Fn(&Argument) -> bool>(&self, predicate: P) -> Option<usize> {
        self.command
            .arguments
            .iter()
            .enumerate()
            .find(|(i, a)| predicate(a) && self.slots[*i].as_ref().map_or(true, |s| !s.defined))
            .map(|(i, _)| i)
    }

    fn bind(&mut self, index: usize, input: Input, value: Value) {
        trace!("parse: {} {} = {}", self.command.name, self.command.arguments[index].name, input);
        self.slots[index] = Some(ArgumentContainer {
            argument: self.argument(index),
            input: Some(input),
            value: Some(value),
            defined: true,
        });
    }

    fn bind_default(&mut self, index: usize) {
        let argument = self.argument(index);
        trace!("parse: {} {} = default", self.command.name, argument.name);
        self.slots[index] = Some(ArgumentContainer {
            value: argument.default_value(),
            argument,
            input: None,
            defined: false,
        });
    }

    fn transform(&self, index: usize, input: &Input) -> Result<Value, ParseFail> {
        let argument = &self.command.arguments[index];
        argument
            .kind
            .transform(input)
            .map_err(|cause| ParseFail::ArgumentInputParseFail {
                command: self.command.clone(),
                argument: argument.clone(),
                input: input.clone(),
                cause,
                state: self.state(),
            })
    }

    /// Transforms the elements of a list input of a multiple argument. `None`
    /// if the input is not a list the element type accepts.
    fn transform_elements(&self, index: usize, input: &Input) -> Option<Result<Value, ParseFail>> {
        let kind = &self.command.arguments[index].kind;
        let items = input.as_list()?;
        if !items.iter().all(|item| kind.validate(item)) {
            return None;
        }

        let values = items
            .iter()
            .map(|item| self.transform(index, item))
            .collect::<Result<Vec<_>, _>>();
        Some(values.map(|values| kind.collect(values)))
    }

    fn invalid(&self, index: usize, input: Input) -> ParseFail {
        ParseFail::InvalidInputForArgument {
            command: self.command.clone(),
            argument: self.argument(index),
            input,
            state: self.state(),
        }
    }

    fn bind_one(&mut self, index: usize, token: Token) -> Result<(), ParseFail> {
        let argument = self.argument(index);
        if argument.kind.validate(&token.input) {
            self.cursor.advance();
            let value = self.transform(index, &token.input)?;
            self.bind(index, token.input, value);
        } else if argument.optional {
            // The same token is tried against the next argument.
            self.bind_default(index);
        } else {
            return Err(self.invalid(index, token.input));
        }

        Ok(())
    }

    /// A multiple argument takes the elements of a list input, or every
    /// following token its type accepts.
    fn bind_many(&mut self, index: usize, token: Token) -> Result<(), ParseFail> {
        let argument = self.argument(index);
        if !argument.kind.validate(&token.input) {
            if let Some(value) = self.transform_elements(index, &token.input) {
                let value = value?;
                self.cursor.advance();
                self.bind(index, token.input, value);
            } else if argument.optional {
                self.bind_default(index);
            } else {
                return Err(self.invalid(index, token.input));
            }
            return Ok(());
        }

        let mut inputs = Vec::new();
        let mut values = Vec::new();
        loop {
            let input = match self.cursor.peek() {
                Some(next) if is_value(next) && argument.kind.validate(&next.input) => next.input.clone(),
                _ => break,
            };

            values.push(self.transform(index, &input)?);
            self.cursor.advance();
            inputs.push(input);
        }

        let value = argument.kind.collect(values);
        self.bind(index, Input::List(inputs), value);
        Ok(())
    }

    /// Binds `input` to a named argument. The input must be valid even if
    /// the argument is optional.
    fn bind_strict(&mut self, index: usize, input: Input) -> Result<(), ParseFail> {
        let argument = self.argument(index);
        let value = if argument.kind.validate(&input) {
            let value = self.transform(index, &input)?;
            if argument.multiple {
                argument.kind.collect(vec![value])
            } else {
                value
            }
        } else if argument.multiple {
            match self.transform_elements(index, &input) {
                Some(value) => value?,
                None => return Err(self.invalid(index, input)),
            }
        } else {
            return Err(self.invalid(index, input));
        };

        self.bind(index, input, value);
        Ok(())
    }

    fn not_found(&self, name: String) -> ParseFail {
        ParseFail::ArgumentNotFound {
            command: self.command.clone(),
            name,
            state: self.state(),
        }
    }

    fn bind_named(&mut self, named: Named, input: Input) -> Result<(), ParseFail> {
        match named {
            Named::Long { name, value } => {
                let index = match self.find_named(|a| a.name == name) {
                    Some(index) => index,
                    None => return Err(self.not_found(name)),
                };
                match value {
                    Some(value) => self.bind_strict(index, Input::single(value)),
                    None => self.bind_flag(index),
                }
            }
            Named::Short(letters) => {
                let mut indexes = Vec::with_capacity(letters.len());
                for letter in letters {
                    match self.find_named(|a| a.short_name == Some(letter)) {
                        Some(index) => indexes.push(index),
                        None => return Err(self.not_found(letter.to_string())),
                    }
                }

                if indexes.len() == 1 {
                    return self.bind_flag(indexes[0]);
                }

                let arguments = &self.command.arguments;
                if let Some(bad) = indexes.iter().find(|i| !arguments[**i].is_boolean()) {
                    return Err(ParseFail::IncompatibleInputTypesForShortArguments {
                        command: self.command.clone(),
                        expected: arguments[indexes[0]].clone(),
                        incompatible: arguments[*bad].clone(),
                        input,
                        state: self.state(),
                    });
                }

                for index in indexes {
                    self.bind_strict(index, Input::single("true"))?;
                }
                Ok(())
            }
        }
    }

    /// `--name` or `-n`: the value is the next token. A boolean argument
    /// without a usable next token is set to `true`.
    fn bind_flag(&mut self, index: usize) -> Result<(), ParseFail> {
        let argument = self.argument(index);
        let next = self.cursor.peek().filter(|t| is_value(t)).map(|t| t.input.clone());
        match next {
            Some(input) if !argument.is_boolean() || argument.kind.validate(&input) => {
                self.cursor.advance();
                self.bind_strict(index, input)
            }
            _ if argument.is_boolean() => self.bind_strict(index, Input::single("true")),
            _ => Err(ParseFail::NoInputForArgument {
                command: self.command.clone(),
                argument,
                state: self.state(),
            }),
        }
    }

    fn finish(mut self) -> Result<CommandContainer, ParseFail> {
        let missing: Vec<usize> = (0..self.slots.len())
            .filter(|i| self.slots[*i].is_none() && !self.command.arguments[*i].optional)
            .collect();

        if let Some(first) = missing.first() {
            let at_separator = self.cursor.peek().map_or(false, is_separator);
            return Err(if at_separator {
                ParseFail::ArgumentsMissing {
                    command: self.command.clone(),
                    missing: missing.iter().map(|i| self.argument(*i)).collect(),
                    state: self.state(),
                }
            } else {
                ParseFail::NoInputForArgument {
                    command: self.command.clone(),
                    argument: self.argument(*first),
                    state: self.state(),
                }
            });
        }

        for index in 0..self.slots.len() {
            if self.slots[index].is_none() {
                self.bind_default(index);
            }
        }

        Ok(CommandContainer {
            id: self.id,
            command: self.command,
            arguments: self.slots.into_iter().flatten().collect(),
            handler: None,
        })
    }
}
