//! Turns a line into command containers.
//!
//! A line holds one or more commands. Each command is a top-level command
//! name, optionally followed by sub-command names, then its arguments:
//!
//! ```text
//! config set --key=prompt "$ " & echo done
//! ```
//!
//! An unquoted `&` ends the arguments of a command. Without it, the tokens
//! left after the arguments are bound start the next command.
use crate::command::{CommandContainer, CommandId, CommandManager};
use crate::tokenizer::{Token, TokenCursor};

mod arguments;
mod fail;

use arguments::ArgumentParser;
pub use fail::{ParseFail, ParseState};

pub const SEPARATOR: &str = "&";

pub(crate) fn is_separator(token: &Token) -> bool {
    token.bare_word() == Some(SEPARATOR)
}

/// Parses `raw` against the top-level commands of `owner`, or of every
/// owner if `owner` is `None`.
pub fn parse(manager: &CommandManager, raw: &str, owner: Option<&str>) -> Result<Vec<CommandContainer>, ParseFail> {
    let owner = owner.map(str::to_owned);
    parse_with_owner_fn(manager, raw, &|_: &str| owner.clone())
}

/// Like [`parse`], but the owner is picked per command by `owner_of`, which
/// is given the word naming the top-level command.
pub fn parse_with_owner_fn(
    manager: &CommandManager,
    raw: &str,
    owner_of: &dyn Fn(&str) -> Option<String>,
) -> Result<Vec<CommandContainer>, ParseFail> {
    let mut cursor = TokenCursor::parse(raw)?;
    trace!("parse: {:?} ({} tokens)", raw, cursor.tokens().len());

    let mut parsed = Vec::new();
    loop {
        let token = match cursor.peek() {
            Some(token) => token.clone(),
            None => break,
        };

        if is_separator(&token) {
            cursor.advance();
            continue;
        }

        let found = token.input.as_single().and_then(|word| {
            let owner = owner_of(word);
            manager.find_root(word, owner.as_deref())
        });
        let root = match found {
            Some(root) => root,
            None => {
                return Err(ParseFail::CommandNotFound {
                    input: token.input,
                    state: ParseState {
                        position: cursor.offset(),
                        parsed,
                        arguments: Vec::new(),
                    },
                })
            }
        };

        cursor.advance();
        let id = descend(manager, root, &mut cursor, &mut parsed);
        let command = match manager.command(id) {
            Some(command) => command.clone(),
            None => break,
        };

        trace!("parse: matched {:?}", manager.tree().path(id));
        let container = ArgumentParser::new(id, command, &mut cursor, &parsed).parse()?;
        parsed.push(container);
    }

    Ok(parsed)
}

/// Follows sub-command names from `id`. A command without arguments may be
/// followed by a sub-command of one of its ancestors; it is then emitted on
/// its own and the walk continues from that sibling.
fn descend(
    manager: &CommandManager,
    mut id: CommandId,
    cursor: &mut TokenCursor,
    parsed: &mut Vec<CommandContainer>,
) -> CommandId {
    loop {
        let word = match cursor.peek() {
            Some(token) if !is_separator(token) => match token.input.as_single() {
                Some(word) => word.to_owned(),
                None => return id,
            },
            _ => return id,
        };

        if let Some(sub) = manager.find_sub_command(id, &word) {
            cursor.advance();
            id = sub;
            continue;
        }

        let command = match manager.command(id) {
            Some(command) if command.arguments.is_empty() => command.clone(),
            _ => return id,
        };

        let sibling = manager
            .tree()
            .ancestors(id)
            .into_iter()
            .find_map(|ancestor| manager.find_sub_command(ancestor, &word));
        match sibling {
            Some(sibling) => {
                trace!("parse: {} followed by sibling {}", command.name, word);
                parsed.push(CommandContainer {
                    id,
                    command,
                    arguments: Vec::new(),
                    handler: None,
                });
                cursor.advance();
                id = sibling;
            }
            None => return id,
        }
    }
}
