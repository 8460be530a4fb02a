//! Commands of the interactive console.
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cmdtree::argument::value;
use cmdtree::config::Config;
use cmdtree::information::InformationProvider;
use cmdtree::queue::CreatedCommands;
use cmdtree::{
    types, Argument, Command, CommandFactoryQueue, CommandId, CommandManager, Information,
    InformationId, InformationProviders, Placement, RequiredInformation, Requirement,
    RequirementSubject, UnresolvedDependencies, Value,
};

/// Returned by `exit`. Ends the console with the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exit(pub i32);

/// Console settings changed by `config set`.
pub type Settings = Arc<Mutex<BTreeMap<String, String>>>;

pub const SETTING_KEYS: &[&str] = &["prompt", "echo_results"];

pub fn settings(config: &Config) -> Settings {
    let mut settings = BTreeMap::new();
    settings.insert("prompt".to_owned(), config.prompt.clone());
    settings.insert("echo_results".to_owned(), config.echo_results.to_string());
    Arc::new(Mutex::new(settings))
}

pub fn lock(settings: &Settings) -> MutexGuard<'_, BTreeMap<String, String>> {
    settings.lock().unwrap_or_else(PoisonError::into_inner)
}

type Builtin = fn() -> Command;
lazy_static! {
    static ref BUILTINS: BTreeMap<&'static str, Builtin> = {
        let mut builtins: BTreeMap<&'static str, Builtin> = BTreeMap::new();
        builtins.insert("echo", echo);
        builtins.insert("exit", exit);
        builtins.insert("help", help);
        builtins.insert("pwd", pwd);
        builtins.insert("sum", sum);
        builtins.insert("whoami", whoami);
        builtins
    };
}

fn echo() -> Command {
    Command::new("echo")
        .with_description("Prints its arguments.")
        .with_argument(Argument::new("words", types::string()).multiple().optional())
        .with_argument(
            Argument::new("upper", types::boolean())
                .optional()
                .with_description("Print in upper case."),
        )
        .with_handler(|c, _, _| {
            let words = c.value::<Vec<String>>("words")?.join(" ");
            if c.value::<bool>("upper") == Some(&true) {
                Some(value(words.to_uppercase()))
            } else {
                Some(value(words))
            }
        })
}

fn exit() -> Command {
    let in_range = Requirement::typed::<i32, (i32, i32), _>((0, 255), RequirementSubject::Own, |range, code| {
        *code >= range.0 && *code <= range.1
    })
    .with_description("the exit code must be within 0..=255");

    Command::new("exit")
        .with_alias("quit")
        .with_description("Leaves the console.")
        .with_argument(
            Argument::new("code", types::integer::<i32>())
                .optional()
                .with_default(0i32)
                .with_requirement(in_range),
        )
        .with_handler(|c, _, _| Some(value(Exit(*c.value::<i32>("code")?))))
}

fn help() -> Command {
    Command::new("help")
        .with_description("Lists the commands.")
        .with_argument(Argument::new("prefix", types::string()).optional())
        .with_required_info(RequiredInformation::new::<Vec<String>>(&["commands"]).without_providers())
        .with_handler(|c, info, _| {
            let lines = info.get::<Vec<String>>(&["commands"])?;
            let prefix = c.value::<String>("prefix").map(String::as_str).unwrap_or("");
            let lines: Vec<String> = lines.into_iter().filter(|l| l.starts_with(prefix)).collect();
            Some(value(lines.join("\n")))
        })
}

fn pwd() -> Command {
    Command::new("pwd")
        .with_description("Prints the working directory.")
        .with_required_info(RequiredInformation::new::<PathBuf>(&["cwd"]))
        .with_handler(|_, info, _| {
            let dir = info.get::<PathBuf>(&["cwd"])?;
            Some(value(dir.display().to_string()))
        })
}

fn sum() -> Command {
    Command::new("sum")
        .with_alias("add")
        .with_description("Adds integers.")
        .with_argument(Argument::new("numbers", types::integer::<i64>()).multiple())
        .with_handler(|c, _, _| {
            let numbers = c.value::<Vec<i64>>("numbers")?;
            match numbers.iter().try_fold(0i64, |acc, n| acc.checked_add(*n)) {
                Some(total) => Some(value(total)),
                None => Some(value("sum: the result does not fit in 64 bits".to_owned())),
            }
        })
}

fn whoami() -> Command {
    Command::new("whoami")
        .with_description("Prints the user running the console.")
        .with_required_info(RequiredInformation::new::<String>(&["user"]))
        .with_handler(|_, info, _| info.get::<String>(&["user"]).map(value))
}

fn config(settings: Settings) -> Command {
    Command::new("config")
        .with_description("Lists the settings.")
        .with_handler(move |_, _, _| {
            let lines: Vec<String> = lock(&settings)
                .iter()
                .map(|(key, val)| format!("{} = {:?}", key, val))
                .collect();
            Some(value(lines.join("\n")))
        })
}

fn config_get(settings: Settings) -> Command {
    Command::new("get")
        .with_description("Prints a setting.")
        .with_argument(Argument::new("key", types::one_of(SETTING_KEYS)))
        .with_handler(move |c, _, _| {
            let key = c.value::<String>("key")?;
            lock(&settings).get(key).cloned().map(value)
        })
}

fn config_set(settings: Settings) -> Command {
    let not_empty = Requirement::typed::<String, (), _>(
        (),
        RequirementSubject::Argument("value".to_owned()),
        |_, val| !val.is_empty(),
    )
    .with_description("the value must not be empty");

    Command::new("set")
        .with_description("Changes a setting.")
        .with_argument(Argument::new("key", types::one_of(SETTING_KEYS)))
        .with_argument(Argument::new("value", types::string()))
        .with_requirement(not_empty)
        .with_handler(move |c, _, _| {
            let key = c.value::<String>("key")?;
            let val = c.value::<String>("value")?;
            lock(&settings).insert(key.clone(), val.clone());
            Some(value(format!("{} = {:?}", key, val)))
        })
}

/// Queues a sub-command of `config`. It is declared before `config` itself
/// and built once `config` exists.
fn queue_config_command(
    queue: &mut CommandFactoryQueue,
    manager: &mut CommandManager,
    name: &str,
    build: fn(Settings) -> Command,
    settings: &Settings,
) {
    let settings = settings.clone();
    queue.queue_command(
        manager,
        "builtins.rs",
        name,
        move |created: &CreatedCommands<'_>| {
            let placement = created
                .find("config")
                .map_or(Placement::Root, Placement::SubCommandOf);
            (build(settings), placement)
        },
        |created: &CreatedCommands<'_>| created.contains("config"),
        || "config".to_owned(),
    );
}

pub fn register(
    manager: &mut CommandManager,
    owner: &str,
    settings: &Settings,
) -> Result<Vec<CommandId>, UnresolvedDependencies> {
    let mut ids = Vec::new();
    for (name, builtin) in BUILTINS.iter() {
        trace!("builtins: registering {}", name);
        ids.push(manager.register(builtin(), owner));
    }

    let mut queue = CommandFactoryQueue::new(owner);
    queue_config_command(&mut queue, manager, "get", config_get, settings);
    queue_config_command(&mut queue, manager, "set", config_set, settings);
    let root = settings.clone();
    queue.queue_command(
        manager,
        "builtins.rs",
        "config",
        move |_: &CreatedCommands<'_>| (config(root), Placement::Root),
        |_: &CreatedCommands<'_>| true,
        String::new,
    );

    ids.extend(queue.resolve(manager)?);
    Ok(ids)
}

/// One line per command: its path, its arguments and its description.
pub fn help_lines(manager: &CommandManager) -> Vec<String> {
    manager
        .all_commands()
        .into_iter()
        .filter_map(|id| {
            let command = manager.command(id)?;
            let mut line = manager.tree().path(id).join(" ");
            for argument in &command.arguments {
                line.push(' ');
                line.push_str(&argument.to_string());
            }
            if !command.description.is_empty() {
                line.push_str("  -- ");
                line.push_str(&command.description);
            }
            Some(line)
        })
        .collect()
}

fn cwd_provider(id: &InformationId, _: &InformationProviders) -> Option<Information> {
    if !id.accepts(&InformationId::new::<PathBuf>(&["cwd"])) {
        return None;
    }

    std::env::current_dir()
        .ok()
        .map(|dir| Information::new(&["cwd"], dir).with_description("working directory"))
}

/// The information every line is dispatched with.
pub fn information(manager: &CommandManager) -> InformationProviders {
    let mut info = InformationProviders::new();
    if let Ok(user) = std::env::var("USER") {
        info.register_value(&["user"], user);
    }

    info.register_value(&["commands"], help_lines(manager));
    let cwd: Arc<dyn InformationProvider> = Arc::new(cwd_provider);
    info.register_provider(cwd);
    info
}

/// Renders a value result for the terminal.
pub fn render(v: &Value) -> Option<String> {
    if let Some(s) = v.downcast_ref::<String>() {
        Some(s.clone())
    } else if let Some(n) = v.downcast_ref::<i64>() {
        Some(n.to_string())
    } else if let Some(n) = v.downcast_ref::<f64>() {
        Some(n.to_string())
    } else {
        v.downcast_ref::<bool>().map(|b| b.to_string())
    }
}
