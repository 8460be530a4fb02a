#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;

#[macro_use]
mod macros;
mod builtins;
mod mainloop;

use std::path::PathBuf;
use std::process;

use cmdtree::config::{Config, ConfigError};
use cmdtree::{CommandProcessor, UnresolvedDependencies};
use structopt::StructOpt;
use thiserror::Error;

#[derive(Debug, StructOpt)]
#[structopt(name = "cmdtree", about = "An interactive command console.")]
struct Opt {
    /// Runs the commands in the file, one line at a time.
    #[structopt(parse(from_os_str))]
    script: Option<PathBuf>,

    /// The config file. Defaults to `~/.cmdtree.toml`.
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Only the commands of this owner can be run.
    #[structopt(long)]
    owner: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Commands(#[from] UnresolvedDependencies),
    #[error("failed to initialize the logger: {0}")]
    Logger(#[from] fern::InitError),
}

fn run(opt: Opt) -> Result<i32, ConsoleError> {
    let mut config = match &opt.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default()?,
    };

    if let Some(owner) = opt.owner {
        config.owner = owner;
    }

    cmdtree::logger::install_logger(&config.log)?;
    info!("cmdtree: starting (owner={})", config.owner);

    let settings = builtins::settings(&config);
    let mut processor = CommandProcessor::new();
    let registered = builtins::register(processor.manager_mut(), &config.owner, &settings)?;
    debug!("cmdtree: {} commands registered", registered.len());

    let console = mainloop::Console::new(processor, &config.owner, settings);
    match opt.script {
        Some(script) => console.run_script(&script),
        None => console.run_interactive(),
    }
}

fn main() {
    let opt = Opt::from_args();
    match run(opt) {
        Ok(code) => process::exit(code),
        Err(err) => {
            print_err!("{}", err);
            process::exit(1);
        }
    }
}
