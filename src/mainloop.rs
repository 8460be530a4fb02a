use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use cmdtree::{
    CommandContainer, CommandProcessor, CommandResult, InformationProviders, Interceptor, ParseFail,
};

use crate::builtins::{self, Exit, Settings};
use crate::ConsoleError;

/// Logs every dispatched command.
struct Trace;

impl Interceptor for Trace {
    fn pre_dispatch(
        &self,
        _original: &Arc<CommandContainer>,
        current: Arc<CommandContainer>,
    ) -> Option<Arc<CommandContainer>> {
        debug!("mainloop: dispatching {:?}", current);
        Some(current)
    }

    fn post_dispatch(
        &self,
        _original: &Arc<CommandContainer>,
        dispatched: &Arc<CommandContainer>,
        results: &[CommandResult],
    ) {
        trace!("mainloop: {} produced {} results", dispatched.command.name, results.len());
    }
}

pub struct Console {
    processor: CommandProcessor,
    owner: String,
    settings: Settings,
    info: InformationProviders,
}

impl Console {
    pub fn new(processor: CommandProcessor, owner: &str, settings: Settings) -> Console {
        processor.dispatcher().register_interceptor(Arc::new(Trace));
        let info = builtins::information(processor.manager());
        Console {
            processor,
            owner: owner.to_owned(),
            settings,
            info,
        }
    }

    fn setting(&self, key: &str) -> Option<String> {
        builtins::lock(&self.settings).get(key).cloned()
    }

    fn prompt(&self) -> String {
        self.setting("prompt").unwrap_or_default()
    }

    fn echo_results(&self) -> bool {
        self.setting("echo_results")
            .map_or(true, |v| matches!(v.to_ascii_lowercase().as_str(), "true" | "yes" | "on" | "1"))
    }

    /// Runs one line. Returns the exit code if `exit` was run.
    pub fn run_line(&self, line: &str) -> Result<Option<i32>, ParseFail> {
        let results = self
            .processor
            .parse_and_dispatch(line, Some(&self.owner), &self.info)?;

        let echo = self.echo_results();
        for result in &results {
            match result {
                CommandResult::Value { value, .. } => {
                    if let Some(Exit(code)) = value.downcast_ref::<Exit>() {
                        return Ok(Some(*code));
                    }

                    if echo {
                        if let Some(text) = builtins::render(value) {
                            println!("{}", text);
                        }
                    }
                }
                CommandResult::UnsatisfiedRequirements { unsatisfied, container } => {
                    for u in unsatisfied {
                        print_err!(
                            "{}: {} ({})",
                            container.command().command.name,
                            u.requirement.description,
                            u.subject
                        );
                    }
                }
                CommandResult::MissingInformation { missing, requester } => {
                    for m in missing {
                        print_err!("{}: missing information {}", requester.command().command.name, m.id);
                    }
                }
            }
        }

        Ok(None)
    }

    fn report(&self, line: &str, err: &ParseFail) {
        print_err!("{}", err);
        eprintln!("  {}", line);
        eprintln!("  {}^", " ".repeat(err.position()));
    }

    pub fn run_interactive(&self) -> Result<i32, ConsoleError> {
        let stdin = io::stdin();
        let mut line = String::new();
        loop {
            print!("{}", self.prompt());
            io::stdout().flush()?;

            line.clear();
            if stdin.lock().read_line(&mut line)? == 0 {
                println!();
                return Ok(0);
            }

            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            match self.run_line(input) {
                Ok(Some(code)) => return Ok(code),
                Ok(None) => (),
                Err(err) => self.report(input, &err),
            }
        }
    }

    /// Runs each line of a script. Empty lines and lines starting with `#`
    /// are skipped; the script stops at the first line that fails to parse.
    pub fn run_script(&self, path: &Path) -> Result<i32, ConsoleError> {
        let script = fs::read_to_string(path)?;
        for (lineno, line) in script.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match self.run_line(line) {
                Ok(Some(code)) => return Ok(code),
                Ok(None) => (),
                Err(err) => {
                    print_err!("{}:{}: {}", path.display(), lineno + 1, err);
                    return Ok(1);
                }
            }
        }

        Ok(0)
    }
}
