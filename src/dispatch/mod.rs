use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::argument::Value;
use crate::command::{CommandContainer, Container};
use crate::information::InformationProviders;
use crate::requirement::{self, Gate};

mod result;

pub use result::{CommandResult, ResultHandler};

/// Hooks around the dispatch of each command.
pub trait Interceptor: Send + Sync {
    /// Called before the gate runs with the container as parsed and the one
    /// returned by the previous interceptor. Returning `None` drops the
    /// command: it produces no results and the remaining interceptors are not
    /// called for it.
    fn pre_dispatch(
        &self,
        _original: &Arc<CommandContainer>,
        current: Arc<CommandContainer>,
    ) -> Option<Arc<CommandContainer>> {
        Some(current)
    }

    /// Observes the results of one command.
    fn post_dispatch(
        &self,
        _original: &Arc<CommandContainer>,
        _dispatched: &Arc<CommandContainer>,
        _results: &[CommandResult],
    ) {
    }
}

/// Sees every result of a dispatch call, once all commands have run.
pub trait DispatchHandler: Send + Sync {
    fn handle(&self, results: &[CommandResult]);
}

impl<F> DispatchHandler for F
where
    F: Fn(&[CommandResult]) + Send + Sync,
{
    fn handle(&self, results: &[CommandResult]) {
        self(results)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs parsed commands.
///
/// Interceptors and dispatch handlers may be (un)registered at any time;
/// a dispatch call works on the sets registered when it started.
#[derive(Default)]
pub struct Dispatcher {
    interceptors: Mutex<Vec<Arc<dyn Interceptor>>>,
    dispatch_handlers: Mutex<Vec<Arc<dyn DispatchHandler>>>,
}

impl Dispatcher {
    pub fn new() -> Dispatcher {
        Dispatcher::default()
    }

    /// Returns false if the interceptor is already registered.
    pub fn register_interceptor(&self, interceptor: Arc<dyn Interceptor>) -> bool {
        let mut interceptors = lock(&self.interceptors);
        if interceptors.iter().any(|i| Arc::ptr_eq(i, &interceptor)) {
            return false;
        }

        interceptors.push(interceptor);
        true
    }

    pub fn unregister_interceptor(&self, interceptor: &Arc<dyn Interceptor>) -> bool {
        let mut interceptors = lock(&self.interceptors);
        let before = interceptors.len();
        interceptors.retain(|i| !Arc::ptr_eq(i, interceptor));
        interceptors.len() != before
    }

    pub fn register_dispatch_handler(&self, handler: Arc<dyn DispatchHandler>) -> bool {
        let mut handlers = lock(&self.dispatch_handlers);
        if handlers.iter().any(|h| Arc::ptr_eq(h, &handler)) {
            return false;
        }

        handlers.push(handler);
        true
    }

    pub fn unregister_dispatch_handler(&self, handler: &Arc<dyn DispatchHandler>) -> bool {
        let mut handlers = lock(&self.dispatch_handlers);
        let before = handlers.len();
        handlers.retain(|h| !Arc::ptr_eq(h, handler));
        handlers.len() != before
    }

    /// Dispatches the commands in order. The results of one command are
    /// contiguous and follow the results of the commands before it.
    pub fn dispatch(&self, containers: Vec<CommandContainer>, info: &InformationProviders) -> Vec<CommandResult> {
        let interceptors = lock(&self.interceptors).clone();
        let dispatch_handlers = lock(&self.dispatch_handlers).clone();

        let mut results = Vec::new();
        for container in containers {
            let original = Arc::new(container);
            let dispatched = match intercept(&interceptors, &original) {
                Some(dispatched) => dispatched,
                None => {
                    debug!("dispatch: `{}` dropped by an interceptor", original.command.name);
                    continue;
                }
            };

            let bucket = dispatch_command(&dispatched, info);
            for interceptor in &interceptors {
                interceptor.post_dispatch(&original, &dispatched, &bucket);
            }

            results.extend(bucket);
        }

        if !results.is_empty() {
            for handler in &dispatch_handlers {
                handler.handle(&results);
            }
        }

        results
    }
}

fn intercept(interceptors: &[Arc<dyn Interceptor>], original: &Arc<CommandContainer>) -> Option<Arc<CommandContainer>> {
    let mut current = original.clone();
    for interceptor in interceptors {
        current = interceptor.pre_dispatch(original, current)?;
    }

    Some(current)
}

fn push_gate_results(bucket: &mut Vec<CommandResult>, gate: Gate, container: Container) {
    if !gate.unsatisfied.is_empty() {
        bucket.push(CommandResult::UnsatisfiedRequirements {
            unsatisfied: gate.unsatisfied,
            container: container.clone(),
        });
    }

    if !gate.missing.is_empty() {
        bucket.push(CommandResult::MissingInformation {
            missing: gate.missing,
            requester: container,
        });
    }
}

/// Runs the gates and handlers of one command. Results come in this order:
/// the command gate, then per argument (in declaration order) its gate or
/// its handler, then the command handler.
fn dispatch_command(container: &Arc<CommandContainer>, info: &InformationProviders) -> Vec<CommandResult> {
    let command = &container.command;
    let mut bucket = Vec::new();

    let gate = requirement::check(&command.requirements, &command.required_info, None, container, info);
    if !gate.passed() {
        debug!("dispatch: `{}` did not pass its gate", command.name);
        push_gate_results(&mut bucket, gate, Container::Command(container.clone()));
        return bucket;
    }

    // Every argument gate is checked before any handler runs.
    let gates: Vec<Gate> = container
        .arguments
        .iter()
        .map(|arg| {
            requirement::check(
                &arg.argument.requirements,
                &arg.argument.required_info,
                arg.value.as_ref(),
                container,
                info,
            )
        })
        .collect();
    let gate_failed = gates.iter().any(|g| !g.passed());

    let mut cancelled = false;
    for (index, (arg, gate)) in container.arguments.iter().zip(gates).enumerate() {
        let arg_container = Container::Argument {
            command: container.clone(),
            index,
        };

        if !gate.passed() {
            debug!("dispatch: argument `{}` did not pass its gate", arg.name());
            push_gate_results(&mut bucket, gate, arg_container);
            continue;
        }

        if let Some(handler) = &arg.argument.handler {
            trace!("dispatch: argument handler of `{}`", arg.name());
            let mut results = ResultHandler::new(arg_container);
            if let Some(value) = handler.handle(arg, container, info, &mut results) {
                push_returned(&mut results, value);
            }

            let (results, cancel) = results.into_results();
            bucket.extend(results);
            cancelled |= cancel;
        }
    }

    if gate_failed || cancelled {
        debug!(
            "dispatch: skipping the handler of `{}` (gate_failed={}, cancelled={})",
            command.name, gate_failed, cancelled
        );
        return bucket;
    }

    if let Some(handler) = container.handler() {
        trace!("dispatch: handler of `{}`", command.name);
        let mut results = ResultHandler::new(Container::Command(container.clone()));
        if let Some(value) = handler.handle(container, info, &mut results) {
            push_returned(&mut results, value);
        }

        bucket.extend(results.into_results().0);
    }

    bucket
}

/// A handler returning `()` produced nothing.
fn push_returned(results: &mut ResultHandler, value: Value) {
    if !value.is::<()>() {
        results.result(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::{types, value, Argument};
    use crate::command::{ArgumentContainer, Command, CommandManager};
    use crate::requirement::{Requirement, RequirementSubject};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn bind(manager: &CommandManager, name: &str, values: Vec<Option<i64>>) -> CommandContainer {
        let id = manager.find_root(name, None).unwrap();
        let command = manager.command(id).unwrap().clone();
        let arguments = command
            .arguments
            .iter()
            .zip(values)
            .map(|(argument, v)| ArgumentContainer {
                argument: argument.clone(),
                input: None,
                value: v.map(value),
                defined: v.is_some(),
            })
            .collect();
        CommandContainer {
            id,
            command,
            arguments,
            handler: None,
        }
    }

    fn kinds(results: &[CommandResult]) -> Vec<&'static str> {
        results
            .iter()
            .map(|r| match r {
                CommandResult::Value { .. } => "value",
                CommandResult::UnsatisfiedRequirements { .. } => "unsatisfied",
                CommandResult::MissingInformation { .. } => "missing",
            })
            .collect()
    }

    fn positive() -> Requirement {
        Requirement::typed::<i64, i64, _>(0, RequirementSubject::Own, |min, v| v > min)
    }

    #[test]
    fn unsatisfied_command_requirement_skips_everything() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        let mut manager = CommandManager::new();
        manager.register(
            Command::new("admin")
                .with_requirement(Requirement::information::<String, String, _>(
                    &["role"],
                    "admin".to_owned(),
                    |required, role| role == required,
                ))
                .with_handler(move |_, _, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Some(value(1))
                }),
            "test",
        );

        let mut info = InformationProviders::new();
        info.register_value(&["role"], "guest".to_owned());
        let results = Dispatcher::new().dispatch(vec![bind(&manager, "admin", vec![])], &info);

        assert_eq!(kinds(&results), vec!["unsatisfied"]);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert!(results[0].root().is_none());
    }

    #[test]
    fn cancellation_only_suppresses_the_command_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (c1, c2, c3) = (calls.clone(), calls.clone(), calls.clone());
        let mut manager = CommandManager::new();
        manager.register(
            Command::new("cmd")
                .with_argument(Argument::new("a", types::integer::<i64>()).with_handler(
                    move |_, _, _, results| {
                        c1.fetch_add(1, Ordering::SeqCst);
                        results.cancel();
                        None
                    },
                ))
                .with_argument(Argument::new("b", types::integer::<i64>()).with_handler(
                    move |arg, _, _, _| {
                        c2.fetch_add(1, Ordering::SeqCst);
                        arg.value::<i64>().map(|v| value(*v * 10))
                    },
                ))
                .with_handler(move |_, _, _| {
                    c3.fetch_add(100, Ordering::SeqCst);
                    None
                }),
            "test",
        );

        let results = Dispatcher::new().dispatch(
            vec![bind(&manager, "cmd", vec![Some(1), Some(2)])],
            &InformationProviders::new(),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(kinds(&results), vec!["value"]);
        assert_eq!(results[0].value::<i64>(), Some(&20));
        assert_eq!(results[0].container().argument().map(|a| a.name()), Some("b"));
        assert!(results[0].root().is_some());
    }

    #[test]
    fn argument_gates_run_before_handlers() {
        let mut manager = CommandManager::new();
        manager.register(
            Command::new("cmd")
                .with_argument(
                    Argument::new("a", types::integer::<i64>())
                        .with_requirement(positive())
                        .with_handler(|_, _, _, _| Some(value("a"))),
                )
                .with_argument(
                    Argument::new("b", types::integer::<i64>())
                        .with_requirement(positive())
                        .with_handler(|_, _, _, _| Some(value("b"))),
                )
                .with_handler(|_, _, _| Some(value("cmd"))),
            "test",
        );

        let results = Dispatcher::new().dispatch(
            vec![bind(&manager, "cmd", vec![Some(1), Some(-1)])],
            &InformationProviders::new(),
        );
        assert_eq!(kinds(&results), vec!["value", "unsatisfied"]);
        assert_eq!(results[0].value::<&str>(), Some(&"a"));

        let results = Dispatcher::new().dispatch(
            vec![bind(&manager, "cmd", vec![Some(1), Some(2)])],
            &InformationProviders::new(),
        );
        assert_eq!(kinds(&results), vec!["value", "value", "value"]);
        assert_eq!(results[2].value::<&str>(), Some(&"cmd"));
    }

    #[test]
    fn missing_information() {
        let mut manager = CommandManager::new();
        manager.register(
            Command::new("cmd")
                .with_required_info(crate::information::RequiredInformation::new::<u8>(&["x"]))
                .with_handler(|_, _, _| Some(value("ran"))),
            "test",
        );

        let results = Dispatcher::new().dispatch(vec![bind(&manager, "cmd", vec![])], &InformationProviders::new());
        assert_eq!(kinds(&results), vec!["missing"]);

        let mut info = InformationProviders::new();
        info.register_value(&["x"], 1u8);
        let results = Dispatcher::new().dispatch(vec![bind(&manager, "cmd", vec![])], &info);
        assert_eq!(kinds(&results), vec!["value"]);
    }

    #[test]
    fn unit_returns_produce_no_result() {
        let mut manager = CommandManager::new();
        manager.register(
            Command::new("noop")
                .with_argument(Argument::new("n", types::integer::<i64>()).with_handler(|_, _, _, _| Some(value(()))))
                .with_handler(|_, _, _| Some(value(()))),
            "test",
        );

        let results = Dispatcher::new().dispatch(
            vec![bind(&manager, "noop", vec![Some(1)])],
            &InformationProviders::new(),
        );
        assert!(results.is_empty());
    }

    #[test]
    fn handlers_report_gate_failures() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        let mut manager = CommandManager::new();
        manager.register(
            Command::new("cmd")
                .with_argument(Argument::new("a", types::integer::<i64>()).with_handler(
                    |_, _, _, results| {
                        results.requirements_unsatisfied(Vec::new(), false);
                        assert!(!results.should_cancel());
                        results.result(value("reported"));
                        None
                    },
                ))
                .with_argument(Argument::new("b", types::integer::<i64>()).with_handler(
                    |_, _, _, results| {
                        let missing = crate::information::RequiredInformation::new::<String>(&["token"]);
                        results.information_missing(vec![missing], true);
                        assert!(results.should_cancel());
                        assert_eq!(kinds(results.results()), vec!["missing"]);
                        Some(value("returned"))
                    },
                ))
                .with_handler(move |_, _, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Some(value("cmd"))
                }),
            "test",
        );

        let results = Dispatcher::new().dispatch(
            vec![bind(&manager, "cmd", vec![Some(1), Some(2)])],
            &InformationProviders::new(),
        );
        assert_eq!(kinds(&results), vec!["unsatisfied", "value", "missing", "value"]);
        assert_eq!(results[1].value::<&str>(), Some(&"reported"));
        assert_eq!(results[3].value::<&str>(), Some(&"returned"));
        assert_eq!(results[2].container().argument().map(|a| a.name()), Some("b"));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    struct Recorder {
        drop_name: &'static str,
        seen: Mutex<Vec<(String, usize)>>,
    }

    impl Interceptor for Recorder {
        fn pre_dispatch(
            &self,
            original: &Arc<CommandContainer>,
            current: Arc<CommandContainer>,
        ) -> Option<Arc<CommandContainer>> {
            if original.command.name.as_str() == self.drop_name {
                None
            } else {
                Some(current)
            }
        }

        fn post_dispatch(
            &self,
            _original: &Arc<CommandContainer>,
            dispatched: &Arc<CommandContainer>,
            results: &[CommandResult],
        ) {
            lock(&self.seen).push((dispatched.command.name.to_string(), results.len()));
        }
    }

    #[test]
    fn interceptors_and_batch_order() {
        let mut manager = CommandManager::new();
        for name in &["one", "two", "three"] {
            let label = *name;
            manager.register(
                Command::new(*name)
                    .with_argument(
                        Argument::new("n", types::integer::<i64>())
                            .with_handler(move |_, _, _, _| Some(value(format!("{}:arg", label)))),
                    )
                    .with_handler(move |_, _, _| Some(value(format!("{}:cmd", label)))),
                "test",
            );
        }

        let recorder = Arc::new(Recorder {
            drop_name: "two",
            seen: Mutex::new(Vec::new()),
        });
        let batches = Arc::new(AtomicUsize::new(0));
        let batch_counter = batches.clone();
        let dispatcher = Dispatcher::new();
        let interceptor: Arc<dyn Interceptor> = recorder.clone();
        assert!(dispatcher.register_interceptor(interceptor.clone()));
        assert!(!dispatcher.register_interceptor(interceptor.clone()));
        let handler: Arc<dyn DispatchHandler> = Arc::new(move |results: &[CommandResult]| {
            batch_counter.fetch_add(results.len(), Ordering::SeqCst);
        });
        assert!(dispatcher.register_dispatch_handler(handler.clone()));

        let containers = vec![
            bind(&manager, "one", vec![Some(1)]),
            bind(&manager, "two", vec![Some(2)]),
            bind(&manager, "three", vec![Some(3)]),
        ];
        let results = dispatcher.dispatch(containers, &InformationProviders::new());
        let values: Vec<&str> = results
            .iter()
            .filter_map(|r| r.value::<String>().map(String::as_str))
            .collect();

        assert_eq!(values, vec!["one:arg", "one:cmd", "three:arg", "three:cmd"]);
        assert_eq!(
            *lock(&recorder.seen),
            vec![("one".to_owned(), 2), ("three".to_owned(), 2)]
        );
        assert_eq!(batches.load(Ordering::SeqCst), 4);

        assert!(dispatcher.unregister_interceptor(&interceptor));
        assert!(dispatcher.unregister_dispatch_handler(&handler));
        assert!(!dispatcher.unregister_dispatch_handler(&handler));
        let results = dispatcher.dispatch(
            vec![bind(&manager, "two", vec![Some(2)])],
            &InformationProviders::new(),
        );
        assert_eq!(results.len(), 2);
        assert_eq!(batches.load(Ordering::SeqCst), 4);
    }
}
