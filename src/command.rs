//! Clap-backed command execution
//!
//! A [`Command`] describes one named command: its aliases, its arguments, its
//! subcommands and the handler that runs it. Executing a command builds the
//! matching `clap::Command` tree, parses the full argument vector and runs the
//! handler of the deepest matched subcommand.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::builder::StyledStr;
use clap::{Arg, ArgMatches};
use log::debug;
use thiserror::Error;

use crate::registry::{Invocable, Registry};

/// Error returned by a command handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// The behavior behind a command.
pub type Handler = Arc<dyn Fn(&mut Context<'_>, &ArgMatches) -> Result<(), HandlerError> + Send + Sync>;

type ExecutableLocator<'a> = Box<dyn Fn() -> io::Result<PathBuf> + 'a>;

/// Generated by clap for every command with subcommands.
const HELP_SUBCOMMAND: &str = "help";

/// Errors that can occur while executing a resolved command
#[derive(Error, Debug)]
pub enum ExecError {
    /// The arguments did not parse: unknown subcommand, invalid value, missing argument
    #[error(transparent)]
    Usage(#[from] clap::Error),
    #[error("{command}: {source}")]
    Failed {
        command: String,
        #[source]
        source: HandlerError,
    },
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

/// Everything a handler may touch besides its parsed arguments.
pub struct Context<'a> {
    out: &'a mut dyn Write,
    err: &'a mut dyn Write,
    color: bool,
    registry: Option<&'a Registry<Command>>,
    locate_executable: ExecutableLocator<'a>,
}

impl<'a> Context<'a> {
    /// Create a context writing to `out` and `err`, without color, locating the
    /// executable through `std::env::current_exe`.
    pub fn new(out: &'a mut dyn Write, err: &'a mut dyn Write) -> Self {
        Self {
            out,
            err,
            color: false,
            registry: None,
            locate_executable: Box::new(std::env::current_exe),
        }
    }

    #[must_use]
    pub fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Expose the registry of the multi-call binary the handler runs in.
    #[must_use]
    pub fn registry(mut self, registry: &'a Registry<Command>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replace how the running executable is located.
    #[must_use]
    pub fn locate_executable(mut self, locate: impl Fn() -> io::Result<PathBuf> + 'a) -> Self {
        self.locate_executable = Box::new(locate);
        self
    }

    pub fn stdout(&mut self) -> &mut (dyn Write + 'a) {
        &mut *self.out
    }

    pub fn stderr(&mut self) -> &mut (dyn Write + 'a) {
        &mut *self.err
    }

    #[must_use]
    pub fn use_color(&self) -> bool {
        self.color
    }

    #[must_use]
    pub fn registered(&self) -> Option<&'a Registry<Command>> {
        self.registry
    }

    /// Path of the running executable.
    ///
    /// # Errors
    ///
    /// Returns the locator's error if the path cannot be determined.
    pub fn current_exe(&self) -> io::Result<PathBuf> {
        (self.locate_executable)()
    }
}

/// A named command that can be registered, resolved, installed and executed.
#[derive(Clone, Default)]
pub struct Command {
    name: String,
    aliases: Vec<String>,
    about: Option<String>,
    args: Vec<Arg>,
    subcommands: Vec<Command>,
    handler: Option<Handler>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("subcommands", &self.subcommands)
            .field("has_handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}

impl Command {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    #[must_use]
    pub fn arg(mut self, arg: Arg) -> Self {
        self.args.push(arg);
        self
    }

    /// Attach a subcommand, replacing any existing subcommand of the same name.
    #[must_use]
    pub fn subcommand(mut self, cmd: Command) -> Self {
        self.subcommands.retain(|existing| existing.name != cmd.name);
        self.subcommands.push(cmd);
        self
    }

    /// Set the behavior. A command without one prints its help when executed.
    #[must_use]
    pub fn run<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut Context<'_>, &ArgMatches) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    #[must_use]
    pub fn get_about(&self) -> Option<&str> {
        self.about.as_deref()
    }

    #[must_use]
    pub fn subcommands(&self) -> &[Command] {
        &self.subcommands
    }

    fn to_clap(&self) -> clap::Command {
        self.to_clap_with_aliases(self.aliases.clone())
    }

    fn to_clap_with_aliases(&self, aliases: Vec<String>) -> clap::Command {
        let subcommands = self
            .subcommands
            .iter()
            .zip(self.routable_aliases())
            .map(|(sub, aliases)| sub.to_clap_with_aliases(aliases));
        let mut cmd = clap::Command::new(self.name.clone())
            .visible_aliases(aliases)
            .args(self.args.clone())
            .subcommands(subcommands);
        if let Some(about) = &self.about {
            cmd = cmd.about(about.clone());
        }
        cmd
    }

    /// The aliases of each subcommand, minus the shadowed ones.
    ///
    /// A subcommand name shadows any alias of the same spelling, and a later
    /// alias shadows an earlier one, matching how the registry resolves names.
    fn routable_aliases(&self) -> Vec<Vec<String>> {
        let names: HashSet<&str> = self
            .subcommands
            .iter()
            .map(|sub| sub.name.as_str())
            .chain([HELP_SUBCOMMAND])
            .collect();
        let mut taken = HashSet::new();

        let mut routable: Vec<Vec<String>> = self
            .subcommands
            .iter()
            .rev()
            .map(|sub| {
                let mut kept = Vec::new();
                for alias in sub.aliases.iter().rev() {
                    if !names.contains(alias.as_str()) && taken.insert(alias.as_str()) {
                        kept.push(alias.clone());
                    } else {
                        debug!("Alias '{alias}' of '{}' is shadowed under '{}'", sub.name, self.name);
                    }
                }
                kept.reverse();
                kept
            })
            .collect();
        routable.reverse();
        routable
    }

    /// Parse `args` against this command and run the deepest matched handler.
    ///
    /// `args[0]` is taken as the binary name, the way a process receives it.
    /// Help requests are written to the context's stdout and count as success.
    ///
    /// # Errors
    ///
    /// Returns `ExecError::Usage` if the arguments do not parse,
    /// `ExecError::Failed` if the handler fails, or `ExecError::Io` if output
    /// cannot be written.
    pub fn execute<I, T>(&self, args: I, ctx: &mut Context<'_>) -> Result<(), ExecError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let mut clap_cmd = self.to_clap();
        let matches = match clap_cmd.try_get_matches_from_mut(args) {
            Ok(matches) => matches,
            Err(e) if !e.use_stderr() => {
                write!(ctx.stdout(), "{}", e.render())?;
                return Ok(());
            }
            Err(e) => return Err(ExecError::Usage(e)),
        };

        let mut current = self;
        let mut current_matches = &matches;
        let mut path = Vec::new();
        while let Some((name, sub_matches)) = current_matches.subcommand() {
            let Some(sub) = current.subcommands.iter().find(|c| c.name == name) else {
                break;
            };
            path.push(name.to_string());
            current = sub;
            current_matches = sub_matches;
        }

        let Some(handler) = &current.handler else {
            debug!("Command '{}' has no handler, printing help", current.name);
            write!(ctx.stdout(), "{}", render_help_at(&mut clap_cmd, &path))?;
            return Ok(());
        };

        debug!("Running command '{}'", current.name);
        handler(ctx, current_matches).map_err(|source| ExecError::Failed {
            command: current.name.clone(),
            source,
        })
    }
}

/// Render the help of the subcommand reached by following `path` from `cmd`.
fn render_help_at(cmd: &mut clap::Command, path: &[String]) -> StyledStr {
    match path.split_first() {
        Some((name, rest)) => match cmd.find_subcommand_mut(name) {
            Some(sub) => render_help_at(sub, rest),
            None => cmd.render_help(),
        },
        None => cmd.render_help(),
    }
}

impl Invocable for Command {
    fn name(&self) -> &str {
        &self.name
    }

    fn aliases(&self) -> &[String] {
        &self.aliases
    }

    fn take_subcommands(&mut self) -> Vec<Self> {
        std::mem::take(&mut self.subcommands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::ArgAction;

    fn echo(name: &'static str) -> Command {
        Command::new(name).run(move |ctx, _| {
            writeln!(ctx.stdout(), "{name} ran")?;
            Ok(())
        })
    }

    fn execute(cmd: &Command, args: &[&str]) -> (Result<(), ExecError>, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let result = {
            let mut ctx = Context::new(&mut out, &mut err);
            cmd.execute(args.iter().copied(), &mut ctx)
        };
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_runs_deepest_matched_handler() {
        let cmd = Command::new("toolbox")
            .subcommand(echo("add").subcommand(echo("version")))
            .subcommand(echo("multiply"));

        let (result, out) = execute(&cmd, &["/usr/bin/toolbox", "add", "version"]);
        assert!(result.is_ok());
        assert_eq!(out, "version ran\n");

        let (result, out) = execute(&cmd, &["toolbox", "multiply"]);
        assert!(result.is_ok());
        assert_eq!(out, "multiply ran\n");
    }

    #[test]
    fn test_subcommand_alias_dispatches_to_canonical_command() {
        let cmd = Command::new("toolbox").subcommand(echo("add").alias("sum"));
        let (result, out) = execute(&cmd, &["toolbox", "sum"]);
        assert!(result.is_ok());
        assert_eq!(out, "add ran\n");
    }

    #[test]
    fn test_name_shadows_alias_of_same_spelling() {
        let cmd = Command::new("toolbox")
            .subcommand(echo("div").alias("multiply").alias("quotient"))
            .subcommand(echo("multiply"));

        let (result, out) = execute(&cmd, &["toolbox", "multiply"]);
        assert!(result.is_ok());
        assert_eq!(out, "multiply ran\n");

        let (result, out) = execute(&cmd, &["toolbox", "quotient"]);
        assert!(result.is_ok());
        assert_eq!(out, "div ran\n");
    }

    #[test]
    fn test_later_alias_shadows_earlier_alias() {
        let cmd = Command::new("toolbox")
            .subcommand(echo("add").alias("sum"))
            .subcommand(echo("total").alias("sum").alias("sum"));

        let (result, out) = execute(&cmd, &["toolbox", "sum"]);
        assert!(result.is_ok());
        assert_eq!(out, "total ran\n");
    }

    #[test]
    fn test_shadowed_aliases_are_dropped_at_every_level() {
        let cmd = Command::new("toolbox").subcommand(
            echo("add")
                .subcommand(echo("version").alias("help").alias("check"))
                .subcommand(echo("check")),
        );
        assert_eq!(cmd.subcommands()[0].routable_aliases(), vec![Vec::<String>::new(), Vec::new()]);

        let (result, out) = execute(&cmd, &["toolbox", "add", "check"]);
        assert!(result.is_ok());
        assert_eq!(out, "check ran\n");
    }

    #[test]
    fn test_without_handler_prints_help() {
        let cmd = Command::new("toolbox")
            .about("Run a command in toolbox")
            .subcommand(echo("add"));
        let (result, out) = execute(&cmd, &["toolbox"]);
        assert!(result.is_ok());
        assert!(out.contains("Run a command in toolbox"));
        assert!(out.contains("add"));
    }

    #[test]
    fn test_help_flag_is_not_an_error() {
        let cmd = Command::new("toolbox").subcommand(echo("add").about("Add numbers together"));
        let (result, out) = execute(&cmd, &["toolbox", "add", "--help"]);
        assert!(result.is_ok());
        assert!(out.contains("Add numbers together"));
    }

    #[test]
    fn test_unknown_subcommand_is_a_usage_error() {
        let cmd = Command::new("toolbox").subcommand(echo("add"));
        let (result, out) = execute(&cmd, &["toolbox", "unknown_subcommand"]);
        assert!(matches!(result, Err(ExecError::Usage(_))));
        assert!(out.is_empty());
    }

    #[test]
    fn test_handler_failure_names_the_command() {
        let cmd = Command::new("fail").run(|_, _| Err("boom".into()));
        let (result, _) = execute(&cmd, &["fail"]);
        let err = result.unwrap_err();
        assert!(matches!(err, ExecError::Failed { .. }));
        assert_eq!(err.to_string(), "fail: boom");
    }

    #[test]
    fn test_handler_sees_parsed_arguments() {
        let cmd = Command::new("greet")
            .arg(Arg::new("loud").long("loud").action(ArgAction::SetTrue))
            .run(|ctx, matches| {
                let greeting = if matches.get_flag("loud") { "HELLO" } else { "hello" };
                writeln!(ctx.stdout(), "{greeting}")?;
                Ok(())
            });
        let (_, out) = execute(&cmd, &["greet", "--loud"]);
        assert_eq!(out, "HELLO\n");
    }

    #[test]
    fn test_subcommand_replaces_same_name() {
        let cmd = Command::new("toolbox")
            .subcommand(echo("add"))
            .subcommand(Command::new("add").about("replacement"));
        assert_eq!(cmd.subcommands().len(), 1);
        assert_eq!(cmd.subcommands()[0].get_about(), Some("replacement"));
    }

    #[test]
    fn test_context_locates_executable_through_locator() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let ctx = Context::new(&mut out, &mut err)
            .locate_executable(|| Ok(PathBuf::from("/opt/toolbox/bin/toolbox")));
        assert_eq!(
            ctx.current_exe().unwrap(),
            PathBuf::from("/opt/toolbox/bin/toolbox")
        );
    }
}
