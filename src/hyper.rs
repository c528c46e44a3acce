//! The multi-call binary as a whole
//!
//! A [`HyperCommand`] ties the registry, the resolver and the installer
//! together: hosts register their commands on it once at startup, then hand it
//! the process invocation to resolve and execute.

use std::ffi::OsString;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use thiserror::Error;

use crate::command::{Command, Context, ExecError};
use crate::install;
use crate::registry::Registry;
use crate::resolver::{self, Resolution, ResolveError};

/// Errors that can occur while running a multi-call binary
#[derive(Error, Debug)]
pub enum HyperError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// How the process was invoked: its raw arguments and where its executable lives.
pub struct Invocation {
    args: Vec<OsString>,
    locate_executable: Box<dyn Fn() -> io::Result<PathBuf>>,
    color: bool,
}

impl Invocation {
    /// An invocation with the given raw arguments, `args[0]` being the invoked
    /// path. The executable is located through `std::env::current_exe`.
    pub fn new<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            locate_executable: Box::new(std::env::current_exe),
            color: false,
        }
    }

    /// The invocation of the current process. Output is colored when stderr is a terminal.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(std::env::args_os()).color(io::stderr().is_terminal())
    }

    /// Use a fixed executable path instead of locating it.
    #[must_use]
    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.locate_executable = Box::new(move || Ok(path.clone()));
        self
    }

    #[must_use]
    pub fn locate_executable_with(
        mut self,
        locate: impl Fn() -> io::Result<PathBuf> + 'static,
    ) -> Self {
        self.locate_executable = Box::new(locate);
        self
    }

    #[must_use]
    pub fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
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

/// A root command and the commands exploded from it into their own symlinks.
#[derive(Debug)]
pub struct HyperCommand {
    registry: Registry<Command>,
    with_aliases: bool,
}

impl HyperCommand {
    /// Create a multi-call binary named `name`, with an `install` subcommand
    /// already attached to the root.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let root = Command::new(name)
            .about(format!("Run a command in {name}"))
            .subcommand(install::command());
        Self {
            registry: Registry::new(root),
            with_aliases: true,
        }
    }

    /// Whether aliases take part in resolution. On by default.
    #[must_use]
    pub fn with_aliases(mut self, with_aliases: bool) -> Self {
        self.with_aliases = with_aliases;
        self
    }

    /// Add a command, available as a subcommand and as a symlink once installed.
    pub fn add_command(&mut self, cmd: Command) {
        self.registry.add_command(cmd);
    }

    /// Add every subcommand of `cmd`.
    pub fn import_commands(&mut self, cmd: Command) {
        self.registry.import_commands(cmd);
    }

    /// The root command, for attaching subcommands that should not become symlinks.
    pub fn root_mut(&mut self) -> &mut Command {
        self.registry.root_mut()
    }

    #[must_use]
    pub fn root(&self) -> &Command {
        self.registry.root()
    }

    #[must_use]
    pub fn registry(&self) -> &Registry<Command> {
        &self.registry
    }

    /// Registered commands, in registration order.
    pub fn commands(&self) -> impl ExactSizeIterator<Item = &Command> {
        self.registry.commands()
    }

    /// Resolve which command `args[0]` selects.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::NoCommand` if nothing is registered under the invoked name.
    pub fn resolve<S: AsRef<std::ffi::OsStr>>(
        &self,
        args: &[S],
    ) -> Result<Resolution<'_, Command>, ResolveError> {
        resolver::resolve(&self.registry, args, self.with_aliases)
    }

    /// Resolve the invocation and execute the selected command with the full
    /// argument vector.
    ///
    /// When invoked as the root, every registered command is reachable as a
    /// subcommand, alongside the root's own.
    ///
    /// # Errors
    ///
    /// Returns `HyperError::Resolve` if the invoked name is unknown, or
    /// `HyperError::Exec` if argument parsing or the command itself fails.
    pub fn run(
        &self,
        invocation: &Invocation,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<(), HyperError> {
        let resolution = self.resolve(invocation.args())?;
        let mut ctx = Context::new(out, err)
            .color(invocation.color)
            .registry(&self.registry)
            .locate_executable(|| invocation.current_exe());

        match resolution {
            Resolution::Root(root) => {
                let tree = self
                    .registry
                    .commands()
                    .cloned()
                    .fold(root.clone(), Command::subcommand);
                tree.execute(invocation.args(), &mut ctx)?;
            }
            Resolution::Command(cmd) => cmd.execute(invocation.args(), &mut ctx)?,
        }
        Ok(())
    }
}
