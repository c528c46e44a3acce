//! Invocation-name resolution
//!
//! Decides which command a multi-call binary should run from `argv[0]` alone.
//! The base name of the invocation path is compared against the root command
//! first, then against the registered commands. Everything after `argv[0]` is
//! left to the execution engine.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::registry::{Invocable, Registry};

/// Errors that can occur while resolving an invocation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no command found: {name} (root is {root})")]
    NoCommand { name: String, root: String },
}

/// The command selected for an invocation.
#[derive(Debug)]
pub enum Resolution<'a, C> {
    /// Invoked as the multi-call binary itself; the root dispatches on the remaining arguments.
    Root(&'a C),
    /// Invoked under the name of a registered command, typically through an installed symlink.
    Command(&'a C),
}

impl<'a, C> Resolution<'a, C> {
    /// The selected command, whichever way it was selected.
    #[must_use]
    pub fn command(&self) -> &'a C {
        match self {
            Resolution::Root(cmd) | Resolution::Command(cmd) => cmd,
        }
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        matches!(self, Resolution::Root(_))
    }
}

/// Extract the name a binary was invoked under from its `argv[0]`.
///
/// Absolute paths, relative paths and bare names on `PATH` all normalize to the
/// final path component. The platform executable suffix is stripped, which is a
/// no-op outside Windows.
#[must_use]
pub fn base_name(arg0: &OsStr) -> Cow<'_, str> {
    let name = Path::new(arg0).file_name().unwrap_or(arg0);
    match name.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(strip_exe_suffix(s)),
        Cow::Owned(s) => Cow::Owned(strip_exe_suffix(&s).to_string()),
    }
}

fn strip_exe_suffix(name: &str) -> &str {
    let suffix = std::env::consts::EXE_SUFFIX;
    if suffix.is_empty() {
        return name;
    }
    match name.strip_suffix(suffix) {
        Some(stem) if !stem.is_empty() => stem,
        _ => name,
    }
}

fn matches_alias<C: Invocable>(cmd: &C, name: &str) -> bool {
    cmd.aliases().iter().any(|alias| alias == name)
}

/// Resolve the command to run from the raw invocation arguments.
///
/// Only `args[0]` is inspected. Matching is exact and case-sensitive; aliases
/// are considered only when `with_aliases` is set. Among registered commands an
/// exact name match takes precedence over an alias match.
///
/// # Errors
///
/// Returns `ResolveError::NoCommand` if the base name matches neither the root
/// nor any registered command. An empty argument vector resolves as an empty name.
pub fn resolve<'a, C, S>(
    registry: &'a Registry<C>,
    args: &[S],
    with_aliases: bool,
) -> Result<Resolution<'a, C>, ResolveError>
where
    C: Invocable,
    S: AsRef<OsStr>,
{
    let name = args
        .first()
        .map_or(Cow::Borrowed(""), |arg0| base_name(arg0.as_ref()));
    let root = registry.root();

    if root.name() == name || (with_aliases && matches_alias(root, &name)) {
        debug!("Resolved '{name}' to the root command");
        return Ok(Resolution::Root(root));
    }

    let found = registry.get(&name).or_else(|| {
        if with_aliases {
            registry.find_alias(&name)
        } else {
            None
        }
    });

    match found {
        Some(cmd) => {
            debug!("Resolved '{name}' to command '{}'", cmd.name());
            Ok(Resolution::Command(cmd))
        }
        None => Err(ResolveError::NoCommand {
            name: name.into_owned(),
            root: root.name().to_string(),
        }),
    }
}
