//! Symlink installation for multi-call binaries
//!
//! Every registered command gets a symlink named after it, next to the running
//! executable and pointing at it. Existing entries are never touched, dry runs
//! only report, and individual failures are collected rather than aborting the
//! batch.

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anstyle::{AnsiColor, Style};
use clap::{Arg, ArgAction};
use log::debug;
use thiserror::Error;

use crate::command::Command;
use crate::registry::Invocable;

const SKIP_STYLE: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Yellow)));
const DRY_RUN_STYLE: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Cyan)));
const SUCCESS_STYLE: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Green)));
const FAILURE_STYLE: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Red)));

/// A symlink that could not be created.
#[derive(Error, Debug)]
#[error("{name} at {}: {source}", .path.display())]
pub struct SymlinkError {
    pub name: String,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Errors that can occur while installing symlinks
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("unable to locate the running executable: {0}")]
    Executable(#[source] io::Error),

    #[error("could not install one or more symlinks:\n{}", FailureList(.0))]
    Symlinks(Vec<SymlinkError>),
}

struct FailureList<'a>(&'a [SymlinkError]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {failure}")?;
        }
        Ok(())
    }
}

/// What an installation run did, per symlink path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Symlinks created by this run.
    pub installed: Vec<PathBuf>,
    /// Paths left alone because something already exists there.
    pub skipped: Vec<PathBuf>,
    /// Symlinks a dry run would have created.
    pub planned: Vec<PathBuf>,
}

/// Installs symlinks to one executable, in the executable's own directory.
#[derive(Debug, Clone)]
pub struct Installer {
    executable: PathBuf,
    dir: PathBuf,
    dry_run: bool,
    color: bool,
}

impl Installer {
    /// Create an installer for `executable`. Dry-run is on until disabled.
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        let executable = executable.into();
        let dir = match executable.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self {
            executable,
            dir,
            dry_run: true,
            color: false,
        }
    }

    /// Create an installer for the executable reported by `locate`.
    ///
    /// # Errors
    ///
    /// Returns `InstallError::Executable` if `locate` fails.
    pub fn from_current_exe(
        locate: impl FnOnce() -> io::Result<PathBuf>,
    ) -> Result<Self, InstallError> {
        locate().map(Self::new).map_err(InstallError::Executable)
    }

    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Style status words in progress output.
    #[must_use]
    pub fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// The directory symlinks are created in.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the symlink for a command named `name`.
    #[must_use]
    pub fn link_path(&self, name: &str) -> PathBuf {
        self.dir
            .join(format!("{name}{}", std::env::consts::EXE_SUFFIX))
    }

    fn status(&self, style: Style, word: &str) -> String {
        if self.color {
            format!("{}{word}{}", style.render(), style.render_reset())
        } else {
            word.to_string()
        }
    }

    /// Install one symlink per command, reporting every decision to `progress`.
    ///
    /// Failures writing to `progress` are ignored.
    ///
    /// # Errors
    ///
    /// Returns `InstallError::Symlinks` with every symlink that could not be
    /// created, after all commands have been attempted.
    pub fn install<'c, I, C>(
        &self,
        commands: I,
        progress: &mut dyn Write,
    ) -> Result<InstallReport, InstallError>
    where
        I: IntoIterator<Item = &'c C>,
        C: Invocable + 'c,
    {
        let commands: Vec<&C> = commands.into_iter().collect();
        let _ = writeln!(
            progress,
            "Installing {} symlinks to {} in {}",
            commands.len(),
            self.executable.display(),
            self.dir.display()
        );

        let mut report = InstallReport::default();
        let mut failures = Vec::new();
        for cmd in commands {
            let name = cmd.name();
            let link = self.link_path(name);

            if link.symlink_metadata().is_ok() {
                debug!("Skipping {}: path exists", link.display());
                let _ = writeln!(
                    progress,
                    "{} symlink for {name} already exists at {}",
                    self.status(SKIP_STYLE, "Skip:"),
                    link.display()
                );
                report.skipped.push(link);
                continue;
            }

            if self.dry_run {
                let _ = writeln!(
                    progress,
                    "{} would have installed symlink for {name} at {}",
                    self.status(DRY_RUN_STYLE, "Dry-run:"),
                    link.display()
                );
                report.planned.push(link);
                continue;
            }

            match create_symlink(&self.executable, &link) {
                Ok(()) => {
                    debug!("Linked {} -> {}", link.display(), self.executable.display());
                    let _ = writeln!(
                        progress,
                        "{} symlink for {name} at {}",
                        self.status(SUCCESS_STYLE, "Installed"),
                        link.display()
                    );
                    report.installed.push(link);
                }
                Err(source) => {
                    let _ = writeln!(
                        progress,
                        "{} could not install symlink for {name} at {}: {source}",
                        self.status(FAILURE_STYLE, "Failed:"),
                        link.display()
                    );
                    failures.push(SymlinkError {
                        name: name.to_string(),
                        path: link,
                        source,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(InstallError::Symlinks(failures))
        }
    }
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are not supported on this platform",
    ))
}

/// The `install` subcommand, installing every command of the registry it runs in.
#[must_use]
pub fn command() -> Command {
    Command::new("install")
        .about("Install hyperbinary commands as symlinks")
        .arg(
            Arg::new("yes")
                .short('y')
                .long("yes")
                .action(ArgAction::SetTrue)
                .help("Create the symlinks (without this, only report what would be done)"),
        )
        .run(|ctx, matches| {
            let installer = Installer::from_current_exe(|| ctx.current_exe())?
                .dry_run(!matches.get_flag("yes"))
                .color(ctx.use_color());
            let commands = ctx.registered().into_iter().flat_map(|registry| registry.commands());
            installer.install(commands, ctx.stderr())?;
            Ok(())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::Named;
    use tempfile::tempdir;

    fn commands(names: &[&str]) -> Vec<Named> {
        names.iter().map(|name| Named::new(name, &[])).collect()
    }

    #[test]
    fn test_dir_is_parent_of_executable() {
        let installer = Installer::new("/opt/toolbox/bin/toolbox");
        assert_eq!(installer.dir(), Path::new("/opt/toolbox/bin"));

        let installer = Installer::new("toolbox");
        assert_eq!(installer.dir(), Path::new("."));
    }

    #[test]
    fn test_executable_failure_is_fatal() {
        let err = Installer::from_current_exe(|| Err(io::Error::other("gone"))).unwrap_err();
        assert!(matches!(err, InstallError::Executable(_)));
        assert_eq!(
            err.to_string(),
            "unable to locate the running executable: gone"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_dry_run_creates_nothing() {
        let dir = tempdir().unwrap();
        let exe = dir.path().join("toolbox");
        std::fs::write(&exe, "").unwrap();

        let cmds = commands(&["add", "multiply"]);
        let mut progress = Vec::new();
        let report = Installer::new(&exe).install(&cmds, &mut progress).unwrap();

        assert_eq!(report.planned.len(), 2);
        assert!(report.installed.is_empty());
        assert!(!dir.path().join("add").exists());
        assert!(!dir.path().join("multiply").exists());
        let progress = String::from_utf8(progress).unwrap();
        assert!(progress.contains("Dry-run: would have installed symlink for add"));
    }

    #[cfg(unix)]
    #[test]
    fn test_install_links_point_at_executable() {
        let dir = tempdir().unwrap();
        let exe = dir.path().join("toolbox");
        std::fs::write(&exe, "").unwrap();

        let cmds = commands(&["add"]);
        let report = Installer::new(&exe)
            .dry_run(false)
            .install(&cmds, &mut io::sink())
            .unwrap();

        let link = dir.path().join("add");
        assert_eq!(report.installed, vec![link.clone()]);
        assert!(link.is_symlink());
        assert_eq!(std::fs::read_link(&link).unwrap(), exe);
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_entries_are_skipped_not_overwritten() {
        let dir = tempdir().unwrap();
        let exe = dir.path().join("toolbox");
        std::fs::write(&exe, "").unwrap();
        std::fs::write(dir.path().join("add"), "user data").unwrap();
        std::os::unix::fs::symlink(dir.path().join("missing"), dir.path().join("multiply"))
            .unwrap();

        let cmds = commands(&["add", "multiply"]);
        let mut progress = Vec::new();
        let report = Installer::new(&exe)
            .dry_run(false)
            .install(&cmds, &mut progress)
            .unwrap();

        assert_eq!(report.skipped.len(), 2);
        assert!(report.installed.is_empty());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("add")).unwrap(),
            "user data"
        );
        let progress = String::from_utf8(progress).unwrap();
        assert!(!progress.contains("Installed"));
        assert!(progress.contains("Skip: symlink for multiply already exists"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failures_are_collected_and_others_still_installed() {
        let dir = tempdir().unwrap();
        let exe = dir.path().join("toolbox");
        std::fs::write(&exe, "").unwrap();

        let cmds = commands(&["add", "missing/sub", "multiply"]);
        let err = Installer::new(&exe)
            .dry_run(false)
            .install(&cmds, &mut io::sink())
            .unwrap_err();

        let InstallError::Symlinks(failures) = &err else {
            panic!("Expected Symlinks, got: {err:?}");
        };
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].name, "missing/sub");
        assert!(dir.path().join("add").is_symlink());
        assert!(dir.path().join("multiply").is_symlink());
        assert!(
            err.to_string()
                .starts_with("could not install one or more symlinks:\n  missing/sub at ")
        );
    }

    #[test]
    fn test_color_wraps_status_words() {
        let plain = Installer::new("/bin/toolbox");
        assert_eq!(plain.status(SKIP_STYLE, "Skip:"), "Skip:");

        let colored = Installer::new("/bin/toolbox").color(true);
        let status = colored.status(SKIP_STYLE, "Skip:");
        assert!(status.starts_with("\x1b["));
        assert!(status.contains("Skip:"));
    }
}
