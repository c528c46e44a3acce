//! Multi-call binaries
//!
//! One executable exposes many commands. Which command runs is decided by the
//! name the process was invoked under: the binary's own name runs the root
//! command, which dispatches on its subcommands, while a symlink named after a
//! registered command runs that command directly. The built-in `install`
//! subcommand creates those symlinks next to the executable.
//!
//! ```
//! use std::io::Write;
//!
//! use hypercmd::{Command, HyperCommand, Invocation};
//!
//! let mut toolbox = HyperCommand::new("toolbox");
//! toolbox.add_command(Command::new("hello").run(|ctx, _| {
//!     writeln!(ctx.stdout(), "hello")?;
//!     Ok(())
//! }));
//!
//! for args in [vec!["/usr/bin/toolbox", "hello"], vec!["/usr/bin/hello"]] {
//!     let mut out = Vec::new();
//!     toolbox
//!         .run(&Invocation::new(args), &mut out, &mut std::io::sink())
//!         .unwrap();
//!     assert_eq!(out, b"hello\n");
//! }
//! ```

pub mod command;
pub mod hyper;
pub mod install;
pub mod logger;
pub mod registry;
pub mod resolver;

pub use command::{Command, Context, ExecError, HandlerError};
pub use hyper::{HyperCommand, HyperError, Invocation};
pub use install::{InstallError, InstallReport, Installer};
pub use registry::{Invocable, Registry};
pub use resolver::{Resolution, ResolveError, base_name, resolve};
