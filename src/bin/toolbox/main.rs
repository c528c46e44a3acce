mod arith;

use std::io::{self, Write};
use std::process::ExitCode;

use hypercmd::logger::{self, LogConfig};
use hypercmd::{Command, ExecError, HyperCommand, HyperError, Invocation};

const NAME: &str = "toolbox";

/// Prints the version. Attached under the root and under every registered
/// command, but never installed as its own symlink.
fn version() -> Command {
    Command::new("version")
        .about(format!("Print the version number of {NAME}"))
        .run(|ctx, _| {
            writeln!(ctx.stdout(), "{NAME} version {}", env!("CARGO_PKG_VERSION"))?;
            Ok(())
        })
}

fn build() -> HyperCommand {
    let mut toolbox = HyperCommand::new(NAME);
    let root = std::mem::take(toolbox.root_mut());
    *toolbox.root_mut() = root.alias("tb").subcommand(version());

    toolbox.add_command(arith::add().subcommand(version()));
    toolbox.add_command(arith::multiply().subcommand(version()));
    toolbox
}

fn main() -> ExitCode {
    if let Err(e) = logger::init(&LogConfig::from_env()) {
        eprintln!("Warning: {e}");
    }

    let toolbox = build();
    let invocation = Invocation::from_env();
    let result = toolbox.run(&invocation, &mut io::stdout(), &mut io::stderr());
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(HyperError::Exec(ExecError::Usage(e))) => {
            let _ = e.print();
            u8::try_from(e.exit_code()).map_or(ExitCode::FAILURE, ExitCode::from)
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
