use std::io::Write;

use clap::{Arg, ArgMatches};

use hypercmd::{Command, HandlerError};

fn numbers() -> Arg {
    Arg::new("numbers")
        .num_args(0..)
        .allow_negative_numbers(true)
        .value_parser(clap::value_parser!(i64))
        .help("Integers to combine")
}

fn values(matches: &ArgMatches) -> impl Iterator<Item = i64> + '_ {
    matches.get_many::<i64>("numbers").into_iter().flatten().copied()
}

/// Add numbers together.
pub fn add() -> Command {
    Command::new("add")
        .about("Add numbers together")
        .alias("sum")
        .arg(numbers())
        .run(|ctx, matches| {
            let sum = values(matches)
                .try_fold(0i64, i64::checked_add)
                .ok_or_else(|| HandlerError::from("sum overflows a 64-bit integer"))?;
            writeln!(ctx.stdout(), "Sum: {sum}")?;
            Ok(())
        })
}

/// Multiply numbers together.
pub fn multiply() -> Command {
    Command::new("multiply")
        .about("Multiply numbers together")
        .alias("product")
        .arg(numbers())
        .run(|ctx, matches| {
            let product = values(matches)
                .try_fold(1i64, i64::checked_mul)
                .ok_or_else(|| HandlerError::from("product overflows a 64-bit integer"))?;
            writeln!(ctx.stdout(), "Product: {product}")?;
            Ok(())
        })
}
