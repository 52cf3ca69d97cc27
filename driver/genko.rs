mod args;

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;

use colored::Colorize;

use debug_mono::MonoDebug;
use error::{ErrKind, Error, ErrorHandler, FAILURE_EXIT_CODE};
use genko::MonoProgram;
use location::Source;

use args::Args;

fn handle_input(args: &Args, file: &Path) -> Result<MonoProgram, ErrorHandler> {
    let input = fs::read_to_string(file).map_err(|e| {
        Error::from(e).with_msg(format!("cannot read input file `{}`", file.display()))
    })?;

    let program = genko::resolve_source(&input, Source::Path(file))?;

    if args.debug() {
        MonoDebug::default()
            .header("specialized")
            .show_bindings()
            .display(&program);
    }

    Ok(program)
}

fn main() -> anyhow::Result<()> {
    macro_rules! x_try {
        ($res:expr) => {
            match $res {
                Ok(inner) => inner,
                Err(e) => {
                    e.emit();
                    process::exit(FAILURE_EXIT_CODE);
                }
            }
        };
    }

    let args = Args::handle();
    if args.debug() {
        generics::log::enable();
    }

    let file = x_try!(args.input().ok_or_else(|| {
        Error::new(ErrKind::IO).with_msg(String::from("no input file given"))
    }));

    let program = x_try!(handle_input(&args, file));

    if args.emit() {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{}", debug_mono::emit(&program.to_ast()))?;
        stdout.flush()?;
    }

    if args.debug() {
        eprintln!(
            "{}: {} specializations",
            "ok".green(),
            program.specializations().len()
        );
    }

    Ok(())
}
