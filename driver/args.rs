//! Command line options given to genko

use structopt::StructOpt;

use std::path::PathBuf;

#[derive(StructOpt)]
#[structopt(
    name = "genko",
    about = "Resolve and specialize the generic declarations of a program"
)]
pub struct Args {
    #[structopt(short, long)]
    version: bool,

    #[structopt(short, long)]
    debug: bool,

    /// Print the specialized program once resolution succeeds
    #[structopt(short, long)]
    emit: bool,

    #[structopt(parse(from_os_str))]
    input: Option<PathBuf>,
}

impl Args {
    fn print_version() {
        println!("{}", env!("CARGO_PKG_VERSION"));

        std::process::exit(0);
    }

    /// Parses the command line arguments, executes stopping options (such as --help
    /// or --version) and returns the given arguments
    pub fn handle() -> Args {
        let args = Args::from_args();

        if args.version {
            Args::print_version()
        }

        args
    }

    /// Is genko launched in debug mode
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Should the specialized program be printed
    pub fn emit(&self) -> bool {
        self.emit
    }

    /// File input given to genko
    pub fn input(&self) -> Option<&PathBuf> {
        self.input.as_ref()
    }
}
