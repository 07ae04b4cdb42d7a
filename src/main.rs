mod cli;

use clap::{Parser, Subcommand};

use cli::check::CheckArgs;
use cli::compile::CompileArgs;
use cli::translate::TranslateArgs;

#[derive(Parser)]
#[command(
    name = "jackc",
    version,
    about = "Jack compiler — .jack sources to VM code, VM code to Hack assembly"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a .jack file (or directory) to .vm files
    Compile(CompileArgs),
    /// Translate a .vm file (or directory) to a single .asm file
    Translate(TranslateArgs),
    /// Compile without writing output files
    Check(CheckArgs),
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Compile(args) => cli::compile::cmd_compile(args),
        Command::Translate(args) => cli::translate::cmd_translate(args),
        Command::Check(args) => cli::check::cmd_check(args),
    }
}
