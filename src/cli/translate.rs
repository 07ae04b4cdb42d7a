use std::path::PathBuf;
use std::process;

use clap::Args;

#[derive(Args)]
pub struct TranslateArgs {
    /// Input .vm file or directory of .vm files
    pub input: PathBuf,
    /// Output .asm file
    pub output: PathBuf,
}

pub fn cmd_translate(args: TranslateArgs) {
    match jackc::translate_path(&args.input, &args.output) {
        Ok(true) => eprintln!("Translated -> {}", args.output.display()),
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("error: {}: {}", args.input.display(), e);
            process::exit(1);
        }
    }
}
