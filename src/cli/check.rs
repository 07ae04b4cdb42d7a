use std::path::PathBuf;
use std::process;

use clap::Args;

#[derive(Args)]
pub struct CheckArgs {
    /// Input .jack file or directory of .jack files
    pub input: PathBuf,
}

pub fn cmd_check(args: CheckArgs) {
    let outcome = match jackc::check_path(&args.input) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("error: {}: {}", args.input.display(), e);
            process::exit(1);
        }
    };

    for path in &outcome.compiled {
        eprintln!("OK: {}", path.display());
    }

    if outcome.failures > 0 {
        process::exit(1);
    }
}
