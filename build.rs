use std::{env, io};

use clap::{CommandFactory, ValueEnum};
use clap_complete::{generate_to, Shell};

include!("src/cli.rs");

fn main() -> Result<(), io::Error> {
    println!("cargo:rerun-if-changed=src/cli.rs");
    let out_dir = match env::var_os("OUT_DIR") {
        None => return Ok(()),
        Some(out_dir) => out_dir,
    };
    let mut cli_cmd = Cli::command();
    for &shell in Shell::value_variants() {
        generate_to(shell, &mut cli_cmd, "genreq", &out_dir)?;
    }

    Ok(())
}
