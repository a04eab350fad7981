use std::path::PathBuf;

use clap::Parser;

/// Generate an RSA key and a PKCS#10 certificate signing request.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// the config file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,
    /// Output dir
    #[arg(long, short)]
    pub out: Option<PathBuf>,
    /// passphrase protecting the private key.
    #[arg(long, env = "GENREQ_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,
    /// accept every default without prompting.
    #[arg(long)]
    pub non_interactive: bool,
    /// overwrite existing key and request files.
    #[arg(long, short)]
    pub force: bool,
}

#[derive(Debug)]
pub struct RequestPlan {
    pub config_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub passphrase: Option<String>,
    pub interactive: bool,
    pub force: bool,
}

pub fn create_plan(cli: Cli) -> RequestPlan {
    RequestPlan {
        config_path: cli.config,
        output_path: cli.out,
        passphrase: cli.passphrase,
        interactive: !cli.non_interactive,
        force: cli.force,
    }
}
