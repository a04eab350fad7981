use std::{
    env::current_dir,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use clap::Parser;
use cli::{create_plan, Cli, RequestPlan};
use config::{read_config, Config};
use directories::ProjectDirs;
use log::{info, warn};
use rustyline::DefaultEditor;
use utils::{prompt_passphrase, prompt_question, AcceptDefaults, Prompt};

use crate::{
    cert_sign_request::{
        dn::{get_subject_interactive, Subject},
        san::{get_alt_names_interactive, AltNames},
        RequestBuilder,
    },
    inspect::RequestSummary,
    key::RequestKey,
};

mod cert_sign_request;
mod cli;
mod config;
mod inspect;
mod key;
mod utils;

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(buf, "[{} {}] {}", buf.timestamp_seconds(), record.level(), record.args())
        })
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logger();
    let plan = create_plan(Cli::parse());
    let app = ProjectDirs::from("org", "genreq", "genreq");

    let candidates = config::search_paths(app.as_ref(), &current_dir()?);
    let config = read_config(plan.config_path.as_deref(), &candidates)?;
    let output_dir = match &plan.output_path {
        Some(out_dir) => out_dir.clone(),
        None => current_dir()?,
    };

    if plan.interactive {
        let mut rl = DefaultEditor::new()?;
        run(&plan, &config, &output_dir, &mut rl)
    } else {
        run(&plan, &config, &output_dir, &mut AcceptDefaults)
    }
}

fn run(
    plan: &RequestPlan,
    config: &Config,
    output_dir: &Path,
    rl: &mut impl Prompt,
) -> anyhow::Result<()> {
    if plan.interactive {
        println!("Now create certificate signing request. Please enter the following details");
        println!("Leaving it empty confirms the default values");
        println!("Submitting a dot clears the value");
        println!();
    }
    let subject = get_subject_interactive(rl, config)?;

    let mut alt_names = AltNames::seeded(subject.common_name());
    alt_names.extend(config.alt_names.iter().map(String::as_str));
    if plan.interactive {
        println!();
        println!("Enter alternative names");
        println!("Leaving it empty continues");
    }
    let alt_names = get_alt_names_interactive(rl, alt_names)?;
    let builder = RequestBuilder::new(subject, alt_names);

    let paths = OutputPaths::new(output_dir, output_stem(builder.subject())?);
    if paths.any_exists() && !plan.force {
        if !prompt_question(
            rl,
            &format!(
                "{:?} or {:?} already exists. Overwrite? (y/N) ",
                paths.key, paths.csr
            ),
            "y",
        )? {
            bail!("not overwriting existing files, rerun with --force to replace them");
        }
        warn!("overwriting existing files for {:?}", paths.stem);
    }
    let passphrase = resolve_passphrase(plan, rl)?;

    info!("generating a {}-bit RSA key", config.key_bits);
    let key = RequestKey::generate(config.key_bits).context("can't generate key")?;
    info!(
        "signing a request for {:?} with {} alternative names and a {}-bit key",
        paths.stem,
        builder.alt_names().len(),
        key.bits()
    );
    let signing_key = key.signing_key()?;
    let csr = builder.sign(&signing_key).context("can't create csr")?;
    let key_pem = key.to_encrypted_pem(&passphrase)?;

    save_request(&paths, &key_pem, &csr)?;

    let summary = load_request(&paths.csr)?;
    println!("{summary}");
    Ok(())
}

fn resolve_passphrase(
    plan: &RequestPlan,
    rl: &mut impl Prompt,
) -> anyhow::Result<String> {
    match &plan.passphrase {
        Some(passphrase) if passphrase.is_empty() => {
            bail!("the private key needs a passphrase")
        }
        Some(passphrase) => Ok(passphrase.clone()),
        None if plan.interactive => prompt_passphrase(rl),
        None => bail!(
            "the private key needs a passphrase, pass --passphrase or set GENREQ_PASSPHRASE"
        ),
    }
}

/// Output files are named `request.key` and `request.csr` when the common
/// name was cleared.
const FALLBACK_STEM: &str = "request";

/// The common name doubles as the output file name.
fn output_stem(subject: &Subject) -> anyhow::Result<String> {
    let Some(common_name) = subject.common_name() else {
        warn!("the common name was cleared, naming the output files {FALLBACK_STEM:?}");
        return Ok(FALLBACK_STEM.to_owned());
    };
    if common_name == "." || common_name == ".." || common_name.contains(['/', '\\']) {
        bail!("{common_name:?} can't be used as a file name");
    }
    Ok(common_name.to_owned())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OutputPaths {
    stem: String,
    key: PathBuf,
    csr: PathBuf,
}

impl OutputPaths {
    fn new(dir: &Path, stem: String) -> Self {
        Self {
            key: dir.join(format!("{stem}.key")),
            csr: dir.join(format!("{stem}.csr")),
            stem,
        }
    }

    fn any_exists(&self) -> bool {
        self.key.exists() || self.csr.exists()
    }
}

fn save_request(paths: &OutputPaths, key: &str, csr: &str) -> anyhow::Result<()> {
    let mut options = File::options();
    options.create(true).write(true).truncate(true);
    #[cfg(unix)]
    std::os::unix::fs::OpenOptionsExt::mode(&mut options, 0o600);
    let mut key_file = options
        .open(&paths.key)
        .with_context(|| format!("can't open file {:?}", paths.key))?;
    // The mode above only applies to new files.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        key_file
            .set_permissions(fs::Permissions::from_mode(0o600))
            .with_context(|| format!("can't restrict permissions of {:?}", paths.key))?;
    }
    key_file
        .write_all(key.as_bytes())
        .with_context(|| format!("can't write file {:?}", paths.key))?;
    info!("wrote private key to {:?}", paths.key);

    File::options()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&paths.csr)
        .with_context(|| format!("can't open file {:?}", paths.csr))?
        .write_all(csr.as_bytes())
        .with_context(|| format!("can't write file {:?}", paths.csr))?;
    info!("wrote certificate signing request to {:?}", paths.csr);
    Ok(())
}

fn load_request(path: &Path) -> anyhow::Result<RequestSummary> {
    let pem = fs::read_to_string(path).with_context(|| format!("can't read {path:?}"))?;
    RequestSummary::from_pem(&pem).with_context(|| format!("can't decode {path:?}"))
}
