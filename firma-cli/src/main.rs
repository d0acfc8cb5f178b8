//! Application for certificate discovery and detached signing against a credential store.

use std::{
    io::{Read, Write, stdout},
    path::Path,
    process::ExitCode,
};

use clap::Parser;
use firma_pki::{
    CredentialStore as _,
    SigningRequest,
    SigningService,
    StoreSession as _,
};
use log::error;

use crate::{
    cli::{Cli, Command, DocumentCommand},
    config::Settings,
    docstore::DocumentStore,
};

mod cli;
mod config;
mod docstore;
mod logging;

/// An error that may occur when running the CLI.
#[derive(Debug, thiserror::Error)]
enum Error {
    /// A configuration error.
    #[error("Configuration issue: {0}")]
    Config(#[from] config::Error),

    /// A signing workflow error.
    #[error("Signing issue: {0}")]
    Pki(#[from] firma_pki::Error),

    /// A credential store error.
    #[error("Credential store issue: {0}")]
    Store(#[from] firma_pki::store::Error),

    /// A document store error.
    #[error("Document issue: {0}")]
    Document(#[from] docstore::Error),

    /// An I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A file name is not valid UTF-8 or the path has no file name at all.
    #[error("The path {0} does not name a file")]
    NoFileName(std::path::PathBuf),
}

/// Reports system health and lists all certificates matching the configured issuer marker.
fn status(settings: &Settings) -> Result<(), Error> {
    println!("OK - system active");

    let session = settings.to_store()?.open()?;
    let rule = settings.issuer_rule();
    let matching: Vec<_> = session
        .entries()?
        .into_iter()
        .filter(|entry| rule.matches(entry))
        .collect();

    if matching.is_empty() {
        println!("No certificates matching issuer marker {:?} found", settings.issuer_marker);
        return Ok(());
    }

    for entry in matching {
        println!("Alias:       {}", entry.alias());
        println!("Subject:     {}", entry.subject_name());
        println!("Issuer:      {}", entry.issuer_name());
        println!("Valid from:  {}", entry.not_before());
        println!("Valid until: {}", entry.not_after());
        println!("--------------------------------------------------");
    }

    Ok(())
}

/// Signs a payload from a file or stdin and prints the Base64-encoded signature.
fn sign(
    settings: &Settings,
    input: Option<&Path>,
    issuer: Option<String>,
    subject: Option<String>,
    algorithm: Option<firma_pki::SignatureAlgorithm>,
    tie_break: Option<firma_pki::TieBreak>,
) -> Result<(), Error> {
    let payload = match input {
        Some(path) => std::fs::read(path)?,
        None => {
            let mut payload = Vec::new();
            std::io::stdin().read_to_end(&mut payload)?;
            payload
        }
    };

    let request = SigningRequest::new(payload)
        .with_rule(settings.selection(issuer, subject))
        .with_algorithm(algorithm.unwrap_or(settings.algorithm))
        .with_tie_break(tie_break.unwrap_or(settings.tie_break));

    let store = settings.to_store()?;
    let outcome = SigningService::new(&store).sign(&request)?;

    eprintln!("Signed with {} ({})", outcome.alias(), outcome.subject_name());
    println!("{}", outcome.signature());
    Ok(())
}

/// Runs a document store command.
fn document(settings: &Settings, command: DocumentCommand) -> Result<(), Error> {
    let store = DocumentStore::new(&settings.document_dir);

    match command {
        DocumentCommand::Store { file } => {
            let filename = file
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| Error::NoFileName(file.clone()))?
                .to_string();
            let bytes = std::fs::read(&file)?;
            let slot = store.store(&bytes, &filename)?;
            println!("{}", slot.display());
        }
        DocumentCommand::Show => {
            let bytes = store.retrieve()?;
            stdout().lock().write_all(&bytes)?;
        }
    }

    Ok(())
}

/// Dispatches the parsed command line arguments.
fn run(cli: Cli) -> Result<(), Error> {
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Command::Status => status(&settings),
        Command::Sign {
            input,
            issuer,
            subject,
            algorithm,
            tie_break,
        } => sign(
            &settings,
            input.as_deref(),
            issuer,
            subject,
            algorithm,
            tie_break,
        ),
        Command::Document(command) => document(&settings, command),
    }
}

fn main() -> ExitCode {
    let args = Cli::parse();

    if let Err(error) = logging::setup_logging(args.verbosity.log_level_filter()) {
        eprintln!("{error}");
        return ExitCode::FAILURE;
    }

    if let Err(error) = run(args) {
        error!(error:err; "Processing command failed: {error:#?}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
