//! Command line interface for `firma`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_verbosity_flag::Verbosity;
use firma_pki::{SignatureAlgorithm, TieBreak};

/// Command line arguments for certificate discovery and signing.
#[derive(Debug, Parser)]
#[command(
    name = "firma",
    about = "Discover a qualified signing certificate and create detached signatures with it.",
    long_about = "Discover a qualified signing certificate and create detached signatures with it.

The credential store is populated from key slots listed in the configuration file.
Certificate selection is driven by substring markers over the issuer and subject distinguished
names, defaulting to the markers of a DNIe deployment (issuer \"RENIEC\", subject \" FIR \")."
)]
pub struct Cli {
    /// The path to a custom configuration file.
    ///
    /// If specified, the custom configuration file is used instead of the default configuration
    /// file location.
    #[arg(env = "FIRMA_CONFIG", global = true, long, short)]
    pub config: Option<PathBuf>,

    /// Global processing log verbosity.
    #[command(flatten)]
    pub verbosity: Verbosity,

    /// The command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// The available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reports system health and lists certificates matching the configured issuer marker.
    #[command(about = "Report system health and list matching certificates")]
    Status,

    /// Creates a detached signature over a payload.
    #[command(about = "Create a detached, Base64-encoded signature over a payload")]
    Sign {
        /// The path to the payload file.
        ///
        /// Reads from stdin if not provided.
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// A substring the issuer distinguished name must contain.
        ///
        /// Overrides the marker from the configuration file.
        #[arg(long)]
        issuer: Option<String>,

        /// A substring the subject distinguished name must contain.
        ///
        /// Overrides the marker from the configuration file.
        #[arg(long)]
        subject: Option<String>,

        /// The hash-then-sign algorithm to use, e.g. "sha256-rsa-pkcs1".
        #[arg(long)]
        algorithm: Option<SignatureAlgorithm>,

        /// The policy applied when more than one certificate matches.
        #[arg(long)]
        tie_break: Option<TieBreak>,
    },

    /// Manages the single-slot document store.
    #[command(subcommand)]
    Document(DocumentCommand),
}

/// Commands for the single-slot document store.
#[derive(Debug, Subcommand)]
pub enum DocumentCommand {
    /// Stores a PDF document in the slot, overwriting any previous one.
    #[command(about = "Store a PDF document in the slot")]
    Store {
        /// The path to the PDF document.
        file: PathBuf,
    },

    /// Writes the stored document to stdout.
    #[command(about = "Write the stored document to stdout")]
    Show,
}
