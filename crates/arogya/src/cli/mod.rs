//! Command-line interface for arogya.
//!
//! This module provides the CLI structure for the `arogya` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    split_pair, AddRecordArgs, ConfigCommand, ConsultCommand, ConsultationTypeArg,
    DirectoryCommand, EmergencyCommand, LanguageArg, PharmacyCommand, ProfileCommand,
    RecordTypeArg, RecordsCommand, RegisterCommand, RoleArg, StatusCommand, TriageCommand,
};

use crate::logging::Verbosity;

/// arogya - offline-first health records for rural clinics
///
/// Records are kept on this device and synced to the clinic server when a
/// connection is available.
#[derive(Debug, Parser)]
#[command(name = "arogya")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Treat the network as unavailable
    #[arg(long, global = true)]
    pub offline: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show session, queue and store status
    Status(StatusCommand),

    /// Register this device's user
    Register(RegisterCommand),

    /// View or clear the registered profile
    #[command(subcommand)]
    Profile(ProfileCommand),

    /// List or add health records
    #[command(subcommand)]
    Records(RecordsCommand),

    /// Push queued records to the server now
    Sync,

    /// Classify symptoms
    Triage(TriageCommand),

    /// Pharmacy stock and bookings
    #[command(subcommand)]
    Pharmacy(PharmacyCommand),

    /// Doctors and hospitals
    #[command(subcommand)]
    Directory(DirectoryCommand),

    /// Book a consultation
    Consult(ConsultCommand),

    /// Alert emergency responders
    Emergency(EmergencyCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
