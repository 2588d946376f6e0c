//! `arogya` - CLI for the offline-first health records core
//!
//! Drives an [`AppState`] backed by the on-device `SQLite` store and the
//! clinic server's HTTP API.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::Parser;

use arogya::app::AppState;
use arogya::capability::{FixedLocation, Location, TracingAnnouncer};
use arogya::care::{AlertOutcome, ConsultationOutcome};
use arogya::cli::{
    split_pair, AddRecordArgs, Cli, Command, ConfigCommand, ConsultCommand, DirectoryCommand,
    EmergencyCommand, PharmacyCommand, ProfileCommand, RecordsCommand, RegisterCommand,
    TriageCommand,
};
use arogya::directory::{DOCTORS, HOSPITALS};
use arogya::pharmacy::{BookingOutcome, Cart};
use arogya::profile::UserCreate;
use arogya::record::{HealthRecord, Medication};
use arogya::triage::TriageSource;
use arogya::{init_logging, Config, ConnectivityState, FlushOutcome, HttpApi, SqliteStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    // Config inspection must work even when the config itself is broken.
    match &cli.command {
        Command::Config(ConfigCommand::Path) => {
            println!("{}", Config::default_config_path().display());
            return Ok(());
        }
        Command::Config(ConfigCommand::Validate { file }) => {
            let path = file
                .clone()
                .or_else(|| cli.config.clone())
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
            return Ok(());
        }
        _ => {}
    }

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    if let Command::Config(ConfigCommand::Show { json }) = &cli.command {
        return handle_config_show(&config, *json);
    }

    let store = SqliteStore::open(config.database_path()).context("opening local store")?;
    let api = HttpApi::new(&config.api).context("building API client")?;
    let online = !cli.offline && config.sync.assume_online;

    let mut app = AppState::new(
        Arc::new(store),
        Arc::new(api),
        ConnectivityState::from_online(online),
        config.app.default_language,
    );

    if online && config.sync.flush_on_startup && !app.queue().is_empty() {
        report_flush(&app.sync().await);
    }

    match cli.command {
        Command::Status(cmd) => handle_status(&app, &config, cmd.json)?,
        Command::Register(cmd) => handle_register(&mut app, cmd).await?,
        Command::Profile(cmd) => handle_profile(&mut app, &cmd)?,
        Command::Records(cmd) => handle_records(&app, cmd).await?,
        Command::Sync => report_flush(&app.sync().await),
        Command::Triage(cmd) => handle_triage(&app, &cmd).await?,
        Command::Pharmacy(cmd) => handle_pharmacy(&app, cmd).await?,
        Command::Directory(cmd) => handle_directory(&cmd),
        Command::Consult(cmd) => handle_consult(&app, cmd).await?,
        Command::Emergency(cmd) => handle_emergency(app, cmd).await?,
        Command::Config(_) => unreachable!("config commands handled above"),
    }

    Ok(())
}

fn report_flush(outcome: &FlushOutcome) {
    match outcome {
        FlushOutcome::Empty => println!("Nothing to sync."),
        FlushOutcome::AlreadyInFlight => println!("A sync is already running."),
        FlushOutcome::Flushed { count } => println!("Synced {count} offline record(s)."),
        FlushOutcome::Failed { error } => {
            println!("Sync failed, records kept on this device: {error}");
        }
    }
}

fn handle_status(app: &AppState, config: &Config, json: bool) -> anyhow::Result<()> {
    let user = app.profile().map(|p| p.name.as_str());
    if json {
        let status = serde_json::json!({
            "user": user,
            "language": app.language().code(),
            "connectivity": app.connectivity().state().to_string(),
            "pending_records": app.queue().len(),
            "database_path": config.database_path(),
            "api_base_url": config.api.base_url,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("arogya status");
        println!("-------------");
        println!("User:          {}", user.unwrap_or("(not registered)"));
        println!(
            "Language:      {} ({})",
            app.language().english_name(),
            app.language().native_name()
        );
        println!("Connectivity:  {}", app.connectivity().state());
        println!("Pending:       {} record(s)", app.queue().len());
        println!("Database:      {}", config.database_path().display());
        println!("Server:        {}", config.api.base_url);
    }
    Ok(())
}

async fn handle_register(app: &mut AppState, cmd: RegisterCommand) -> anyhow::Result<()> {
    let form = UserCreate {
        name: cmd.name,
        phone: cmd.phone,
        village: cmd.village,
        language: cmd.language.into(),
        role: cmd.role.into(),
        emergency_contact: cmd.emergency_contact,
    };
    let registration = app.register(form).await?;
    if registration.offline {
        println!("Registered offline. Your profile is saved on this device.");
    } else {
        println!("Registered successfully.");
    }
    println!("User id: {}", registration.profile.id);
    Ok(())
}

fn handle_profile(app: &mut AppState, cmd: &ProfileCommand) -> anyhow::Result<()> {
    match cmd {
        ProfileCommand::Show { json } => {
            let Some(profile) = app.profile() else {
                println!("No profile registered.");
                return Ok(());
            };
            if *json {
                println!("{}", serde_json::to_string_pretty(profile)?);
            } else {
                println!("Name:      {}", profile.name);
                println!("Phone:     {}", profile.phone);
                println!("Village:   {}", profile.village);
                println!("Role:      {}", profile.role);
                println!("Language:  {}", profile.language.english_name());
                if let Some(contact) = &profile.emergency_contact {
                    println!("Emergency: {contact}");
                }
            }
        }
        ProfileCommand::Clear => {
            app.logout()?;
            println!("Profile cleared.");
        }
    }
    Ok(())
}

fn build_record(args: AddRecordArgs) -> HealthRecord {
    let mut record = HealthRecord::new(
        String::new(),
        args.record_type.into(),
        args.title,
        args.description,
    );
    if let Some(doctor) = args.doctor {
        record = record.with_doctor(doctor);
    }
    for raw in &args.medications {
        let (name, dosage) = split_pair(raw);
        record = record.with_medication(Medication::new(name, dosage.unwrap_or_default()));
    }
    record
}

async fn handle_records(app: &AppState, cmd: RecordsCommand) -> anyhow::Result<()> {
    match cmd {
        RecordsCommand::List { json } => {
            let view = app.records().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view.records)?);
                return Ok(());
            }
            if view.records.is_empty() {
                println!("No health records yet.");
                return Ok(());
            }
            for record in &view.records {
                println!(
                    "{}  [{}] {:<13} {}",
                    record.date.format("%Y-%m-%d"),
                    record.provenance(),
                    record.record_type,
                    record.title
                );
                if let Some(doctor) = &record.doctor_name {
                    println!("            {doctor}");
                }
                for med in &record.medications {
                    println!("            - {} {}", med.name, med.dosage);
                }
            }
            if view.pending > 0 {
                println!();
                println!("{} record(s) waiting to sync.", view.pending);
            }
        }
        RecordsCommand::Add(args) => {
            let (record, outcome) = app.add_record(build_record(args)).await?;
            println!(
                "Saved record {}.",
                record.offline_id.as_deref().unwrap_or_default()
            );
            match outcome {
                Some(outcome) => report_flush(&outcome),
                None => println!("Offline: it will sync when the connection returns."),
            }
        }
    }
    Ok(())
}

async fn handle_triage(app: &AppState, cmd: &TriageCommand) -> anyhow::Result<()> {
    let report = app.triage(&cmd.symptoms, &cmd.notes).await?;
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    let assessment = &report.assessment;
    if report.source == TriageSource::Local {
        println!("(offline assessment)");
    }
    println!("Severity: {}", assessment.severity.to_string().to_uppercase());
    println!("{}", assessment.assessment);
    println!();
    println!("Recommendations:");
    for rec in &assessment.recommendations {
        println!("  - {rec}");
    }
    if assessment.referral_needed {
        println!();
        println!("A consultation with a doctor is recommended.");
    }
    Ok(())
}

async fn handle_pharmacy(app: &AppState, cmd: PharmacyCommand) -> anyhow::Result<()> {
    match cmd {
        PharmacyCommand::List { json } => {
            let pharmacies = app.pharmacies().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&pharmacies)?);
                return Ok(());
            }
            for pharmacy in &pharmacies {
                println!("{} [{}]", pharmacy.name, pharmacy.id);
                println!("  {} | {}", pharmacy.location, pharmacy.phone);
                for (name, stock) in &pharmacy.medicines {
                    println!("  {name:<14} stock {:>4}  ₹{}", stock.stock, stock.price);
                }
            }
        }
        PharmacyCommand::Check { medicine, pharmacy } => {
            let pharmacies = app.pharmacies().await;
            let mut checked = 0;
            for p in pharmacies
                .iter()
                .filter(|p| pharmacy.as_deref().map_or(true, |id| p.id == id))
            {
                checked += 1;
                let availability = p.availability(&medicine);
                if availability.available {
                    println!("{}: {} in stock", p.name, availability.stock);
                } else {
                    println!("{}: not available", p.name);
                }
            }
            if checked == 0 {
                bail!("no pharmacy matches the given id");
            }
        }
        PharmacyCommand::Book { pharmacy, items } => {
            let pharmacies = app.pharmacies().await;
            let Some(target) = pharmacies.iter().find(|p| p.id == pharmacy) else {
                bail!("unknown pharmacy id: {pharmacy}");
            };

            let mut cart = Cart::new();
            for raw in &items {
                let (name, qty) = split_pair(raw);
                let quantity: u32 = match qty {
                    Some(q) => q.parse().with_context(|| format!("bad quantity for {name}"))?,
                    None => 1,
                };
                let price = target.availability(name).price.unwrap_or_default();
                cart.set_quantity(&name.to_lowercase(), quantity, price);
            }

            match app.book_medicines(&cart, &target.id).await? {
                BookingOutcome::Confirmed(request) => {
                    println!("Booking {} confirmed at {}.", request.id, target.name);
                    println!("Total: ₹{:.2}", cart.total());
                }
                BookingOutcome::Offline => {
                    println!("Could not reach the pharmacy. Please try again when online.");
                }
            }
        }
    }
    Ok(())
}

fn handle_directory(cmd: &DirectoryCommand) {
    match cmd {
        DirectoryCommand::Doctors => {
            for doctor in DOCTORS {
                println!("{:<20} {}", doctor.name, doctor.specialty);
            }
        }
        DirectoryCommand::Hospitals => {
            for hospital in HOSPITALS {
                let ward = if hospital.emergency { "24h emergency" } else { "" };
                println!(
                    "{:<22} {:<18} {:<15} {ward}",
                    hospital.name, hospital.location, hospital.phone
                );
            }
        }
    }
}

async fn handle_consult(app: &AppState, cmd: ConsultCommand) -> anyhow::Result<()> {
    let at = match &cmd.at {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("invalid appointment time: {raw}"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    match app
        .book_consultation(&cmd.doctor, &cmd.symptoms, at, cmd.consultation_type.into())
        .await?
    {
        ConsultationOutcome::Booked(consultation) => {
            println!(
                "Consultation with {} booked for {}.",
                consultation.doctor_name,
                consultation.appointment_time.format("%Y-%m-%d %H:%M UTC")
            );
        }
        ConsultationOutcome::Queued(_) => {
            println!("Consultation saved offline. It will sync when the connection returns.");
        }
    }
    Ok(())
}

async fn handle_emergency(app: AppState, cmd: EmergencyCommand) -> anyhow::Result<()> {
    let location = match (cmd.lat, cmd.lng) {
        (Some(lat), Some(lng)) => Some(Location { lat, lng }),
        (None, None) => None,
        _ => bail!("--lat and --lng must be given together"),
    };
    let alert_type = cmd.alert_type();
    let app = app.with_capabilities(
        Arc::new(FixedLocation(location)),
        Arc::new(TracingAnnouncer),
    );

    match app.raise_emergency(alert_type, cmd.description).await? {
        AlertOutcome::Sent(alert) => {
            println!("Emergency services have been notified (alert {}).", alert.id);
        }
        AlertOutcome::Offline => {
            println!("Could not reach emergency services. Call 108 now.");
        }
        AlertOutcome::NoLocation => {
            println!("No location available. Call 108 now.");
        }
    }
    Ok(())
}

fn handle_config_show(config: &Config, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }
    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("[Storage]");
    println!("  Database path:     {}", config.database_path().display());
    println!();
    println!("[API]");
    println!("  Base URL:          {}", config.api.base_url);
    println!("  Timeout (secs):    {}", config.api.timeout_secs);
    println!(
        "  Auth token:        {}",
        if config.api.auth_token.is_some() { "set" } else { "not set" }
    );
    println!();
    println!("[Sync]");
    println!("  Flush on startup:  {}", config.sync.flush_on_startup);
    println!("  Assume online:     {}", config.sync.assume_online);
    println!();
    println!("[App]");
    println!("  Default language:  {}", config.app.default_language.english_name());
    Ok(())
}
