//! `portmaster` - CLI for the port office
//!
//! This binary logs in an operator and runs one office operation per
//! invocation against the configured store.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use portmaster::cli::{
    CatchCommand, Cli, Command, ConfigCommand, FisherCommand, OutputFormat, RenewCommand,
    ReportCommand,
};
use portmaster::config::{Language, StorageBackend};
use portmaster::model::{
    CatchRecord, Fisher, NfcLog, RenewalRecord, ReportRecord, ScanResult, SummaryRow, User,
};
use portmaster::{init_logging, seed, Config, Error, PortOffice, RenewalWizard};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = match Config::load_from(cli.config.clone()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}: {err}", err.status_message(Language::default()));
            return ExitCode::FAILURE;
        }
    };

    match run(cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<Error>() {
                Some(office_err) => {
                    eprintln!("{}: {office_err}", office_err.status_message(config.ui.language));
                }
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: &Config) -> anyhow::Result<()> {
    let Cli {
        user,
        password,
        command,
        ..
    } = cli;

    if let Command::Config(config_cmd) = command {
        return handle_config(config, config_cmd);
    }

    let office = PortOffice::from_config(config)?;
    let seeded = seed::run(office.store(), config).await?;

    if command.is_anonymous() {
        handle_init(config, seeded);
        return Ok(());
    }

    let email = user.context("--user (or PORTMASTER_USER) is required for this command")?;
    let password =
        password.context("--password (or PORTMASTER_PASSWORD) is required for this command")?;
    let user = office.authenticate(&email, &password).await?;

    match command {
        Command::Init | Command::Config(_) => Ok(()),
        Command::Login => {
            println!("Logged in as {} <{}> ({})", user.name, user.email, user.role);
            Ok(())
        }
        Command::Fisher(cmd) => handle_fisher(&office, &user, cmd).await,
        Command::Catch(cmd) => handle_catch(&office, &user, cmd).await,
        Command::Scan => {
            let result = office.scan_card(&user).await?;
            print_scan(&result);
            Ok(())
        }
        Command::Search { query } => {
            let result = office.manual_search(&query, &user).await?;
            print_scan(&result);
            Ok(())
        }
        Command::Logs { format } => print_logs(&office.list_nfc_logs(&user).await?, format),
        Command::Renew(cmd) => handle_renew(&office, &user, cmd).await,
        Command::Renewals { search, format } => {
            let renewals = match search {
                Some(query) => office.search_renewals(&user, &query).await?,
                None => office.list_renewals(&user).await?,
            };
            print_renewals(&renewals, format)
        }
        Command::Report(cmd) => handle_report(&office, &user, cmd).await,
    }
}

fn handle_init(config: &Config, seeded: seed::SeedSummary) {
    match config.storage.backend {
        StorageBackend::Sqlite => println!("Database:  {}", config.database_path().display()),
        StorageBackend::Memory => println!("Database:  in memory (discarded on exit)"),
    }
    println!("Accounts:  {} created", seeded.users);
    println!("Fishers:   {} demo records created", seeded.fishers);
}

async fn handle_fisher(office: &PortOffice, user: &User, cmd: FisherCommand) -> anyhow::Result<()> {
    match cmd {
        FisherCommand::List { format } => {
            print_fishers(&office.list_fishers(user).await?, format)?;
        }
        FisherCommand::Add(args) => {
            let fisher = office.add_fisher(user, args.into()).await?;
            println!("Added fisher {}", fisher.fisher_id);
        }
        FisherCommand::Update(args) => {
            let fisher = office.update_fisher(user, args.into()).await?;
            println!("Updated fisher {}", fisher.fisher_id);
        }
        FisherCommand::Delete { fisher_id } => {
            if office.delete_fisher(user, &fisher_id).await? {
                println!("Deleted fisher {fisher_id}");
            } else {
                println!("No fisher {fisher_id}; nothing deleted");
            }
        }
    }
    Ok(())
}

async fn handle_catch(office: &PortOffice, user: &User, cmd: CatchCommand) -> anyhow::Result<()> {
    match cmd {
        CatchCommand::List { date, format } => {
            let catches = match date {
                Some(date) => office.catches_on(user, &date).await?,
                None => office.list_catches(user).await?,
            };
            print_catches(&catches, format)?;
        }
        CatchCommand::Add(args) => {
            let draft = args.into_draft(&office.clock().today_iso());
            let record = office.save_catch(user, draft).await?;
            println!(
                "Logged catch #{}: {} {} {}",
                record.id, record.quantity, record.unit, record.fish_type
            );
        }
        CatchCommand::Update { id, catch } => {
            let draft = catch.into_draft(&office.clock().today_iso());
            let record = office.update_catch(user, id, draft).await?;
            println!("Updated catch #{}", record.id);
        }
    }
    Ok(())
}

async fn handle_renew(office: &PortOffice, user: &User, cmd: RenewCommand) -> anyhow::Result<()> {
    let scan = office.manual_search(&cmd.query, user).await?;
    print_scan(&scan);

    let mut wizard = RenewalWizard::begin(&scan, user)?;
    let code = wizard.authorize(office, &cmd.ssn).await?;
    println!("Authorization: {code}");

    let record = wizard.confirm_payment(office, cmd.amount).await?;
    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(record)?),
        OutputFormat::Table => print_receipt(record),
    }
    Ok(())
}

async fn handle_report(office: &PortOffice, user: &User, cmd: ReportCommand) -> anyhow::Result<()> {
    let current_month = || office.clock().today().format("%Y-%m").to_string();

    match cmd {
        ReportCommand::Summary { month, format } => {
            let month = month.unwrap_or_else(current_month);
            print_summary(&month, &office.monthly_summary(user, &month).await?, format)?;
        }
        ReportCommand::Export { month } => {
            let month = month.unwrap_or_else(current_month);
            match office.export_monthly_report(user, &month).await? {
                Some(record) => println!("Saved {}", record.path),
                None => println!("Export cancelled"),
            }
        }
        ReportCommand::FishTypes => {
            for fish_type in office.fish_types(user).await? {
                println!("{fish_type}");
            }
        }
        ReportCommand::History { format } => {
            print_reports(&office.list_reports(user).await?, format)?;
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Backend:            {:?}", config.storage.backend);
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Reader]");
                println!("  Simulated UID:      {}", config.reader.simulated_uid);
                println!("  Simulate fault:     {}", config.reader.simulate_fault);
                println!();
                println!("[Reports]");
                println!("  Output directory:   {}", config.reports_dir().display());
                println!();
                println!("[Seed]");
                println!("  Demo fishers:       {}", config.seed.demo_fishers);
                println!();
                println!("[UI]");
                println!("  Language:           {:?}", config.ui.language);
                println!();
                println!("[History]");
                println!("  NFC log limit:      {}", config.history.nfc_log_limit);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn print_scan(result: &ScanResult) {
    println!("Status:    {}", result.message);
    if let Some(fisher) = &result.data {
        println!("Fisher:    {} ({})", fisher.name, fisher.fisher_id);
        println!("Boat:      {}", fisher.boat);
        println!("Card:      {}", fisher.card_uid);
        if !fisher.insurance_expiry.is_empty() {
            println!("Expires:   {}", fisher.insurance_expiry);
        }
    }
}

fn print_receipt(record: &RenewalRecord) {
    println!();
    println!("Receipt {}", record.transaction_id);
    println!("------------------------------------------");
    println!("Fisher:         {} ({})", record.fisher_name, record.fisher_id);
    println!("Boat:           {}", record.boat);
    println!("SSN:            {}", record.social_security_number);
    println!("Amount:         {:.2} DA", record.amount);
    println!(
        "Validity:       {} -> {}",
        record.renewal_date, record.new_expiry_date
    );
    println!("Operator:       {}", record.operator_name);
    println!("Authorization:  {}", record.authorization_pdf_path);
    println!("Receipt:        {}", record.receipt_pdf_path);
}

fn print_fishers(fishers: &[Fisher], format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(fishers)?);
        return Ok(());
    }
    println!("{:<8} {:<14} {:<12} {:<24} BOAT", "ID", "CARD", "EXPIRY", "NAME");
    for f in fishers {
        println!(
            "{:<8} {:<14} {:<12} {:<24} {}",
            f.fisher_id, f.card_uid, f.insurance_expiry, f.name, f.boat
        );
    }
    Ok(())
}

fn print_catches(catches: &[CatchRecord], format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(catches)?);
        return Ok(());
    }
    println!(
        "{:>5} {:<12} {:<18} {:>10} {:<6} FISHER",
        "ID", "DATE", "FISH", "QUANTITY", "UNIT"
    );
    for c in catches {
        println!(
            "{:>5} {:<12} {:<18} {:>10} {:<6} {}",
            c.id, c.date, c.fish_type, c.quantity, c.unit, c.fisher_name
        );
    }
    Ok(())
}

fn print_logs(logs: &[NfcLog], format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(logs)?);
        return Ok(());
    }
    println!(
        "{:>5} {:<20} {:<8} {:<10} {:<10} NAME",
        "ID", "TIME", "FISHER", "MATCH", "STATUS"
    );
    for log in logs {
        let matched = format!("{:?}", log.match_status);
        let status = format!("{:?}", log.activation_status);
        println!(
            "{:>5} {:<20} {:<8} {:<10} {:<10} {}",
            log.log_id,
            log.timestamp.format("%Y-%m-%d %H:%M:%S"),
            log.fisher_id,
            matched,
            status,
            log.name_from_card
        );
    }
    Ok(())
}

fn print_renewals(renewals: &[RenewalRecord], format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(renewals)?);
        return Ok(());
    }
    println!(
        "{:<42} {:<8} {:<12} {:<12} {:>10}",
        "TRANSACTION", "FISHER", "PAID", "EXPIRES", "AMOUNT"
    );
    for r in renewals {
        println!(
            "{:<42} {:<8} {:<12} {:<12} {:>10.2}",
            r.transaction_id, r.fisher_id, r.renewal_date, r.new_expiry_date, r.amount
        );
    }
    Ok(())
}

fn print_summary(month: &str, rows: &[SummaryRow], format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }
    println!("Catches for {month}");
    println!("{:<20} {:<6} {:>12}", "FISH", "UNIT", "TOTAL");
    for row in rows {
        println!("{:<20} {:<6} {:>12}", row.fish_type, row.unit, row.total);
    }
    Ok(())
}

fn print_reports(reports: &[ReportRecord], format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(reports)?);
        return Ok(());
    }
    println!("{:<8} {:<20} {:<16} PATH", "MONTH", "GENERATED", "BY");
    for r in reports {
        println!(
            "{:<8} {:<20} {:<16} {}",
            r.month,
            r.generated_at.format("%Y-%m-%d %H:%M:%S"),
            r.generated_by,
            r.path
        );
    }
    Ok(())
}
