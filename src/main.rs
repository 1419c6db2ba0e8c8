use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;

use netdesk::api::{Collaborators, HttpBackend};
use netdesk::audit::{AuditLog, JsonlAuditLog, NullAuditLog};
use netdesk::config::Config;
use netdesk::logging;
use netdesk::notifications::{ChannelIntegration, NotificationEvent, NotificationService};
use netdesk::queue::EnrichmentStatus;
use netdesk::search::{SearchScope, SearchService};
use netdesk::strategy::FieldValue;
use netdesk::types::{ExistingRecord, Subject};
use netdesk::wizard::{Phase, SubmitOutcome, WizardController, WizardLaunch};

#[derive(Parser)]
#[command(name = "netdesk")]
#[command(about = "Ticket and ONU provisioning workflows for the ISP operations console")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Write logs to a file under the state directory instead of stderr
    #[arg(long)]
    log_file: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search customers or pending registrations
    Search {
        /// Search term; every word must match
        term: String,

        /// Search pending registrations (PSB) instead of customers
        #[arg(long)]
        pending: bool,
    },

    /// Scan an OLT for unconfigured devices
    Scan {
        /// OLT name
        node: String,
    },

    /// Run a ticket workflow (create, open, forward, close)
    Ticket {
        /// Workflow mode
        mode: String,

        #[command(flatten)]
        args: WorkflowArgs,
    },

    /// Run a configuration workflow (manual, auto, batch, bridge)
    Configure {
        /// Workflow mode
        mode: String,

        /// OLT to configure against
        #[arg(short, long)]
        node: Option<String>,

        /// Batch mode: scan the node and queue every detected device
        #[arg(long)]
        scan: bool,

        #[command(flatten)]
        args: WorkflowArgs,
    },

    /// Show recorded audit entries
    Audit {
        /// Number of most recent entries to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Args)]
struct WorkflowArgs {
    /// Subject search term (modes that start by searching)
    #[arg(short, long)]
    term: Option<String>,

    /// Which search result to select (0-based)
    #[arg(long, default_value = "0")]
    pick: usize,

    /// JSON file with the existing record (open, forward, close, bridge)
    #[arg(short, long)]
    record: Option<PathBuf>,

    /// Form field assignment, e.g. --set description="LOS red"
    #[arg(short, long = "set", value_name = "FIELD=VALUE")]
    fields: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging setup)
    let config = Config::load(cli.config.as_deref())?;
    let logging_handle = logging::init_logging(&config, cli.log_file, cli.debug)?;

    let result = match cli.command {
        Commands::Search { term, pending } => cmd_search(&config, &term, pending).await,
        Commands::Scan { node } => cmd_scan(&config, &node).await,
        Commands::Ticket { mode, args } => {
            let launch = WizardLaunch::ticket(mode);
            cmd_workflow(&config, launch, args, false).await
        }
        Commands::Configure {
            mode,
            node,
            scan,
            args,
        } => {
            let mut launch = WizardLaunch::configuration(mode);
            launch.node = node;
            cmd_workflow(&config, launch, args, scan).await
        }
        Commands::Audit { limit } => cmd_audit(&config, limit).await,
    };

    if let Some(log_path) = logging_handle.log_file_path {
        eprintln!("Session log: {}", log_path.display());
    }

    result
}

fn collaborators(config: &Config) -> Result<Collaborators> {
    let backend = Arc::new(
        HttpBackend::from_config(&config.backend).context("Failed to create backend client")?,
    );
    let audit: Arc<dyn AuditLog> = if config.audit.enabled {
        Arc::new(JsonlAuditLog::from_config(config))
    } else {
        Arc::new(NullAuditLog)
    };
    Ok(Collaborators::from_backend(backend, audit))
}

/// Build a controller whose notifications are logged and also returned for
/// printing
fn build_wizard(
    config: &Config,
) -> Result<(WizardController, mpsc::UnboundedReceiver<NotificationEvent>)> {
    let (channel, rx) = ChannelIntegration::new();
    let channel = channel.with_events(config.notifications.events.clone());
    let notifications =
        NotificationService::from_config(config).with_integration(Arc::new(channel));

    let wizard = WizardController::new(
        collaborators(config)?,
        config.search_settings(),
        notifications,
    )
    .with_credentials(config.credentials());
    Ok((wizard, rx))
}

/// Print notifications that have been delivered so far
async fn print_notifications(rx: &mut mpsc::UnboundedReceiver<NotificationEvent>) {
    // deliveries run on their own tasks
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    while let Ok(event) = rx.try_recv() {
        let toast = event.to_toast();
        println!("[{:?}] {}: {}", toast.level, toast.title, toast.message);
    }
}

fn print_subjects(subjects: &[Subject]) {
    if subjects.is_empty() {
        println!("No matches");
        return;
    }
    println!("Matches ({})", subjects.len());
    println!("{}", "─".repeat(60));
    for (index, subject) in subjects.iter().enumerate() {
        let address = subject.attribute("address").unwrap_or("-");
        println!("{index:>2}  {:<16} {} ({address})", subject.id, subject.display_name);
    }
}

async fn cmd_search(config: &Config, term: &str, pending: bool) -> Result<()> {
    let collaborators = collaborators(config)?;
    let search = SearchService::new(collaborators.directory, config.search_settings());
    let scope = if pending {
        SearchScope::PendingRegistrations
    } else {
        SearchScope::Customers
    };

    if !search.is_searchable(term) {
        println!(
            "Search term must be at least {} characters",
            search.settings().min_term_length
        );
        return Ok(());
    }

    let subjects = search.search(scope, term).await?;
    print_subjects(&subjects);
    Ok(())
}

async fn cmd_scan(config: &Config, node: &str) -> Result<()> {
    let (mut wizard, mut notices) = build_wizard(config)?;
    wizard.open(WizardLaunch::configuration("batch").with_node(node))?;
    wizard.scan()?;
    wizard.run_until_idle().await;
    print_notifications(&mut notices).await;

    let devices = &wizard.state().devices;
    if !devices.is_empty() {
        println!("{}", "─".repeat(60));
        for device in devices {
            println!("{:<20} port {}", device.serial, device.port_label());
        }
    }
    Ok(())
}

/// Parse a `FIELD=VALUE` assignment. Comma-separated booleans become flags.
fn parse_assignment(raw: &str) -> Result<(String, FieldValue)> {
    let Some((field, value)) = raw.split_once('=') else {
        bail!("Invalid field assignment '{raw}', expected FIELD=VALUE");
    };
    let field = field.trim().to_string();
    if field.is_empty() {
        bail!("Invalid field assignment '{raw}', field name is empty");
    }

    let flags: Option<Vec<bool>> = value.contains(',').then(|| {
        value
            .split(',')
            .map(|part| match part.trim() {
                "1" | "true" | "on" => Some(true),
                "0" | "false" | "off" => Some(false),
                _ => None,
            })
            .collect()
    })
    .flatten();

    Ok(match flags {
        Some(flags) => (field, FieldValue::Flags(flags)),
        None => (field, FieldValue::Text(value.to_string())),
    })
}

async fn cmd_workflow(
    config: &Config,
    mut launch: WizardLaunch,
    args: WorkflowArgs,
    scan: bool,
) -> Result<()> {
    if let Some(path) = &args.record {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        launch.record = Some(ExistingRecord::from_json(&json).context("Invalid record JSON")?);
    }
    let assignments = args
        .fields
        .iter()
        .map(|raw| parse_assignment(raw))
        .collect::<Result<Vec<_>>>()?;

    let (mut wizard, mut notices) = build_wizard(config)?;
    wizard.open(launch)?;

    if let Some(strategy) = wizard.strategy() {
        println!("{}", strategy.title());
    }

    if wizard.phase() == Phase::Searching {
        let Some(term) = args.term.as_deref() else {
            bail!("This mode starts with a search; pass --term");
        };
        wizard.set_search_term(term)?;
        wizard.run_until_idle().await;
        print_notifications(&mut notices).await;
        print_subjects(&wizard.state().results);

        if !wizard.select_result(args.pick)? {
            bail!("No search result at position {}", args.pick);
        }
    }

    if scan {
        wizard.scan()?;
        wizard.run_until_idle().await;
        let added = wizard.add_detected_devices()?;
        // wait for customer enrichment
        wizard.run_until_idle().await;
        print_notifications(&mut notices).await;

        println!("Queued {added} devices");
        for item in wizard.queue().items() {
            let customer = match item.status {
                EnrichmentStatus::Resolved => item
                    .customer
                    .as_ref()
                    .map_or("no customer match", |c| c.name.as_str()),
                EnrichmentStatus::Unresolved => "lookup failed",
                EnrichmentStatus::Loading => "lookup pending",
            };
            println!("  {:<20} {:<8} {customer}", item.serial, item.port);
        }
    }

    for (field, value) in assignments {
        wizard.set_field(&field, value)?;
    }

    match wizard.submit()? {
        SubmitOutcome::Dispatched => {
            wizard.run_until_idle().await;
            print_notifications(&mut notices).await;
        }
        SubmitOutcome::Invalid(errors) => {
            print_notifications(&mut notices).await;
            for error in errors.iter() {
                eprintln!("  {error}");
            }
            bail!("Form is invalid");
        }
        SubmitOutcome::Refused(reason) => {
            print_notifications(&mut notices).await;
            bail!("Operation refused: {reason}");
        }
    }

    match &wizard.state().last_result {
        Some(result) => {
            for line in &result.logs {
                println!("  {line}");
            }
            Ok(())
        }
        None => bail!("Operation failed"),
    }
}

async fn cmd_audit(config: &Config, limit: usize) -> Result<()> {
    let log = JsonlAuditLog::from_config(config);
    let entries = log.read_all().await?;

    if entries.is_empty() {
        println!("No audit entries in {}", log.path().display());
        return Ok(());
    }

    println!("Audit Trail ({} entries)", entries.len());
    println!("{}", "─".repeat(60));
    let skip = entries.len().saturating_sub(limit);
    for entry in entries.iter().skip(skip) {
        println!(
            "{} {:<7} {:<13} {:?} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.action,
            entry.target,
            entry.status,
            entry.user_name.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
