use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use deqm_core::{
    constants::{DEFAULT_SERVER_BASE, SERVER_URL_ENV},
    seed_evaluate_form, seed_form, CareGapsController, CoreConfig, Display,
    EvaluateMeasureController, EvaluateMeasureForm, FhirClient, FormState, HttpTransport,
    MeasureRequest, NotificationKind, ReportType, SeedReferences, SelectionMode,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "deqm")]
#[command(about = "DEQM test server console")]
struct Cli {
    /// FHIR server base URL
    #[arg(long, global = true, env = SERVER_URL_ENV, default_value = DEFAULT_SERVER_BASE)]
    server: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List resource types the server supports
    Types,
    /// List resources of one type
    List {
        /// Resource type, e.g. Patient
        resource_type: String,
    },
    /// Print a resource as JSON
    Read { resource_type: String, id: String },
    /// Create a resource from a JSON file
    Create {
        resource_type: String,
        /// Path to the resource JSON
        file: PathBuf,
    },
    /// Replace a resource with the contents of a JSON file
    Update {
        resource_type: String,
        id: String,
        /// Path to the resource JSON
        file: PathBuf,
    },
    /// Delete a resource
    Delete { resource_type: String, id: String },
    /// Upload a transaction bundle
    Transaction {
        /// Path to the Bundle JSON
        file: PathBuf,
    },
    /// Calculate gaps in care for a measure
    CareGaps {
        measure_id: String,
        /// Patient reference (subject mode)
        #[arg(long)]
        patient: Option<String>,
        /// Organization reference (organization mode)
        #[arg(long)]
        organization: Option<String>,
        /// Practitioner reference (organization mode only)
        #[arg(long)]
        practitioner: Option<String>,
        /// Force subject or organization mode instead of inferring it
        #[arg(long)]
        mode: Option<SelectionMode>,
        /// Program filter
        #[arg(long)]
        program: Option<String>,
        /// Period start (YYYY-MM-DD)
        #[arg(long)]
        period_start: Option<NaiveDate>,
        /// Period end (YYYY-MM-DD)
        #[arg(long)]
        period_end: Option<NaiveDate>,
        /// Print the request without sending it
        #[arg(long)]
        preview: bool,
    },
    /// Evaluate a measure
    EvaluateMeasure {
        measure_id: String,
        /// individual or summary
        #[arg(long, default_value = "individual")]
        report_type: ReportType,
        /// Subject reference (individual reports)
        #[arg(long)]
        subject: Option<String>,
        /// Practitioner reference (summary reports)
        #[arg(long)]
        practitioner: Option<String>,
        /// Period start (YYYY-MM-DD)
        #[arg(long)]
        period_start: Option<NaiveDate>,
        /// Period end (YYYY-MM-DD)
        #[arg(long)]
        period_end: Option<NaiveDate>,
        /// Print the request without sending it
        #[arg(long)]
        preview: bool,
    },
}

fn read_json(path: &Path) -> Result<Value, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Error formatting response: {}", e),
    }
}

fn print_display(display: &Display) {
    if let Some(notification) = &display.notification {
        let marker = match notification.kind {
            NotificationKind::Positive => "ok",
            NotificationKind::Negative => "error",
        };
        eprintln!("[{}] {}: {}", marker, notification.title, notification.message);
    }
    if let Some(result) = &display.result {
        print_json(result);
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = Arc::new(CoreConfig::new(&cli.server)?);
    let client = FhirClient::new(HttpTransport::new(cfg));

    match cli.command {
        Some(Commands::Types) => match client.capability_resource_types().await {
            Ok(types) => {
                for resource_type in types {
                    println!("{}", resource_type);
                }
            }
            Err(e) => eprintln!("Error reading capability statement: {}", e),
        },
        Some(Commands::List { resource_type }) => match client.list(&resource_type).await {
            Ok(resources) if resources.is_empty() => {
                println!("No {} resources found.", resource_type)
            }
            Ok(resources) => {
                for resource in resources {
                    println!("{}/{}", resource.resource_type, resource.id);
                }
            }
            Err(e) => eprintln!("Error listing {}: {}", resource_type, e),
        },
        Some(Commands::Read { resource_type, id }) => {
            match client.read(&resource_type, &id).await {
                Ok(resource) => print_json(&resource),
                Err(e) => eprintln!("Error reading {}/{}: {}", resource_type, id, e),
            }
        }
        Some(Commands::Create {
            resource_type,
            file,
        }) => {
            let body = read_json(&file)?;
            match client.create(&resource_type, body).await {
                Ok(Some(created)) => print_json(&created),
                Ok(None) => println!("Created {}", resource_type),
                Err(e) => eprintln!("Error creating {}: {}", resource_type, e),
            }
        }
        Some(Commands::Update {
            resource_type,
            id,
            file,
        }) => {
            let body = read_json(&file)?;
            match client.update(&resource_type, &id, body).await {
                Ok(Some(updated)) => print_json(&updated),
                Ok(None) => println!("Updated {}/{}", resource_type, id),
                Err(e) => eprintln!("Error updating {}/{}: {}", resource_type, id, e),
            }
        }
        Some(Commands::Delete { resource_type, id }) => {
            match client.delete(&resource_type, &id).await {
                Ok(_) => println!("Deleted {}/{}", resource_type, id),
                Err(e) => eprintln!("Error deleting {}/{}: {}", resource_type, id, e),
            }
        }
        Some(Commands::Transaction { file }) => {
            let bundle = read_json(&file)?;
            match client.transaction(bundle).await {
                Ok(response) => print_json(&response),
                Err(e) => eprintln!("Error uploading transaction bundle: {}", e),
            }
        }
        Some(Commands::CareGaps {
            measure_id,
            patient,
            organization,
            practitioner,
            mode,
            program,
            period_start,
            period_end,
            preview,
        }) => {
            let seed = SeedReferences {
                patient,
                organization,
                practitioner,
            };
            let mut form = if period_start.is_some() && period_end.is_some() {
                FormState::seeded(&measure_id, &seed, today())
            } else {
                seed_form(&client, &measure_id, &seed, today()).await
            };
            form.apply_measure_period(period_start, period_end);
            if let Some(mode) = mode {
                form.set_mode(mode);
            }
            if let Some(program) = program {
                form.set_program(program);
            }

            let mut controller = CareGapsController::new(client, form);
            println!("{}", controller.preview());
            if preview {
                return Ok(());
            }
            match controller.calculate().await {
                Some(display) => print_display(&display),
                None => eprintln!(
                    "Cannot calculate: {} mode requires a reference",
                    controller.form().mode().as_str()
                ),
            }
        }
        Some(Commands::EvaluateMeasure {
            measure_id,
            report_type,
            subject,
            practitioner,
            period_start,
            period_end,
            preview,
        }) => {
            let mut form = if period_start.is_some() && period_end.is_some() {
                EvaluateMeasureForm::new(&measure_id, today())
            } else {
                seed_evaluate_form(&client, &measure_id, None, today()).await
            };
            form.apply_measure_period(period_start, period_end);
            form.report_type = report_type;
            form.subject_ref = subject.unwrap_or_default();
            form.practitioner_ref = practitioner.unwrap_or_default();

            let mut controller = EvaluateMeasureController::new(client, form);
            println!("{}", controller.form().request_path());
            if preview {
                return Ok(());
            }
            match controller.calculate().await {
                Some(display) => print_display(&display),
                None => eprintln!("Cannot calculate: individual reports require --subject"),
            }
        }
        None => {
            println!("Use 'deqm --help' for commands");
        }
    }

    Ok(())
}
