use clap::{Parser, Subcommand, ValueEnum};
use std::io;
use std::path::PathBuf;
use std::process;
use studentdb::{validation, Registry, RegistryConfig, Student, DEFAULT_CAPACITY, DEFAULT_PATH};

mod shell;

/// Student registry — keep a small list of students in a plain text file
#[derive(Parser)]
#[command(name = "studentdb", version, about)]
struct Cli {
    /// Path to the registry file
    #[arg(long, env = "STUDENTDB_PATH", default_value = DEFAULT_PATH)]
    db: PathBuf,

    /// Maximum number of students the registry accepts
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Output format for one-shot commands
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive menu (the default when no command is given)
    Shell,

    /// Print every student
    List,

    /// Add a new student
    Add {
        /// First name (whitespace is removed)
        first_name: String,
        /// Last name (whitespace is removed)
        last_name: String,
        /// Age in years
        #[arg(allow_hyphen_values = true)]
        age: String,
    },

    /// Find a student by ID
    Find {
        /// Student ID
        #[arg(allow_hyphen_values = true)]
        id: String,
    },

    /// Rewrite the student count so it matches the records on disk
    Remove,

    /// Show the registry file, count and capacity
    Status,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error")).init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = RegistryConfig::new(cli.db.clone()).with_capacity(cli.capacity);

    match cli.command.unwrap_or(Command::Shell) {
        Command::Shell => {
            let stdin = io::stdin();
            let mut stdout = io::stdout();
            shell::run(config, &mut stdin.lock(), &mut stdout)?;
        }

        Command::List => {
            let registry = open_with_warnings(config)?;
            let students: Vec<&Student> = registry.list_all().collect();
            match cli.format {
                OutputFormat::Text if students.is_empty() => {
                    println!("{}", shell::EMPTY_REGISTRY)
                }
                OutputFormat::Text => {
                    for student in students {
                        println!("{}", student.to_line());
                    }
                }
                _ => print_output(&serde_json::to_value(&students)?, &cli.format)?,
            }
        }

        Command::Add {
            first_name,
            last_name,
            age,
        } => {
            let first_name = validation::normalize_name("first name", &first_name)?;
            let last_name = validation::normalize_name("last name", &last_name)?;
            let age = validation::parse_age(&age)?;

            let mut registry = Registry::initialize(config)?;
            report_warnings(&registry);
            let student = registry.append(&first_name, &last_name, age)?;
            match cli.format {
                OutputFormat::Text => {
                    println!("New student created!\n{}", shell::describe(&student))
                }
                _ => print_output(&serde_json::to_value(&student)?, &cli.format)?,
            }
        }

        Command::Find { id } => {
            let id = validation::parse_id(&id)?;
            let registry = open_with_warnings(config)?;
            let student = registry
                .find(id)
                .ok_or_else(|| format!("Student {id} not found"))?;
            match cli.format {
                OutputFormat::Text => println!("{}", shell::describe(student)),
                _ => print_output(&serde_json::to_value(student)?, &cli.format)?,
            }
        }

        Command::Remove => {
            let mut registry = open_with_warnings(config)?;
            let count = registry.resync_counter()?;
            match cli.format {
                OutputFormat::Text => println!("Student count resynced to {count}."),
                _ => print_output(
                    &serde_json::json!({ "ok": true, "count": count }),
                    &cli.format,
                )?,
            }
        }

        Command::Status => {
            let registry = Registry::open(config)?;
            let status = serde_json::json!({
                "path": registry.path().display().to_string(),
                "count": registry.count(),
                "records": registry.len(),
                "capacity": registry.capacity(),
                "warnings": registry
                    .warnings()
                    .iter()
                    .map(|w| w.to_string())
                    .collect::<Vec<_>>(),
            });
            match cli.format {
                OutputFormat::Text => {
                    println!("Registry: {}", registry.path().display());
                    println!(
                        "{} students exist ({} of {} IDs used).",
                        registry.len(),
                        registry.count(),
                        registry.capacity()
                    );
                    for warning in registry.warnings() {
                        println!("warning: {warning}");
                    }
                }
                _ => print_output(&status, &cli.format)?,
            }
        }
    }

    Ok(())
}

fn open_with_warnings(config: RegistryConfig) -> studentdb::Result<Registry> {
    let registry = Registry::open(config)?;
    report_warnings(&registry);
    Ok(registry)
}

fn report_warnings(registry: &Registry) {
    for warning in registry.warnings() {
        eprintln!("warning: {warning}");
    }
}

fn print_output(
    value: &serde_json::Value,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        OutputFormat::Text => println!("{value}"),
    }
    Ok(())
}
