use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};

use bedside::access::gate::{current_access, AccessGrant};
use bedside::access::profile::Theme;
use bedside::config::{Config, Stores};
use bedside::play;
use bedside::scenario::document::ScenarioDocument;
use bedside::scenario::Scenario;
use bedside::store::ScenarioSource;

#[derive(Debug, Parser)]
#[command(name = "bedside", version, about = "Branching clinical scenario practice")]
struct Cli {
    /// Directory holding scenarios/, class_rosters.json and access.json.
    #[arg(long, env = "BEDSIDE_DATA_DIR", default_value_os_t = Config::default().data_dir, global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the scenarios you can open.
    Scenarios,
    /// Work through a scenario one decision at a time.
    Play { id: String },
    /// Print a scenario's decision tree.
    Show { id: String },
    /// Check a scenario file without saving it.
    Validate { file: PathBuf },
    /// Validate and store a scenario file under an id (admin).
    Import { id: String, file: PathBuf },
    /// Delete a stored scenario (admin).
    Remove { id: String },
    /// Write the built-in scenarios that are missing.
    Seed,
    /// Show the current user, admin status, theme and allowed scenarios.
    Whoami,
    /// Switch the current user.
    Login { email: String },
    /// Clear the current user.
    Logout,
    /// Set the display theme for the current user.
    Theme { theme: Theme },
    /// Manage class rosters (admin).
    #[command(subcommand)]
    Class(ClassCommand),
}

#[derive(Debug, Subcommand)]
enum ClassCommand {
    List,
    Create { name: String },
    Delete { id: String },
    AddStudent { id: String, email: String },
    RemoveStudent { id: String, email: String },
    /// Restrict the class to these scenarios; pass none to allow all.
    Allow { id: String, scenario_ids: Vec<String> },
}

fn main() -> Result<()> {
    // Initialize logging. Control verbosity with RUST_LOG env var:
    //   RUST_LOG=info   bedside play chest-pain   # session transitions + store writes
    //   RUST_LOG=debug  bedside play chest-pain   # + access resolution, hydrated graphs
    //   RUST_LOG=trace  bedside play chest-pain   # + raw scenario documents
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let config = Config::new(cli.data_dir);
    info!("Using data directory {}", config.data_dir().display());
    let stores = config.open();
    debug!(
        "Stores: scenarios={}, rosters={}, access={}",
        stores.scenarios.dir().display(),
        stores.rosters.path().display(),
        stores.profiles.path().display()
    );

    match cli.command {
        Command::Scenarios => list_scenarios(&stores),
        Command::Play { id } => play_scenario(&stores, &id),
        Command::Show { id } => {
            let scenario = play::open_scenario(&stores.scenarios, &access(&stores)?, &id)?;
            print!("{}", play::outline(&scenario));
            Ok(())
        }
        Command::Validate { file } => {
            let scenario = Scenario::from_document(&read_document(&file)?)?;
            println!(
                "OK: '{}' ({} nodes, up to {} steps)",
                scenario.title(),
                scenario.nodes().len(),
                scenario.total_steps()
            );
            Ok(())
        }
        Command::Import { id, file } => {
            access(&stores)?.ensure_admin()?;
            let doc = read_document(&file)?;
            stores.scenarios.save(&id, &doc)?;
            println!("Saved scenario '{id}'.");
            Ok(())
        }
        Command::Remove { id } => {
            access(&stores)?.ensure_admin()?;
            if stores.scenarios.delete(&id)? {
                println!("Removed scenario '{id}'.");
            } else {
                println!("No scenario '{id}' to remove.");
            }
            Ok(())
        }
        Command::Seed => {
            let written = stores.scenarios.seed_defaults()?;
            if written.is_empty() {
                println!("Built-in scenarios already present.");
            } else {
                println!("Wrote: {}", written.join(", "));
            }
            Ok(())
        }
        Command::Whoami => {
            print_grant(&access(&stores)?);
            Ok(())
        }
        Command::Login { email } => {
            stores.profiles.set_current_email(&email)?;
            print_grant(&access(&stores)?);
            Ok(())
        }
        Command::Logout => {
            stores.profiles.set_current_email("")?;
            println!("Signed out.");
            Ok(())
        }
        Command::Theme { theme } => {
            stores.profiles.set_theme(theme)?;
            println!("Theme set to {theme}.");
            Ok(())
        }
        Command::Class(cmd) => {
            access(&stores)?.ensure_admin()?;
            run_class_command(&stores, cmd)
        }
    }
}

fn access(stores: &Stores) -> Result<AccessGrant> {
    current_access(&stores.profiles, &stores.rosters, &stores.scenarios)
        .context("failed to resolve access")
}

fn read_document(path: &Path) -> Result<ScenarioDocument> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn print_grant(grant: &AccessGrant) {
    if grant.email.is_empty() {
        println!("Not signed in.");
    } else {
        println!("Signed in as : {}", grant.email);
    }
    println!("Admin        : {}", if grant.is_admin { "yes" } else { "no" });
    println!("Theme        : {}", grant.theme);
    if grant.allowed_scenario_ids.is_empty() {
        println!("Scenarios    : (none)");
    } else {
        println!("Scenarios    : {}", grant.allowed_scenario_ids.join(", "));
    }
}

fn list_scenarios(stores: &Stores) -> Result<()> {
    let grant = access(stores)?;
    if grant.allowed_scenario_ids.is_empty() {
        if grant.is_admin {
            println!("No scenarios yet. Run `bedside seed` to add the built-in ones.");
        } else {
            println!("No scenarios are available to you.");
        }
        return Ok(());
    }

    for id in &grant.allowed_scenario_ids {
        match stores.scenarios.load_scenario(id) {
            Ok(scenario) => println!("{id:<24} {}", scenario.title()),
            Err(e) => println!("{id:<24} ({}: {e})", e.kind()),
        }
    }
    Ok(())
}

fn play_scenario(stores: &Stores, id: &str) -> Result<()> {
    let grant = access(stores)?;
    let scenario = play::open_scenario(&stores.scenarios, &grant, id)?;
    info!("'{}' starting '{}'", grant.email, scenario.title());

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();
    play::run(&scenario, &mut input, &mut out)
}

fn run_class_command(stores: &Stores, cmd: ClassCommand) -> Result<()> {
    let rosters = &stores.rosters;
    match cmd {
        ClassCommand::List => {
            let all = rosters.all()?;
            if all.is_empty() {
                println!("No classes.");
            }
            for class in all {
                let scope = if class.allows_everything() {
                    "all scenarios".to_string()
                } else {
                    class.allowed_scenario_ids.join(", ")
                };
                println!("{}  {}  ({scope})", class.id, class.name);
                for student in &class.students {
                    println!("    {student}");
                }
            }
        }
        ClassCommand::Create { name } => {
            let class = rosters.create_class(&name)?;
            println!("Created '{}' with id {}.", class.name, class.id);
        }
        ClassCommand::Delete { id } => report_change(rosters.delete_class(&id)?, "Deleted.", &id),
        ClassCommand::AddStudent { id, email } => {
            rosters.get(&id)?;
            if rosters.add_student(&id, &email)? {
                println!("Added.");
            } else {
                println!("Already enrolled.");
            }
        }
        ClassCommand::RemoveStudent { id, email } => {
            rosters.get(&id)?;
            if rosters.remove_student(&id, &email)? {
                println!("Removed.");
            } else {
                println!("Not enrolled.");
            }
        }
        ClassCommand::Allow { id, scenario_ids } => {
            for scenario_id in &scenario_ids {
                if !stores.scenarios.exists(scenario_id.trim())? {
                    println!("Warning: no scenario '{}' exists yet.", scenario_id.trim());
                }
            }
            report_change(
                rosters.set_allowed_scenarios(&id, &scenario_ids)?,
                "Updated.",
                &id,
            );
        }
    }
    Ok(())
}

fn report_change(changed: bool, message: &str, class_id: &str) {
    if changed {
        println!("{message}");
    } else {
        println!("No class with id '{class_id}'.");
    }
}
