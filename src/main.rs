use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use classroom_advisor::models::{Group, GroupPurpose, Student};
use classroom_advisor::{db, report, Advisor, AdvisorConfig};

#[derive(Parser)]
#[command(name = "classroom-advisor")]
#[command(about = "AI-assisted grade predictions, groupings and insights for a class roster", long_about = None)]
struct Cli {
    #[command(flatten)]
    roster: RosterArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RosterArgs {
    /// Read the roster from a CSV export instead of DATABASE_URL
    #[arg(long, global = true)]
    csv: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether the hosted model is in use
    Status,
    /// Predict next-assignment grades for every student
    Predict {
        #[arg(long)]
        context: Option<String>,
    },
    /// Suggest student groups
    Groups {
        #[arg(long, default_value = "collaborative")]
        purpose: GroupPurpose,
    },
    /// Analyze one student's learning trajectory
    Insights {
        #[arg(long)]
        student: String,
        /// Include graded submissions from the database as history
        #[arg(long)]
        with_history: bool,
    },
    /// Generate intervention strategies for one student
    Interventions {
        #[arg(long)]
        student: String,
        #[arg(long = "risk")]
        risks: Vec<String>,
    },
    /// Draft a parent/guardian message for one student
    Communicate {
        #[arg(long)]
        student: String,
        #[arg(long)]
        context: String,
    },
    /// Generate everything and write a markdown report
    Report {
        #[arg(long)]
        context: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn load_roster(args: &RosterArgs) -> anyhow::Result<Vec<Student>> {
    if let Some(path) = &args.csv {
        return db::load_csv_roster(path);
    }

    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set, or pass --csv with a roster export")?;
    let pool = db::connect(&database_url).await?;
    db::fetch_students(&pool).await
}

/// The roster plus its current groups. CSV rosters only know group ids.
async fn load_classroom(args: &RosterArgs) -> anyhow::Result<(Vec<Student>, Vec<Group>)> {
    if let Some(path) = &args.csv {
        let roster = db::load_csv_roster(path)?;
        let groups = db::groups_from_roster(&roster);
        return Ok((roster, groups));
    }

    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set, or pass --csv with a roster export")?;
    let pool = db::connect(&database_url).await?;
    let roster = db::fetch_students(&pool).await?;
    let groups = db::fetch_groups(&pool).await?;
    Ok((roster, groups))
}

fn find_student<'a>(roster: &'a [Student], key: &str) -> anyhow::Result<&'a Student> {
    roster
        .iter()
        .find(|s| s.id == key || s.email.eq_ignore_ascii_case(key))
        .with_context(|| format!("no student with id or email {key}"))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = AdvisorConfig::from_env();
    let advisor = Advisor::from_config(&config)?;

    match cli.command {
        Commands::Status => {
            print_json(&advisor.status())?;
        }
        Commands::Predict { context } => {
            let roster = load_roster(&cli.roster).await?;
            let predictions = advisor.predict_grades(&roster, context.as_deref()).await;
            print_json(&predictions)?;
        }
        Commands::Groups { purpose } => {
            let roster = load_roster(&cli.roster).await?;
            let groups = advisor.suggest_optimal_groups(&roster, purpose).await;
            print_json(&groups)?;
        }
        Commands::Insights {
            student,
            with_history,
        } => {
            let roster = load_roster(&cli.roster).await?;
            let student = find_student(&roster, &student)?;

            let history = if with_history {
                let database_url = std::env::var("DATABASE_URL")
                    .context("DATABASE_URL must be set to load submission history")?;
                let pool = db::connect(&database_url).await?;
                Some(db::fetch_submission_history(&pool, &student.id).await?)
            } else {
                None
            };

            let insights = advisor
                .analyze_learning_trajectory(student, history.as_deref())
                .await;
            print_json(&insights)?;
        }
        Commands::Interventions { student, risks } => {
            let roster = load_roster(&cli.roster).await?;
            let student = find_student(&roster, &student)?;
            let interventions = advisor
                .generate_intervention_strategies(student, &risks)
                .await;
            print_json(&interventions)?;
        }
        Commands::Communicate { student, context } => {
            let roster = load_roster(&cli.roster).await?;
            let student = find_student(&roster, &student)?;
            let message = advisor.generate_parent_communication(student, &context).await;
            print_json(&message)?;
        }
        Commands::Report {
            context,
            title,
            out,
        } => {
            let (roster, groups) = load_classroom(&cli.roster).await?;
            let overview = advisor
                .classroom_overview(&roster, context.as_deref())
                .await;
            let report = report::build_report(
                title.as_deref(),
                chrono::Utc::now(),
                &roster,
                &groups,
                &overview,
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
