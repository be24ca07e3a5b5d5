use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use signpath_algo::ranking::compare_weakness;
use signpath_algo::{generate_plan, ExerciseKind, ExerciseSlot, SequencingError, WordStats};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

use signpath_runtime::catalog::{Catalog, CatalogError};
use signpath_runtime::config::RuntimeConfig;
use signpath_runtime::grading::{Evaluation, GradingService, HttpGrader};
use signpath_runtime::logging::init_tracing;
use signpath_runtime::session::{LessonSession, PlanRequest, SessionError};
use signpath_runtime::store::{JsonFileStore, MasteryStore, StoreError};

#[derive(Parser, Debug)]
#[command(name = "signpath", version, about = "Adaptive sign-vocabulary practice planner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the plan the learner would get next, as JSON
    Plan(TargetArgs),
    /// Work through a plan interactively on the terminal
    Practice(TargetArgs),
    /// Print the learner's mastery, weakest first
    Mastery {
        #[arg(long)]
        learner: String,
    },
}

#[derive(Args, Debug)]
struct TargetArgs {
    /// Lesson id from the catalog
    #[arg(long, conflicts_with = "unit", required_unless_present = "unit")]
    lesson: Option<String>,
    /// Unit id from the catalog, for a unit test
    #[arg(long)]
    unit: Option<String>,
    /// Motion phase first, recognition phase second
    #[arg(long)]
    phased: bool,
    #[arg(long)]
    learner: String,
}

impl TargetArgs {
    fn request(&self) -> Result<PlanRequest, CliError> {
        match (&self.lesson, &self.unit) {
            (Some(lesson), _) => Ok(PlanRequest::lesson(lesson.as_str(), self.phased)),
            (None, Some(unit)) => Ok(PlanRequest::unit_test(unit.as_str(), self.phased)),
            (None, None) => Err(CliError::NoTarget),
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Sequencing(#[from] SequencingError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("either --lesson or --unit is required")]
    NoTarget,
    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MasteryRow<'a> {
    item_id: &'a str,
    weakness: f64,
    #[serde(flatten)]
    stats: &'a WordStats,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let config = RuntimeConfig::from_env();
    let _log_guard = init_tracing(&config.log_level);

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: &RuntimeConfig) -> Result<(), CliError> {
    let store = JsonFileStore::new(&config.data_dir);

    match command {
        Command::Plan(args) => {
            let catalog = Catalog::load(&config.catalog_path).await?;
            let request = args.request()?;
            let items = request.resolve_items(&catalog)?;
            let mastery = store.load(&args.learner).await?;
            let plan = generate_plan(request.kind(), &items, &mastery)?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Command::Practice(args) => practice(args, config, store).await?,
        Command::Mastery { learner } => {
            let mastery = store.load(&learner).await?;
            let mut rows: Vec<_> = mastery.iter().collect();
            rows.sort_by(|(_, a), (_, b)| compare_weakness(a, b));
            let rows: Vec<_> = rows
                .into_iter()
                .map(|(id, stats)| MasteryRow {
                    item_id: id,
                    weakness: stats.recognition_rate(),
                    stats,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}

async fn practice(
    args: TargetArgs,
    config: &RuntimeConfig,
    store: JsonFileStore,
) -> Result<(), CliError> {
    let catalog = Catalog::load(&config.catalog_path).await?;
    let grader = config
        .grader
        .clone()
        .map(|grader| Arc::new(HttpGrader::new(grader)) as Arc<dyn GradingService>);
    if grader.is_none() {
        tracing::warn!("GRADER_ENDPOINT not set, produce slots will count as failed");
    }

    let request = args.request()?;
    if let Some(heading) = heading(&catalog, &request) {
        println!("== {heading} ==");
    }

    let mut session = LessonSession::start(
        &args.learner,
        request,
        &catalog,
        Arc::new(store),
        grader,
    )
    .await?
    .with_pass_ratio(config.pass_ratio);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(slot) = session.cursor().slot.cloned() {
        let cursor = session.cursor();
        let phase = cursor.phase.map(|p| format!(" ({p:?})")).unwrap_or_default();
        println!("\n[{}/{}]{phase} {}", cursor.index + 1, cursor.total, slot.kind.as_str());

        let step = match slot.kind {
            ExerciseKind::Introduce => {
                println!("Watch \"{}\": {}", slot.correct_answer(), slot.item.media_path);
                println!("Press enter when done.");
                let Some(_) = lines.next_line().await? else {
                    return Ok(());
                };
                session.view().await?
            }
            ExerciseKind::Recognize => {
                let options = answer_options(&slot);
                println!("Which sign is this? {}", slot.item.media_path);
                for (n, option) in options.iter().enumerate() {
                    println!("  {}. {option}", n + 1);
                }
                let Some(line) = lines.next_line().await? else {
                    return Ok(());
                };
                let chosen = line
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|n| options.get(n));
                let correct = chosen.is_some_and(|answer| answer == slot.correct_answer());
                println!("{}", if correct { "Correct!" } else { "Not quite." });
                session.answer(correct).await?
            }
            ExerciseKind::Produce => {
                println!("Sign \"{}\" and enter the path of your recording:", slot.correct_answer());
                let Some(line) = lines.next_line().await? else {
                    return Ok(());
                };
                let path = line.trim();
                let video = if path.is_empty() {
                    Vec::new()
                } else {
                    tokio::fs::read(path).await?
                };
                session.submit(video).await?
            }
        };
        if !step.rewritten.is_empty() {
            println!("(plan adjusted at {:?})", step.rewritten);
        }
        if session.has_unsaved_mastery() {
            println!("(progress not saved yet, will retry)");
        }
    }

    println!("\nWaiting for grades...");
    let summary = session.finish(true).await?;
    println!("{}", serde_json::to_string_pretty(&summary.report)?);
    for question in &summary.report.questions {
        if let Some(evaluation) = summary.feedback.get(&question.index) {
            print_feedback(&question.correct_answer, evaluation);
        }
    }
    match summary.passed {
        Some(true) => println!("Passed with {}%", summary.report.percentage()),
        Some(false) => println!("Not passed yet: {}%", summary.report.percentage()),
        None => println!("Result pending"),
    }
    Ok(())
}

fn heading(catalog: &Catalog, request: &PlanRequest) -> Option<String> {
    match request {
        PlanRequest::UnitTest(id) | PlanRequest::PhasedUnitTest(id) => {
            catalog.unit(id).map(|unit| unit.test_title())
        }
        PlanRequest::Lesson(id) | PlanRequest::PhasedLesson(id) => catalog
            .lesson(id)
            .map(|lesson| lesson.title.clone())
            .filter(|title| !title.is_empty()),
    }
}

fn print_feedback(word: &str, evaluation: &Evaluation) {
    println!("\n\"{word}\": {}/4", evaluation.overall_score_0_to_4);
    if !evaluation.summary.is_empty() {
        println!("  {}", evaluation.summary);
    }
    for point in &evaluation.pros.points {
        println!("  + {point}");
    }
    for point in &evaluation.cons.points {
        println!("  - {point}");
    }
}

/// Correct answer plus distractors, in a stable order
fn answer_options(slot: &ExerciseSlot) -> Vec<String> {
    let mut options: Vec<String> = std::iter::once(slot.correct_answer().to_string())
        .chain(slot.distractors().iter().cloned())
        .collect();
    options.sort();
    options.dedup();
    options
}
