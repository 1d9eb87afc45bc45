//! glassbox CLI module
//!
//! Command-line front end: build a demo black box, distill a black box into
//! surrogates, and rank features globally.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::blackbox::RandomForest;
use crate::config::DistillConfig;
use crate::data::{DataLoader, DataSaver};
use crate::evaluation::{DistillationReport, Distiller, FidelityLevel};
use crate::explain::{compute_global_importance, GlobalImportance};
use crate::surrogate::{SurrogateStrategy, TreeRenderOptions};
use crate::synthetic::make_classification;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn fidelity_colored(level: FidelityLevel, text: &str) -> ColoredString {
    match level {
        FidelityLevel::Low => text.yellow(),
        FidelityLevel::Good => text.cyan(),
        FidelityLevel::Excellent => text.green(),
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "glassbox")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Distill black-box classifiers into interpretable surrogates")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a demo random-forest black box on synthetic data
    MakeTeacher {
        /// Directory receiving teacher_model.json and the sample CSVs
        #[arg(short, long)]
        output_dir: PathBuf,

        #[arg(long, default_value = "200")]
        samples: usize,

        #[arg(long, default_value = "5")]
        features: usize,

        #[arg(long, default_value = "3")]
        informative: usize,

        /// Number of trees
        #[arg(long, default_value = "100")]
        trees: usize,

        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Distill a black box into interpretable surrogates
    Distill {
        /// Black-box model file (JSON random forest)
        #[arg(short, long)]
        model: PathBuf,

        /// Feature CSV, columns in the order the model expects
        #[arg(short, long)]
        data: PathBuf,

        /// Optional ground-truth label CSV (first column)
        #[arg(short, long)]
        labels: Option<PathBuf>,

        /// Surrogate family (logistic, tree, risk-score, all)
        #[arg(short, long, default_value = "tree")]
        strategy: String,

        /// Tree surrogate depth (1-15)
        #[arg(long)]
        max_depth: Option<usize>,

        /// Also compute the global LIME importance
        #[arg(long)]
        importance: bool,

        /// Rows explained for the importance ranking
        #[arg(long)]
        samples: Option<usize>,

        /// JSON configuration; flags override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the JSON report here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the best surrogate as JSON here
        #[arg(long)]
        save_surrogate: Option<PathBuf>,

        /// Show node impurity in tree rules
        #[arg(long)]
        show_impurity: bool,

        /// Show class proportions instead of counts in tree rules
        #[arg(long)]
        show_proportion: bool,
    },

    /// Rank features by aggregated LIME weights
    Importance {
        #[arg(short, long)]
        model: PathBuf,

        #[arg(short, long)]
        data: PathBuf,

        #[arg(long, default_value = "100")]
        samples: usize,

        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

/// Options of the `distill` command
pub struct DistillArgs {
    pub model: PathBuf,
    pub data: PathBuf,
    pub labels: Option<PathBuf>,
    pub strategy: String,
    pub max_depth: Option<usize>,
    pub importance: bool,
    pub samples: Option<usize>,
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub save_surrogate: Option<PathBuf>,
    pub render: TreeRenderOptions,
}

/// Resolve a strategy flag; `all` expands to every family
pub fn parse_strategies(value: &str, config: &DistillConfig) -> anyhow::Result<Vec<SurrogateStrategy>> {
    match value.trim().to_lowercase().as_str() {
        "all" => Ok(config.strategies()),
        other => {
            let strategy = match other.parse::<SurrogateStrategy>()? {
                SurrogateStrategy::DecisionTree { .. } if !other.contains(':') => {
                    config.tree_strategy()
                }
                s => s,
            };
            Ok(vec![strategy])
        }
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_make_teacher(
    output_dir: &Path,
    samples: usize,
    features: usize,
    informative: usize,
    trees: usize,
    seed: u64,
) -> anyhow::Result<()> {
    section("Make teacher");

    step_run("Generating data");
    let (x, y) = make_classification(samples, features, informative, seed)?;
    step_done(&format!("{} rows × {} cols", x.n_rows(), x.n_features()));

    step_run(&format!("Training random forest ({} trees)", trees));
    let start = Instant::now();
    let mut forest = RandomForest::new(trees).with_random_state(seed);
    forest.fit(x.values(), &y)?;
    step_done(&format!("{:?}", start.elapsed()));

    std::fs::create_dir_all(output_dir)?;
    let model_path = output_dir.join("teacher_model.json");
    let features_path = output_dir.join("sample_features.csv");
    let labels_path = output_dir.join("sample_labels.csv");

    forest.save_json(&model_path)?;
    step_ok(&format!("model    → {}", model_path.display()));
    DataSaver::save_features(&x, &features_path)?;
    step_ok(&format!("features → {}", features_path.display()));
    DataSaver::save_labels(&y, "target", &labels_path)?;
    step_ok(&format!("labels   → {}", labels_path.display()));

    println!();
    Ok(())
}

pub fn cmd_distill(args: &DistillArgs) -> anyhow::Result<()> {
    section("Distill");

    let mut config = match &args.config {
        Some(path) => DistillConfig::from_json_file(path)?,
        None => DistillConfig::default(),
    };
    if let Some(depth) = args.max_depth {
        config.tree.max_depth = depth;
    }
    if let Some(samples) = args.samples {
        config.explain.sample_count = samples;
    }
    config.validate()?;
    let strategies = parse_strategies(&args.strategy, &config)?;

    step_run("Loading model");
    let teacher = RandomForest::load_json(&args.model)?;
    step_done(&format!("{} trees, {} classes", teacher.n_trees(), teacher.n_classes()));

    let loader = DataLoader::new();
    step_run("Loading data");
    let x = loader.load_features(&args.data)?;
    step_done(&format!("{} rows × {} cols", x.n_rows(), x.n_features()));

    let y_true = match &args.labels {
        Some(path) => Some(loader.load_labels(path, None)?),
        None => None,
    };

    let mut distiller = Distiller::new(config.clone()).with_render_options(args.render);
    if args.importance {
        distiller = distiller.with_importance(config.explain.sample_count);
    }

    step_run("Distilling");
    let start = Instant::now();
    let report = distiller.run(&x, &teacher, &strategies, y_true.as_ref())?;
    step_done(&format!("{:?}", start.elapsed()));

    print_report(&report);

    if let Some(path) = &args.output {
        report.save_json(path)?;
        step_ok(&format!("report    → {}", path.display()));
    }
    if let Some(path) = &args.save_surrogate {
        match report.best().and_then(|s| s.surrogate()) {
            Some(surrogate) => {
                surrogate.save_json(path)?;
                step_ok(&format!("surrogate → {}", path.display()));
            }
            None => println!("  {}", "No surrogate available to save".yellow()),
        }
    }
    println!();
    Ok(())
}

pub fn cmd_importance(model: &Path, data: &Path, samples: usize, seed: u64) -> anyhow::Result<()> {
    section("Global importance");

    step_run("Loading model");
    let teacher = RandomForest::load_json(model)?;
    step_done(&format!("{} trees", teacher.n_trees()));

    step_run("Loading data");
    let x = DataLoader::new().load_features(data)?;
    step_done(&format!("{} rows × {} cols", x.n_rows(), x.n_features()));

    let config = DistillConfig::default().explain.with_seed(seed).with_sample_count(samples);
    step_run("Explaining");
    let start = Instant::now();
    let importance = compute_global_importance(&x, &teacher, samples, &config)?;
    step_done(&format!("{} rows in {:?}", importance.n_sampled, start.elapsed()));

    print_importance(&importance);
    println!();
    Ok(())
}

// ─── Rendering ─────────────────────────────────────────────────────────────────

fn print_report(report: &DistillationReport) {
    let teacher = &report.teacher;
    section("Black box");
    println!("  {:<16} {}", muted("Model"), teacher.model_name.white());
    println!("  {:<16} {}", muted("Capabilities"), teacher.capabilities.to_string().white());
    println!("  {:<16} {} × {}", muted("Data"), teacher.n_rows, teacher.n_features);
    let classes: Vec<String> = teacher
        .class_counts
        .iter()
        .map(|(c, n)| format!("{}: {}", c, n))
        .collect();
    println!("  {:<16} {}", muted("Classes"), classes.join(", ").white());
    println!("  {:<16} {:?}", muted("First preds"), teacher.preview);

    section("Surrogates");
    println!(
        "  {:<18} {:>10} {:>10} {:>10}",
        muted("Strategy"),
        muted("Fidelity"),
        muted("Accuracy"),
        muted("Fit")
    );
    println!("  {}", dim(&"─".repeat(52)));
    for s in &report.strategies {
        if !s.available {
            println!("  {:<18} {:>10}", s.strategy.to_string(), "unavailable".yellow());
            continue;
        }
        let fidelity = format!("{:.4}", s.fidelity);
        let fidelity = match s.level {
            Some(level) => fidelity_colored(level, &fidelity),
            None => fidelity.normal(),
        };
        let accuracy = s.accuracy.map_or("-".to_string(), |a| format!("{:.4}", a));
        println!(
            "  {:<18} {:>10} {:>10} {:>8}ms",
            s.strategy.to_string(),
            fidelity,
            accuracy,
            s.fit_ms
        );
    }

    if let Some(best) = report.best() {
        if let Some(level) = best.level {
            println!();
            println!("  {} {}", ok("best"), best.strategy.to_string().white().bold());
            println!("  {}", fidelity_colored(level, level.message()));
        }
    }

    for s in report.strategies.iter().filter(|s| s.available) {
        if let Some(description) = &s.description {
            section(&format!("Rules: {}", s.strategy));
            for line in description.lines() {
                println!("  {}", line);
            }
        }
    }

    if let Some(importance) = &report.importance {
        section("Global importance");
        print_importance(importance);
    }
}

fn print_importance(importance: &GlobalImportance) {
    if let Some(reason) = importance.degraded {
        println!("  {} {}", "unavailable:".yellow(), reason);
        return;
    }
    let max = importance
        .ranking
        .first()
        .map(|(_, s)| *s)
        .filter(|s| *s > 0.0)
        .unwrap_or(1.0);
    let name_width = importance.names().map(str::len).max().unwrap_or(8).max(8);
    for (name, score) in &importance.ranking {
        let bar = "█".repeat(((score / max) * 30.0).round() as usize);
        println!(
            "  {:<width$} {:>8.4} {}",
            name,
            score,
            accent(&bar),
            width = name_width
        );
    }
}
