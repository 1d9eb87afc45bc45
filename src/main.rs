//! glassbox - Main Entry Point

use clap::Parser;
use glassbox::cli::{cmd_distill, cmd_importance, cmd_make_teacher, Cli, Commands, DistillArgs};
use glassbox::surrogate::TreeRenderOptions;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "glassbox=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::MakeTeacher { output_dir, samples, features, informative, trees, seed } => {
            cmd_make_teacher(&output_dir, samples, features, informative, trees, seed)?;
        }
        Commands::Distill {
            model,
            data,
            labels,
            strategy,
            max_depth,
            importance,
            samples,
            config,
            output,
            save_surrogate,
            show_impurity,
            show_proportion,
        } => {
            cmd_distill(&DistillArgs {
                model,
                data,
                labels,
                strategy,
                max_depth,
                importance,
                samples,
                config,
                output,
                save_surrogate,
                render: TreeRenderOptions { show_impurity, show_proportion },
            })?;
        }
        Commands::Importance { model, data, samples, seed } => {
            cmd_importance(&model, &data, samples, seed)?;
        }
    }

    Ok(())
}
