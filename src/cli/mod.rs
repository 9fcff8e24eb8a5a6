// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes each subcommand to its
// use case. Results are printed here; nothing below this layer
// writes to stdout except the per-epoch training summary.
//
//   1. `train` — fine-tune and checkpoint the best epoch
//   2. `eval`  — score a checkpoint on a dataset
//   3. `merge` — build the title/content corpus
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvalArgs, MergeArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "span-reader",
    version,
    about = "Fine-tune and evaluate an extractive Chinese reading-comprehension model."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Eval(args)  => run_eval(args),
            Commands::Merge(args) => run_merge(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on '{}'", args.train_file);
    let output_dir = args.output_dir.clone();
    let summary    = TrainUseCase::new(args.into()).execute()?;

    match summary.best_epoch {
        Some(epoch) => println!(
            "Training complete. Best epoch {} (AVG {:.4}) saved in '{}'.",
            epoch, summary.best_avg, output_dir
        ),
        None => println!(
            "Training complete. No epoch scored above 0; no weights were saved."
        ),
    }
    Ok(())
}

fn run_eval(args: EvalArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let use_case = EvaluateUseCase::new(
        args.data_file,
        args.checkpoint_dir,
        args.weights,
        args.predictions,
    );
    let scores = use_case.execute()?;
    println!(
        "F1: {:.4} | EM: {:.4} | AVG: {:.4} | examples: {}",
        scores.f1, scores.em, scores.avg, scores.total
    );
    Ok(())
}

fn run_merge(args: MergeArgs) -> Result<()> {
    use crate::application::merge_use_case::MergeUseCase;

    let use_case: MergeUseCase = args.into();
    let written = use_case.execute()?;
    println!("Wrote {} records to '{}'.", written, use_case.out.display());
    Ok(())
}
