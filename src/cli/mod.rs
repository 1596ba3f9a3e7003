// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// The entry point for all user interaction. Parses arguments
// with clap and hands off to Layer 2; this layer only routes
// and prints.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, PredictArgs, ScheduleArgs, ServeArgs, TrainArgs};
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(
    name = "abalone-pipeline",
    version,
    about = "Train a random-forest model that predicts abalone ring counts, then serve it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Predict(args)  => run_predict(args),
            Commands::Serve(args)    => run_serve(args),
            Commands::Schedule(args) => run_schedule(args),
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Cannot start async runtime")
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on '{}'", args.trainset_path.display());
    let report = TrainUseCase::new(args.into()).execute()?;

    println!("Training complete (run {}).", report.run_id);
    println!("  train RMSE : {:.4}", report.train_rmse);
    println!("  test RMSE  : {:.4}", report.test_rmse);
    println!("  test R²    : {:.4}", report.test_r2);
    println!("  samples    : {} train / {} test", report.n_train, report.n_test);
    println!("  registered : version {}", report.model_version);
    println!("  model      : {}", report.model_path.display());
    println!("  encoder    : {}", report.encoder_path.display());
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::ServiceContext;
    use crate::infra::artifact_store::ArtifactStore;

    let ctx   = ServiceContext::load(&ArtifactStore::new(&args.artifacts_dir))?;
    let rings = ctx.predict(&args.to_input())?;
    println!("Predicted rings: {rings:.2} (≈ {:.1} years)", rings + 1.5);
    Ok(())
}

fn run_serve(args: ServeArgs) -> Result<()> {
    use crate::application::predict_use_case::ServiceContext;
    use crate::infra::artifact_store::ArtifactStore;
    use crate::web::{serve, AppState, RetrainCommand};

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", args.host, args.port))?;

    // Loaded once here, before any request is accepted
    let ctx     = ServiceContext::load(&ArtifactStore::new(&args.artifacts_dir))?;
    let retrain = RetrainCommand::current_exe(args.retrain_args())?;

    runtime()?.block_on(serve(AppState { ctx, retrain }, addr))
}

fn run_schedule(args: ScheduleArgs) -> Result<()> {
    use crate::application::schedule_use_case::ScheduledTraining;

    let summary = runtime()?.block_on(ScheduledTraining::new(args.into()).run())?;
    println!(
        "Schedule stopped after {} runs ({} succeeded, {} failed).",
        summary.attempted, summary.succeeded, summary.failed
    );
    Ok(())
}
