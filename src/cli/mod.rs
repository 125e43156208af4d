// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All pipeline logic is delegated to Layer 2 (application);
// this layer only routes and prints results.
//
//   generate — hosted LLM completion
//   chat     — local dialogue loop
//   caption  — local image captioning
//   classify — digit classifier training
//   regress  — housing regressor training
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{CaptionArgs, ChatArgs, ClassifyArgs, Commands, GenerateArgs, RegressArgs};

#[derive(Parser, Debug)]
#[command(
    name = "ai-demos",
    version = "0.1.0",
    about = "Generative AI and deep learning demos: hosted LLM, chatbot, captioning, two small training pipelines."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to its use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Generate(args) => run_generate(args),
            Commands::Chat(args)     => run_chat(args),
            Commands::Caption(args)  => run_caption(args),
            Commands::Classify(args) => run_classify(args),
            Commands::Regress(args)  => run_regress(args),
        }
    }
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    use crate::application::generate_use_case::GenerateUseCase;

    let prompt   = args.prompt.clone();
    let use_case = GenerateUseCase::connect(args.into())?;
    let text     = use_case.execute(&prompt)?;
    println!("{}", text);
    Ok(())
}

fn run_chat(args: ChatArgs) -> Result<()> {
    use crate::application::chat_use_case::ChatUseCase;

    ChatUseCase::new(args.into()).execute()
}

fn run_caption(args: CaptionArgs) -> Result<()> {
    use crate::application::caption_use_case::CaptionUseCase;

    let caption = CaptionUseCase::new(args.into()).execute()?;
    println!("{}", caption);
    Ok(())
}

fn run_classify(args: ClassifyArgs) -> Result<()> {
    use crate::application::classification_use_case::ClassificationUseCase;

    let report = ClassificationUseCase::new(args.into()).execute()?;
    tracing::info!(
        "Finished {} epochs, test loss {:.4}",
        report.history.epochs.len(),
        report.test_loss
    );
    println!("Test accuracy: {}", report.test_accuracy);
    for (actual, predicted) in &report.predictions {
        println!("Actual: {}, Predicted: {}", actual, predicted);
    }
    Ok(())
}

fn run_regress(args: RegressArgs) -> Result<()> {
    use crate::application::regression_use_case::RegressionUseCase;

    let report = RegressionUseCase::new(args.into()).execute()?;
    tracing::info!(
        "Finished {} epochs, test loss {:.4}",
        report.history.epochs.len(),
        report.test_loss
    );
    println!("Test MAE: {}", report.test_mae);
    for (predicted, actual) in &report.predictions {
        tracing::info!("Predicted {:>6.2}  actual {:>6.2}", predicted, actual);
    }
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::classification_use_case::ClassifyConfig;
    use crate::ml::backend::BackendType;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_classify_defaults() {
        let cli = Cli::try_parse_from(["ai-demos", "classify"]).unwrap();
        let Commands::Classify(args) = cli.command else { panic!("wrong subcommand") };
        let cfg: ClassifyConfig = args.into();
        assert_eq!(cfg.epochs, 10);
        assert_eq!(cfg.batch_size, 128);
        assert_eq!(cfg.backend, BackendType::Wgpu);
    }

    #[test]
    fn test_regress_backend_flag() {
        let cli = Cli::try_parse_from(["ai-demos", "regress", "--backend", "ndarray", "--epochs", "5"]).unwrap();
        let Commands::Regress(args) = cli.command else { panic!("wrong subcommand") };
        assert_eq!(args.backend, BackendType::NdArray);
        assert_eq!(args.epochs, 5);
        assert_eq!(args.batch_size, 16);
    }

    #[test]
    fn test_caption_defaults() {
        let cli = Cli::try_parse_from(["ai-demos", "caption"]).unwrap();
        let Commands::Caption(args) = cli.command else { panic!("wrong subcommand") };
        assert_eq!(args.image, std::path::PathBuf::from("google.png"));
        assert_eq!(args.max_length, 50);
    }

    #[test]
    fn test_zero_counts_rejected() {
        for args in [
            ["ai-demos", "classify", "--batch-size", "0"],
            ["ai-demos", "classify", "--epochs", "0"],
            ["ai-demos", "regress", "--batch-size", "0"],
            ["ai-demos", "regress", "--epochs", "0"],
        ] {
            assert!(Cli::try_parse_from(args).is_err(), "{args:?} should be rejected");
        }
        assert!(Cli::try_parse_from(["ai-demos", "regress", "--batch-size", "-3"]).is_err());
        assert!(Cli::try_parse_from(["ai-demos", "regress", "--batch-size", "1"]).is_ok());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(Cli::try_parse_from(["ai-demos", "classify", "--backend", "cuda"]).is_err());
    }
}
