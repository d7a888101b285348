//! The `loraprep refine` command: rewrite existing captions in place.

use std::time::Duration;

use clap::Args;
use loraprep_core::llm::ProviderFactory;
use loraprep_core::pipeline::rewrite_captions;
use loraprep_core::{Config, DatasetLayout, Refiner, StyleDirective};

/// Arguments for the `refine` command.
#[derive(Args, Debug)]
pub struct RefineArgs {
    /// Dataset name: a captioned directory under the output directory
    #[arg(required = true)]
    pub dataset: String,

    /// Subject name every caption should start with
    #[arg(required = true)]
    pub subject: String,
}

/// Execute the refine command.
pub async fn execute(args: RefineArgs, config: Config) -> anyhow::Result<()> {
    let layout = DatasetLayout::from_config(&config, &args.dataset);
    let dir = layout.captions();

    let chat = ProviderFactory::refiner(&config.llm)?;
    let refiner = Refiner::from_config(chat, &config.refine);
    let directive = StyleDirective::new(args.subject, config.refine.prefix_template.clone());

    let summary = rewrite_captions(
        &refiner,
        &dir,
        &directive,
        Duration::from_millis(config.refine.item_delay_ms),
        |file| {
            tracing::info!(
                "Processing {}",
                file.file_name().unwrap_or_default().to_string_lossy()
            )
        },
    )
    .await?;

    println!(
        "Refined {}/{} captions in {}",
        summary.refined,
        summary.processed,
        dir.display()
    );
    Ok(())
}
