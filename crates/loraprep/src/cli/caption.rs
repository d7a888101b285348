//! The `loraprep caption` command.

use std::time::Duration;

use clap::{Args, ValueEnum};
use loraprep_core::llm::{CaptionOptions, ProviderFactory};
use loraprep_core::{
    CaptionJob, CaptionPipeline, Captioner, Config, DatasetLayout, ImageScanner, NamingStrategy,
    Refiner, StyleDirective,
};

use super::progress::BarSink;

/// Arguments for the `caption` command.
#[derive(Args, Debug)]
pub struct CaptionArgs {
    /// Dataset name: a directory under the images directory
    #[arg(required = true)]
    pub dataset: String,

    /// Prompt sent with every image
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Captioning provider
    #[arg(long, value_enum)]
    pub provider: Option<CaptionProviderArg>,

    /// Model version (Replicate) or model name (OpenAI)
    #[arg(long)]
    pub model: Option<String>,

    /// Rewrite each caption around this subject name
    #[arg(long, value_name = "SUBJECT")]
    pub refine: Option<String>,

    /// How output files are named
    #[arg(long, value_enum)]
    pub naming: Option<NamingArg>,

    /// Suffix appended to the dataset name for the output directory
    #[arg(long)]
    pub suffix: Option<String>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

/// Hosted captioning backends.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CaptionProviderArg {
    Replicate,
    Openai,
}

impl CaptionProviderArg {
    fn as_str(self) -> &'static str {
        match self {
            CaptionProviderArg::Replicate => "replicate",
            CaptionProviderArg::Openai => "openai",
        }
    }
}

/// Output naming strategies selectable from the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum NamingArg {
    /// Keep source file names
    Original,
    /// Number files 1..N in scan order
    Sequential,
}

impl From<NamingArg> for NamingStrategy {
    fn from(arg: NamingArg) -> Self {
        match arg {
            NamingArg::Original => NamingStrategy::Original,
            NamingArg::Sequential => NamingStrategy::Sequential,
        }
    }
}

/// Execute the caption command.
pub async fn execute(args: CaptionArgs, config: Config) -> anyhow::Result<()> {
    let layout = DatasetLayout::from_config(&config, &args.dataset);
    let provider_name = args
        .provider
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| config.caption.provider.clone());

    let provider = ProviderFactory::captioner(&provider_name, &config.llm, args.model.as_deref())?;
    let captioner = Captioner::new(provider, CaptionOptions::from(&config.caption));
    let mut pipeline = CaptionPipeline::new(ImageScanner::new(config.scan.clone()), captioner);

    let directive = match &args.refine {
        Some(subject) => {
            let chat = ProviderFactory::refiner(&config.llm)?;
            pipeline = pipeline.with_refiner(Refiner::from_config(chat, &config.refine));
            Some(StyleDirective::new(
                subject.clone(),
                config.refine.prefix_template.clone(),
            ))
        }
        None => None,
    };

    let suffix = args
        .suffix
        .clone()
        .unwrap_or_else(|| config.caption.output_suffix.clone());
    let job = CaptionJob {
        input_dir: layout.input(),
        output_dir: layout.captioned(&suffix),
        prompt: args
            .prompt
            .clone()
            .unwrap_or_else(|| config.caption.prompt.clone()),
        naming: args
            .naming
            .map(NamingStrategy::from)
            .unwrap_or_else(|| config.caption.naming.clone()),
        refine: directive,
        item_delay: Duration::from_millis(config.refine.item_delay_ms),
    };

    tracing::info!(
        "Captioning {} with {provider_name} into {}",
        job.input_dir.display(),
        job.output_dir.display()
    );

    let report = pipeline.run(&job, &BarSink::new()).await?;
    let summary = &report.summary;

    if args.json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        println!(
            "Captioned {}/{} images into {}",
            summary.persisted,
            summary.total,
            summary.output_dir.display()
        );
        if job.refine.is_some() {
            println!("  refined: {}", summary.refined);
        }
        if summary.failed > 0 {
            println!("  failed:  {}", summary.failed);
        }
    }

    Ok(())
}
