//! The `loraprep resize` command.

use clap::Args;
use loraprep_core::{Config, DatasetLayout, ImageScanner, Resizer};

use super::progress::create_progress_bar;

/// Arguments for the `resize` command.
#[derive(Args, Debug)]
pub struct ResizeArgs {
    /// Dataset name: a directory under the images directory
    #[arg(required = true)]
    pub dataset: String,

    /// Square edge length in pixels (defaults to `resize.size`)
    #[arg(short, long)]
    pub size: Option<u32>,
}

/// Execute the resize command.
pub async fn execute(args: ResizeArgs, config: Config) -> anyhow::Result<()> {
    let size = args.size.unwrap_or(config.resize.size);
    if size == 0 {
        anyhow::bail!("--size must be greater than 0");
    }

    let layout = DatasetLayout::from_config(&config, &args.dataset);
    let src = layout.input();
    let dst = layout.resized(size);

    let resizer = Resizer::new(ImageScanner::new(config.scan.clone()), size);
    let bar = create_progress_bar(0);
    let summary = resizer
        .resize_dataset(&src, &dst, |name, ok| {
            bar.inc(1);
            if !ok {
                bar.println(format!("  failed {name}"));
            }
        })
        .await?;
    bar.finish_and_clear();

    println!(
        "Resized {} images to {size}x{size} into {}",
        summary.resized,
        dst.display()
    );
    if summary.failed > 0 {
        println!("  failed: {}", summary.failed);
    }
    Ok(())
}
