//! The `loraprep package` command: build a training zip.

use clap::Args;
use loraprep_core::{Config, DatasetLayout, ImageScanner, Packager, PackagingManifest};

/// Arguments for the `package` command.
#[derive(Args, Debug)]
pub struct PackageArgs {
    /// Dataset name; its resized `-<dimension>` directory is packaged
    #[arg(required = true)]
    pub dataset: String,

    /// Trigger word used in the training file names
    #[arg(required = true)]
    pub trigger_word: String,

    /// Print the manifest as JSON instead of the next steps
    #[arg(long)]
    pub json: bool,
}

/// Execute the package command.
pub async fn execute(args: PackageArgs, config: Config) -> anyhow::Result<()> {
    let layout = DatasetLayout::from_config(&config, &args.dataset);
    let dim = config.package.target_dimension;
    let source = layout.package_source(dim);

    if !source.is_dir() {
        anyhow::bail!(
            "Source directory not found: {}\nRun `loraprep resize {} --size {dim}` first.",
            source.display(),
            args.dataset
        );
    }

    let zip_path = layout.archive();
    let packager = Packager::new(ImageScanner::new(config.scan.clone()), config.package.clone());
    let manifest = packager.package(&source, &args.trigger_word, &zip_path)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
    } else {
        print!("{}", next_steps(&manifest));
    }
    Ok(())
}

/// Upload instructions printed after a successful package.
fn next_steps(manifest: &PackagingManifest) -> String {
    let dim = manifest.target_dimension;
    format!(
        "Created {} ({} images, {} bytes)

Next steps:
1. Open https://replicate.com/ostris/flux-dev-lora-trainer/train
2. Upload {}
3. Set trigger_word to \"{}\"
4. Suggested settings:
   - steps: 2070
   - lora_rank: 16
   - resolution: {dim}
   - batch_size: 2
   - learning_rate: 0.0005
   - optimizer: adamw8bit

Tips:
- Use the trigger word in prompts to invoke the trained subject
- 12-18 varied images usually train best
",
        manifest.archive_path.display(),
        manifest.renamed_files.len(),
        manifest.archive_size,
        manifest.archive_path.display(),
        manifest.trigger_word,
    )
}
