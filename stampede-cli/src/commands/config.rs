use anyhow::{Context, Result};
use stampede_config::SAMPLE_CONFIG;
use std::fs;
use std::path::Path;
use tracing::info;

/// Write the annotated sample configuration to `output`
pub fn handle_config_generate(output: &Path, force: bool) -> Result<()> {
    info!("Generating sample configuration at: {:?}", output);

    if output.exists() && !force {
        return Err(anyhow::anyhow!(
            "Output file already exists: {:?}. Use --force to overwrite.",
            output
        ));
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }

    fs::write(output, SAMPLE_CONFIG).context("Failed to write configuration file")?;

    println!("✓ Sample configuration generated at: {:?}", output);
    Ok(())
}
