use anyhow::Context;
use rollcall_core::{config::Config, io, paths};
use std::path::Path;

const CONFIG_HEADER: &str = "# rollcall configuration. CLI flags override these values.\n";

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing rollcall in: {}", root.display());

    let body = Config::default()
        .to_yaml()
        .context("failed to serialize default config")?;
    let config_path = paths::config_path(root);
    let written = io::write_if_missing(&config_path, format!("{CONFIG_HEADER}{body}").as_bytes())
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    if written {
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        Config::load(root).with_context(|| format!("invalid {}", paths::CONFIG_FILE))?;
        println!("  exists:  {}", paths::CONFIG_FILE);
    }

    println!("\nNext: rollcall scan, rollcall analyze, rollcall detect");
    Ok(())
}
