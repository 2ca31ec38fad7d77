use crate::conf::{CONFIG_FILE_NAME, load_config};
use anyhow::{Context, Result, bail};
use rust_embed::RustEmbed;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(RustEmbed)]
#[folder = "config-templates/"]
pub struct ConfigTemplates;

pub fn init(path: PathBuf) -> Result<()> {
    write_template(&path)?;

    // User feedback
    println!("✔ Initialized Relayway config in {}", path.display());
    println!("✔ Created:");
    println!("  - {CONFIG_FILE_NAME}");
    println!();
    println!("Next steps:");
    println!("  relayway conf check {}", path.display());
    println!("  relayway discover {}", path.display());

    Ok(())
}

/// Write the embedded template into `path`, refusing to touch a non-empty directory.
pub fn write_template(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        if path.is_file() {
            bail!("{} exists and is not a directory", path.display());
        }

        let is_empty = fs::read_dir(path)?.next().is_none();
        if !is_empty {
            bail!(
                "config directory '{}' already exists and is not empty",
                path.display()
            );
        }
    }

    fs::create_dir_all(path)?;

    let target = path.join(CONFIG_FILE_NAME);
    write_file(&target, &template(CONFIG_FILE_NAME)?)?;

    // The template must always pass its own validation.
    load_config(path).context("embedded config template failed validation")?;

    Ok(target)
}

/// Fetch an embedded config template as UTF-8 text
fn template(path: &str) -> Result<String> {
    let file = ConfigTemplates::get(path)
        .with_context(|| format!("missing embedded config template: {path}"))?;

    let s =
        std::str::from_utf8(file.data.as_ref()).context("config template is not valid UTF-8")?;

    Ok(s.to_owned())
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    let mut f =
        fs::File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    f.write_all(contents.trim_start().as_bytes())?;
    Ok(())
}
