//! `xmlmerger list` - show configured jobs.

use crate::Context;
use crate::config::{self, BatchConfig};
use crate::ui;
use anyhow::Result;
use std::path::Path;

pub fn run(_ctx: &Context, config_path: &Path) -> Result<()> {
    let config = BatchConfig::load(config_path)?;
    let specs = config.specs(&config::base_dir(config_path));

    ui::header(&format!("Merge jobs ({})", config_path.display()));
    if specs.is_empty() {
        ui::dim("none");
        return Ok(());
    }

    for (i, spec) in specs.iter().enumerate() {
        ui::step(i + 1, specs.len(), &spec.target().display().to_string());
        for source in spec.sources() {
            ui::kv("source", &source.display().to_string());
        }
        if let Some(props) = spec.properties() {
            ui::kv("properties", &props.display().to_string());
        }
    }

    if config.options.keep_going {
        ui::dim(&format!(
            "keep_going = true, jobs = {}",
            config.options.jobs.unwrap_or(1)
        ));
    }
    Ok(())
}
