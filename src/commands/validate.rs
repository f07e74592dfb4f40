//! `xmlmerger validate` - check jobs without writing targets.

use crate::Context;
use crate::config::{self, BatchConfig};
use crate::ui;
use anyhow::Result;
use mergekit::MergeRunner;
use std::path::Path;

pub fn run(ctx: &Context, config_path: &Path) -> Result<()> {
    let config = BatchConfig::load(config_path)?;
    let specs = config.specs(&config::base_dir(config_path));
    let runner = MergeRunner::new();

    let mut failed = 0;
    for (i, spec) in specs.iter().enumerate() {
        match runner.validate(spec) {
            Ok(()) => {
                if !ctx.quiet {
                    ui::success(&format!("Job {} ({}) is valid", i + 1, spec.target().display()));
                }
            }
            Err(e) => {
                failed += 1;
                ui::error(&format!("Job {} ({}): {e}", i + 1, spec.target().display()));
                if !ctx.quiet {
                    ui::dim(e.kind().advice());
                }
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} merge jobs are invalid", specs.len());
    }
    if !ctx.quiet {
        ui::info(&format!("{} job(s) checked", specs.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> Context {
        Context {
            verbose: 0,
            quiet: true,
        }
    }

    #[test]
    fn test_validate_reports_invalid_jobs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.xml"), "<r/>").unwrap();
        std::fs::write(dir.path().join("bad.properties"), "/r = shuffle\n").unwrap();
        let config_path = dir.path().join("xmlmerge.toml");
        std::fs::write(
            &config_path,
            r#"
[[merge]]
target = "ok.xml"
sources = ["a.xml"]

[[merge]]
target = "bad.xml"
sources = ["a.xml"]
properties = "bad.properties"
"#,
        )
        .unwrap();

        let err = run(&quiet(), &config_path).unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 merge jobs are invalid");
        assert!(!dir.path().join("ok.xml").exists());
    }

    #[test]
    fn test_validate_accepts_good_batch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.xml"), "<r/>").unwrap();
        let config_path = dir.path().join("xmlmerge.toml");
        std::fs::write(&config_path, "[[merge]]\ntarget = \"o.xml\"\nsources = [\"a.xml\"]\n")
            .unwrap();

        run(&quiet(), &config_path).unwrap();
    }
}
