//! `xmlmerger merge` - one job straight from the command line.

use crate::Context;
use crate::cli::MergeArgs;
use crate::progress::merged_line;
use crate::ui;
use anyhow::{Context as _, Result};
use mergekit::{MergeRunner, MergeSpec};

pub fn run(ctx: &Context, args: MergeArgs) -> Result<()> {
    let mut spec = MergeSpec::new(args.output, args.sources);
    if let Some(props) = args.properties {
        spec = spec.with_properties(props);
    }
    log::debug!("Ad-hoc job: {spec}");

    let report = MergeRunner::new()
        .run(&spec)
        .with_context(|| format!("Could not merge into {}", spec.target().display()))?;

    if !ctx.quiet {
        ui::success(&merged_line(&report));
        if ctx.verbose > 0 {
            ui::kv("bytes written", &report.bytes_written.to_string());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_with_properties() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.xml");
        let b = dir.path().join("b.xml");
        let props = dir.path().join("merge.properties");
        let out = dir.path().join("out.xml");
        std::fs::write(&a, "<deps><dep>a</dep></deps>").unwrap();
        std::fs::write(&b, "<deps><dep>b</dep></deps>").unwrap();
        std::fs::write(&props, "/deps/dep = append\n").unwrap();

        let ctx = Context {
            verbose: 0,
            quiet: true,
        };
        run(
            &ctx,
            MergeArgs {
                output: out.clone(),
                properties: Some(props),
                sources: vec![a, b],
            },
        )
        .unwrap();

        let merged = std::fs::read_to_string(out).unwrap();
        assert!(merged.contains("<dep>a</dep>"));
        assert!(merged.contains("<dep>b</dep>"));
    }
}
