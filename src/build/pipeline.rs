//! Build pipeline orchestration.
//!
//! The pipeline runs a [`BuildPlan`] batch by batch. Steps inside a batch
//! of independent steps run on the rayon pool; every other batch runs one
//! step on the calling thread.

use crate::build::{
    assets, markup, scripts, styles, BuildContext, BuildError, BuildPlan, BuildResult, Step,
    StepKind, StepResult,
};
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info};

/// Build pipeline for executing builds.
pub struct BuildPipeline {
    /// Build context
    context: BuildContext,
}

impl BuildPipeline {
    /// Create a new build pipeline.
    pub fn new(context: BuildContext) -> Self {
        Self { context }
    }

    /// Get the build context.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Run the full default plan: clean, copies, then every transform.
    pub fn full_build(&self) -> Result<BuildResult, BuildError> {
        self.run(&BuildPlan::full())
    }

    /// Run a plan.
    ///
    /// Transform failures are logged and recorded in the result. Any other
    /// error stops the run and is returned.
    pub fn run(&self, plan: &BuildPlan) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        let mut result = BuildResult::new();

        debug!(mode = %self.context.mode(), steps = ?plan.kinds(), "running build plan");

        for batch in plan.batches() {
            let step_results: Vec<Result<StepResult, BuildError>> = if batch.len() > 1 {
                batch.par_iter().map(|step| self.execute_step(step)).collect()
            } else {
                batch.iter().map(|step| self.execute_step(step)).collect()
            };

            for step_result in step_results {
                result.add_result(step_result?);
            }
        }

        result.total_duration = start.elapsed();
        Ok(result)
    }

    /// Execute a single step.
    fn execute_step(&self, step: &Step) -> Result<StepResult, BuildError> {
        let start = Instant::now();
        debug!(step = %step.kind, "starting");

        match self.dispatch(step.kind) {
            Ok(outputs) => {
                let duration = start.elapsed();
                if self.context.is_verbose() {
                    info!(step = %step.kind, files = outputs.len(), ?duration, "done");
                } else {
                    debug!(step = %step.kind, files = outputs.len(), ?duration, "done");
                }
                Ok(StepResult::success(step.kind, outputs, duration))
            }
            Err(e) if e.is_recoverable() => {
                error!(step = %step.kind, "{}", e);
                Ok(StepResult::failed(step.kind, e.to_string(), start.elapsed()))
            }
            Err(e) => Err(e),
        }
    }

    fn dispatch(&self, kind: StepKind) -> Result<Vec<PathBuf>, BuildError> {
        let ctx = &self.context;
        match kind {
            StepKind::Clean => assets::clean(ctx).map(|()| Vec::new()),
            StepKind::CopyImages => assets::copy_images(ctx),
            StepKind::CopyFonts => assets::copy_fonts(ctx),
            StepKind::Styles => styles::compile_styles(ctx),
            StepKind::Scripts => scripts::compile_scripts(ctx),
            StepKind::Markup => markup::compile_markup(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildMode;
    use crate::config::default_config;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn create_test_pipeline() -> (TempDir, BuildPipeline) {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "src/images/logo.png", "png-bytes");
        write(root, "src/fonts/body.woff2", "font-bytes");
        write(root, "src/styles/app.scss", "$c: #333;\nbody { color: $c; }\n");
        write(root, "src/scripts/app.js", "init(items);\n");
        write(root, "src/scripts/data/items.js", "var items = [1, 2,];\n");
        write(root, "src/views/index.pug", "script(src=baseurl + \"scripts.min.js\" + version)");

        let ctx = BuildContext::new(default_config(), root.to_path_buf(), BuildMode::Development);
        (temp, BuildPipeline::new(ctx))
    }

    #[test]
    fn test_full_build_runs_every_step() {
        let (temp, pipeline) = create_test_pipeline();
        let result = pipeline.full_build().unwrap();

        assert!(result.is_success(), "{}", result.summary());
        assert_eq!(result.kinds(), BuildPlan::full().kinds());

        let out = temp.path().join("public");
        assert!(out.join("images/logo.png").is_file());
        assert!(out.join("fonts/body.woff2").is_file());
        assert_eq!(fs::read_to_string(out.join("styles.min.css")).unwrap(), "body{color:#333}");
        assert_eq!(
            fs::read_to_string(out.join("scripts.min.js")).unwrap(),
            "var items=[1,2,];\ninit(items);"
        );
        assert_eq!(
            fs::read_to_string(out.join("index.html")).unwrap(),
            "<script src=\"http://localhost:9000/scripts.min.js\"></script>"
        );
    }

    #[test]
    fn test_transform_failure_is_recorded() {
        let (temp, pipeline) = create_test_pipeline();
        write(temp.path(), "src/scripts/broken.js", "var s = 'open");

        let result = pipeline.full_build().unwrap();

        assert_eq!(result.failed_count(), 1);
        let failed = result.step(StepKind::Scripts).unwrap();
        assert!(!failed.is_success());
        assert!(!temp.path().join("public/scripts.min.js").exists());
        assert!(result.step(StepKind::Markup).unwrap().is_success());
    }

    #[test]
    fn test_plan_subset() {
        let (temp, pipeline) = create_test_pipeline();
        let plan = BuildPlan::new().with_step(Step::independent(StepKind::CopyFonts));

        let result = pipeline.run(&plan).unwrap();

        assert_eq!(result.kinds(), vec![StepKind::CopyFonts]);
        assert!(temp.path().join("public/fonts/body.woff2").is_file());
        assert!(!temp.path().join("public/images").exists());
    }
}
