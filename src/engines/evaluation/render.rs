use super::command;
use super::evaluator::{Evaluator, ExitOutcome};
use super::pool::{JobHandle, WorkerPool};
use crate::config::EvaluatorConfig;
use crate::error::Result;
use crate::model::{serialize, Model};
use log::{info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Renders model images with makeimage through the worker pool
pub struct Renderer {
    pool: Arc<WorkerPool>,
    evaluator: Arc<dyn Evaluator>,
    config: EvaluatorConfig,
    work_dir: PathBuf,
}

impl Renderer {
    pub fn new(
        pool: Arc<WorkerPool>,
        evaluator: Arc<dyn Evaluator>,
        config: EvaluatorConfig,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            pool,
            evaluator,
            config,
            work_dir: work_dir.into(),
        }
    }

    fn submit(&self, model: &Model, prefix: &str, output: &Path) -> Result<JobHandle<bool>> {
        let mut model_file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(".dat")
            .tempfile_in(&self.work_dir)?;
        model_file.write_all(serialize(model, false).as_bytes())?;
        model_file.flush()?;
        let log_file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(".log")
            .tempfile_in(&self.work_dir)?;

        let invocation = command::render(&self.config, model_file.path(), output);
        let evaluator = Arc::clone(&self.evaluator);

        Ok(self.pool.submit(move |cancel| {
            let rendered = match evaluator.execute(&invocation, log_file.path(), cancel) {
                Ok(ExitOutcome::Success) => true,
                Ok(outcome) => {
                    warn!("makeimage finished with {:?}", outcome);
                    false
                }
                Err(e) => {
                    warn!("Failed to run {}: {}", invocation.program.display(), e);
                    false
                }
            };
            drop(model_file);
            drop(log_file);
            rendered
        }))
    }

    /// Render the whole model to `output`. Failures are logged, never fatal.
    pub fn snapshot(&self, model: &Model, output: &Path) -> bool {
        match self.submit(model, "snapshot_", output) {
            Ok(handle) => handle.wait().unwrap_or(false),
            Err(e) => {
                warn!("Could not render snapshot {}: {}", output.display(), e);
                false
            }
        }
    }

    /// Render every function on its own as `<unique_name>.fits` in `out_dir`.
    /// Returns the images that were produced.
    pub fn subcomponents(&self, model: &Model, out_dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(out_dir)?;

        let mut jobs = Vec::with_capacity(model.functions().len());
        for (index, function) in model.functions().iter().enumerate() {
            let Some(single) = model.single_function(index) else {
                continue;
            };
            let unique = function.unique_name();
            let output = out_dir.join(format!("{}.fits", unique));
            let handle = self.submit(&single, &format!("{}_", unique), &output)?;
            jobs.push((output, handle));
        }

        let mut rendered = Vec::with_capacity(jobs.len());
        for (output, handle) in jobs {
            if handle.wait().unwrap_or(false) {
                rendered.push(output);
            }
        }
        info!("Rendered {}/{} subcomponents", rendered.len(), model.functions().len());
        Ok(rendered)
    }
}
