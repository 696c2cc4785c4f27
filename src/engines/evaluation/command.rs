use super::evaluator::Invocation;
use crate::config::EvaluatorConfig;
use std::path::{Path, PathBuf};

/// Where imfit writes the refinement products
#[derive(Debug, Clone, PartialEq)]
pub struct RefinementOutputs {
    pub params: PathBuf,
    pub model_image: PathBuf,
    pub residual: PathBuf,
}

/// `imfit -c <model> <data>` plus the configured data-description flags
fn imfit_base(config: &EvaluatorConfig, model_path: &Path) -> Invocation {
    let mut invocation = Invocation::new(&config.imfit)
        .arg("-c")
        .path_arg(model_path)
        .path_arg(&config.data);

    if let Some(psf) = &config.psf {
        invocation = invocation.arg("--psf").path_arg(psf);
    }
    if let Some(mask) = &config.mask {
        invocation = invocation.arg("--mask").path_arg(mask);
    }
    if let Some(noise) = &config.noise {
        invocation = invocation.arg("--noise").path_arg(noise);
    }
    if let Some(read_noise) = config.read_noise {
        invocation = invocation.arg("--readnoise").arg(read_noise.to_string());
    }
    if let Some(gain) = config.gain {
        invocation = invocation.arg("--gain").arg(gain.to_string());
    }
    for flag in &config.extra_flags {
        invocation = invocation.arg(flag.clone());
    }
    invocation
}

/// Fit statistic at exactly the model's point, single-threaded since the
/// parallelism comes from running many jobs
pub fn fit_statistic(config: &EvaluatorConfig, model_path: &Path) -> Invocation {
    imfit_base(config, model_path)
        .arg("--fitstat-only")
        .arg("--max-threads")
        .arg("1")
}

/// Local optimisation inside the model's limits
pub fn refinement(
    config: &EvaluatorConfig,
    model_path: &Path,
    ftol: f64,
    threads: usize,
    outputs: &RefinementOutputs,
) -> Invocation {
    imfit_base(config, model_path)
        .arg("--ftol")
        .arg(ftol.to_string())
        .arg("--max-threads")
        .arg(threads.to_string())
        .arg("--save-params")
        .path_arg(&outputs.params)
        .arg("--save-model")
        .path_arg(&outputs.model_image)
        .arg("--save-residual")
        .path_arg(&outputs.residual)
}

/// `makeimage` rendering a model on the data image's grid
pub fn render(config: &EvaluatorConfig, model_path: &Path, output: &Path) -> Invocation {
    let mut invocation = Invocation::new(&config.makeimage)
        .path_arg(model_path)
        .arg("--refimage")
        .path_arg(&config.data);
    if let Some(psf) = &config.psf {
        invocation = invocation.arg("--psf").path_arg(psf);
    }
    invocation.arg("--output").path_arg(output)
}
