mod common;

use common::{entries_with_prefix, three_function_model};
use imfit_evolve::config::EvaluatorConfig;
use imfit_evolve::engines::evaluation::{
    CancelToken, Evaluator, ExitOutcome, Invocation, Renderer, WorkerPool,
};
use imfit_evolve::model::{parse_model, Model};
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// makeimage stand-in: writes the function kinds it was asked to render
#[derive(Default)]
struct StubMakeimage {
    fail_kind: Option<String>,
    rendered: Mutex<Vec<String>>,
}

impl Evaluator for StubMakeimage {
    fn execute(&self, invocation: &Invocation, _log: &Path, _: &CancelToken) -> io::Result<ExitOutcome> {
        let model_path = invocation.args.first().cloned().unwrap_or_default();
        let model = parse_model(&std::fs::read_to_string(&model_path)?)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        let kinds: Vec<String> = model.functions().iter().map(|f| f.kind.clone()).collect();

        if self.fail_kind.as_ref().is_some_and(|k| kinds.contains(k)) {
            return Ok(ExitOutcome::Failed(Some(1)));
        }
        assert_eq!(invocation.value_after("--refimage"), Some("galaxy.fits"));
        let output = invocation
            .value_after("--output")
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no --output"))?;
        std::fs::write(output, kinds.join(","))?;
        self.rendered.lock().unwrap().push(kinds.join(","));
        Ok(ExitOutcome::Success)
    }
}

fn renderer(dir: &Path, evaluator: Arc<dyn Evaluator>) -> Renderer {
    let config = EvaluatorConfig {
        data: "galaxy.fits".into(),
        ..EvaluatorConfig::default()
    };
    Renderer::new(Arc::new(WorkerPool::new(2).unwrap()), evaluator, config, dir)
}

#[test]
fn test_subcomponents_render_each_function_alone() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("parts");
    let stub = Arc::new(StubMakeimage::default());

    let rendered = renderer(dir.path(), stub.clone())
        .subcomponents(&three_function_model(), &out)
        .unwrap();

    let names: Vec<String> = rendered
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["Sersic.0.fits", "Exponential.1.fits", "Gaussian.2.fits"]);
    assert_eq!(std::fs::read_to_string(out.join("Gaussian.2.fits")).unwrap(), "Gaussian");

    let mut calls = stub.rendered.lock().unwrap().clone();
    calls.sort();
    assert_eq!(calls, vec!["Exponential", "Gaussian", "Sersic"]);

    // Per-function model files are temporary
    assert!(entries_with_prefix(dir.path(), "Sersic.0_").is_empty());
}

#[test]
fn test_failed_subcomponent_is_left_out() {
    let dir = tempfile::tempdir().unwrap();
    let stub = StubMakeimage {
        fail_kind: Some("Exponential".to_string()),
        ..StubMakeimage::default()
    };

    let rendered = renderer(dir.path(), Arc::new(stub))
        .subcomponents(&three_function_model(), dir.path())
        .unwrap();

    assert_eq!(rendered.len(), 2);
    assert!(!dir.path().join("Exponential.1.fits").exists());
}

#[test]
fn test_snapshot_reports_success() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("gen_0003_best.fits");
    let model: Model = three_function_model();

    assert!(renderer(dir.path(), Arc::new(StubMakeimage::default())).snapshot(&model, &output));
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "Sersic,Exponential,Gaussian"
    );
    assert!(entries_with_prefix(dir.path(), "snapshot_").is_empty());
}
