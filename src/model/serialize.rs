use super::{Model, Parameter};
use std::fmt::Write;

fn write_parameter(out: &mut String, param: &Parameter, fix_all: bool) {
    match param.limits {
        Some(limits) if !fix_all => {
            let _ = writeln!(out, "{}\t{}\t{},{}", param.name, param.value, limits.lower, limits.upper);
        }
        _ => {
            let _ = writeln!(out, "{}\t{}\tfixed", param.name, param.value);
        }
    }
}

/// Render a model in imfit's config-file syntax.
///
/// With `fix_all` every parameter is written as fixed at its current value,
/// which asks the evaluator for the fit statistic at exactly this point.
/// Without it free parameters keep their live limits for local refinement.
pub fn serialize(model: &Model, fix_all: bool) -> String {
    let mut out = String::new();

    for (key, value) in &model.options {
        let _ = writeln!(out, "{}\t{}", key, value);
    }

    let mut current_block = None;
    for function in model.functions() {
        let mut params = function.params.iter();
        let coordinates: Vec<&Parameter> = params.by_ref().take(2).collect();
        // One X0/Y0 header per coordinate block
        if current_block != Some(function.block) {
            if !out.is_empty() {
                out.push('\n');
            }
            for coordinate in coordinates {
                write_parameter(&mut out, coordinate, fix_all);
            }
            current_block = Some(function.block);
        }
        let _ = writeln!(out, "FUNCTION {}", function.kind);
        for param in params {
            write_parameter(&mut out, param, fix_all);
        }
    }

    out
}
