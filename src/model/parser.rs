use super::{Function, Model, Parameter, IMAGE_OPTIONS};
use crate::error::{EvolveError, Result};

fn parse_error(line: usize, message: impl Into<String>) -> EvolveError {
    EvolveError::ModelParse {
        line,
        message: message.into(),
    }
}

/// A finite number; `inf` and `nan` are rejected like any other bad token
fn parse_number(token: &str, line: usize, what: impl FnOnce() -> String) -> Result<f64> {
    match token.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(parse_error(line, what())),
    }
}

/// Parse a `<name> <value> [<lower>,<upper> | fixed]` line
fn parse_parameter(tokens: &[&str], line: usize) -> Result<Parameter> {
    let name = tokens[0];
    let value_token = tokens
        .get(1)
        .ok_or_else(|| parse_error(line, format!("Parameter {} has no value", name)))?;
    let value = parse_number(value_token, line, || format!("Invalid value for {}", name))?;

    if tokens.len() > 3 {
        return Err(parse_error(line, format!("Unexpected tokens after {}", name)));
    }

    match tokens.get(2) {
        // imfit writes best-fit output without limits
        None => Ok(Parameter::fixed(name, value)),
        Some(&"fixed") => Ok(Parameter::fixed(name, value)),
        Some(range) => {
            let (lower, upper) = range
                .split_once(',')
                .ok_or_else(|| parse_error(line, format!("Expected <lower>,<upper> for {}", name)))?;
            let lower = parse_number(lower, line, || format!("Invalid lower limit for {}", name))?;
            let upper = parse_number(upper, line, || format!("Invalid upper limit for {}", name))?;
            if lower > upper {
                return Err(parse_error(line, format!("Lower limit exceeds upper limit for {}", name)));
            }
            if value < lower || value > upper {
                return Err(parse_error(line, format!("Value of {} lies outside its limits", name)));
            }
            Ok(Parameter::free(name, value, lower, upper))
        }
    }
}

/// Parse imfit model text.
///
/// X0/Y0 lines set the coordinates for the next FUNCTION line and may be
/// shared by several functions; every other line adds a parameter to the
/// most recent function.
pub fn parse_model(text: &str) -> Result<Model> {
    let mut options = Vec::new();
    let mut functions: Vec<Function> = Vec::new();
    let mut x0: Option<Parameter> = None;
    let mut y0: Option<Parameter> = None;
    let mut coordinates_used = true;
    let mut block = 0;
    let mut blocks = 0;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();

        match tokens[0] {
            keyword if IMAGE_OPTIONS.contains(&keyword) => {
                if tokens.len() != 2 {
                    return Err(parse_error(line_no, format!("{} expects a single value", keyword)));
                }
                options.push((keyword.to_string(), tokens[1].to_string()));
            }
            "X0" => {
                x0 = Some(parse_parameter(&tokens, line_no)?);
                coordinates_used = false;
            }
            "Y0" => {
                y0 = Some(parse_parameter(&tokens, line_no)?);
                coordinates_used = false;
            }
            "FUNCTION" => {
                let kind = tokens
                    .get(1)
                    .ok_or_else(|| parse_error(line_no, "FUNCTION without a name"))?;
                let (Some(x), Some(y)) = (x0.clone(), y0.clone()) else {
                    return Err(parse_error(line_no, "FUNCTION before X0 and Y0"));
                };
                if !coordinates_used {
                    block = blocks;
                    blocks += 1;
                }
                functions.push(Function::new(*kind, functions.len(), x, y).in_block(block));
                coordinates_used = true;
            }
            name => {
                let current = functions
                    .last_mut()
                    .ok_or_else(|| parse_error(line_no, format!("Parameter {} before any FUNCTION", name)))?;
                if current.param(name).is_some() {
                    return Err(parse_error(line_no, format!("Duplicate parameter {}", name)));
                }
                current.params.push(parse_parameter(&tokens, line_no)?);
            }
        }
    }

    if !coordinates_used {
        return Err(parse_error(text.lines().count(), "X0/Y0 without a following FUNCTION"));
    }
    if functions.is_empty() {
        return Err(parse_error(0, "Model contains no functions"));
    }

    Ok(Model::new(options, functions))
}
