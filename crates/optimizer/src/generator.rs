use crate::error::OptimizerError;
use configuration::optimizer_config::{OptimizerConfig, ParameterRange};
use configuration::settings::Config;
use core_types::StrategyType;
use itertools::Itertools;
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value, json};
use std::str::FromStr;

/// One point of the grid, keyed by parameter name.
pub type ParameterSet = Map<String, Value>;

/// Generates every unique combination of parameters from the defined parameter space.
///
/// The parameter space is ordered by name, so the sets come out in the same
/// order on every call.
pub fn generate_parameter_sets(
    config: &OptimizerConfig,
) -> Result<Vec<ParameterSet>, OptimizerError> {
    // 1. Convert all parameter ranges into concrete lists of values.
    let mut param_names = Vec::with_capacity(config.parameter_space.len());
    let mut value_lists = Vec::with_capacity(config.parameter_space.len());
    for (name, range) in &config.parameter_space {
        let values: Vec<Value> = match range {
            ParameterRange::DiscreteInt(vals) => vals.iter().map(|&v| json!(v)).collect(),
            ParameterRange::DiscreteDecimal(vals) => {
                vals.iter().map(|v| decimal_value(name, *v)).collect::<Result<_, _>>()?
            }
            ParameterRange::DiscreteText(vals) => vals.iter().map(|v| json!(v)).collect(),
            ParameterRange::LinearInt { start, end, step } => {
                if *step <= 0 {
                    return Err(OptimizerError::ParameterGeneration(format!(
                        "Step for '{}' must be positive.",
                        name
                    )));
                }
                (*start..=*end).step_by(*step as usize).map(|v| json!(v)).collect()
            }
            ParameterRange::LinearDecimal { start, end, step } => {
                if step.is_sign_negative() || step.is_zero() {
                    return Err(OptimizerError::ParameterGeneration(format!(
                        "Step for '{}' must be positive.",
                        name
                    )));
                }
                let mut vals = Vec::new();
                let mut current = *start;
                while current <= *end {
                    vals.push(decimal_value(name, current)?);
                    current += *step;
                }
                vals
            }
        };
        if values.is_empty() {
            return Err(OptimizerError::ParameterGeneration(format!(
                "'{}' produced no values.",
                name
            )));
        }
        param_names.push(name.clone());
        value_lists.push(values);
    }

    // 2. Use itertools::multi_cartesian_product to generate all combinations.
    let combinations = value_lists
        .into_iter()
        .multi_cartesian_product()
        .map(|product| param_names.iter().cloned().zip(product).collect())
        .collect();

    Ok(combinations)
}

/// Decimals become plain JSON numbers with their exact decimal text.
fn decimal_value(name: &str, value: Decimal) -> Result<Value, OptimizerError> {
    Number::from_str(&value.normalize().to_string())
        .map(Value::Number)
        .map_err(|e| OptimizerError::ParameterGeneration(format!("'{}' = {}: {}", name, value, e)))
}

/// Returns a copy of `base` with every parameter of the set applied, validated.
pub fn apply_parameters(base: &Config, set: &ParameterSet) -> Result<Config, OptimizerError> {
    let mut config = base.clone();
    for (name, value) in set {
        match name.as_str() {
            "deviation" => config.rebalance.deviation = Some(as_decimal(name, value)?),
            "collateral" => config.backtest.collateral = as_decimal(name, value)?,
            "rebalance_hours" => config.rebalance.rebalance_hours = Some(as_u32(name, value)?),
            "start_hour" => config.rebalance.start_hour = as_u32(name, value)?,
            "strategy_type" => {
                config.rebalance.strategy_type = StrategyType::from_str(as_str(name, value)?)?
            }
            "funding" => config.columns.funding = as_str(name, value)?.to_string(),
            other => {
                return Err(OptimizerError::ParameterGeneration(format!(
                    "'{}' is not a sweepable parameter.",
                    other
                )));
            }
        }
    }
    config.validate()?;
    Ok(config)
}

fn mismatch(name: &str, expected: &str, value: &Value) -> OptimizerError {
    OptimizerError::ParameterGeneration(format!("'{}' expects {}, got {}", name, expected, value))
}

fn as_decimal(name: &str, value: &Value) -> Result<Decimal, OptimizerError> {
    match value {
        Value::Number(n) => {
            Decimal::from_str(&n.to_string()).map_err(|_| mismatch(name, "a decimal", value))
        }
        _ => Err(mismatch(name, "a number", value)),
    }
}

fn as_u32(name: &str, value: &Value) -> Result<u32, OptimizerError> {
    value
        .as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| mismatch(name, "a non-negative integer", value))
}

fn as_str<'a>(name: &str, value: &'a Value) -> Result<&'a str, OptimizerError> {
    value.as_str().ok_or_else(|| mismatch(name, "a string", value))
}
