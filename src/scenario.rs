//! Projection of gas figures onto named usage scenarios and their monetary cost.

use crate::compare::saved;
use crate::error::HarnessError;
use crate::{OperationKind, Variant};
use serde::{Deserialize, Serialize};

/// Rate pair plus the unit conversion between them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceAssumptions {
    /// Smallest price units per gas (gwei per gas).
    pub gas_price_rate: f64,
    /// Currency per base unit (USD per ETH).
    pub base_price_rate: f64,
    /// Smallest price units per base unit (gwei per ETH).
    pub conversion_constant: f64,
}

impl Default for PriceAssumptions {
    fn default() -> Self {
        Self {
            gas_price_rate: 20.0,
            base_price_rate: 2_000.0,
            conversion_constant: 1e9,
        }
    }
}

impl PriceAssumptions {
    pub fn validate(&self) -> Result<(), HarnessError> {
        let rates = [
            ("gas_price_rate", self.gas_price_rate),
            ("base_price_rate", self.base_price_rate),
        ];
        for (name, v) in rates {
            if !v.is_finite() || v < 0.0 {
                return Err(HarnessError::InvalidRate(format!("{name} = {v}")));
            }
        }
        if !self.conversion_constant.is_finite() || self.conversion_constant <= 0.0 {
            return Err(HarnessError::InvalidRate(format!(
                "conversion_constant = {}",
                self.conversion_constant
            )));
        }
        Ok(())
    }

    /// Currency per unit of gas.
    pub fn unit_price(&self) -> f64 {
        self.gas_price_rate * self.base_price_rate / self.conversion_constant
    }
}

/// Where a scenario's gas figure came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum GasSource {
    /// A recorded sample, multiplied by `repeat`.
    Measured {
        variant: Variant,
        operation: OperationKind,
        input: String,
        per_call_gas: u64,
        repeat: u64,
    },
    /// Supplied by configuration.
    Assumed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioEstimate {
    pub name: String,
    pub gas: u64,
    pub source: GasSource,
    pub unit_price: f64,
    pub derived_cost: f64,
}

/// Scenario as written in configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub name: String,
    pub basis: ScenarioBasis,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioBasis {
    /// Latest sample for (variant, operation, input label), times `repeat`.
    Measured {
        variant: Variant,
        operation: OperationKind,
        input: String,
        #[serde(default = "one")]
        repeat: u64,
    },
    Assumed { gas: u64 },
}

fn one() -> u64 {
    1
}

/// Same usage scenario costed on both variants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PairedScenarioSpec {
    pub name: String,
    pub baseline: ScenarioBasis,
    pub optimized: ScenarioBasis,
}

/// Gas of a scenario on each side and what the optimized side saves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub name: String,
    pub baseline: GasSource,
    pub optimized: GasSource,
    pub baseline_gas: u64,
    pub optimized_gas: u64,
    pub saved_absolute: i128,
    pub saved_percent: f64,
}

/// Savings for a scenario whose two sides are already resolved to gas.
pub fn compare_scenario(
    name: &str,
    (baseline_gas, baseline): (u64, GasSource),
    (optimized_gas, optimized): (u64, GasSource),
) -> Result<ScenarioComparison, HarnessError> {
    let (saved_absolute, saved_percent) = saved(baseline_gas, optimized_gas)?;
    Ok(ScenarioComparison {
        name: name.to_string(),
        baseline,
        optimized,
        baseline_gas,
        optimized_gas,
        saved_absolute,
        saved_percent,
    })
}

/// Explicit linear scaling of a per-call figure.
pub fn scale_gas(per_call: u64, repeat: u64) -> Result<u64, HarnessError> {
    per_call.checked_mul(repeat).ok_or(HarnessError::GasOverflow {
        gas: per_call,
        factor: repeat,
    })
}

/// Price `gas` under `prices`. No scaling happens here.
pub fn project(
    name: &str,
    gas: u64,
    source: GasSource,
    prices: &PriceAssumptions,
) -> Result<ScenarioEstimate, HarnessError> {
    prices.validate()?;
    let derived_cost =
        gas as f64 * prices.gas_price_rate * prices.base_price_rate / prices.conversion_constant;
    Ok(ScenarioEstimate {
        name: name.to_string(),
        gas,
        source,
        unit_price: prices.unit_price(),
        derived_cost,
    })
}
