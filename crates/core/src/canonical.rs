//! Canonical JSON form and content fingerprints.
//!
//! Object keys are emitted in sorted order at every depth; arrays keep their
//! order because patch order is meaningful. Integral floats are written as
//! integers so `1` and `1.0` fingerprint the same, matching JSON number
//! semantics rather than serde's internal representation.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::{domain::plan::Plan, errors::PlanError};

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub fn canonicalize(value: &Value) -> String {
    let mut output = String::new();
    write_canonical(value, &mut output);
    output
}

/// Canonical form of a parsed plan. Defaults are already filled in, so two
/// documents that differ only in omitted-vs-explicit defaults agree.
pub fn canonical_plan(plan: &Plan) -> Result<String, PlanError> {
    let value = serde_json::to_value(plan).map_err(|error| PlanError::Schema(error.to_string()))?;
    Ok(canonicalize(&value))
}

pub fn plan_hash(plan: &Plan) -> Result<String, PlanError> {
    canonical_plan(plan).map(|canonical| sha256_hex(canonical.as_bytes()))
}

pub fn sha256_hex(payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    format!("{:x}", hasher.finalize())
}

fn write_canonical(value: &Value, output: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            output.push('{');
            for (index, key) in keys.into_iter().enumerate() {
                if index > 0 {
                    output.push(',');
                }
                output.push_str(&Value::String(key.clone()).to_string());
                output.push(':');
                if let Some(entry) = map.get(key) {
                    write_canonical(entry, output);
                }
            }
            output.push('}');
        }
        Value::Array(items) => {
            output.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    output.push(',');
                }
                write_canonical(item, output);
            }
            output.push(']');
        }
        Value::Number(number) => match number.as_f64() {
            Some(float)
                if !number.is_i64()
                    && !number.is_u64()
                    && float.fract() == 0.0
                    && float.abs() <= MAX_SAFE_INTEGER =>
            {
                output.push_str(&(float as i64).to_string());
            }
            _ => output.push_str(&number.to_string()),
        },
        scalar => output.push_str(&scalar.to_string()),
    }
}
