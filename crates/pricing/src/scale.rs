//! Purchase-scale plans ("escalas"): a supplier bills `paid_units` and ships
//! `paid_units + bonus_units`.

use serde::{Deserialize, Serialize};

use crate::error::PricingError;

/// Code for "no bonus scheme": one unit paid, one unit received.
pub const NO_SCALE_CODE: &str = "sin_escala";

/// Scales offered out of the box.
pub const DEFAULT_SCALE_CODES: &[&str] = &[NO_SCALE_CODE, "5+1", "10+2", "10+3", "20+5"];

/// A supplier bonus scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScalePlan {
    pub code: String,
    pub paid_units: u32,
    pub bonus_units: u32,
}

impl ScalePlan {
    /// The identity plan (`sin_escala`).
    pub fn none() -> Self {
        Self {
            code: NO_SCALE_CODE.to_string(),
            paid_units: 1,
            bonus_units: 0,
        }
    }

    /// Parse a plan code: `sin_escala` or `N+M` with `N >= 1`, `M >= 0`.
    pub fn parse(code: &str) -> Result<Self, PricingError> {
        if code == NO_SCALE_CODE {
            return Ok(Self::none());
        }

        let invalid = |reason: &str| PricingError::InvalidScale {
            code: code.to_string(),
            reason: reason.to_string(),
        };

        let (paid, bonus) = code
            .split_once('+')
            .ok_or_else(|| invalid("expected '<paid>+<bonus>'"))?;

        let is_number = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !is_number(paid) || !is_number(bonus) {
            return Err(invalid("paid and bonus units must be unsigned integers"));
        }

        let paid_units: u32 = paid.parse().map_err(|_| invalid("paid units out of range"))?;
        let bonus_units: u32 = bonus.parse().map_err(|_| invalid("bonus units out of range"))?;

        if paid_units == 0 {
            return Err(invalid("paid units must be at least 1"));
        }
        paid_units
            .checked_add(bonus_units)
            .ok_or_else(|| invalid("total units out of range"))?;

        Ok(Self {
            code: code.to_string(),
            paid_units,
            bonus_units,
        })
    }

    /// Units physically received per purchase (`paid + bonus`).
    pub fn total_units(&self) -> u32 {
        self.paid_units + self.bonus_units
    }
}

/// Immutable lookup table of the scales a deployment accepts.
///
/// Built once at startup; a malformed entry fails construction so that bad
/// configuration never reaches a pricing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleTable {
    plans: Vec<ScalePlan>,
}

impl ScaleTable {
    pub fn from_codes<I, S>(codes: I) -> Result<Self, PricingError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut plans: Vec<ScalePlan> = Vec::new();
        for code in codes {
            let plan = ScalePlan::parse(code.as_ref().trim())?;
            if plans.iter().any(|p| p.code == plan.code) {
                return Err(PricingError::DuplicateScale(plan.code));
            }
            plans.push(plan);
        }

        if !plans.iter().any(|p| p.code == NO_SCALE_CODE) {
            plans.insert(0, ScalePlan::none());
        }

        Ok(Self { plans })
    }

    pub fn resolve(&self, code: &str) -> Result<ScalePlan, PricingError> {
        self.plans
            .iter()
            .find(|p| p.code == code)
            .cloned()
            .ok_or_else(|| PricingError::UnknownScale(code.to_string()))
    }

    /// Plans in configuration order.
    pub fn plans(&self) -> &[ScalePlan] {
        &self.plans
    }
}

impl Default for ScaleTable {
    fn default() -> Self {
        Self {
            plans: DEFAULT_SCALE_CODES
                .iter()
                .filter_map(|c| ScalePlan::parse(c).ok())
                .collect(),
        }
    }
}
