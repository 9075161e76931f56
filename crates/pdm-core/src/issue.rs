//! Issue catalog: the wear mechanisms a device can accumulate damage from.

use crate::error::{CoreError, Result};
use crate::sensor::SensorGeometry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position of an issue in the catalog, also the index of its damage accumulator.
pub type IssueId = usize;

/// Wear mechanisms. Each variant owns its damage formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Issue {
    /// Non-fatal fouling that only lowers the production rate.
    Crud,
    JammedRotor,
    CrackedValve,
    BrokenGear,
}

impl Issue {
    /// Returns all issue kinds.
    pub fn all() -> &'static [Issue] {
        &[
            Issue::Crud,
            Issue::JammedRotor,
            Issue::CrackedValve,
            Issue::BrokenGear,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Issue::Crud => "crud",
            Issue::JammedRotor => "jammed_rotor",
            Issue::CrackedValve => "cracked_valve",
            Issue::BrokenGear => "broken_gear",
        }
    }

    /// Damage accrued in one tick for the given coefficient and sensor geometry.
    ///
    /// The gated formulas contribute nothing while their gating channel is negative.
    pub fn damage_increment(&self, coefficient: f64, g: &SensorGeometry) -> f64 {
        match self {
            Issue::Crud => coefficient * g.r,
            Issue::JammedRotor => {
                if g.x < 0.0 {
                    0.0
                } else {
                    coefficient * g.x * g.x
                }
            }
            Issue::CrackedValve => {
                if g.y < 0.0 {
                    0.0
                } else {
                    coefficient * g.y * g.y
                }
            }
            Issue::BrokenGear => {
                if g.z < 0.0 {
                    0.0
                } else {
                    coefficient * g.rho * g.z
                }
            }
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Issue {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Issue::all()
            .iter()
            .copied()
            .find(|issue| issue.as_str() == s)
            .ok_or_else(|| CoreError::UnknownIssue(s.to_string()))
    }
}

/// A catalog entry: an issue with its numeric id, coefficient and fatality flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IssueSpec {
    pub issue: Issue,
    pub id: IssueId,
    pub coefficient: f64,
    pub fatal: bool,
}

impl IssueSpec {
    pub fn new(issue: Issue, id: IssueId, coefficient: f64, fatal: bool) -> Self {
        Self {
            issue,
            id,
            coefficient,
            fatal,
        }
    }

    /// Damage accrued in one tick at the given geometry.
    pub fn damage_increment(&self, g: &SensorGeometry) -> f64 {
        self.issue.damage_increment(self.coefficient, g)
    }
}

/// Static table of issues, ordered by id. Immutable for the simulation's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueCatalog {
    specs: Vec<IssueSpec>,
    crud: IssueId,
}

impl IssueCatalog {
    /// Builds a catalog, validating ids, names and coefficients.
    ///
    /// Ids must cover `0..n` exactly once and `crud` must be present.
    pub fn new(mut specs: Vec<IssueSpec>) -> Result<Self> {
        specs.sort_by_key(|s| s.id);

        for (position, spec) in specs.iter().enumerate() {
            if spec.id != position {
                return Err(CoreError::NonContiguousIssueId {
                    position,
                    found: spec.id,
                });
            }
            if !spec.coefficient.is_finite() || spec.coefficient < 0.0 {
                return Err(CoreError::InvalidCoefficient {
                    issue: spec.issue.to_string(),
                    value: spec.coefficient,
                });
            }
            if specs[..position].iter().any(|s| s.issue == spec.issue) {
                return Err(CoreError::DuplicateIssue(spec.issue.to_string()));
            }
        }

        let crud = specs
            .iter()
            .find(|s| s.issue == Issue::Crud)
            .map(|s| s.id)
            .ok_or(CoreError::MissingIssue("crud"))?;

        Ok(Self { specs, crud })
    }

    /// The reference catalog used by the default configuration.
    pub fn reference() -> Self {
        Self {
            specs: vec![
                IssueSpec::new(Issue::Crud, 0, 0.1, false),
                IssueSpec::new(Issue::JammedRotor, 1, 0.000_08, true),
                IssueSpec::new(Issue::CrackedValve, 2, 0.000_01, true),
                IssueSpec::new(Issue::BrokenGear, 3, 0.000_002, true),
            ],
            crud: 0,
        }
    }

    pub fn specs(&self) -> &[IssueSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn get(&self, issue: Issue) -> Option<&IssueSpec> {
        self.specs.iter().find(|s| s.issue == issue)
    }

    pub fn id_of(&self, issue: Issue) -> Option<IssueId> {
        self.get(issue).map(|s| s.id)
    }

    /// Accumulator index of the crud issue.
    pub fn crud_id(&self) -> IssueId {
        self.crud
    }

    /// Fatal issues in id order.
    pub fn fatal(&self) -> impl Iterator<Item = &IssueSpec> + '_ {
        self.specs.iter().filter(|s| s.fatal)
    }

    pub fn fatal_count(&self) -> usize {
        self.fatal().count()
    }
}
