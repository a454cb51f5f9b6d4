//! Operations performed by virtual users and the policies that select them

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single logical request against the users API
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
}

impl Operation {
    /// Get the string representation of the operation
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
        }
    }

    /// Get all operations
    pub fn all() -> &'static [Operation] {
        &[Operation::Create, Operation::Read, Operation::Update]
    }

    /// Status code the target answers with when the operation succeeds
    pub fn expected_status(&self) -> u16 {
        match self {
            Operation::Create => 201,
            Operation::Read | Operation::Update => 200,
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Operation::Create => 0,
            Operation::Read => 1,
            Operation::Update => 2,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create" => Ok(Operation::Create),
            "read" => Ok(Operation::Read),
            "update" => Ok(Operation::Update),
            _ => Err(format!("Invalid operation: {}", s)),
        }
    }
}

/// Which operation a virtual user runs on each iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OperationPolicy {
    #[default]
    Create,
    Read,
    Update,
    /// Create on even iterations, read on odd ones
    Alternate,
    /// Seeded random choice by relative weight
    Weighted,
}

impl OperationPolicy {
    /// Pick the operation for one iteration
    pub fn select<R: Rng + ?Sized>(
        &self,
        iteration: u64,
        weights: &OperationWeights,
        rng: &mut R,
    ) -> Operation {
        match self {
            OperationPolicy::Create => Operation::Create,
            OperationPolicy::Read => Operation::Read,
            OperationPolicy::Update => Operation::Update,
            OperationPolicy::Alternate => {
                if iteration % 2 == 0 {
                    Operation::Create
                } else {
                    Operation::Read
                }
            }
            OperationPolicy::Weighted => weights.pick(rng),
        }
    }

    /// Whether any iteration under this policy may need a pool resource
    pub fn needs_pool(&self, weights: &OperationWeights) -> bool {
        match self {
            OperationPolicy::Update => true,
            OperationPolicy::Weighted => weights.update > 0,
            _ => false,
        }
    }
}

/// Relative weights for the weighted policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationWeights {
    pub create: u32,
    pub read: u32,
    pub update: u32,
}

impl Default for OperationWeights {
    fn default() -> Self {
        Self {
            create: 1,
            read: 1,
            update: 0,
        }
    }
}

impl OperationWeights {
    pub fn total(&self) -> u64 {
        self.create as u64 + self.read as u64 + self.update as u64
    }

    fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Operation {
        let total = self.total();
        if total == 0 {
            return Operation::Create;
        }

        let roll = rng.random_range(0..total);
        if roll < self.create as u64 {
            Operation::Create
        } else if roll < self.create as u64 + self.read as u64 {
            Operation::Read
        } else {
            Operation::Update
        }
    }
}

/// How an updating virtual user chooses the pool resource it writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResourceBinding {
    /// Any pool entry, uniformly per iteration; concurrent writers may collide
    #[default]
    Random,
    /// VU `v` always writes `pool[v - 1]`
    Dedicated,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_operation_from_str() {
        assert_eq!("create".parse::<Operation>().unwrap(), Operation::Create);
        assert_eq!("READ".parse::<Operation>().unwrap(), Operation::Read);
        assert_eq!("Update".parse::<Operation>().unwrap(), Operation::Update);
        assert!("delete".parse::<Operation>().is_err());
    }

    #[test]
    fn test_expected_status() {
        assert_eq!(Operation::Create.expected_status(), 201);
        assert_eq!(Operation::Read.expected_status(), 200);
        assert_eq!(Operation::Update.expected_status(), 200);
    }

    #[test]
    fn test_alternate_follows_iteration_parity() {
        let mut rng = StdRng::seed_from_u64(7);
        let weights = OperationWeights::default();
        let picked: Vec<Operation> = (0..4)
            .map(|i| OperationPolicy::Alternate.select(i, &weights, &mut rng))
            .collect();
        assert_eq!(
            picked,
            vec![Operation::Create, Operation::Read, Operation::Create, Operation::Read]
        );
    }

    #[test]
    fn test_weighted_respects_zero_weights() {
        let mut rng = StdRng::seed_from_u64(42);
        let weights = OperationWeights {
            create: 0,
            read: 3,
            update: 1,
        };
        for i in 0..200 {
            let op = OperationPolicy::Weighted.select(i, &weights, &mut rng);
            assert_ne!(op, Operation::Create);
        }
    }

    #[test]
    fn test_weighted_is_reproducible_with_seed() {
        let weights = OperationWeights {
            create: 1,
            read: 1,
            update: 1,
        };
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..32)
                .map(|i| OperationPolicy::Weighted.select(i, &weights, &mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(9), run(9));
    }

    #[test]
    fn test_needs_pool() {
        let weights = OperationWeights::default();
        assert!(OperationPolicy::Update.needs_pool(&weights));
        assert!(!OperationPolicy::Alternate.needs_pool(&weights));
        assert!(!OperationPolicy::Weighted.needs_pool(&weights));
        let with_updates = OperationWeights {
            update: 2,
            ..weights
        };
        assert!(OperationPolicy::Weighted.needs_pool(&with_updates));
    }
}
