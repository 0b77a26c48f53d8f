//! What a prover claims.

use curve25519_dalek::Scalar;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::curve::Group;

/// Upper bound on public membership sets.
pub const MAX_MEMBERSHIP_SET: usize = 1024;

/// Upper bound on the number of terms in a linear relation.
pub const MAX_LINEAR_TERMS: usize = 64;

/// The statement category recorded in every proof's metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementType {
    DiscreteLog,
    Existence,
    Range,
    Membership,
    Linear,
}

impl StatementType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            StatementType::DiscreteLog => "discrete_log",
            StatementType::Existence => "existence",
            StatementType::Range => "range",
            StatementType::Membership => "membership",
            StatementType::Linear => "linear",
        }
    }

    /// The protocol family that proves this category.
    pub const fn family(&self) -> ProofFamily {
        match self {
            StatementType::DiscreteLog => ProofFamily::Schnorr,
            StatementType::Existence | StatementType::Range | StatementType::Membership => {
                ProofFamily::Pedersen
            }
            StatementType::Linear => ProofFamily::Sigma,
        }
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProofFamily {
    Schnorr,
    Pedersen,
    Sigma,
}

/// A statement together with its witness.
///
/// Secrets never leave the prover: only the resulting [`ZkProof`](crate::ZkProof)
/// is shared.
#[derive(Clone)]
pub enum Statement {
    /// Knowledge of `x` with `y = x·B`.
    ///
    /// A supplied `challenge` produces an interactive transcript; `None`
    /// derives it by Fiat–Shamir over `message` and the commitment.
    DiscreteLog {
        secret: Scalar,
        group: Group,
        message: Vec<u8>,
        challenge: Option<Scalar>,
    },
    /// Knowledge of the opening of a commitment to an attribute.
    Existence { attribute: Vec<u8> },
    /// `0 <= value < range`.
    Range { value: u64, range: u64 },
    /// `value` is one of `set`.
    Membership { value: String, set: Vec<String> },
    /// Knowledge of `x_i` with `Y = Σ x_i·G_i`, each `G_i` named by label.
    Linear {
        witnesses: Vec<Scalar>,
        generators: Vec<String>,
    },
}

impl Statement {
    pub fn statement_type(&self) -> StatementType {
        match self {
            Statement::DiscreteLog { .. } => StatementType::DiscreteLog,
            Statement::Existence { .. } => StatementType::Existence,
            Statement::Range { .. } => StatementType::Range,
            Statement::Membership { .. } => StatementType::Membership,
            Statement::Linear { .. } => StatementType::Linear,
        }
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::DiscreteLog { group, message, .. } => f
                .debug_struct("DiscreteLog")
                .field("group", group)
                .field("message_len", &message.len())
                .finish_non_exhaustive(),
            Statement::Existence { .. } => f.debug_struct("Existence").finish_non_exhaustive(),
            Statement::Range { range, .. } => f
                .debug_struct("Range")
                .field("range", range)
                .finish_non_exhaustive(),
            Statement::Membership { set, .. } => f
                .debug_struct("Membership")
                .field("set_len", &set.len())
                .finish_non_exhaustive(),
            Statement::Linear { generators, .. } => f
                .debug_struct("Linear")
                .field("generators", generators)
                .finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_witness() {
        let s = Statement::Range {
            value: 41,
            range: 100,
        };
        let out = format!("{s:?}");
        assert!(out.contains("100"));
        assert!(!out.contains("41"));
    }

    #[test]
    fn test_family_mapping() {
        assert_eq!(StatementType::DiscreteLog.family(), ProofFamily::Schnorr);
        assert_eq!(StatementType::Membership.family(), ProofFamily::Pedersen);
        assert_eq!(StatementType::Linear.family(), ProofFamily::Sigma);
    }
}
