//! Error types for instance loading, tour evaluation and search.

use std::fmt::{self, Display};

/// Errors raised while evaluating a single tour.
#[derive(Debug, Clone, PartialEq)]
pub enum TourError {
    /// The tour has the wrong length, is not anchored at the depot, repeats or
    /// omits a customer, or references a node outside the instance.
    Malformed { reason: String },
    /// Flow reconstruction finished with a pickup or delivery total that does
    /// not match the instance demand.
    InvariantViolation {
        quantity: &'static str,
        expected: i32,
        actual: i32,
    },
}

impl TourError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        TourError::Malformed { reason: reason.into() }
    }
}

impl Display for TourError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { reason } => write!(f, "Malformed tour: {}", reason),
            Self::InvariantViolation {
                quantity,
                expected,
                actual,
            } => write!(
                f,
                "Flow invariant violated: final {} is {}, expected {}",
                quantity, actual, expected
            ),
        }
    }
}

impl std::error::Error for TourError {}

/// Errors that abort a search run.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchError {
    /// A tour reached evaluation in a structurally invalid state.
    Tour(TourError),
    /// Bounded permutation search was exhausted without a feasible tour.
    NoInitialSolution { depth: usize },
    /// Exhaustive enumeration found no feasible tour.
    NoFeasibleTour { explored: usize },
    /// The instance is too large for exhaustive enumeration.
    InstanceTooLarge { customers: usize, limit: usize },
    /// A configuration value is out of range.
    InvalidConfig(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tour(e) => write!(f, "{}", e),
            Self::NoInitialSolution { depth } => write!(
                f,
                "No possible solution found after permutation depth P_r={}",
                depth
            ),
            Self::NoFeasibleTour { explored } => {
                write!(f, "No feasible tour among {} enumerated tours", explored)
            }
            Self::InstanceTooLarge { customers, limit } => write!(
                f,
                "Instance has {} customers, exhaustive search is limited to {}",
                customers, limit
            ),
            Self::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for SearchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Tour(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TourError> for SearchError {
    fn from(e: TourError) -> Self {
        Self::Tour(e)
    }
}

/// Errors raised while building or loading an instance.
#[derive(Debug)]
pub enum InstanceError {
    /// The instance file could not be read or written.
    Io(std::io::Error),
    /// The instance file is not valid JSON for an instance.
    Json(serde_json::Error),
    /// Matrix/vector shapes or values are inconsistent.
    Shape(String),
}

impl Display for InstanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Json(e) => write!(f, "JSON error: {e}"),
            Self::Shape(msg) => write!(f, "Invalid instance: {}", msg),
        }
    }
}

impl std::error::Error for InstanceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Shape(_) => None,
        }
    }
}

impl From<std::io::Error> for InstanceError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for InstanceError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_error_wraps_tour_error() {
        let err: SearchError = TourError::malformed("too short").into();
        assert_eq!(err.to_string(), "Malformed tour: too short");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_no_initial_solution_names_depth() {
        let err = SearchError::NoInitialSolution { depth: 3 };
        assert!(err.to_string().contains("P_r=3"));
    }
}
