use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::RankingError;
use crate::scoring::{GradeScoreCalculator, ScoreCalculator, TimeConsumedScoreCalculator};

/// Symbolic key of one scoring dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreDimension {
    Grade,
    Time,
}

impl ScoreDimension {
    /// Every dimension the ranking pipeline expects to resolve.
    pub fn all() -> [ScoreDimension; 2] {
        [ScoreDimension::Grade, ScoreDimension::Time]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreDimension::Grade => "grade",
            ScoreDimension::Time => "time",
        }
    }
}

impl fmt::Display for ScoreDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dimension-to-calculator table, built once at startup. Registration
/// order is the order breakdowns are reported in.
#[derive(Clone)]
pub struct CalculatorRegistry {
    calculators: Vec<(ScoreDimension, Arc<dyn ScoreCalculator>)>,
}

impl CalculatorRegistry {
    pub fn new() -> Self {
        Self {
            calculators: Vec::new(),
        }
    }

    /// Registry with the two known production dimensions, verified so a
    /// missing calculator fails here instead of during a request.
    pub fn with_defaults() -> Result<Self, RankingError> {
        let mut registry = Self::new();
        registry.register(ScoreDimension::Grade, Arc::new(GradeScoreCalculator));
        registry.register(ScoreDimension::Time, Arc::new(TimeConsumedScoreCalculator));
        for dimension in ScoreDimension::all() {
            registry.resolve(dimension)?;
        }
        Ok(registry)
    }

    /// Registers a calculator, replacing any previous one for the same
    /// dimension.
    pub fn register(&mut self, dimension: ScoreDimension, calculator: Arc<dyn ScoreCalculator>) {
        self.calculators.retain(|(existing, _)| *existing != dimension);
        self.calculators.push((dimension, calculator));
    }

    pub fn resolve(&self, dimension: ScoreDimension) -> Result<&dyn ScoreCalculator, RankingError> {
        self.calculators
            .iter()
            .find(|(existing, _)| *existing == dimension)
            .map(|(_, calculator)| calculator.as_ref())
            .ok_or(RankingError::CalculatorMissing(dimension))
    }

    pub fn entries(&self) -> impl Iterator<Item = (ScoreDimension, &dyn ScoreCalculator)> {
        self.calculators
            .iter()
            .map(|(dimension, calculator)| (*dimension, calculator.as_ref()))
    }
}

impl Default for CalculatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_resolves_every_dimension() {
        let registry = CalculatorRegistry::with_defaults().unwrap();
        for dimension in ScoreDimension::all() {
            assert!(registry.resolve(dimension).is_ok());
        }
    }

    #[test]
    fn empty_registry_reports_a_configuration_error() {
        let registry = CalculatorRegistry::new();
        let err = registry.resolve(ScoreDimension::Grade).unwrap_err();
        assert!(matches!(err, RankingError::CalculatorMissing(_)));
    }

    #[test]
    fn registration_order_is_preserved() {
        let registry = CalculatorRegistry::with_defaults().unwrap();
        let order: Vec<ScoreDimension> = registry.entries().map(|(d, _)| d).collect();
        assert_eq!(order, vec![ScoreDimension::Grade, ScoreDimension::Time]);
    }

    #[test]
    fn re_registration_replaces_without_duplicating() {
        let mut registry = CalculatorRegistry::with_defaults().unwrap();
        registry.register(ScoreDimension::Grade, Arc::new(GradeScoreCalculator));
        assert_eq!(registry.entries().count(), 2);
    }
}
