use serde::{Deserialize, Serialize};
use uyir_shared::VehicleClass;

/// Fare schedule, amounts in whole rupees
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FareConfig {
    /// Flat charge applied to every trip
    pub base: f64,

    /// Charge per kilometer before the class multiplier
    pub per_km: f64,

    /// Trips shorter than this are billed as this distance
    pub min_km: f64,

    pub bls_multiplier: f64,
    pub als_multiplier: f64,
    pub neo_multiplier: f64,
}

impl Default for FareConfig {
    fn default() -> Self {
        Self {
            base: 200.0,
            per_km: 25.0,
            min_km: 1.0,
            bls_multiplier: 1.0,
            als_multiplier: 1.3,
            neo_multiplier: 1.5,
        }
    }
}

/// Distance-based fare pricing
#[derive(Debug, Clone)]
pub struct FareCalculator {
    config: FareConfig,
}

impl FareCalculator {
    pub fn new(config: FareConfig) -> Self {
        Self { config }
    }

    pub fn multiplier(&self, class: VehicleClass) -> f64 {
        match class {
            VehicleClass::Bls => self.config.bls_multiplier,
            VehicleClass::Als => self.config.als_multiplier,
            VehicleClass::Neo => self.config.neo_multiplier,
        }
    }

    /// `base + per_km * max(km, min_km) * multiplier`, truncated.
    pub fn estimate(&self, distance_m: i64, class: VehicleClass) -> i64 {
        let km = (distance_m.max(0) as f64 / 1000.0).max(self.config.min_km);
        (self.config.base + self.config.per_km * km * self.multiplier(class)) as i64
    }
}

impl Default for FareCalculator {
    fn default() -> Self {
        Self::new(FareConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fare_by_class() {
        let calculator = FareCalculator::default();

        assert_eq!(calculator.estimate(1535, VehicleClass::Bls), 238);
        assert_eq!(calculator.estimate(1535, VehicleClass::Als), 249);
        assert_eq!(calculator.estimate(1535, VehicleClass::Neo), 257);
    }

    #[test]
    fn test_minimum_distance() {
        let calculator = FareCalculator::default();

        // Sub-kilometer trips are billed as one kilometer.
        assert_eq!(calculator.estimate(0, VehicleClass::Bls), 225);
        assert_eq!(calculator.estimate(400, VehicleClass::Bls), 225);
        assert_eq!(calculator.estimate(-50, VehicleClass::Bls), 225);
    }

    #[test]
    fn test_fare_is_positive_and_monotonic() {
        let calculator = FareCalculator::default();
        let mut previous = 0;
        for distance_m in (0..50_000).step_by(2_500) {
            let fare = calculator.estimate(distance_m, VehicleClass::Als);
            assert!(fare > 0);
            assert!(fare >= previous);
            previous = fare;
        }
    }
}
