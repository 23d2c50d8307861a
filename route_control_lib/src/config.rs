use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    pub driver: String,
    pub vehicle: String,
    /// Distance per fuel unit, e.g. km per liter.
    pub fuel_economy: f64,
    /// Currency per fuel unit.
    pub fuel_price: f64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            driver: String::new(),
            vehicle: String::new(),
            fuel_economy: 10.0,
            fuel_price: 25.0,
        }
    }
}

impl DriverConfig {
    /// Whether both labels have been filled in. The caller decides what to
    /// do with an incomplete configuration; trip operations do not gate on it.
    pub fn is_complete(&self) -> bool {
        !self.driver.trim().is_empty() && !self.vehicle.trim().is_empty()
    }
}
