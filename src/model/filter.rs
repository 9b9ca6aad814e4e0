//! Search filter for laptops.

use super::laptop::{Laptop, Memory};

/// Criteria a laptop must satisfy to be returned by a search.
///
/// All bounds are inclusive. The default filter matches every laptop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub max_price_usd: Option<f64>,
    pub min_cpu_cores: u32,
    pub min_cpu_ghz: f64,
    pub min_ram: Option<Memory>,
}

impl Filter {
    /// Returns true if `laptop` satisfies every bound.
    pub fn matches(&self, laptop: &Laptop) -> bool {
        if let Some(max_price) = self.max_price_usd
            && laptop.price_usd > max_price
        {
            return false;
        }

        if laptop.cpu.number_cores < self.min_cpu_cores {
            return false;
        }

        if laptop.cpu.min_ghz < self.min_cpu_ghz {
            return false;
        }

        if let Some(min_ram) = &self.min_ram
            && laptop.ram.to_bits() < min_ram.to_bits()
        {
            return false;
        }

        true
    }
}
