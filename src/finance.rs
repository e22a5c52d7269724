//! General functions related to finance.
use indexmap::IndexMap;

/// Calculates the capital recovery factor (CRF) for a given lifetime and discount rate.
///
/// The CRF is used to annualize capital costs over the lifetime of an asset.
pub fn capital_recovery_factor(lifetime: u32, discount_rate: f64) -> f64 {
    if lifetime == 0 {
        return 0.0;
    }
    if discount_rate == 0.0 {
        return 1.0 / f64::from(lifetime);
    }
    let factor = (1.0 + discount_rate).powi(lifetime as i32);
    (discount_rate * factor) / (factor - 1.0)
}

/// Factors for discounting costs which occur in each support timeframe back to the first one.
///
/// With a single support timeframe, costs are not discounted and investments are simply annualised.
#[derive(Debug, Clone, PartialEq)]
pub struct CostFactors {
    discount_rate: f64,
    first_year: u32,
    /// Last year covered by the model (inclusive)
    horizon_end: u32,
    /// Number of years represented by each support timeframe
    year_weights: IndexMap<u32, u32>,
}

impl CostFactors {
    /// Create cost factors for the given support timeframes.
    ///
    /// # Arguments
    ///
    /// * `years` - Support timeframes, sorted and unique
    /// * `discount_rate` - Rate used for discounting to the first support timeframe
    /// * `last_year_weight` - Number of years represented by the last support timeframe
    pub fn new(years: &[u32], discount_rate: f64, last_year_weight: u32) -> Self {
        let mut year_weights: IndexMap<u32, u32> = years
            .windows(2)
            .map(|pair| (pair[0], pair[1] - pair[0]))
            .collect();
        let first_year = years.first().copied().unwrap_or_default();
        let last_year = years.last().copied().unwrap_or_default();
        year_weights.insert(last_year, last_year_weight);

        Self {
            discount_rate,
            first_year,
            horizon_end: last_year + last_year_weight.saturating_sub(1),
            year_weights,
        }
    }

    /// Whether more than one support timeframe is modelled
    pub fn is_intertemporal(&self) -> bool {
        self.year_weights.len() > 1
    }

    /// Number of years represented by the given support timeframe
    pub fn year_weight(&self, year: u32) -> u32 {
        self.year_weights.get(&year).copied().unwrap_or(1)
    }

    fn discount(&self, year: u32) -> f64 {
        (1.0 + self.discount_rate).powi((year - self.first_year) as i32).recip()
    }

    /// Factor applied to annual costs (fixed, variable, fuel) incurred in a support timeframe
    pub fn cost_factor(&self, year: u32) -> f64 {
        if !self.is_intertemporal() {
            return 1.0;
        }

        (year..year + self.year_weight(year))
            .map(|y| self.discount(y))
            .sum()
    }

    /// Factor converting an investment made in `year` into the total of its annuity payments
    pub fn invcost_factor(&self, year: u32, depreciation: u32, wacc: f64) -> f64 {
        let crf = capital_recovery_factor(depreciation, wacc);
        if !self.is_intertemporal() {
            return crf;
        }

        crf * (year..year + depreciation)
            .map(|y| self.discount(y))
            .sum::<f64>()
    }

    /// The part of [`CostFactors::invcost_factor`] paid after the end of the modelled horizon
    pub fn overpay_factor(&self, year: u32, depreciation: u32, wacc: f64) -> f64 {
        if !self.is_intertemporal() {
            return 0.0;
        }

        let crf = capital_recovery_factor(depreciation, wacc);
        crf * (year..year + depreciation)
            .filter(|y| *y > self.horizon_end)
            .map(|y| self.discount(y))
            .sum::<f64>()
    }

    /// Investment cost coefficient per unit of new capacity built in `year`
    pub fn investment_factor(&self, year: u32, depreciation: u32, wacc: f64) -> f64 {
        self.invcost_factor(year, depreciation, wacc)
            - self.overpay_factor(year, depreciation, wacc)
    }
}
