//! Ordered compounding levy schedule applied to sale amounts.
//!
//! Each levy is computed on the running base (base amount plus every levy
//! already applied), mirroring the tax-on-tax compounding rule, and the
//! total is the running base after the last levy.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevyRate {
    pub code: String,
    pub rate_pct: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevyComponent {
    pub code: String,
    pub rate_pct: Decimal,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevyBreakdown {
    pub base: Decimal,
    pub components: Vec<LevyComponent>,
    pub total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevySchedule {
    rates: Vec<LevyRate>,
}

impl LevySchedule {
    pub fn new(rates: Vec<LevyRate>) -> Self {
        Self { rates }
    }

    pub fn rates(&self) -> &[LevyRate] {
        &self.rates
    }

    /// Apply every levy in order, each on the running base.
    pub fn apply(&self, base: Decimal) -> LevyBreakdown {
        let mut running = base;
        let mut components = Vec::with_capacity(self.rates.len());

        for rate in &self.rates {
            let amount = (running * rate.rate_pct / Decimal::ONE_HUNDRED).round_dp(2);
            components.push(LevyComponent {
                code: rate.code.clone(),
                rate_pct: rate.rate_pct,
                amount,
            });
            running += amount;
        }

        LevyBreakdown { base, components, total: running }
    }
}

impl Default for LevySchedule {
    fn default() -> Self {
        Self::new(vec![
            LevyRate { code: "VAT".to_string(), rate_pct: Decimal::from(15) },
            LevyRate { code: "TURNOVER".to_string(), rate_pct: Decimal::from(2) },
        ])
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{LevyRate, LevySchedule};

    #[test]
    fn default_schedule_compounds_on_the_running_base() {
        let breakdown = LevySchedule::default().apply(Decimal::from(5000));

        // 15% of 5000, then 2% of 5750.
        assert_eq!(breakdown.components[0].amount, Decimal::new(75000, 2));
        assert_eq!(breakdown.components[1].amount, Decimal::new(11500, 2));
        assert_eq!(breakdown.total, Decimal::new(586500, 2));
    }

    #[test]
    fn total_equals_base_plus_component_sum() {
        let breakdown = LevySchedule::default().apply(Decimal::new(123456, 2));
        let levy_sum: Decimal = breakdown.components.iter().map(|component| component.amount).sum();
        assert_eq!(breakdown.total, breakdown.base + levy_sum);
    }

    #[test]
    fn component_amounts_are_rounded_to_two_places() {
        let breakdown = LevySchedule::default().apply(Decimal::new(999, 2));
        for component in &breakdown.components {
            assert!(component.amount.scale() <= 2, "{} over-precise", component.code);
        }
    }

    #[test]
    fn empty_schedule_leaves_the_base_untouched() {
        let breakdown = LevySchedule::new(Vec::new()).apply(Decimal::from(42));
        assert!(breakdown.components.is_empty());
        assert_eq!(breakdown.total, breakdown.base);
    }

    #[test]
    fn ordering_changes_the_compounded_total() {
        let forward = LevySchedule::new(vec![
            LevyRate { code: "A".to_string(), rate_pct: Decimal::from(10) },
            LevyRate { code: "B".to_string(), rate_pct: Decimal::from(5) },
        ]);
        let reversed = LevySchedule::new(vec![
            LevyRate { code: "B".to_string(), rate_pct: Decimal::from(5) },
            LevyRate { code: "A".to_string(), rate_pct: Decimal::from(10) },
        ]);

        let base = Decimal::from(1000);
        // Totals agree for two levies, but the per-component split must not.
        assert_ne!(
            forward.apply(base).components[0].amount,
            reversed.apply(base).components[0].amount
        );
    }
}
