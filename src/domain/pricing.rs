use crate::domain::clock::{SharedClock, system_clock};
use crate::domain::money::round2;
use crate::error::{Result, WorkflowError};
use chrono::Timelike;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tracing::{debug, info};

/// An interchangeable pricing algorithm.
///
/// `calculate_price` maps a base price to a final price; the metadata
/// accessors describe the algorithm for audit display.
pub trait PricingStrategy: Send + Sync {
    fn calculate_price(&self, base_price: Decimal) -> Decimal;
    fn name(&self) -> String;
    fn description(&self) -> String;
    fn configuration(&self) -> Value;
}

/// Identity pricing: the base price passes through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardPricing;

impl PricingStrategy for StandardPricing {
    fn calculate_price(&self, base_price: Decimal) -> Decimal {
        base_price
    }

    fn name(&self) -> String {
        "standard".to_string()
    }

    fn description(&self) -> String {
        "base price without modifications".to_string()
    }

    fn configuration(&self) -> Value {
        json!({ "type": "standard", "multiplier": 1 })
    }
}

/// Flat percentage discount over the base price.
#[derive(Debug, Clone, Copy)]
pub struct DiscountPricing {
    percentage: Decimal,
}

impl DiscountPricing {
    /// Rejects percentages outside `[0, 100]`.
    pub fn new(percentage: Decimal) -> Result<Self> {
        if percentage < Decimal::ZERO || percentage > Decimal::from(100) {
            return Err(WorkflowError::Validation(format!(
                "discount percentage must be between 0 and 100, got {percentage}"
            )));
        }
        Ok(Self { percentage })
    }

    pub fn percentage(&self) -> Decimal {
        self.percentage
    }
}

impl PricingStrategy for DiscountPricing {
    fn calculate_price(&self, base_price: Decimal) -> Decimal {
        base_price - base_price * self.percentage / Decimal::from(100)
    }

    fn name(&self) -> String {
        format!("{}% discount", self.percentage)
    }

    fn description(&self) -> String {
        format!("applies a {}% discount on the base price", self.percentage)
    }

    fn configuration(&self) -> Value {
        json!({
            "type": "discount",
            "percentage": self.percentage,
            "multiplier": Decimal::ONE - self.percentage / Decimal::from(100),
        })
    }
}

/// Multiplicative demand/season pricing with a time-of-day factor.
///
/// The time-of-day factor is read from the injected clock at the moment of
/// calculation: +5% within 09:00-17:59 UTC, +10% within 18:00-22:59 UTC,
/// neutral otherwise. Two calls with identical inputs at different times may
/// legitimately produce different prices.
pub struct DynamicPricing {
    demand_multiplier: Decimal,
    season_multiplier: Decimal,
    clock: SharedClock,
}

impl DynamicPricing {
    pub fn new(demand_multiplier: Decimal, season_multiplier: Decimal) -> Self {
        Self::with_clock(demand_multiplier, season_multiplier, system_clock())
    }

    pub fn with_clock(
        demand_multiplier: Decimal,
        season_multiplier: Decimal,
        clock: SharedClock,
    ) -> Self {
        Self {
            demand_multiplier,
            season_multiplier,
            clock,
        }
    }

    fn time_of_day_factor(&self) -> Decimal {
        match self.clock.now().hour() {
            9..=17 => Decimal::new(105, 2),
            18..=22 => Decimal::new(110, 2),
            _ => Decimal::ONE,
        }
    }
}

impl PricingStrategy for DynamicPricing {
    fn calculate_price(&self, base_price: Decimal) -> Decimal {
        base_price * self.demand_multiplier * self.season_multiplier * self.time_of_day_factor()
    }

    fn name(&self) -> String {
        "dynamic".to_string()
    }

    fn description(&self) -> String {
        format!(
            "price adjusted by demand ({}x), season ({}x) and time of day",
            self.demand_multiplier, self.season_multiplier
        )
    }

    fn configuration(&self) -> Value {
        json!({
            "type": "dynamic",
            "demand_multiplier": self.demand_multiplier,
            "season_multiplier": self.season_multiplier,
        })
    }
}

/// Holds the active strategy and a bounded history of previous ones.
pub struct PricingContext {
    strategy: Box<dyn PricingStrategy>,
    history: Vec<Box<dyn PricingStrategy>>,
    max_history: usize,
}

impl Default for PricingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl PricingContext {
    pub const MAX_STRATEGY_HISTORY: usize = 10;

    pub fn new() -> Self {
        Self {
            strategy: Box::new(StandardPricing),
            history: Vec::new(),
            max_history: Self::MAX_STRATEGY_HISTORY,
        }
    }

    /// Installs a new strategy, pushing the previous one onto the bounded
    /// history (oldest evicted first).
    pub fn set_strategy(&mut self, strategy: Box<dyn PricingStrategy>) {
        let previous = std::mem::replace(&mut self.strategy, strategy);
        self.history.push(previous);
        if self.history.len() > self.max_history {
            self.history.remove(0);
        }
        info!(strategy = %self.strategy.name(), "pricing strategy changed");
    }

    /// Delegates to the active strategy and rounds to 2 decimal places,
    /// half away from zero.
    pub fn calculate_price(&self, base_price: Decimal) -> Decimal {
        let final_price = round2(self.strategy.calculate_price(base_price));
        debug!(
            base = %base_price,
            result = %final_price,
            strategy = %self.strategy.name(),
            "price calculated"
        );
        final_price
    }

    /// Reinstalls the most recent prior strategy. Returns false when the
    /// history is empty and nothing changed.
    pub fn revert_to_previous_strategy(&mut self) -> bool {
        let Some(previous) = self.history.pop() else {
            return false;
        };
        self.strategy = previous;
        info!(strategy = %self.strategy.name(), "pricing strategy reverted");
        true
    }

    pub fn current_strategy_name(&self) -> String {
        self.strategy.name()
    }

    pub fn current_strategy_description(&self) -> String {
        self.strategy.description()
    }

    pub fn current_strategy_configuration(&self) -> Value {
        self.strategy.configuration()
    }

    pub fn strategy_history_names(&self) -> Vec<String> {
        self.history.iter().map(|s| s.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn clock_at_hour(hour: u32) -> SharedClock {
        Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2024, 3, 20, hour, 30, 0).unwrap(),
        ))
    }

    #[test]
    fn test_standard_is_identity() {
        let context = PricingContext::new();
        assert_eq!(context.calculate_price(dec!(123.45)), dec!(123.45));
        assert_eq!(context.current_strategy_name(), "standard");
    }

    #[test]
    fn test_discount_ten_percent() {
        let mut context = PricingContext::new();
        context.set_strategy(Box::new(DiscountPricing::new(dec!(10)).unwrap()));
        assert_eq!(context.calculate_price(dec!(100)), dec!(90.00));
    }

    #[test]
    fn test_discount_rejects_out_of_range() {
        assert!(matches!(
            DiscountPricing::new(dec!(150)),
            Err(WorkflowError::Validation(_))
        ));
        assert!(matches!(
            DiscountPricing::new(dec!(-1)),
            Err(WorkflowError::Validation(_))
        ));
        assert!(DiscountPricing::new(dec!(0)).is_ok());
        assert!(DiscountPricing::new(dec!(100)).is_ok());
    }

    #[test]
    fn test_dynamic_time_of_day_windows() {
        let business = DynamicPricing::with_clock(dec!(1), dec!(1), clock_at_hour(10));
        assert_eq!(business.calculate_price(dec!(100)), dec!(105.00));

        let peak = DynamicPricing::with_clock(dec!(1), dec!(1), clock_at_hour(20));
        assert_eq!(peak.calculate_price(dec!(100)), dec!(110.00));

        let off_hours = DynamicPricing::with_clock(dec!(1), dec!(1), clock_at_hour(3));
        assert_eq!(off_hours.calculate_price(dec!(100)), dec!(100));
    }

    #[test]
    fn test_dynamic_multiplies_demand_and_season() {
        let strategy = DynamicPricing::with_clock(dec!(1.1), dec!(1.05), clock_at_hour(3));
        let mut context = PricingContext::new();
        context.set_strategy(Box::new(strategy));
        // 100 * 1.1 * 1.05 = 115.5
        assert_eq!(context.calculate_price(dec!(100)), dec!(115.50));
    }

    #[test]
    fn test_context_rounds_half_away_from_zero() {
        let mut context = PricingContext::new();
        context.set_strategy(Box::new(DiscountPricing::new(dec!(15)).unwrap()));
        // 0.10 * 0.85 = 0.085; half-away-from-zero gives 0.09, banker's would give 0.08.
        assert_eq!(context.calculate_price(dec!(0.10)), dec!(0.09));
    }

    #[test]
    fn test_revert_to_previous_strategy() {
        let mut context = PricingContext::new();
        context.set_strategy(Box::new(DiscountPricing::new(dec!(20)).unwrap()));
        assert_eq!(context.calculate_price(dec!(100)), dec!(80.00));

        assert!(context.revert_to_previous_strategy());
        assert_eq!(context.calculate_price(dec!(100)), dec!(100));
        // History exhausted.
        assert!(!context.revert_to_previous_strategy());
    }

    #[test]
    fn test_strategy_history_is_bounded() {
        let mut context = PricingContext::new();
        for pct in 1..=12 {
            context.set_strategy(Box::new(DiscountPricing::new(Decimal::from(pct)).unwrap()));
        }
        let history = context.strategy_history_names();
        assert_eq!(history.len(), PricingContext::MAX_STRATEGY_HISTORY);
        // The initial standard strategy and the 1% entry were evicted.
        assert_eq!(history.first().unwrap(), "2% discount");
    }
}
