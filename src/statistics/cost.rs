use crate::{
    quantity::{cost::Cost, energy::KilowattHours, rate::KilowattHourRate},
    statistics::solar::EnergyBalance,
};

#[derive(Copy, Clone, Debug)]
pub struct Tariff {
    pub import_rate: KilowattHourRate,

    /// Paid for the exported energy.
    pub export_rate: KilowattHourRate,
}

impl Default for Tariff {
    fn default() -> Self {
        Self { import_rate: KilowattHourRate::from(0.15), export_rate: KilowattHourRate::from(0.08) }
    }
}

/// Amounts are rounded to cents, so that the derived totals match the printed items.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CostEstimate {
    pub import_cost: Cost,
    pub export_revenue: Cost,

    /// What the self-consumed production would have cost if imported.
    pub self_consumption_savings: Cost,
}

impl CostEstimate {
    pub fn new(balance: &EnergyBalance, tariff: &Tariff) -> Self {
        let self_consumed = (balance.solar - balance.grid_export).max(KilowattHours::ZERO);
        Self {
            import_cost: (balance.grid_import * tariff.import_rate).round_to_cents(),
            export_revenue: (balance.grid_export * tariff.export_rate).round_to_cents(),
            self_consumption_savings: (self_consumed * tariff.import_rate).round_to_cents(),
        }
    }

    #[must_use]
    pub fn net_cost(&self) -> Cost {
        self.import_cost - self.export_revenue
    }

    /// Cost without the solar installation: everything consumed on site is imported.
    #[must_use]
    pub fn cost_without_solar(&self) -> Cost {
        self.import_cost + self.self_consumption_savings
    }

    #[must_use]
    pub fn total_benefit(&self) -> Cost {
        self.self_consumption_savings + self.export_revenue
    }
}
