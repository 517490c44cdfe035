use clap::Parser;

use crate::{
    cli::{DeviceArgs, FallbackArgs, RoleArgs, TariffArgs, WindowArgs},
    core::{
        collector::Collector,
        pipeline::{Analysis, Windows},
        reconcile::Reconciler,
        series::{Attribution, DeltaPolicy, OnCounterReset},
    },
    prelude::*,
    statistics::{
        cost::{CostEstimate, Tariff},
        solar::{EnergyBalance, Roles},
    },
    tables::{
        build_cost_table,
        build_heatmap_table,
        build_monthly_table,
        build_profile_table,
        build_sources_table,
        build_status_table,
        build_summary_table,
        build_weekday_table,
    },
};

#[derive(Parser)]
pub struct ReportArgs {
    #[clap(flatten)]
    pub device: DeviceArgs,

    #[clap(flatten)]
    pub roles: RoleArgs,

    #[clap(flatten)]
    pub tariff: TariffArgs,

    #[clap(flatten)]
    pub windows: WindowArgs,

    #[clap(flatten)]
    pub fallback: FallbackArgs,

    /// Timestamp of the pair of counter readings that an interval delta is stored at.
    #[clap(long, env = "ATTRIBUTION", value_enum, default_value = "interval-start")]
    pub attribution: Attribution,

    #[clap(long, env = "ON_COUNTER_RESET", value_enum, default_value = "clamp")]
    pub on_counter_reset: OnCounterReset,
}

impl ReportArgs {
    #[instrument(skip_all)]
    pub fn run(self) -> Result {
        let client = self.device.client();
        let collector = Collector::new(&client, self.fallback.sampling()?);
        let reconciler = Reconciler::new(DeltaPolicy {
            attribution: self.attribution,
            on_counter_reset: self.on_counter_reset,
        });
        let analysis = Analysis::run(&collector, &reconciler, &Windows::from(self.windows));
        if analysis.is_empty() {
            println!("no data available");
            return Ok(());
        }

        let roles = Roles::from(self.roles);
        let tariff = Tariff::from(self.tariff);
        println!("{}", build_sources_table(&analysis.outcomes, &analysis.warnings));
        if !analysis.current.is_empty() {
            println!("{}", build_status_table(&analysis.current, &roles));
        }
        if !analysis.monthly.is_empty() {
            println!("{}", build_monthly_table(&analysis.monthly, &roles));
        }
        if !analysis.daily.is_empty() {
            println!("{}", build_weekday_table(&analysis.daily, &roles));
        }
        if !analysis.hourly.is_empty() {
            println!("{}", build_profile_table(&analysis.hourly, &roles));
            println!("{}", build_heatmap_table(&analysis.hourly, &roles));
        }
        println!("{}", build_summary_table(&analysis, &roles)?);
        let estimate = CostEstimate::new(&EnergyBalance::of(&analysis.monthly, &roles), &tariff);
        println!("{}", build_cost_table(&estimate, &tariff));
        Ok(())
    }
}
