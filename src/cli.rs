mod instant;
mod report;
mod totals;

use chrono::TimeDelta;
use clap::{Parser, Subcommand};

pub use self::{instant::InstantArgs, report::ReportArgs, totals::TotalsArgs};
use crate::{
    api::egauge::{Client, DeviceUrl, Timeouts},
    core::{collector::FallbackSampling, pipeline::Windows, reading::Register},
    prelude::*,
    quantity::rate::KilowattHourRate,
    statistics::{cost::Tariff, solar::Roles},
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: fetch the history, reconcile it, and print the report.
    #[clap(name = "report")]
    Report(Box<ReportArgs>),

    /// Print the present power of every register.
    #[clap(name = "instant")]
    Instant(InstantArgs),

    /// Print the lifetime energy counters.
    #[clap(name = "totals")]
    Totals(TotalsArgs),
}

#[derive(Parser)]
pub struct DeviceArgs {
    /// Device address, for example `192.168.1.50` or `https://egauge12345.egaug.es`.
    #[clap(long = "device-url", env = "EGAUGE_URL")]
    url: DeviceUrl,

    #[clap(long, env = "INSTANT_TIMEOUT", default_value = "5s")]
    instant_timeout: humantime::Duration,

    /// Historical responses are much larger than the instant ones.
    #[clap(long, env = "HISTORICAL_TIMEOUT", default_value = "30s")]
    historical_timeout: humantime::Duration,
}

impl DeviceArgs {
    pub fn client(&self) -> Client {
        let timeouts = Timeouts {
            instant: self.instant_timeout.into(),
            historical: self.historical_timeout.into(),
        };
        Client::new(self.url.clone(), timeouts)
    }
}

#[derive(Parser)]
pub struct RoleArgs {
    #[clap(long = "solar-register", env = "SOLAR_REGISTER", default_value = "Solar")]
    solar: Register,

    #[clap(long = "grid-import-register", env = "GRID_IMPORT_REGISTER", default_value = "Grid_Incoming")]
    grid_import: Register,

    #[clap(long = "grid-export-register", env = "GRID_EXPORT_REGISTER", default_value = "Grid_Outgoing")]
    grid_export: Register,
}

impl From<RoleArgs> for Roles {
    fn from(args: RoleArgs) -> Self {
        Self { solar: args.solar, grid_import: args.grid_import, grid_export: args.grid_export }
    }
}

#[derive(Parser)]
pub struct TariffArgs {
    /// Import rate per kilowatt-hour.
    #[clap(long = "import-rate", env = "IMPORT_RATE", default_value = "0.15")]
    import_rate: KilowattHourRate,

    /// Export rate per kilowatt-hour.
    #[clap(long = "export-rate", env = "EXPORT_RATE", default_value = "0.08")]
    export_rate: KilowattHourRate,
}

impl From<TariffArgs> for Tariff {
    fn from(args: TariffArgs) -> Self {
        Self { import_rate: args.import_rate, export_rate: args.export_rate }
    }
}

#[derive(Parser)]
pub struct WindowArgs {
    #[clap(long = "months", env = "MONTHS", default_value = "12")]
    months: u32,

    #[clap(long = "days", env = "DAYS", default_value = "365")]
    days: u32,

    #[clap(long = "hours", env = "HOURS", default_value = "168")]
    hours: u32,
}

impl From<WindowArgs> for Windows {
    fn from(args: WindowArgs) -> Self {
        Self { months: args.months, days: args.days, hours: args.hours }
    }
}

#[derive(Parser)]
pub struct FallbackArgs {
    /// Simulated time between two instant samples when the history is unavailable.
    #[clap(long = "fallback-cadence", env = "FALLBACK_CADENCE", default_value = "6h")]
    cadence: humantime::Duration,

    #[clap(long = "fallback-max-samples", env = "FALLBACK_MAX_SAMPLES", default_value = "1460")]
    max_samples: u32,
}

impl FallbackArgs {
    pub fn sampling(&self) -> Result<FallbackSampling> {
        let cadence = TimeDelta::from_std(self.cadence.into())?;
        ensure!(cadence > TimeDelta::zero(), "the fallback cadence must be positive");
        Ok(FallbackSampling { cadence, max_samples: self.max_samples })
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_args() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() -> Result {
        let args = Args::try_parse_from(["egauge-digest", "report", "--device-url", "192.168.1.50"])?;
        let Command::Report(args) = args.command else {
            bail!("expected the report command");
        };
        let sampling = args.fallback.sampling()?;
        assert_eq!(sampling.cadence, TimeDelta::hours(6));
        assert_eq!(sampling.max_samples, 1460);
        let windows = Windows::from(args.windows);
        assert_eq!((windows.months, windows.days, windows.hours), (12, 365, 168));
        let roles = Roles::from(args.roles);
        assert_eq!(roles.grid_export, Register::from("Grid_Outgoing"));
        Ok(())
    }
}
