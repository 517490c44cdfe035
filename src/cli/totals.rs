use clap::Parser;

use crate::{
    cli::DeviceArgs,
    core::collector::{Collector, FallbackSampling},
    prelude::*,
    tables::build_totals_table,
};

#[derive(Parser)]
pub struct TotalsArgs {
    #[clap(flatten)]
    pub device: DeviceArgs,
}

impl TotalsArgs {
    #[instrument(skip_all)]
    pub fn run(self) -> Result {
        let client = self.device.client();
        let readings = Collector::new(&client, FallbackSampling::default())
            .totals()
            .context("failed to fetch the totals")?;
        info!(n_registers = readings.len(), "fetched");
        println!("{}", build_totals_table(&readings));
        Ok(())
    }
}
