use clap::Parser;

use crate::{
    cli::{DeviceArgs, RoleArgs},
    core::{
        collector::{Collector, FallbackSampling},
        granularity::Granularity,
        reconcile::Reconciler,
    },
    prelude::*,
    statistics::solar::Roles,
    tables::build_status_table,
};

#[derive(Parser)]
pub struct InstantArgs {
    #[clap(flatten)]
    pub device: DeviceArgs,

    #[clap(flatten)]
    pub roles: RoleArgs,
}

impl InstantArgs {
    #[instrument(skip_all)]
    pub fn run(self) -> Result {
        let client = self.device.client();
        let readings = Collector::new(&client, FallbackSampling::default())
            .instant()
            .context("failed to fetch the instant readings")?;
        let current = Reconciler::default().reconcile(readings, Granularity::Second).table;
        println!("{}", build_status_table(&current, &Roles::from(self.roles)));
        Ok(())
    }
}
