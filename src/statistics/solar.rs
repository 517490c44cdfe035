use std::collections::BTreeMap;

use chrono::{DateTime, Local};

use crate::{
    core::{
        reading::Register,
        table::{Column, Table},
    },
    quantity::{energy::KilowattHours, ratio::Ratio},
};

/// Which registers measure what.
#[derive(Clone, Debug)]
pub struct Roles {
    pub solar: Register,
    pub grid_import: Register,
    pub grid_export: Register,
}

impl Default for Roles {
    fn default() -> Self {
        Self {
            solar: Register::from("Solar"),
            grid_import: Register::from("Grid_Incoming"),
            grid_export: Register::from("Grid_Outgoing"),
        }
    }
}

/// Share of the production that was used on site: `(solar − export) / solar`.
#[must_use]
pub fn self_consumption_rate(solar: KilowattHours, export: KilowattHours) -> Ratio {
    Ratio::of((solar - export).0, solar.0)
}

/// Share of the consumption that was covered by the production: `solar / (import + solar)`.
#[must_use]
pub fn solar_offset(solar: KilowattHours, import: KilowattHours) -> Ratio {
    Ratio::of(solar.0, (import + solar).0)
}

/// Energy balance of a table.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EnergyBalance {
    pub solar: KilowattHours,
    pub grid_import: KilowattHours,
    pub grid_export: KilowattHours,
}

impl EnergyBalance {
    pub fn of(table: &Table, roles: &Roles) -> Self {
        Self {
            solar: table.total_energy(&roles.solar),
            grid_import: table.total_energy(&roles.grid_import),
            grid_export: table.total_energy(&roles.grid_export),
        }
    }

    /// Everything used on site, whichever source it came from.
    #[must_use]
    pub fn consumption(&self) -> KilowattHours {
        self.grid_import + self.solar - self.grid_export
    }

    #[must_use]
    pub fn net_import(&self) -> KilowattHours {
        self.grid_import - self.grid_export
    }

    #[must_use]
    pub fn self_consumption(&self) -> Ratio {
        self_consumption_rate(self.solar, self.grid_export)
    }

    #[must_use]
    pub fn solar_offset(&self) -> Ratio {
        solar_offset(self.solar, self.grid_import)
    }
}

/// Number of rows in which the grid flowed in either direction on balance.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NetDirections {
    pub importing: usize,
    pub exporting: usize,
}

impl Table {
    /// Count the rows by the sign of `import − export`. Balanced rows and rows without any grid
    /// energy are not counted.
    #[must_use]
    pub fn net_directions(&self, roles: &Roles) -> NetDirections {
        let import = Column::energy(roles.grid_import.clone());
        let export = Column::energy(roles.grid_export.clone());
        let mut directions = NetDirections::default();
        for (_, row) in self.rows() {
            let net = row.get(&import).copied().unwrap_or_default()
                - row.get(&export).copied().unwrap_or_default();
            if net > 0.0 {
                directions.importing += 1;
            } else if net < 0.0 {
                directions.exporting += 1;
            }
        }
        directions
    }

    /// Self-consumption rate of every row that has any production.
    #[must_use]
    pub fn self_consumption(&self, roles: &Roles) -> Vec<(DateTime<Local>, Ratio)> {
        let export: BTreeMap<_, _> = self.energy(&roles.grid_export).collect();
        self.energy(&roles.solar)
            .map(|(timestamp, solar)| {
                let export = export.get(&timestamp).copied().unwrap_or_default();
                (timestamp, self_consumption_rate(solar, export))
            })
            .collect()
    }
}
