use chrono::{Local, TimeDelta};

use crate::{
    api::egauge::{Device, HistoricalQuery, Request, parse},
    core::{
        granularity::Granularity,
        reading::{Reading, ValueKind},
    },
    prelude::*,
};

/// How the fallback path polls the instant endpoint when a historical query is unusable.
#[derive(Copy, Clone, Debug)]
pub struct FallbackSampling {
    /// Simulated backward time between two samples.
    pub cadence: TimeDelta,

    pub max_samples: u32,
}

impl Default for FallbackSampling {
    fn default() -> Self {
        Self { cadence: TimeDelta::hours(6), max_samples: 1460 }
    }
}

impl FallbackSampling {
    /// Number of samples to cover the window, capped.
    fn n_samples(&self, query: &HistoricalQuery) -> u32 {
        let span = match (query.from, query.to) {
            (Some(from), Some(to)) => to - from,
            _ => i32::try_from(query.count)
                .ok()
                .and_then(|count| query.granularity.nominal_duration().checked_mul(count))
                .unwrap_or(TimeDelta::MAX),
        };
        span.num_seconds()
            .checked_div(self.cadence.num_seconds())
            .and_then(|n_samples| u32::try_from(n_samples).ok())
            .unwrap_or(0)
            .min(self.max_samples)
    }
}

/// Which path produced the readings.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The historical query succeeded.
    Primary,

    /// The historical query failed, and the instant samples were used instead.
    Fallback,

    /// Nothing usable could be obtained.
    Failed,
}

#[must_use]
pub struct Collection {
    pub outcome: Outcome,
    pub readings: Vec<Reading>,
}

impl Collection {
    const fn failed() -> Self {
        Self { outcome: Outcome::Failed, readings: Vec::new() }
    }
}

pub struct Collector<'a, D> {
    device: &'a D,
    fallback: FallbackSampling,
}

impl<'a, D: Device> Collector<'a, D> {
    pub const fn new(device: &'a D, fallback: FallbackSampling) -> Self {
        Self { device, fallback }
    }

    /// Fetch the historical window, falling back to instant sampling on any failure.
    ///
    /// Never fails: an unreachable device results in an empty [`Outcome::Failed`] collection.
    #[instrument(skip_all, fields(granularity = %query.granularity, count = query.count))]
    pub fn collect(&self, query: &HistoricalQuery) -> Collection {
        match self.fetch_historical(query) {
            Ok(readings) => {
                info!(n_readings = readings.len(), "fetched the history");
                Collection { outcome: Outcome::Primary, readings }
            }
            Err(error) => {
                warn!("historical query failed, falling back to instant sampling: {error:#}");
                self.sample(query)
            }
        }
    }

    /// Current power of every register. Counters are left out, as a single sample of a
    /// counter carries no energy.
    #[instrument(skip_all)]
    pub fn instant(&self) -> Result<Vec<Reading>> {
        let mut readings = parse(&self.device.fetch(&Request::Instant)?, Granularity::Second)?;
        readings.retain(|reading| reading.kind == ValueKind::InstantPower);
        Ok(readings)
    }

    /// Lifetime counters of every register.
    #[instrument(skip_all)]
    pub fn totals(&self) -> Result<Vec<Reading>> {
        let mut readings = parse(&self.device.fetch(&Request::Totals)?, Granularity::Second)?;
        readings.retain(|reading| reading.kind == ValueKind::CumulativeEnergy);
        Ok(readings)
    }

    fn fetch_historical(&self, query: &HistoricalQuery) -> Result<Vec<Reading>> {
        let payload = self.device.fetch(&Request::Historical(query.clone()))?;
        Ok(parse(&payload, query.granularity)?)
    }

    /// Poll the instant endpoint and stamp the samples backwards from the window end.
    ///
    /// The samples are taken right now, so the re-stamped counters would be meaningless:
    /// only the power readings are kept.
    fn sample(&self, query: &HistoricalQuery) -> Collection {
        let n_samples = self.fallback.n_samples(query);
        let anchor = query.to.unwrap_or_else(Local::now);
        info!(n_samples, cadence = ?self.fallback.cadence, "sampling…");

        let mut readings = Vec::new();
        let mut n_failed: u32 = 0;
        for (index, offset) in (0..n_samples).zip(0..) {
            let Some(timestamp) =
                self.fallback.cadence.checked_mul(offset).and_then(|back| anchor.checked_sub_signed(back))
            else {
                break;
            };
            match self.instant() {
                Ok(sample) => readings.extend(
                    sample.into_iter().map(|reading| Reading { timestamp, ..reading }),
                ),
                Err(error) => {
                    debug!(index, "sample failed: {error:#}");
                    n_failed += 1;
                }
            }
        }

        if readings.is_empty() {
            error!(n_failed, "the fallback produced no readings");
            return Collection::failed();
        }
        info!(n_readings = readings.len(), n_failed, "sampled");
        Collection { outcome: Outcome::Fallback, readings }
    }
}
