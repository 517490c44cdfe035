//! [eGauge](https://www.egauge.net) power monitor client.

mod error;
mod schema;

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
    time::Duration,
};

use chrono::{DateTime, Local};
use itertools::Itertools;
use ureq::Agent;

pub use self::{
    error::{FetchError, ParseError},
    schema::{Schema, parse},
};
use crate::{core::granularity::Granularity, prelude::*};

/// Base URL of the device, without the trailing slash.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeviceUrl(String);

impl FromStr for DeviceUrl {
    type Err = Error;

    /// Accept either a full URL or a bare host, which is then reached over plain HTTP.
    fn from_str(url: &str) -> Result<Self> {
        let url = url.trim().trim_end_matches('/');
        ensure!(!url.is_empty(), "the device URL is empty");
        if url.starts_with("http://") || url.starts_with("https://") {
            Ok(Self(url.to_owned()))
        } else {
            ensure!(!url.contains("://"), "unsupported scheme in `{url}`");
            Ok(Self(format!("http://{url}")))
        }
    }
}

impl Display for DeviceUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Timeouts {
    /// Instant and totals readings are tiny.
    pub instant: Duration,

    pub historical: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { instant: Duration::from_secs(5), historical: Duration::from_secs(30) }
    }
}

/// Window of a historical query.
///
/// Without explicit bounds, the device returns the `count` most recent rows.
#[derive(Clone, Debug, bon::Builder)]
pub struct HistoricalQuery {
    pub granularity: Granularity,
    pub count: u32,

    /// Oldest moment of the window.
    pub from: Option<DateTime<Local>>,

    /// Newest moment of the window.
    pub to: Option<DateTime<Local>>,
}

impl HistoricalQuery {
    fn query_string(&self, now: DateTime<Local>) -> String {
        if self.granularity == Granularity::Month {
            // No native month unit, so ask for the counters at every month start:
            let until = self.to.unwrap_or(now);
            let boundaries = Granularity::month_boundaries(until, self.count)
                .into_iter()
                .filter(|boundary| self.from.is_none_or(|from| *boundary >= from))
                .map(|boundary| boundary.timestamp())
                .join(",");
            return format!("T={boundaries}");
        }
        let unit = match self.granularity {
            Granularity::Second => "S",
            Granularity::Minute => "m",
            Granularity::Hour => "h",
            Granularity::Day | Granularity::Month => "d",
        };
        // One more row, since `n` counters delimit `n − 1` intervals:
        let mut query = format!("{unit}&n={}", self.count.saturating_add(1));
        // The device walks backwards in time, from `f` down to `t`:
        if let Some(to) = self.to {
            query.push_str(&format!("&f={}", to.timestamp()));
        }
        if let Some(from) = self.from {
            query.push_str(&format!("&t={}", from.timestamp()));
        }
        query
    }
}

#[derive(Clone, Debug)]
pub enum Request {
    /// Present power and counters of every register.
    Instant,

    /// Counters only.
    Totals,

    Historical(HistoricalQuery),
}

impl Request {
    fn path(&self, now: DateTime<Local>) -> String {
        match self {
            Self::Instant => "/cgi-bin/egauge?inst".to_owned(),
            Self::Totals => "/cgi-bin/egauge?tot".to_owned(),
            Self::Historical(query) => format!("/cgi-bin/egauge-show?{}", query.query_string(now)),
        }
    }
}

impl Display for Request {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Instant => f.write_str("instant"),
            Self::Totals => f.write_str("totals"),
            Self::Historical(query) => write!(f, "{} × {}", query.count, query.granularity),
        }
    }
}

/// Raw response body.
#[must_use]
#[derive(Clone, Debug, derive_more::Constructor)]
pub struct Payload {
    pub body: String,
    pub received_at: DateTime<Local>,
}

/// Anything that answers device requests.
pub trait Device {
    fn fetch(&self, request: &Request) -> Result<Payload, FetchError>;
}

pub struct Client {
    url: DeviceUrl,
    instant: Agent,
    historical: Agent,
}

impl Client {
    pub fn new(url: DeviceUrl, timeouts: Timeouts) -> Self {
        Self { url, instant: agent(timeouts.instant), historical: agent(timeouts.historical) }
    }
}

fn agent(timeout: Duration) -> Agent {
    Agent::config_builder().timeout_global(Some(timeout)).build().into()
}

impl Device for Client {
    #[instrument(skip_all, fields(request = %request))]
    fn fetch(&self, request: &Request) -> Result<Payload, FetchError> {
        let url = format!("{}{}", self.url, request.path(Local::now()));
        let agent = match request {
            Request::Instant | Request::Totals => &self.instant,
            Request::Historical(_) => &self.historical,
        };
        debug!(%url, "fetching…");
        let body = agent
            .get(&url)
            .call()
            .and_then(|mut response| response.body_mut().read_to_string())
            .map_err(|error| FetchError::from_ureq(&url, error))?;
        debug!(n_bytes = body.len(), "fetched");
        Ok(Payload::new(body, Local::now()))
    }
}
