//! Endpoint weighting.
//!
//! An [`Endpoints`] table is built once from an ordered list of [`EndpointSpec`]s. Every
//! endpoint owns the half-open range `[lower, upper)` of the cumulative weights, so any draw in
//! `[0, 100)` maps to exactly one endpoint.
use crate::{ConfigError, WEIGHTED_MIX, WEIGHT_EPSILON, WEIGHT_TOTAL};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A target url and its share of the traffic, in percent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EndpointSpec {
    pub url: String,
    pub weight: f64,
}

impl EndpointSpec {
    pub fn new(url: impl Into<String>, weight: f64) -> Self {
        Self {
            url: url.into(),
            weight,
        }
    }
}

/// Check that `specs` is non-empty and that its weights are valid and sum to ~100.
pub fn validate_weights(specs: &[EndpointSpec]) -> Result<(), ConfigError> {
    if specs.is_empty() {
        return Err(ConfigError::Empty);
    }

    if let Some(spec) = specs
        .iter()
        .find(|spec| !spec.weight.is_finite() || spec.weight < 0.)
    {
        return Err(ConfigError::InvalidWeight {
            url: spec.url.clone(),
            weight: spec.weight,
        });
    }

    let sum: f64 = specs.iter().map(|spec| spec.weight).sum();
    if (sum - WEIGHT_TOTAL).abs() > WEIGHT_EPSILON {
        return Err(ConfigError::WeightSum(sum));
    }

    Ok(())
}

/// Draw a uniform value in `[0, 100)`.
pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(0.0..WEIGHT_TOTAL)
}

#[derive(Clone, Debug)]
struct Entry {
    url: String,
    weight: f64,
    upper: f64,
}

/// Immutable cumulative weight table. Never empty.
#[derive(Clone, Debug)]
pub struct Endpoints {
    entries: Vec<Entry>,
}

impl Endpoints {
    /// Validate `specs` and build the table. The last endpoint owns every draw up to 100, even
    /// when its own weight is zero and the weights sum to slightly less than 100.
    pub fn new(specs: &[EndpointSpec]) -> Result<Self, ConfigError> {
        validate_weights(specs)?;

        let mut upper = 0.;
        let mut entries = Vec::with_capacity(specs.len());
        for spec in specs {
            url::Url::parse(&spec.url).map_err(|source| ConfigError::InvalidUrl {
                url: spec.url.clone(),
                source,
            })?;

            upper += spec.weight;
            entries.push(Entry {
                url: spec.url.clone(),
                weight: spec.weight,
                upper,
            });
        }

        // NOTE: The last endpoint absorbs whatever rounding left between the sum and 100.
        if let Some(last) = entries.last_mut() {
            last.upper = WEIGHT_TOTAL;
        }

        Ok(Self { entries })
    }

    /// Index of the endpoint owning `draw`. Draws at or beyond 100 land on the last endpoint.
    pub fn position(&self, draw: f64) -> usize {
        self.entries
            .iter()
            .position(|entry| draw < entry.upper)
            .unwrap_or(self.entries.len() - 1)
    }

    pub fn select(&self, draw: f64) -> &str {
        self.url(self.position(draw))
    }

    pub fn pick_index<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.position(draw(rng))
    }

    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        self.url(self.pick_index(rng))
    }

    /// # Panics
    ///
    /// If `idx` is out of bounds.
    pub fn url(&self, idx: usize) -> &str {
        &self.entries[idx].url
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.url.as_str())
    }

    pub fn specs(&self) -> Vec<EndpointSpec> {
        self.entries
            .iter()
            .map(|entry| EndpointSpec::new(entry.url.clone(), entry.weight))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Endpoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for entry in &self.entries {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{}={:.1}%", entry.url, entry.weight)?;
        }
        Ok(())
    }
}

/// How traffic is split across the endpoints.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficMix {
    /// Every endpoint receives the same share.
    #[default]
    Uniform,
    /// Explicit per-endpoint weights, in endpoint order.
    Weighted(Vec<f64>),
}

impl TrafficMix {
    /// The 60/25/15 simple/I/O/compute split.
    pub fn weighted() -> Self {
        Self::Weighted(WEIGHTED_MIX.to_vec())
    }

    pub fn weights(&self, count: usize) -> Result<Vec<f64>, ConfigError> {
        if count == 0 {
            return Err(ConfigError::Empty);
        }

        match self {
            TrafficMix::Uniform => {
                let share = WEIGHT_TOTAL / count as f64;
                let mut weights = vec![share; count];
                weights[count - 1] = WEIGHT_TOTAL - share * (count - 1) as f64;
                Ok(weights)
            }
            TrafficMix::Weighted(weights) if weights.len() == count => Ok(weights.clone()),
            TrafficMix::Weighted(weights) => Err(ConfigError::WeightCount {
                expected: count,
                found: weights.len(),
            }),
        }
    }

    pub fn specs<S: AsRef<str>>(&self, urls: &[S]) -> Result<Vec<EndpointSpec>, ConfigError> {
        let weights = self.weights(urls.len())?;
        Ok(urls
            .iter()
            .zip(weights)
            .map(|(url, weight)| EndpointSpec::new(url.as_ref(), weight))
            .collect())
    }

    pub fn endpoints<S: AsRef<str>>(&self, urls: &[S]) -> Result<Endpoints, ConfigError> {
        Endpoints::new(&self.specs(urls)?)
    }
}

impl FromStr for TrafficMix {
    type Err = ConfigError;

    /// Accepts `uniform`, `weighted`, or a comma separated list of weights such as `50,30,20`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uniform" => Ok(TrafficMix::Uniform),
            "weighted" => Ok(TrafficMix::weighted()),
            list => list
                .split(',')
                .map(|w| w.trim().parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map(TrafficMix::Weighted)
                .map_err(|_| ConfigError::UnknownMix(s.to_string())),
        }
    }
}

impl fmt::Display for TrafficMix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrafficMix::Uniform => write!(f, "uniform"),
            TrafficMix::Weighted(weights) => {
                let weights: Vec<String> = weights.iter().map(|w| w.to_string()).collect();
                write!(f, "weighted({})", weights.join(","))
            }
        }
    }
}
