use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use crate::delay::RandomDelay;
use crate::error::{Error, Result};

/// Parameters of a run, defaulting to the reference session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Number of slots in the queue.
    pub capacity: usize,
    /// Number of items produced and consumed.
    pub items: u64,
    pub warmup: Duration,
    pub arrival: RangeInclusive<Duration>,
    pub processing: Duration,
    /// Seed for payload choice and delays; random when unset.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 5,
            items: 10,
            warmup: Duration::from_secs(2),
            arrival: Duration::from_secs(2)..=Duration::from_secs(7),
            processing: Duration::from_secs(8),
            seed: None,
        }
    }
}

impl Config {
    /// Reads overrides from `SEMQ_*` environment variables on top of the
    /// defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        let get = |var: &'static str| lookup(var).map(|v| (var, v));

        if let Some((var, v)) = get("SEMQ_CAPACITY") {
            config.capacity = parse(var, &v)?;
        }
        if let Some((var, v)) = get("SEMQ_ITEMS") {
            config.items = parse(var, &v)?;
        }
        if let Some((var, v)) = get("SEMQ_WARMUP_MS") {
            config.warmup = Duration::from_millis(parse(var, &v)?);
        }
        if let Some((var, v)) = get("SEMQ_ARRIVAL_MS") {
            config.arrival = parse_range(var, &v)?;
        }
        if let Some((var, v)) = get("SEMQ_PROCESSING_MS") {
            config.processing = Duration::from_millis(parse(var, &v)?);
        }
        if let Some((var, v)) = get("SEMQ_SEED") {
            config.seed = Some(parse(var, &v)?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::InvalidCapacity(0));
        }
        if self.items == 0 {
            return Err(invalid("SEMQ_ITEMS", "must be positive"));
        }
        if self.arrival.is_empty() {
            return Err(invalid("SEMQ_ARRIVAL_MS", "range must not be inverted"));
        }
        Ok(())
    }

    pub fn rng(&self) -> fastrand::Rng {
        self.seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed)
    }

    /// Delay strategy reproducing the configured timings.
    pub fn delay(&self, rng: fastrand::Rng) -> RandomDelay {
        RandomDelay::new(rng, self.warmup, self.arrival.clone(), self.processing)
    }
}

fn invalid(var: &'static str, reason: impl Into<String>) -> Error {
    Error::InvalidConfig {
        var,
        reason: reason.into(),
    }
}

fn parse<T>(var: &'static str, s: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    s.trim()
        .parse()
        .map_err(|e| invalid(var, format!("{e}, value={s:?}")))
}

/// Parses `lo..hi` (exclusive) or `lo..=hi` in milliseconds.
fn parse_range(var: &'static str, s: &str) -> Result<RangeInclusive<Duration>> {
    let (lo, hi, inclusive) = if let Some((lo, hi)) = s.split_once("..=") {
        (lo, hi, true)
    } else if let Some((lo, hi)) = s.split_once("..") {
        (lo, hi, false)
    } else {
        return Err(invalid(var, format!("expected `lo..hi` or `lo..=hi`, value={s:?}")));
    };
    let lo = parse::<u64>(var, lo)?;
    let mut hi = parse::<u64>(var, hi)?;
    if !inclusive {
        hi = hi
            .checked_sub(1)
            .filter(|&hi| hi >= lo)
            .ok_or_else(|| invalid(var, "range must not be empty"))?;
    }
    Ok(Duration::from_millis(lo)..=Duration::from_millis(hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|&(k, v)| (k.to_owned(), v.to_owned()))
            .collect::<HashMap<_, _>>();
        move |var: &str| vars.get(var).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!((config.capacity, config.items), (5, 10));
    }

    #[test]
    fn overrides() {
        let config = Config::from_lookup(lookup(&[
            ("SEMQ_CAPACITY", "1"),
            ("SEMQ_ITEMS", " 30 "),
            ("SEMQ_WARMUP_MS", "0"),
            ("SEMQ_ARRIVAL_MS", "10..20"),
            ("SEMQ_PROCESSING_MS", "5"),
            ("SEMQ_SEED", "99"),
        ]))
        .unwrap();
        assert_eq!(config, Config {
            capacity: 1,
            items: 30,
            warmup: Duration::ZERO,
            arrival: Duration::from_millis(10)..=Duration::from_millis(19),
            processing: Duration::from_millis(5),
            seed: Some(99),
        });

        let config = Config::from_lookup(lookup(&[("SEMQ_ARRIVAL_MS", "0..=0")])).unwrap();
        assert_eq!(config.arrival, Duration::ZERO..=Duration::ZERO);
    }

    #[test]
    fn rejects_malformed() {
        for (var, value) in [
            ("SEMQ_ITEMS", "ten"),
            ("SEMQ_ITEMS", "0"),
            ("SEMQ_ARRIVAL_MS", "5"),
            ("SEMQ_ARRIVAL_MS", "5..5"),
            ("SEMQ_ARRIVAL_MS", "9..=3"),
            ("SEMQ_SEED", "-1"),
        ] {
            let err = Config::from_lookup(lookup(&[(var, value)])).unwrap_err();
            assert!(
                matches!(err, Error::InvalidConfig { var: v, .. } if v == var),
                "{var}={value}: {err}"
            );
        }
        assert!(matches!(
            Config::from_lookup(lookup(&[("SEMQ_CAPACITY", "0")])),
            Err(Error::InvalidCapacity(0))
        ));
    }
}
