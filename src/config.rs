// Runtime configuration for the search results page

use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::{cache::CacheConfig, facets::DEFAULT_PRICE_CEILING};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    // Price slider upper bound; also the default high end of the price range
    pub price_ceiling: u32,
    // Increment the price slider snaps to
    pub price_step: u32,
    // Artificial supplier latency applied by the mock offer source
    pub simulated_latency: Duration,
    pub cache_ttl: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            price_ceiling: DEFAULT_PRICE_CEILING,
            price_step: 50,
            simulated_latency: Duration::from_millis(1000),
            cache_ttl: Duration::from_secs(300),
        }
    }
}

impl SearchConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            price_ceiling: try_load("TRAVEL_PRICE_CEILING", defaults.price_ceiling),
            price_step: try_load("TRAVEL_PRICE_STEP", defaults.price_step),
            simulated_latency: Duration::from_millis(try_load(
                "TRAVEL_SIMULATED_LATENCY_MS",
                defaults.simulated_latency.as_millis() as u64,
            )),
            cache_ttl: Duration::from_secs(try_load(
                "TRAVEL_CACHE_TTL_SECONDS",
                defaults.cache_ttl.as_secs(),
            )),
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            default_ttl: self.cache_ttl,
        }
    }
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}, using default {default}");
            default
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}
