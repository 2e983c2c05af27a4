// Offer sources: where a results page gets its flight offers from

use std::{
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    cache::OfferCache,
    offer::{FlightOffer, OfferError},
    query::SearchQuery,
};

// The five-offer New York to London catalogue shipped with the crate
pub const SAMPLE_FLIGHTS_JSON: &str = include_str!("../samples/flights.json");
pub const SAMPLE_FLIGHTS_PATH: &str = "samples/flights.json";

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Catalogue parse error: {0}")]
    CatalogueParse(#[from] serde_json::Error),

    #[error("Invalid offer in catalogue: {0}")]
    InvalidOffer(#[from] OfferError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Offer source unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait OfferSource: Send + Sync + 'static {
    // Full, unpaginated offer collection for a query
    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<FlightOffer>, SourceError>;
}

/// Parses and validates an offer catalogue in the provider's JSON shape.
pub fn parse_catalogue(json: &str) -> Result<Vec<FlightOffer>, SourceError> {
    let offers: Vec<FlightOffer> = serde_json::from_str(json)?;
    for offer in &offers {
        offer.validate()?;
    }
    Ok(offers)
}

// In-memory supplier stand-in with configurable latency and failure injection
pub struct MockOfferSource {
    catalogue: Vec<FlightOffer>,
    latency_ms: AtomicU64,
    fail_next_requests: AtomicUsize,
    request_count: AtomicUsize,
}

impl MockOfferSource {
    pub fn new(catalogue: Vec<FlightOffer>) -> Self {
        Self {
            catalogue,
            latency_ms: AtomicU64::new(0),
            fail_next_requests: AtomicUsize::new(0),
            request_count: AtomicUsize::new(0),
        }
    }

    pub fn with_sample_catalogue() -> Result<Self, SourceError> {
        Ok(Self::new(parse_catalogue(SAMPLE_FLIGHTS_JSON)?))
    }

    pub fn from_file(path: &str) -> Result<Self, SourceError> {
        let json = std::fs::read_to_string(path)?;
        Ok(Self::new(parse_catalogue(&json)?))
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn fail_next_requests(&self, count: usize) {
        self.fail_next_requests.store(count, Ordering::SeqCst);
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    fn route_matches(offer: &FlightOffer, query: &SearchQuery) -> bool {
        let origin_ok =
            query.origin.is_empty() || offer.routing.origin.matches(&query.origin);
        let destination_ok =
            query.destination.is_empty() || offer.routing.destination.matches(&query.destination);
        origin_ok && destination_ok
    }
}

#[async_trait]
impl OfferSource for MockOfferSource {
    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<FlightOffer>, SourceError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);

        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            // Up to 10% jitter
            let jitter = rand::random::<u64>() % (latency / 10 + 1);
            tokio::time::sleep(Duration::from_millis(latency + jitter)).await;
        }

        // Each injected failure is consumed by exactly one request
        if let Ok(previous) =
            self.fail_next_requests
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        {
            warn!(remaining = previous - 1, "injected offer source failure");
            return Err(SourceError::Unavailable(
                "supplier returned 503".to_string(),
            ));
        }

        let offers: Vec<FlightOffer> = self
            .catalogue
            .iter()
            .filter(|offer| Self::route_matches(offer, query))
            .cloned()
            .collect();

        debug!(
            origin = %query.origin,
            destination = %query.destination,
            offers = offers.len(),
            "fetched offers"
        );

        Ok(offers)
    }
}

/// Wraps a source with an [`OfferCache`]; only successful fetches are cached.
pub struct CachedOfferSource<S, C> {
    inner: S,
    cache: C,
}

impl<S: OfferSource, C: OfferCache> CachedOfferSource<S, C> {
    pub fn new(inner: S, cache: C) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub async fn fetch_shared(&self, query: &SearchQuery) -> Result<Arc<[FlightOffer]>, SourceError> {
        if let Some(offers) = self.cache.get(query) {
            debug!(origin = %query.origin, destination = %query.destination, "offer cache hit");
            return Ok(offers);
        }

        let offers: Arc<[FlightOffer]> = self.inner.fetch(query).await?.into();
        self.cache.store(query, offers.clone(), None);
        Ok(offers)
    }

    // Warm the cache ahead of expected searches; returns how many were loaded
    pub async fn prefetch(&self, queries: &[SearchQuery]) -> usize {
        let results = join_all(queries.iter().map(|q| self.fetch_shared(q))).await;

        let loaded = results.iter().filter(|r| r.is_ok()).count();
        info!(requested = queries.len(), loaded, "prefetched offer collections");
        loaded
    }
}

#[async_trait]
impl<S: OfferSource, C: OfferCache> OfferSource for CachedOfferSource<S, C> {
    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<FlightOffer>, SourceError> {
        Ok(self.fetch_shared(query).await?.to_vec())
    }
}
