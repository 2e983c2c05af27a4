// Flight search results: offer model, facet selection and the refinement engine
// that turns a raw offer collection into the ordered view a results page shows.

pub mod cache;
pub mod config;
pub mod facets;
pub mod offer;
pub mod query;
pub mod refine;
pub mod session;
pub mod source;

// Re-export key types for convenience
pub use cache::{CacheConfig, CacheStats, OfferCache, TtlOfferCache};
pub use config::SearchConfig;
pub use facets::{
    CarrierFilter, DepartureWindow, FacetError, FacetSelection, PriceRange, SortKey, StopsFilter,
};
pub use offer::{FlightDuration, FlightOffer, OfferError, TimeOfDay};
pub use query::{facets_from_params, QueryError, SearchQuery, TripType};
pub use refine::{apply_facets, derive_available_carriers};
pub use session::SearchSession;
pub use source::{CachedOfferSource, MockOfferSource, OfferSource, SourceError};
