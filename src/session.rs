// Results page state: one query, one read-only offer collection and one facet
// selection. The refined view is recomputed from these on every read.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    facets::{
        CarrierFilter, DepartureWindow, FacetError, FacetSelection, PriceRange, SortKey,
        StopsFilter,
    },
    offer::FlightOffer,
    query::SearchQuery,
    refine::{apply_facets, derive_available_carriers},
    source::{OfferSource, SourceError},
};

#[derive(Debug, Clone)]
pub struct SearchSession {
    query: SearchQuery,
    offers: Arc<[FlightOffer]>,
    carriers: Vec<String>,
    selection: FacetSelection,
}

impl SearchSession {
    pub fn from_offers(query: SearchQuery, offers: Arc<[FlightOffer]>, price_ceiling: u32) -> Self {
        let carriers = derive_available_carriers(&offers);
        Self {
            query,
            offers,
            carriers,
            selection: FacetSelection::new(price_ceiling),
        }
    }

    // Price slider drags snap to multiples of `step`
    pub fn with_price_step(mut self, step: u32) -> Self {
        self.selection = self.selection.with_price_step(step);
        self
    }

    pub async fn load<S>(source: &S, query: SearchQuery, price_ceiling: u32) -> Result<Self, SourceError>
    where
        S: OfferSource + ?Sized,
    {
        let offers: Arc<[FlightOffer]> = source.fetch(&query).await?.into();
        info!(
            origin = %query.origin,
            destination = %query.destination,
            offers = offers.len(),
            "search results loaded"
        );
        Ok(Self::from_offers(query, offers, price_ceiling))
    }

    /// A new search supersedes this one: offers, carriers and facets are all replaced.
    ///
    /// On error the session keeps its previous state.
    pub async fn replace_query<S>(&mut self, source: &S, query: SearchQuery) -> Result<(), SourceError>
    where
        S: OfferSource + ?Sized,
    {
        let range = self.selection.price_range;
        *self = Self::load(source, query, range.ceiling())
            .await?
            .with_price_step(range.step());
        Ok(())
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    pub fn offers(&self) -> &[FlightOffer] {
        &self.offers
    }

    pub fn available_carriers(&self) -> &[String] {
        &self.carriers
    }

    pub fn selection(&self) -> &FacetSelection {
        &self.selection
    }

    pub fn set_stops(&mut self, stops: StopsFilter) {
        debug!(%stops, "stops filter changed");
        self.selection.stops = stops;
    }

    pub fn set_carrier(&mut self, carrier: CarrierFilter) -> Result<(), FacetError> {
        match carrier {
            CarrierFilter::Any => self.selection.carrier = CarrierFilter::Any,
            CarrierFilter::Only(name) => self.selection.select_carrier(&name, &self.carriers)?,
        }
        debug!(carrier = %self.selection.carrier, "carrier filter changed");
        Ok(())
    }

    pub fn set_departure_window(&mut self, window: DepartureWindow) {
        debug!(%window, "departure window changed");
        self.selection.departure_window = window;
    }

    pub fn set_price_low(&mut self, low: u32) {
        self.selection.set_price_low(low);
        debug!(
            low = self.selection.price_range.low(),
            high = self.selection.price_range.high(),
            "price range changed"
        );
    }

    pub fn set_price_high(&mut self, high: u32) {
        self.selection.set_price_high(high);
        debug!(
            low = self.selection.price_range.low(),
            high = self.selection.price_range.high(),
            "price range changed"
        );
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        debug!(%sort, "sort changed");
        self.selection.sort = sort;
    }

    // Replaces the whole selection, e.g. one restored from URL parameters.
    // The price bounds are re-clamped against this session's slider.
    pub fn apply_selection(&mut self, selection: FacetSelection) -> Result<(), FacetError> {
        if let CarrierFilter::Only(name) = &selection.carrier {
            if !self.carriers.contains(name) {
                return Err(FacetError::UnavailableCarrier(name.clone()));
            }
        }

        let slider = self.selection.price_range;
        let requested = selection.price_range;
        self.selection = FacetSelection {
            price_range: PriceRange::new(requested.low(), requested.high(), slider.ceiling())
                .with_step(slider.step()),
            ..selection
        };
        debug!(
            low = self.selection.price_range.low(),
            high = self.selection.price_range.high(),
            "selection applied"
        );
        Ok(())
    }

    pub fn clear_filters(&mut self) {
        debug!("filters cleared");
        self.selection.clear_filters();
    }

    pub fn results(&self) -> Vec<&FlightOffer> {
        apply_facets(&self.offers, &self.selection)
    }

    pub fn is_empty_result(&self) -> bool {
        self.results().is_empty()
    }

    pub fn result_count_label(&self) -> String {
        match self.results().len() {
            1 => "1 flight found".to_string(),
            n => format!("{n} flights found"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{offer::fixtures::sample_offers, source::MockOfferSource};

    fn session() -> SearchSession {
        SearchSession::from_offers(SearchQuery::default(), sample_offers().into(), 1000)
    }

    fn prices(session: &SearchSession) -> Vec<u32> {
        session.results().iter().map(|o| o.discounted_price()).collect()
    }

    #[test]
    fn test_new_session_has_defaults() {
        let session = session();
        assert_eq!(session.selection(), &FacetSelection::new(1000));
        assert_eq!(session.available_carriers().len(), 5);
        assert_eq!(session.result_count_label(), "5 flights found");
        assert_eq!(prices(&session), vec![449, 479, 509, 519, 719]);
    }

    #[test]
    fn test_mutations_recompute_results() {
        let mut session = session();

        session.set_stops(StopsFilter::NonStop);
        assert_eq!(prices(&session), vec![479, 509, 519, 719]);

        session.set_departure_window(DepartureWindow::Evening);
        // 18:45, 20:30 and 21:15
        assert_eq!(prices(&session), vec![509, 519, 719]);

        session.set_price_high(600);
        assert_eq!(prices(&session), vec![509, 519]);

        session.set_sort(SortKey::PriceDescending);
        assert_eq!(prices(&session), vec![519, 509]);

        session
            .set_carrier(CarrierFilter::Only("Atlantic Connect".to_string()))
            .unwrap();
        assert_eq!(prices(&session), vec![509]);
        assert_eq!(session.result_count_label(), "1 flight found");

        session.set_price_low(510);
        assert!(session.is_empty_result());
        assert_eq!(session.result_count_label(), "0 flights found");

        session.clear_filters();
        assert_eq!(session.selection().sort, SortKey::PriceDescending);
        assert_eq!(prices(&session), vec![719, 519, 509, 479, 449]);
    }

    #[test]
    fn test_set_unknown_carrier_is_rejected() {
        let mut session = session();
        let err = session
            .set_carrier(CarrierFilter::Only("Nowhere Air".to_string()))
            .unwrap_err();
        assert_eq!(err, FacetError::UnavailableCarrier("Nowhere Air".to_string()));
        assert_eq!(session.selection().carrier, CarrierFilter::Any);

        session
            .set_carrier(CarrierFilter::Only("Luxury Air".to_string()))
            .unwrap();
        session.set_carrier(CarrierFilter::Any).unwrap();
        assert_eq!(session.results().len(), 5);
    }

    #[test]
    fn test_apply_selection() {
        let mut session = session();

        let selection = FacetSelection {
            price_range: PriceRange::new(0, 100, 1000),
            ..FacetSelection::new(1000)
        };
        session.apply_selection(selection).unwrap();
        assert!(session.is_empty_result());

        let bad = FacetSelection {
            carrier: CarrierFilter::Only("Nowhere Air".to_string()),
            ..FacetSelection::new(1000)
        };
        assert!(session.apply_selection(bad).is_err());
        assert!(session.is_empty_result());
    }

    #[test]
    fn test_apply_selection_reclamps_price_range() {
        let mut session = session().with_price_step(50);

        let mut json = serde_json::to_value(FacetSelection::new(1000)).unwrap();
        json["stops"] = serde_json::to_value(StopsFilter::NonStop).unwrap();
        json["price_range"] = serde_json::json!({"low": 900, "high": 100, "ceiling": 5000});
        let restored: FacetSelection = serde_json::from_value(json).unwrap();

        session.apply_selection(restored).unwrap();
        let range = session.selection().price_range;
        assert!(range.low() <= range.high());
        assert!(range.high() <= 1000);
        assert_eq!(range.ceiling(), 1000);
        assert_eq!(range.step(), 50);
        assert_eq!(session.selection().stops, StopsFilter::NonStop);

        let wide = FacetSelection {
            price_range: PriceRange::new(0, 5000, 5000),
            ..FacetSelection::new(5000)
        };
        session.apply_selection(wide).unwrap();
        assert_eq!(session.selection().price_range.high(), 1000);
        assert!(session.selection().price_range.is_full());
        assert_eq!(prices(&session), vec![449, 479, 509, 519, 719]);
    }

    #[test]
    fn test_price_step_snaps_slider() {
        let mut session = session().with_price_step(50);

        session.set_price_high(612);
        assert_eq!(session.selection().price_range.high(), 600);
        assert_eq!(prices(&session), vec![449, 479, 509, 519]);

        session.set_price_low(480);
        assert_eq!(session.selection().price_range.low(), 500);
        assert_eq!(prices(&session), vec![509, 519]);

        session.clear_filters();
        assert_eq!(session.selection().price_range.step(), 50);
        assert_eq!(session.results().len(), 5);
    }

    #[tokio::test]
    async fn test_load_and_replace_query() {
        let source = MockOfferSource::with_sample_catalogue().unwrap();
        let london = SearchQuery::from_params([("origin", "JFK"), ("destination", "London")]).unwrap();

        let mut session = SearchSession::load(&source, london, 1000).await.unwrap();
        assert_eq!(session.offers().len(), 4);
        assert!(!session
            .available_carriers()
            .contains(&"TransAtlantic Air".to_string()));

        session.set_stops(StopsFilter::OneStop);
        session.set_sort(SortKey::ArrivalAscending);

        let gatwick = SearchQuery::from_params([("origin", "JFK"), ("destination", "LGW")]).unwrap();
        session.replace_query(&source, gatwick.clone()).await.unwrap();

        assert_eq!(session.query(), &gatwick);
        assert_eq!(session.selection(), &FacetSelection::new(1000));
        assert_eq!(session.available_carriers(), ["Global Express".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_replace_keeps_previous_results() {
        let source = MockOfferSource::with_sample_catalogue().unwrap();
        let mut session = SearchSession::load(&source, SearchQuery::default(), 1000)
            .await
            .unwrap();
        session.set_stops(StopsFilter::NonStop);

        source.fail_next_requests(1);
        let result = session
            .replace_query(&source, SearchQuery::from_params([("origin", "EWR")]).unwrap())
            .await;

        assert!(result.is_err());
        assert_eq!(session.offers().len(), 5);
        assert_eq!(session.selection().stops, StopsFilter::NonStop);
    }
}
