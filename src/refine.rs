// Result refinement: faceted filtering and stable sorting of flight offers.
// Everything here is a pure function of its inputs.

use std::collections::HashSet;

use tracing::trace;

use crate::{
    facets::{FacetSelection, SortKey},
    offer::FlightOffer,
};

/// Distinct carrier names in order of first appearance.
pub fn derive_available_carriers(offers: &[FlightOffer]) -> Vec<String> {
    let mut seen = HashSet::new();
    offers
        .iter()
        .map(FlightOffer::carrier_name)
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}

/// True when `offer` passes every active facet of `selection`.
pub fn matches(offer: &FlightOffer, selection: &FacetSelection) -> bool {
    let stops_ok = selection.stops.accepts(offer.stops());
    let carrier_ok = selection.carrier.accepts(offer.carrier_name());
    let window_ok = selection
        .departure_window
        .contains(offer.schedule.departure_time);
    let price_ok = selection.price_range.contains(offer.discounted_price());

    stops_ok && carrier_ok && window_ok && price_ok
}

/// Stable sort; offers with equal keys keep their relative input order.
pub fn sort_offers(offers: &mut [&FlightOffer], key: SortKey) {
    match key {
        SortKey::PriceAscending => offers.sort_by_key(|o| o.discounted_price()),
        SortKey::PriceDescending => {
            offers.sort_by(|a, b| b.discounted_price().cmp(&a.discounted_price()))
        }
        SortKey::DurationAscending => offers.sort_by_key(|o| o.schedule.duration.total_minutes()),
        SortKey::DepartureAscending => {
            offers.sort_by_key(|o| o.schedule.departure_time.clock_value())
        }
        SortKey::ArrivalAscending => offers.sort_by_key(|o| o.schedule.arrival_time.clock_value()),
    }
}

/// Filters `offers` by `selection` and orders the survivors by its sort key.
///
/// An empty result is a normal outcome.
pub fn apply_facets<'a>(offers: &'a [FlightOffer], selection: &FacetSelection) -> Vec<&'a FlightOffer> {
    let mut refined: Vec<&FlightOffer> = offers
        .iter()
        .filter(|offer| matches(offer, selection))
        .collect();

    sort_offers(&mut refined, selection.sort);

    trace!(
        total = offers.len(),
        kept = refined.len(),
        sort = %selection.sort,
        "applied facets"
    );

    refined
}
