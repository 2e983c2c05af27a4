// Facet selection for a results page: stops, carrier, departure window,
// price range and sort order. One selection exists per active search.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::offer::TimeOfDay;

pub const DEFAULT_PRICE_CEILING: u32 = 1000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FacetError {
    #[error("Unknown stops filter: {0:?}")]
    UnknownStops(String),

    #[error("Unknown departure window: {0:?}")]
    UnknownDepartureWindow(String),

    #[error("Unknown sort key: {0:?}")]
    UnknownSortKey(String),

    #[error("Carrier {0:?} is not present in the current results")]
    UnavailableCarrier(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StopsFilter {
    #[default]
    Any,
    NonStop,
    OneStop,
    TwoOrMore,
}

impl StopsFilter {
    pub const ALL: [StopsFilter; 4] = [Self::Any, Self::NonStop, Self::OneStop, Self::TwoOrMore];

    pub fn accepts(&self, stops: usize) -> bool {
        match self {
            Self::Any => true,
            Self::NonStop => stops == 0,
            Self::OneStop => stops == 1,
            Self::TwoOrMore => stops >= 2,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Self::Any => "all",
            Self::NonStop => "0",
            Self::OneStop => "1",
            Self::TwoOrMore => "2+",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Any => "All",
            Self::NonStop => "Non-stop",
            Self::OneStop => "1 Stop",
            Self::TwoOrMore => "2+ Stops",
        }
    }
}

impl FromStr for StopsFilter {
    type Err = FacetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.token() == s)
            .ok_or_else(|| FacetError::UnknownStops(s.to_string()))
    }
}

impl fmt::Display for StopsFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CarrierFilter {
    #[default]
    Any,
    Only(String),
}

impl CarrierFilter {
    pub fn accepts(&self, carrier: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Only(name) => name == carrier,
        }
    }
}

impl fmt::Display for CarrierFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("all"),
            Self::Only(name) => f.write_str(name),
        }
    }
}

// Windows are half-open on the hour: morning [06, 12), afternoon [12, 18),
// evening [18, 22), night [22, 06) crossing midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DepartureWindow {
    #[default]
    Any,
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl DepartureWindow {
    pub const ALL: [DepartureWindow; 5] = [
        Self::Any,
        Self::Morning,
        Self::Afternoon,
        Self::Evening,
        Self::Night,
    ];

    pub fn contains_hour(&self, hour: u8) -> bool {
        match self {
            Self::Any => true,
            Self::Morning => (6..12).contains(&hour),
            Self::Afternoon => (12..18).contains(&hour),
            Self::Evening => (18..22).contains(&hour),
            Self::Night => hour >= 22 || hour < 6,
        }
    }

    pub fn contains(&self, time: TimeOfDay) -> bool {
        self.contains_hour(time.hour())
    }

    /// The single concrete window a departure time falls into.
    pub fn classify(time: TimeOfDay) -> DepartureWindow {
        [Self::Morning, Self::Afternoon, Self::Evening]
            .into_iter()
            .find(|w| w.contains(time))
            .unwrap_or(Self::Night)
    }

    pub fn token(&self) -> &'static str {
        match self {
            Self::Any => "all",
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
            Self::Night => "night",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Any => "All Times",
            Self::Morning => "Morning (6AM - 12PM)",
            Self::Afternoon => "Afternoon (12PM - 6PM)",
            Self::Evening => "Evening (6PM - 10PM)",
            Self::Night => "Night (10PM - 6AM)",
        }
    }
}

impl FromStr for DepartureWindow {
    type Err = FacetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|w| w.token() == s)
            .ok_or_else(|| FacetError::UnknownDepartureWindow(s.to_string()))
    }
}

impl fmt::Display for DepartureWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortKey {
    #[default]
    PriceAscending,
    PriceDescending,
    DurationAscending,
    DepartureAscending,
    ArrivalAscending,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        Self::PriceAscending,
        Self::PriceDescending,
        Self::DurationAscending,
        Self::DepartureAscending,
        Self::ArrivalAscending,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Self::PriceAscending => "price-asc",
            Self::PriceDescending => "price-desc",
            Self::DurationAscending => "duration-asc",
            Self::DepartureAscending => "departure-asc",
            Self::ArrivalAscending => "arrival-asc",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::PriceAscending => "Price: Lowest first",
            Self::PriceDescending => "Price: Highest first",
            Self::DurationAscending => "Duration: Shortest first",
            Self::DepartureAscending => "Departure: Earliest first",
            Self::ArrivalAscending => "Arrival: Earliest first",
        }
    }
}

impl FromStr for SortKey {
    type Err = FacetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.token() == s)
            .ok_or_else(|| FacetError::UnknownSortKey(s.to_string()))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Closed interval over discounted price. `low <= high <= ceiling` always holds.
///
/// Dragged bounds snap to the nearest multiple of `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPriceRange")]
pub struct PriceRange {
    low: u32,
    high: u32,
    ceiling: u32,
    step: u32,
}

// Deserialized ranges go back through `PriceRange::new`
#[derive(Deserialize)]
struct RawPriceRange {
    low: u32,
    high: u32,
    ceiling: u32,
    step: Option<u32>,
}

impl From<RawPriceRange> for PriceRange {
    fn from(raw: RawPriceRange) -> Self {
        PriceRange::new(raw.low, raw.high, raw.ceiling).with_step(raw.step.unwrap_or(1))
    }
}

impl PriceRange {
    pub fn full(ceiling: u32) -> Self {
        Self {
            low: 0,
            high: ceiling,
            ceiling,
            step: 1,
        }
    }

    // Builds a range, clamping both bounds into [0, ceiling] and the low bound under the high one
    pub fn new(low: u32, high: u32, ceiling: u32) -> Self {
        let high = high.min(ceiling);
        Self {
            low: low.min(high),
            high,
            ceiling,
            step: 1,
        }
    }

    pub fn with_step(mut self, step: u32) -> Self {
        self.step = step.max(1);
        self
    }

    pub fn low(&self) -> u32 {
        self.low
    }

    pub fn high(&self) -> u32 {
        self.high
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn set_low(&mut self, low: u32) {
        self.low = self.snap(low).min(self.high);
    }

    pub fn set_high(&mut self, high: u32) {
        self.high = self.snap(high).min(self.ceiling).max(self.low);
    }

    pub fn contains(&self, price: u32) -> bool {
        self.low <= price && price <= self.high
    }

    pub fn is_full(&self) -> bool {
        self.low == 0 && self.high == self.ceiling
    }

    // Nearest multiple of the step, halves rounding up
    fn snap(&self, value: u32) -> u32 {
        let step = u64::from(self.step);
        let snapped = (u64::from(value) + step / 2) / step * step;
        u32::try_from(snapped).unwrap_or(u32::MAX)
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self::full(DEFAULT_PRICE_CEILING)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FacetSelection {
    pub stops: StopsFilter,
    pub carrier: CarrierFilter,
    pub departure_window: DepartureWindow,
    pub price_range: PriceRange,
    pub sort: SortKey,
}

impl FacetSelection {
    pub fn new(price_ceiling: u32) -> Self {
        Self {
            price_range: PriceRange::full(price_ceiling),
            ..Default::default()
        }
    }

    pub fn with_price_step(mut self, step: u32) -> Self {
        self.price_range = self.price_range.with_step(step);
        self
    }

    // Back to defaults, sort included; the slider's ceiling and step are kept
    pub fn reset(&mut self) {
        let range = self.price_range;
        *self = Self::new(range.ceiling()).with_price_step(range.step());
    }

    // "Clear all filters" leaves the chosen sort order in place
    pub fn clear_filters(&mut self) {
        let sort = self.sort;
        self.reset();
        self.sort = sort;
    }

    pub fn set_price_low(&mut self, low: u32) {
        self.price_range.set_low(low);
    }

    pub fn set_price_high(&mut self, high: u32) {
        self.price_range.set_high(high);
    }

    pub fn select_carrier<S: AsRef<str>>(
        &mut self,
        carrier: &str,
        available: &[S],
    ) -> Result<(), FacetError> {
        if !available.iter().any(|c| c.as_ref() == carrier) {
            return Err(FacetError::UnavailableCarrier(carrier.to_string()));
        }
        self.carrier = CarrierFilter::Only(carrier.to_string());
        Ok(())
    }

    pub fn is_unfiltered(&self) -> bool {
        self.stops == StopsFilter::Any
            && self.carrier == CarrierFilter::Any
            && self.departure_window == DepartureWindow::Any
            && self.price_range.is_full()
    }
}
