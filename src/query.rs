// Search query context, read from the key/value parameters the search form submits

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::facets::{CarrierFilter, DepartureWindow, FacetError, FacetSelection, StopsFilter};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid date for {field}: {value:?}")]
    InvalidDate { field: &'static str, value: String },

    #[error("Invalid passenger count: {0:?}")]
    InvalidPassengers(String),

    #[error("Unknown trip type: {0:?}")]
    UnknownTripType(String),

    #[error("Invalid price for {field}: {value:?}")]
    InvalidPrice { field: &'static str, value: String },

    #[error("Return date {return_date} is before departure {depart_date}")]
    ReturnBeforeDeparture {
        depart_date: NaiveDate,
        return_date: NaiveDate,
    },

    #[error(transparent)]
    Facet(#[from] FacetError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TripType {
    #[default]
    RoundTrip,
    OneWay,
}

impl FromStr for TripType {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "roundtrip" => Ok(Self::RoundTrip),
            "oneway" => Ok(Self::OneWay),
            other => Err(QueryError::UnknownTripType(other.to_string())),
        }
    }
}

impl fmt::Display for TripType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoundTrip => f.write_str("Round Trip"),
            Self::OneWay => f.write_str("One Way"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub origin: String,
    pub destination: String,
    pub depart_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub passengers: u32,
    pub trip_type: TripType,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            origin: String::new(),
            destination: String::new(),
            depart_date: None,
            return_date: None,
            passengers: 1,
            trip_type: TripType::RoundTrip,
        }
    }
}

// Accepts a plain date or a full RFC 3339 timestamp (the form submits ISO strings)
fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, QueryError> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.date_naive())
        .map_err(|_| QueryError::InvalidDate {
            field,
            value: value.to_string(),
        })
}

fn parse_price(field: &'static str, value: &str) -> Result<u32, QueryError> {
    value.parse::<u32>().map_err(|_| QueryError::InvalidPrice {
        field,
        value: value.to_string(),
    })
}

impl SearchQuery {
    /// Builds a query from form parameters. Unknown keys are ignored and empty
    /// values count as absent.
    pub fn from_params<'a, I>(params: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut query = SearchQuery::default();

        for (key, value) in params {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key {
                "origin" => query.origin = value.to_string(),
                "destination" => query.destination = value.to_string(),
                "departDate" => query.depart_date = Some(parse_date("departDate", value)?),
                "returnDate" => query.return_date = Some(parse_date("returnDate", value)?),
                "passengers" => {
                    query.passengers = value
                        .parse::<u32>()
                        .ok()
                        .filter(|p| *p >= 1)
                        .ok_or_else(|| QueryError::InvalidPassengers(value.to_string()))?;
                }
                "flightType" => query.trip_type = value.parse()?,
                _ => {}
            }
        }

        if query.trip_type == TripType::OneWay {
            query.return_date = None;
        }

        if let (Some(depart_date), Some(return_date)) = (query.depart_date, query.return_date) {
            if return_date < depart_date {
                return Err(QueryError::ReturnBeforeDeparture {
                    depart_date,
                    return_date,
                });
            }
        }

        Ok(query)
    }

    pub fn headline(&self) -> String {
        let or = |s: &str, fallback: &str| {
            if s.is_empty() {
                fallback.to_string()
            } else {
                s.to_string()
            }
        };
        format!(
            "Flights from {} to {}",
            or(&self.origin, "Origin"),
            or(&self.destination, "Destination")
        )
    }

    // e.g. "Wed, Nov 15, 2023 - Wed, Nov 22, 2023 | 2 Passengers | Round Trip"
    pub fn summary(&self) -> String {
        let date = |d: Option<NaiveDate>| match d {
            Some(d) => d.format("%a, %b %-d, %Y").to_string(),
            None => "N/A".to_string(),
        };

        let mut dates = date(self.depart_date);
        if self.return_date.is_some() {
            dates.push_str(" - ");
            dates.push_str(&date(self.return_date));
        }

        let noun = if self.passengers == 1 {
            "Passenger"
        } else {
            "Passengers"
        };

        format!(
            "{} | {} {} | {}",
            dates, self.passengers, noun, self.trip_type
        )
    }
}

/// Reads facet parameters (`stops`, `airline`, `departureTime`, `sort`,
/// `minPrice`, `maxPrice`) into a selection with the given slider ceiling.
///
/// The carrier is taken as-is; callers holding a result set should validate it
/// with [`FacetSelection::select_carrier`].
pub fn facets_from_params<'a, I>(params: I, price_ceiling: u32) -> Result<FacetSelection, QueryError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut selection = FacetSelection::new(price_ceiling);
    let mut min_price = None;
    let mut max_price = None;

    for (key, value) in params {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key {
            "stops" => selection.stops = value.parse::<StopsFilter>()?,
            "airline" => {
                selection.carrier = match value {
                    "all" => CarrierFilter::Any,
                    name => CarrierFilter::Only(name.to_string()),
                }
            }
            "departureTime" => selection.departure_window = value.parse::<DepartureWindow>()?,
            "sort" => selection.sort = value.parse()?,
            "minPrice" => min_price = Some(parse_price("minPrice", value)?),
            "maxPrice" => max_price = Some(parse_price("maxPrice", value)?),
            _ => {}
        }
    }

    // High first so the low bound clamps against the final ceiling
    if let Some(high) = max_price {
        selection.set_price_high(high);
    }
    if let Some(low) = min_price {
        selection.set_price_low(low);
    }

    Ok(selection)
}
