// Flight offer data model
// Offers arrive wholesale from an offer source and are never mutated afterwards.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Providers publish a rounded percentage, so the computed discounted price may
// drift from the published one by a single unit.
pub const DISCOUNT_ROUNDING_TOLERANCE: u32 = 1;

// Longest flight time a provider may publish
pub const MAX_DURATION_HOURS: u32 = 99;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OfferError {
    #[error("Invalid time of day: {0:?} (expected zero-padded HH:MM)")]
    InvalidTime(String),

    #[error("Invalid duration: {0:?} (expected e.g. \"7h 15m\")")]
    InvalidDuration(String),

    #[error("Invalid discount percentage: {0}")]
    InvalidDiscount(u32),

    #[error("Offer {id}: discounted price {discounted} exceeds list price {list}")]
    DiscountAboveList { id: String, list: u32, discounted: u32 },

    #[error("Offer {id}: discounted price {discounted} does not match {percentage}% off {list}")]
    DiscountMismatch {
        id: String,
        list: u32,
        discounted: u32,
        percentage: u32,
    },
}

/// A wall-clock time of day, parsed from a zero-padded `HH:MM` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self, OfferError> {
        if hour > 23 || minute > 59 {
            return Err(OfferError::InvalidTime(format!("{hour}:{minute}")));
        }
        Ok(Self { hour, minute })
    }

    pub fn parse(s: &str) -> Result<Self, OfferError> {
        let invalid = || OfferError::InvalidTime(s.to_string());

        let (h, m) = s.split_once(':').ok_or_else(invalid)?;
        if h.len() != 2 || m.len() != 2 {
            return Err(invalid());
        }
        if !h.bytes().chain(m.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let hour = h.parse::<u8>().map_err(|_| invalid())?;
        let minute = m.parse::<u8>().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// The `HH:MM` text with the colon removed, read as an integer ("09:45" -> 945).
    ///
    /// Because every time is zero-padded this orders exactly like
    /// [`TimeOfDay::minute_of_day`].
    pub fn clock_value(&self) -> u16 {
        self.hour as u16 * 100 + self.minute as u16
    }

    pub fn minute_of_day(&self) -> u16 {
        self.hour as u16 * 60 + self.minute as u16
    }
}

impl FromStr for TimeOfDay {
    type Err = OfferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = OfferError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<TimeOfDay> for String {
    fn from(t: TimeOfDay) -> Self {
        t.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Total flight time as published by the provider, e.g. `7h 15m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FlightDuration {
    hours: u32,
    minutes: u32,
}

impl FlightDuration {
    pub fn new(hours: u32, minutes: u32) -> Result<Self, OfferError> {
        if hours > MAX_DURATION_HOURS || minutes > 59 {
            return Err(OfferError::InvalidDuration(format!("{hours}h {minutes}m")));
        }
        Ok(Self { hours, minutes })
    }

    pub fn parse(s: &str) -> Result<Self, OfferError> {
        let invalid = || OfferError::InvalidDuration(s.to_string());

        let mut hours = None;
        let mut minutes = None;

        for part in s.split_whitespace() {
            if let Some(h) = part.strip_suffix('h') {
                if hours.is_some() || minutes.is_some() {
                    return Err(invalid());
                }
                hours = Some(h.parse::<u32>().map_err(|_| invalid())?);
            } else if let Some(m) = part.strip_suffix('m') {
                if minutes.is_some() {
                    return Err(invalid());
                }
                minutes = Some(m.parse::<u32>().map_err(|_| invalid())?);
            } else {
                return Err(invalid());
            }
        }

        if hours.is_none() && minutes.is_none() {
            return Err(invalid());
        }

        Self::new(hours.unwrap_or(0), minutes.unwrap_or(0)).map_err(|_| invalid())
    }

    pub fn hours(&self) -> u32 {
        self.hours
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn total_minutes(&self) -> u32 {
        self.hours * 60 + self.minutes
    }
}

impl FromStr for FlightDuration {
    type Err = OfferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FlightDuration {
    type Error = OfferError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<FlightDuration> for String {
    fn from(d: FlightDuration) -> Self {
        d.to_string()
    }
}

impl fmt::Display for FlightDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {}m", self.hours, self.minutes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Carrier {
    pub name: String,
    pub flight_number: String,
    pub logo: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airport {
    pub city: String,
    pub code: String,
}

impl Airport {
    // Matches either the city name or the airport code, ignoring case
    pub fn matches(&self, needle: &str) -> bool {
        self.city.eq_ignore_ascii_case(needle) || self.code.eq_ignore_ascii_case(needle)
    }
}

impl fmt::Display for Airport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.city, self.code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Routing {
    pub origin: Airport,
    pub destination: Airport,
    // Empty means non-stop
    #[serde(default)]
    pub stop_locations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub departure_time: TimeOfDay,
    pub arrival_time: TimeOfDay,
    pub duration: FlightDuration,
    pub departure_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<NaiveDate>,
}

// Prices are whole currency units, per passenger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fare {
    pub price: u32,
    pub discounted_price: u32,
    pub discount_percentage: u32,
}

impl Fare {
    /// Builds a fare whose discounted price is `round(price * (1 - pct / 100))`.
    pub fn with_discount(price: u32, discount_percentage: u32) -> Result<Self, OfferError> {
        if discount_percentage > 100 {
            return Err(OfferError::InvalidDiscount(discount_percentage));
        }
        Ok(Self {
            price,
            discounted_price: discounted(price, discount_percentage),
            discount_percentage,
        })
    }

    pub fn savings(&self) -> u32 {
        self.price.saturating_sub(self.discounted_price)
    }
}

fn discounted(price: u32, discount_percentage: u32) -> u32 {
    (price as f64 * (1.0 - discount_percentage as f64 / 100.0)).round() as u32
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightOffer {
    pub id: String,
    pub carrier: Carrier,
    pub routing: Routing,
    pub schedule: Schedule,
    pub fare: Fare,
    pub seats_available: u32,
    pub cabin_class: String,
    pub aircraft: String,
}

impl FlightOffer {
    pub fn stops(&self) -> usize {
        self.routing.stop_locations.len()
    }

    pub fn is_non_stop(&self) -> bool {
        self.routing.stop_locations.is_empty()
    }

    pub fn carrier_name(&self) -> &str {
        &self.carrier.name
    }

    pub fn discounted_price(&self) -> u32 {
        self.fare.discounted_price
    }

    // Check the commercial invariants before an offer is handed to the engine
    pub fn validate(&self) -> Result<(), OfferError> {
        let Fare {
            price,
            discounted_price,
            discount_percentage,
        } = self.fare;

        if discount_percentage > 100 {
            return Err(OfferError::InvalidDiscount(discount_percentage));
        }

        if discounted_price > price {
            return Err(OfferError::DiscountAboveList {
                id: self.id.clone(),
                list: price,
                discounted: discounted_price,
            });
        }

        let expected = discounted(price, discount_percentage);
        if expected.abs_diff(discounted_price) > DISCOUNT_ROUNDING_TOLERANCE {
            return Err(OfferError::DiscountMismatch {
                id: self.id.clone(),
                list: price,
                discounted: discounted_price,
                percentage: discount_percentage,
            });
        }

        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_of_day_parse() {
        let t = TimeOfDay::parse("09:45").unwrap();
        assert_eq!(t.hour(), 9);
        assert_eq!(t.minute(), 45);
        assert_eq!(t.clock_value(), 945);
        assert_eq!(t.minute_of_day(), 585);
        assert_eq!(t.to_string(), "09:45");

        assert!(TimeOfDay::parse("9:45").is_err());
        assert!(TimeOfDay::parse("24:00").is_err());
        assert!(TimeOfDay::parse("12:60").is_err());
        assert!(TimeOfDay::parse("1200").is_err());
        assert!(TimeOfDay::parse("+1:00").is_err());
    }

    #[test]
    fn test_clock_value_orders_like_minutes() {
        let times = ["00:00", "05:59", "06:00", "09:05", "09:45", "10:00", "23:59"];
        let parsed: Vec<TimeOfDay> = times.iter().map(|t| t.parse().unwrap()).collect();

        for pair in parsed.windows(2) {
            assert!(pair[0].clock_value() < pair[1].clock_value());
            assert!(pair[0].minute_of_day() < pair[1].minute_of_day());
        }
    }

    #[test]
    fn test_duration_parse() {
        assert_eq!(FlightDuration::parse("7h 15m").unwrap().total_minutes(), 435);
        assert_eq!(FlightDuration::parse("7h").unwrap().total_minutes(), 420);
        assert_eq!(FlightDuration::parse("45m").unwrap().total_minutes(), 45);
        assert_eq!(FlightDuration::parse("7h 5m").unwrap().to_string(), "7h 5m");

        assert!(FlightDuration::parse("").is_err());
        assert!(FlightDuration::parse("7 hours").is_err());
        assert!(FlightDuration::parse("15m 7h").is_err());
    }

    #[test]
    fn test_duration_bounds() {
        assert_eq!(FlightDuration::parse("99h 59m").unwrap().total_minutes(), 5999);
        assert_eq!(
            FlightDuration::parse("80000000h 0m"),
            Err(OfferError::InvalidDuration("80000000h 0m".to_string()))
        );
        assert!(FlightDuration::parse("7h 75m").is_err());
        assert!(FlightDuration::parse("100h").is_err());
        assert!(FlightDuration::parse("90m").is_err());

        assert!(FlightDuration::new(99, 59).is_ok());
        assert!(FlightDuration::new(7, 60).is_err());
        assert!(FlightDuration::new(u32::MAX, 0).is_err());

        let json = crate::source::SAMPLE_FLIGHTS_JSON.replacen("7h 15m", "80000000h 0m", 1);
        assert!(serde_json::from_str::<Vec<FlightOffer>>(&json).is_err());
    }

    #[test]
    fn test_fare_with_discount() {
        let fare = Fare::with_discount(599, 20).unwrap();
        assert_eq!(fare.discounted_price, 479);
        assert_eq!(fare.savings(), 120);

        assert_eq!(Fare::with_discount(100, 0).unwrap().discounted_price, 100);
        assert_eq!(Fare::with_discount(100, 100).unwrap().discounted_price, 0);
        assert_eq!(
            Fare::with_discount(100, 101),
            Err(OfferError::InvalidDiscount(101))
        );
    }

    #[test]
    fn test_validate_offer() {
        let mut offer = fixtures::offer("x", "SkyJet Airways", "08:30", 0, 500);
        assert!(offer.validate().is_ok());

        offer.fare = Fare {
            price: 529,
            discounted_price: 449,
            discount_percentage: 15,
        };
        assert!(offer.validate().is_ok(), "one unit of rounding drift is allowed");

        offer.fare.discounted_price = 400;
        assert!(matches!(
            offer.validate(),
            Err(OfferError::DiscountMismatch { .. })
        ));

        offer.fare.discounted_price = 600;
        assert!(matches!(
            offer.validate(),
            Err(OfferError::DiscountAboveList { .. })
        ));
    }

    #[test]
    fn test_sample_offers_deserialize() {
        let offers = fixtures::sample_offers();
        assert_eq!(offers.len(), 5);

        let f2 = &offers[1];
        assert_eq!(f2.carrier.name, "Global Express");
        assert_eq!(f2.stops(), 1);
        assert!(!f2.is_non_stop());
        assert!(offers[0].is_non_stop());
        assert_eq!(f2.schedule.duration.total_minutes(), 435);
        assert_eq!(
            f2.schedule.return_date,
            NaiveDate::from_ymd_opt(2023, 11, 22)
        );

        for offer in &offers {
            assert!(offer.validate().is_ok(), "{} failed validation", offer.id);
        }
    }

    #[test]
    fn test_offer_json_shape() {
        let offer = fixtures::offer("x", "Luxury Air", "21:15", 0, 719);
        let json = serde_json::to_value(&offer).unwrap();

        assert_eq!(json["schedule"]["departureTime"], "21:15");
        assert_eq!(json["schedule"]["duration"], "7h 0m");
        assert_eq!(json["fare"]["discountedPrice"], 719);
        assert_eq!(json["seatsAvailable"], 9);
    }
}
