use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use travel_ease_search::{
    facets_from_params, CachedOfferSource, MockOfferSource, SearchConfig, SearchQuery,
    SearchSession, TtlOfferCache,
};

// Usage: travel-search origin=JFK destination=London stops=0 sort=price-asc ...
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "travel_ease_search=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let params = args
        .iter()
        .map(|arg| {
            arg.split_once('=')
                .with_context(|| format!("expected key=value, got {arg:?}"))
        })
        .collect::<anyhow::Result<Vec<(&str, &str)>>>()?;

    let config = SearchConfig::from_env();
    let query = SearchQuery::from_params(params.iter().copied())?;
    let selection = facets_from_params(params.iter().copied(), config.price_ceiling)?;

    let mock = MockOfferSource::with_sample_catalogue()?;
    mock.set_latency(config.simulated_latency);
    let source = CachedOfferSource::new(mock, TtlOfferCache::new(config.cache_config()));

    let mut session = SearchSession::load(&source, query, config.price_ceiling)
        .await?
        .with_price_step(config.price_step);
    session
        .apply_selection(selection)
        .context("facet parameters do not fit the results")?;

    println!("{}", session.query().headline());
    println!("{}", session.query().summary());
    println!("Airlines: all, {}", session.available_carriers().join(", "));
    println!(
        "{} (sorted by {})",
        session.result_count_label(),
        session.selection().sort.label()
    );

    if session.is_empty_result() {
        println!("No flights found. Try adjusting your filters or search criteria.");
        return Ok(());
    }

    for offer in session.results() {
        println!(
            "{:<18} {:<7} {} -> {} {:>7} {:>9} ${:>4} (was ${}, save {}%) {} seats",
            offer.carrier.name,
            offer.carrier.flight_number,
            offer.schedule.departure_time,
            offer.schedule.arrival_time,
            offer.schedule.duration,
            match offer.stops() {
                0 => "non-stop".to_string(),
                n => format!("{n} stop"),
            },
            offer.fare.discounted_price,
            offer.fare.price,
            offer.fare.discount_percentage,
            offer.seats_available,
        );
    }

    Ok(())
}
