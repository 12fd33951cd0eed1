//! # Wayfarer headless client
//!
//! Assembles the backend from `configs::Settings` and runs a single command
//! against the state holders, printing what a UI would render.
//!
//! ```text
//! wayfarer [--seed countries.json] <command>
//!
//!   countries [search text]       list (or search) countries
//!   country <name>                details plus current weather at the capital
//!   reviews <country> [--min N] [--oldest]
//!   weather <lat> <lon>
//!   demo                          sign up, review, like and plan a trip
//! ```

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use auth_adapters::LocalAuthService;
use configs::{telemetry, BackendKind, Settings};
use domains::{DocumentStore, DomainError, GeoPoint, Weather, WeatherService, DEFAULT_LANGUAGE};
use services::holders::Registration;
use services::{Backend, HolderState, Holders, ReviewFilter};
use storage_adapters::{InMemoryDocumentStore, LocalObjectStore};

/// Stand-in used when no weather API key is configured.
struct DisabledWeather;

#[async_trait]
impl WeatherService for DisabledWeather {
    async fn current(&self, _location: GeoPoint) -> domains::Result<Weather> {
        Err(DomainError::PermissionDenied("weather.api_key is not configured".into()))
    }
}

fn build_documents(settings: &Settings) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match settings.backend.kind {
        BackendKind::Memory => Ok(Arc::new(InMemoryDocumentStore::new())),
        #[cfg(feature = "backend-http")]
        BackendKind::Http => {
            let url = settings
                .backend
                .documents_url
                .as_deref()
                .ok_or_else(|| anyhow!("backend.documents_url is not set"))?;
            let store = storage_adapters::HttpDocumentStore::new(
                url,
                settings.backend_api_key().map(str::to_owned),
            )?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "backend-http"))]
        BackendKind::Http => bail!("this build has no HTTP backend; rebuild with --features backend-http"),
    }
}

fn build_weather(settings: &Settings) -> Arc<dyn WeatherService> {
    #[cfg(feature = "backend-http")]
    {
        if let Some(key) = settings.weather_api_key() {
            return Arc::new(storage_adapters::OpenWeatherClient::new(
                settings.weather.base_url.clone(),
                key,
            ));
        }
    }
    #[cfg(not(feature = "backend-http"))]
    let _ = settings;
    tracing::warn!("no weather API key configured; weather lookups are disabled");
    Arc::new(DisabledWeather)
}

fn build_backend(settings: &Settings) -> anyhow::Result<Backend> {
    Ok(Backend::new(
        build_documents(settings)?,
        Arc::new(LocalObjectStore::new(
            &settings.storage.root_dir,
            settings.storage.public_url.clone(),
        )),
        Arc::new(LocalAuthService::new()),
        build_weather(settings),
    ))
}

/// Turns the holder's published error message into a command failure.
fn check<T>(state: &HolderState<T>) -> anyhow::Result<()> {
    match state.error_message.get() {
        Some(message) => Err(anyhow!(message)),
        None => Ok(()),
    }
}

fn print_weather(weather: &Weather) {
    println!("{:.1}°C, {}", weather.temperature_celsius, weather.description);
}

async fn list_countries(holders: &Holders, search: Option<String>) -> anyhow::Result<()> {
    holders.countries.load_countries().await;
    check(holders.countries.state())?;

    let countries = match search {
        Some(text) => holders.countries.search(&text, DEFAULT_LANGUAGE),
        None => holders.countries.state().data.get(),
    };
    for country in countries {
        println!("{:<24} {}", country.canonical_name(), country.capital);
    }
    Ok(())
}

async fn show_country(holders: &Holders, name: &str) -> anyhow::Result<()> {
    holders.countries.load_countries().await;
    check(holders.countries.state())?;
    let country = holders
        .countries
        .find_by_name(name)
        .ok_or_else(|| anyhow!("unknown country {name:?}"))?;

    println!("{} ({})", country.canonical_name(), country.capital);
    println!("{}", country.description.get(DEFAULT_LANGUAGE));
    println!("security: {:?}", country.security.risk_level);
    println!("visa required: {}", country.visa.required);
    if let Some(weather) = holders.weather.load_for_country(&country).await {
        print_weather(&weather);
    } else if let Some(message) = holders.weather.state().error_message.get() {
        println!("weather unavailable: {message}");
    }
    Ok(())
}

async fn list_reviews(holders: &Holders, country: &str, filter: ReviewFilter) -> anyhow::Result<()> {
    holders.reviews.load_for_country(country).await;
    check(holders.reviews.state())?;

    let reviews = holders.reviews.displayed(filter);
    if reviews.is_empty() {
        println!("no reviews for {country}");
        return Ok(());
    }
    if let Some(avg) = holders.reviews.average_rating() {
        println!("average {avg:.1} from {} review(s)", holders.reviews.state().data.with(Vec::len));
    }
    for review in reviews {
        println!(
            "{}  {}  {}",
            review.created_at.format("%Y-%m-%d"),
            review.rating,
            review.comment
        );
    }
    Ok(())
}

async fn weather(holders: &Holders, lat: &str, lon: &str) -> anyhow::Result<()> {
    let point = GeoPoint::new(
        lat.parse().context("latitude must be a number")?,
        lon.parse().context("longitude must be a number")?,
    );
    let current = holders.weather.load(point).await;
    check(holders.weather.state())?;
    if let Some(current) = current {
        print_weather(&current);
    }
    Ok(())
}

/// Exercises the write paths end to end.
async fn demo(holders: &Holders) -> anyhow::Result<()> {
    holders
        .session
        .sign_up(Registration {
            email: "demo@wayfarer.test".into(),
            password: "wayfarer".into(),
            name: "Demo".into(),
            surname: "Traveller".into(),
        })
        .await;
    check(holders.session.state())?;

    holders.countries.load_countries().await;
    check(holders.countries.state())?;
    let destination = holders
        .countries
        .state()
        .data
        .with(|countries| countries.first().map(|c| c.canonical_name().to_string()))
        .unwrap_or_else(|| "Japan".to_string());

    holders.reviews.load_for_country(&destination).await;
    holders.reviews.submit_review(&destination, 5, "Amazing trip!").await;
    check(holders.reviews.state())?;
    println!("reviews for {destination}: {}", holders.reviews.state().data.with(Vec::len));

    let liked = holders.likes.toggle_like(&destination).await;
    check(holders.likes.state())?;
    println!("liked {destination}: {}", liked.unwrap_or(false));

    let start = chrono::Utc::now().date_naive() + chrono::Days::new(30);
    holders.trips.load_trips().await;
    holders.trips.add_trip(&destination, start).await;
    check(holders.trips.state())?;
    if let Some(trip) = holders.trips.next_trip(chrono::Utc::now().date_naive()) {
        println!("next trip: {} on {}", trip.destination, trip.start_date);
    }

    if let Some(profile) = holders.profile.load_profile().await {
        println!("signed in as {}", profile.display_name());
    }
    holders.session.sign_out().await;
    Ok(())
}

fn parse_review_filter(args: &[String]) -> anyhow::Result<ReviewFilter> {
    let mut filter = ReviewFilter {
        min_rating: None,
        newest_first: true,
    };
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--min" => {
                let value = iter.next().ok_or_else(|| anyhow!("--min needs a value"))?;
                filter.min_rating = Some(value.parse().context("--min must be 0-5")?);
            }
            "--oldest" => filter.newest_first = false,
            other => bail!("unexpected argument {other:?}"),
        }
    }
    Ok(filter)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    telemetry::init_tracing(&settings.app);

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let seed_file = match args.iter().position(|a| a == "--seed") {
        Some(pos) => {
            if pos + 1 >= args.len() {
                bail!("--seed needs a file path");
            }
            let path = args.remove(pos + 1);
            args.remove(pos);
            Some(path)
        }
        None => None,
    };

    let backend = build_backend(&settings)?;
    tracing::info!(backend = ?settings.backend.kind, "wayfarer starting");

    if let Some(path) = seed_file {
        let json = tokio::fs::read_to_string(Path::new(&path))
            .await
            .with_context(|| format!("reading {path}"))?;
        let countries = services::parse_countries(&json)?;
        let report = services::seed_countries(backend.documents.as_ref(), &countries).await?;
        tracing::info!(inserted = report.inserted, skipped = report.skipped, "seeded countries");
    }

    let holders = Holders::new(&backend);
    holders.session.session().restore().await;

    let (command, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("usage: wayfarer [--seed FILE] <countries|country|reviews|weather|demo> ..."))?;
    match command.as_str() {
        "countries" => {
            let search = (!rest.is_empty()).then(|| rest.join(" "));
            list_countries(&holders, search).await
        }
        "country" => match rest {
            [] => bail!("usage: wayfarer country <name>"),
            name => show_country(&holders, &name.join(" ")).await,
        },
        "reviews" => match rest.split_first() {
            Some((country, flags)) => list_reviews(&holders, country, parse_review_filter(flags)?).await,
            None => bail!("usage: wayfarer reviews <country> [--min N] [--oldest]"),
        },
        "weather" => match rest {
            [lat, lon] => weather(&holders, lat, lon).await,
            _ => bail!("usage: wayfarer weather <lat> <lon>"),
        },
        "demo" => demo(&holders).await,
        other => bail!("unknown command {other:?}"),
    }
}
