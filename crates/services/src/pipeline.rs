//! Pure filter-then-sort transformations applied to observed collections
//! before display.

use std::cmp::Ordering;

use chrono::NaiveDate;
use domains::{Country, Review, Trip};

type Predicate<'a, T> = Box<dyn Fn(&T) -> bool + Send + Sync + 'a>;
type Comparator<'a, T> = Box<dyn Fn(&T, &T) -> Ordering + Send + Sync + 'a>;

/// `(collection, predicate, comparator) -> ordered Vec`.
///
/// The predicate always runs first and the comparator only sees surviving
/// items. Sorting is stable, so equal elements keep their input order.
pub struct FilterSortPipeline<'a, T> {
    predicate: Option<Predicate<'a, T>>,
    comparator: Option<Comparator<'a, T>>,
}

impl<T> Default for FilterSortPipeline<'_, T> {
    fn default() -> Self {
        Self {
            predicate: None,
            comparator: None,
        }
    }
}

impl<'a, T: Clone + 'a> FilterSortPipeline<'a, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a predicate; multiple calls are AND-ed together.
    pub fn filter(mut self, predicate: impl Fn(&T) -> bool + Send + Sync + 'a) -> Self {
        let combined: Predicate<'a, T> = match self.predicate.take() {
            Some(existing) => Box::new(move |item: &T| existing(item) && predicate(item)),
            None => Box::new(predicate),
        };
        self.predicate = Some(combined);
        self
    }

    pub fn sort_by(mut self, comparator: impl Fn(&T, &T) -> Ordering + Send + Sync + 'a) -> Self {
        self.comparator = Some(Box::new(comparator));
        self
    }

    pub fn apply(&self, items: &[T]) -> Vec<T> {
        let mut out: Vec<T> = match &self.predicate {
            Some(predicate) => items.iter().filter(|item| predicate(item)).cloned().collect(),
            None => items.to_vec(),
        };
        if let Some(comparator) = &self.comparator {
            out.sort_by(|a, b| comparator(a, b));
        }
        out
    }
}

/// Display options for a review list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewFilter {
    /// Hide reviews rated below this value.
    pub min_rating: Option<u8>,
    /// Newest first when true, oldest first otherwise.
    pub newest_first: bool,
}

pub fn review_pipeline<'a>(filter: ReviewFilter) -> FilterSortPipeline<'a, Review> {
    let mut pipeline = FilterSortPipeline::new();
    if let Some(min) = filter.min_rating {
        pipeline = pipeline.filter(move |review: &Review| review.rating.value() >= min);
    }
    pipeline.sort_by(move |a: &Review, b: &Review| {
        let order = a.created_at.cmp(&b.created_at);
        if filter.newest_first {
            order.reverse()
        } else {
            order
        }
    })
}

/// Case-insensitive substring match on the localized country name, sorted
/// alphabetically in the same language.
pub fn country_search<'a>(text: &'a str, lang: &'a str) -> FilterSortPipeline<'a, Country> {
    let needle = text.trim().to_lowercase();
    FilterSortPipeline::new()
        .filter(move |country: &Country| {
            needle.is_empty() || country.name.get(lang).to_lowercase().contains(&needle)
        })
        .sort_by(move |a: &Country, b: &Country| {
            a.name
                .get(lang)
                .to_lowercase()
                .cmp(&b.name.get(lang).to_lowercase())
        })
}

/// Trips departing on or after `today`, soonest first.
pub fn upcoming_trips<'a>(today: NaiveDate) -> FilterSortPipeline<'a, Trip> {
    FilterSortPipeline::new()
        .filter(move |trip: &Trip| trip.start_date >= today)
        .sort_by(|a: &Trip, b: &Trip| a.start_date.cmp(&b.start_date))
}
