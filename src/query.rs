// Filtering and ordering over a snapshot of the listing store.

use crate::models::{Listing, ListingFilters};

// Blank filter values (e.g. `?city=`) behave like absent ones. Any other value is
// matched exactly as given, surrounding spaces included.
fn active(filter: &Option<String>) -> Option<&str> {
    filter
        .as_deref()
        .filter(|value| !value.trim().is_empty())
}

fn contains_ignore_case(haystack: &str, needle_lowercase: &str) -> bool {
    haystack.to_lowercase().contains(needle_lowercase)
}

/// Returns the listings matching every active filter, newest first.
///
/// The input is only read; calling this twice with the same listings and filters
/// yields identical output.
pub fn query<'a, I>(listings: I, filters: &ListingFilters) -> Vec<Listing>
where
    I: IntoIterator<Item = &'a Listing>,
{
    let search = active(&filters.search).map(str::to_lowercase);
    let city = active(&filters.city).map(str::to_lowercase);
    let currency = active(&filters.currency);

    let mut result: Vec<Listing> = listings
        .into_iter()
        .filter(|listing| {
            search
                .as_deref()
                .is_none_or(|needle| contains_ignore_case(&listing.name, needle))
        })
        .filter(|listing| {
            city.as_deref()
                .is_none_or(|needle| contains_ignore_case(&listing.city, needle))
        })
        .filter(|listing| currency.is_none_or(|wanted| listing.currency == wanted))
        .cloned()
        .collect();

    // Ids are unique, so this order is total
    result.sort_unstable_by(|a, b| b.id.cmp(&a.id));
    result
}
