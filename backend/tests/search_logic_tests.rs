//! Property tests for the listing search logic: radius filtering,
//! offset pagination, and reservoir sampling.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use uuid::Uuid;

use classifieds_backend::geo::{haversine_miles, within_radius, Coordinates};
use classifieds_backend::listing::{
    apply_sort, page_slice, reservoir_sample, SortMode, LISTING_TTL_DAYS,
};
use classifieds_backend::models::Listing;

fn listing(n: u32, price: i64, coords: Option<(f64, f64)>) -> Listing {
    let created = NaiveDate::from_ymd_opt(2026, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + Duration::seconds(n as i64);
    Listing {
        id: Uuid::from_u128(n as u128 + 1),
        user_id: Uuid::from_u128(1),
        category_id: 1,
        subcategory_id: None,
        title: format!("listing {}", n),
        description: String::new(),
        price,
        listing_type: "sale".to_string(),
        location: None,
        zip_code: None,
        latitude: coords.map(|(lat, _)| lat),
        longitude: coords.map(|(_, lon)| lon),
        images: vec![],
        status: "active".to_string(),
        views: 0,
        expires_at: created + Duration::days(LISTING_TTL_DAYS),
        created_at: created,
        updated_at: created,
    }
}

fn coords_strategy() -> impl Strategy<Value = Option<(f64, f64)>> {
    prop_oneof![
        3 => ((25.0f64..49.0, -124.0f64..-67.0)).prop_map(Some),
        1 => Just(None::<(f64, f64)>),
    ]
}

proptest! {
    /// A listing is kept by the radius filter iff its Haversine distance to
    /// the origin is within the radius; rows without coordinates never match.
    #[test]
    fn radius_filter_matches_haversine(
        points in proptest::collection::vec(coords_strategy(), 0..40),
        origin_lat in 25.0f64..49.0,
        origin_lon in -124.0f64..-67.0,
        radius in 0.1f64..500.0,
    ) {
        let origin = Coordinates { latitude: origin_lat, longitude: origin_lon };
        for (n, coords) in points.into_iter().enumerate() {
            let l = listing(n as u32, 100, coords);
            let kept = within_radius(l.latitude, l.longitude, origin, radius);
            match coords {
                Some((latitude, longitude)) => {
                    let distance = haversine_miles(
                        Coordinates { latitude, longitude },
                        origin,
                    );
                    prop_assert_eq!(kept, distance <= radius);
                }
                None => prop_assert!(!kept),
            }
        }
    }

    /// Concatenating pages until has_more is false yields every listing
    /// exactly once, for every deterministic sort mode.
    #[test]
    fn pagination_is_exhaustive_and_disjoint(
        prices in proptest::collection::vec(0i64..50, 0..60),
        limit in 1usize..10,
        sort_pick in 0usize..4,
    ) {
        let sort = [SortMode::Newest, SortMode::Oldest, SortMode::PriceLow, SortMode::PriceHigh][sort_pick];
        let mut items: Vec<Listing> = prices
            .iter()
            .enumerate()
            .map(|(n, price)| listing(n as u32, *price, None))
            .collect();
        let total = items.len();
        apply_sort(&mut items, sort);

        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut offset = 0;
        loop {
            let (page, has_more) = page_slice(items.clone(), offset, limit);
            prop_assert!(page.len() <= limit);
            for l in &page {
                prop_assert!(seen.insert(l.id), "listing repeated across pages");
            }
            if !has_more {
                prop_assert!(page.len() < limit || offset + page.len() == total);
                break;
            }
            prop_assert_eq!(page.len(), limit);
            offset += limit;
        }
        prop_assert_eq!(seen.len(), total);
    }

    /// Deterministic sorts are total orders: re-sorting a reordered copy
    /// gives the same id sequence, even with duplicate prices.
    #[test]
    fn sorting_is_deterministic(
        prices in proptest::collection::vec(0i64..10, 0..40),
        sort_pick in 0usize..4,
    ) {
        let sort = [SortMode::Newest, SortMode::Oldest, SortMode::PriceLow, SortMode::PriceHigh][sort_pick];
        let mut first: Vec<Listing> = prices
            .iter()
            .enumerate()
            .map(|(n, price)| listing(n as u32, *price, None))
            .collect();
        let mut second: Vec<Listing> = first.iter().rev().cloned().collect();

        apply_sort(&mut first, sort);
        apply_sort(&mut second, sort);
        let first_ids: Vec<Uuid> = first.iter().map(|l| l.id).collect();
        let second_ids: Vec<Uuid> = second.iter().map(|l| l.id).collect();
        prop_assert_eq!(first_ids, second_ids);
    }

    /// The reservoir holds min(n, len) distinct input items.
    #[test]
    fn reservoir_sample_size_and_membership(
        len in 0usize..200,
        n in 0usize..50,
        seed in any::<u64>(),
    ) {
        let items: Vec<usize> = (0..len).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        let sample = reservoir_sample(items, n, &mut rng);
        prop_assert_eq!(sample.len(), n.min(len));
        let distinct: HashSet<usize> = sample.iter().copied().collect();
        prop_assert_eq!(distinct.len(), sample.len());
        prop_assert!(sample.iter().all(|v| *v < len));
    }
}

/// The spec's worked example: a listing in zip 10001 seen from zip 10002.
#[test]
fn manhattan_example_matches_five_mile_radius_only() {
    let origin = Coordinates {
        latitude: 40.7157,
        longitude: -73.9863,
    };
    let l = listing(0, 100, Some((40.7506, -73.9972)));
    assert!(within_radius(l.latitude, l.longitude, origin, 5.0));
    assert!(!within_radius(l.latitude, l.longitude, origin, 1.0));
}
