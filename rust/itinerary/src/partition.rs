//! # Day Partition
//!
//! Derives the items shown for the selected day from a trip's flat item set.
//! Everything here is a pure function over its input; callers recompute on
//! every change instead of caching derived lists.

use std::collections::BTreeSet;

use crate::models::Item;

/// Items scheduled on `day`, ascending by `order_sequence`.
///
/// Duplicate ranks should not happen, but when they do the sort is stable so
/// the result follows input order instead of being arbitrary.
pub fn items_for_day(items: &[Item], day: u32) -> Vec<Item> {
    let mut selected: Vec<Item> = items.iter().filter(|item| item.day == day).cloned().collect();
    selected.sort_by_key(|item| item.order_sequence);
    selected
}

/// Days to offer in the day picker: every day that has items, plus the
/// selected day so that a freshly chosen empty day stays visible.
pub fn trip_days(items: &[Item], selected_day: u32) -> Vec<u32> {
    let mut days: BTreeSet<u32> = items.iter().map(|item| item.day).collect();
    days.insert(selected_day);
    days.into_iter().collect()
}

/// Rank for a place appended to `day`.
pub fn next_order_sequence(items: &[Item], day: u32) -> u32 {
    let count = items.iter().filter(|item| item.day == day).count();
    u32::try_from(count).unwrap_or(u32::MAX - 1) + 1
}
