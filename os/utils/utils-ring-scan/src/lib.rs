//! # Bounded circular search
//!
//! Both the frame bitmap and the thread table are searched the same way:
//! start somewhere in the middle (the spot most likely to hold a hit), run to
//! the end, then wrap around and continue from index `0` up to where the search
//! began. Every index is visited at most once, so the search always terminates
//! after `len` checks.
//!
//! ```text
//!           start
//!             │
//!   ┌───┬───┬─▼─┬───┬───┬───┐
//!   │ 0 │ 1 │ 2 │ 3 │ 4 │ 5 │   visit order: 2, 3, 4, 5, 0, 1
//!   └───┴───┴───┴───┴───┴───┘
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![forbid(unsafe_code)]

/// Returns the indices `0..len` in circular order beginning at `start`.
///
/// A `start` at or beyond `len` wraps modulo `len`, so passing
/// `current + 1` for the last slot of a table begins at slot `0`.
///
/// ```rust
/// # use utils_ring_scan::ring_order;
/// let order: Vec<usize> = ring_order(4, 6).collect();
/// assert_eq!(order, [4, 5, 0, 1, 2, 3]);
/// ```
pub fn ring_order(start: usize, len: usize) -> impl Iterator<Item = usize> {
    let start = if len == 0 { 0 } else { start % len };
    (start..len).chain(0..start)
}

/// Finds the first index in circular order from `start` for which `hit` is true.
///
/// Returns `None` after all `len` indices have been checked without a hit.
///
/// ```rust
/// # use utils_ring_scan::find_from;
/// let slots = [true, false, false, true, false];
/// // Searching from the end wraps around to the low slot.
/// assert_eq!(find_from(4, slots.len(), |i| slots[i]), Some(0));
/// assert_eq!(find_from(1, slots.len(), |i| slots[i]), Some(3));
/// assert_eq!(find_from(0, 0, |_| true), None);
/// ```
#[inline]
pub fn find_from(start: usize, len: usize, mut hit: impl FnMut(usize) -> bool) -> Option<usize> {
    ring_order(start, len).find(|&i| hit(i))
}
