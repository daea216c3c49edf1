//! # Conflict Detector
//!
//! Computes remaining available quantity for an inventory item given the
//! windows already committed against it.
//!
//! ## The Overcount Question
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Item quantity = 3                      search window                   │
//! │                                     ┌───────────────────┐              │
//! │  line A (qty 2)   ├────────┤        │                   │  no overlap  │
//! │  line B (qty 1)              ├──────┼─────┤             │  overlaps    │
//! │  line C (qty 1)                     │       ├────────┤  │  overlaps    │
//! │                                     └───────────────────┘              │
//! │                                                                         │
//! │  booked = 1 + 1 = 2      remaining = 3 - 2 = 1                         │
//! │                                                                         │
//! │  NOTE: summing every overlapping line is CONSERVATIVE - lines B and C  │
//! │  may not overlap each other, yet both count. The reference system      │
//! │  accepts this overcount: rental windows are long relative to the day   │
//! │  and a too-low remainder is always safe, never an overbooking.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All windows are half-open `[start, end)`: a booking ending at noon never
//! conflicts with one starting at noon.

use chrono::{DateTime, Utc};

/// A committed demand against one item: the line's window and quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookedWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub quantity: i64,
}

/// Half-open interval overlap: `[a_start, a_end)` vs `[b_start, b_end)`.
#[inline]
pub fn windows_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Remaining quantity of an item for a candidate window.
///
/// Sums the quantities of every committed window overlapping the candidate
/// and subtracts from the item's total, saturating at zero (a data fix that
/// shrinks an item's quantity below existing demand must not produce a
/// negative remainder).
pub fn remaining_quantity(
    total_quantity: i64,
    candidate_start: DateTime<Utc>,
    candidate_end: DateTime<Utc>,
    committed: &[BookedWindow],
) -> i64 {
    let booked: i64 = committed
        .iter()
        .filter(|w| windows_overlap(candidate_start, candidate_end, w.start, w.end))
        .map(|w| w.quantity)
        .sum();

    (total_quantity - booked).max(0)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, h, 0, 0).unwrap()
    }

    fn booked(start_h: u32, end_h: u32, quantity: i64) -> BookedWindow {
        BookedWindow {
            start: utc(start_h),
            end: utc(end_h),
            quantity,
        }
    }

    #[test]
    fn test_half_open_adjacency_does_not_overlap() {
        assert!(!windows_overlap(utc(10), utc(12), utc(12), utc(14)));
        assert!(!windows_overlap(utc(12), utc(14), utc(10), utc(12)));
        assert!(windows_overlap(utc(10), utc(12), utc(11), utc(13)));
        assert!(windows_overlap(utc(10), utc(14), utc(11), utc(12)));
    }

    #[test]
    fn test_spec_scenario_quantity_one() {
        // Item with quantity 1; reservation A holds [10:00, 12:00), 0 buffer.
        let committed = [booked(10, 12, 1)];

        // A request for [11:00, 13:00) must report 0 remaining.
        assert_eq!(remaining_quantity(1, utc(11), utc(13), &committed), 0);

        // A request for [12:00, 14:00) must report 1 remaining.
        assert_eq!(remaining_quantity(1, utc(12), utc(14), &committed), 1);
    }

    #[test]
    fn test_multiple_lines_sum() {
        let committed = [booked(9, 11, 2), booked(11, 13, 1), booked(15, 16, 5)];
        // [10:00, 12:00) overlaps the first two lines: 3 booked of 5
        assert_eq!(remaining_quantity(5, utc(10), utc(12), &committed), 2);
    }

    #[test]
    fn test_remaining_saturates_at_zero() {
        let committed = [booked(10, 12, 4)];
        assert_eq!(remaining_quantity(3, utc(10), utc(12), &committed), 0);
    }

    #[test]
    fn test_no_committed_windows() {
        assert_eq!(remaining_quantity(7, utc(10), utc(12), &[]), 7);
    }
}
