//! # Buffer Policy
//!
//! Expands a requested window into the window that must be checked for
//! conflicts, and enforces the tenant's advance-notice policy.
//!
//! ## How Buffers Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every committed booking blocks extra time around itself:              │
//! │                                                                         │
//! │     pre-buffer        booked window         post-buffer                │
//! │  ├──────────────┤├────────────────────┤├──────────────────┤            │
//! │   (setup/transit)                        (cleaning/return)             │
//! │                                                                         │
//! │  Instead of expanding every stored row at query time, we expand the    │
//! │  REQUESTED window once:                                                │
//! │                                                                         │
//! │     search window = [start - post_buffer, end + pre_buffer)            │
//! │                                                                         │
//! │  A stored row overlaps the search window exactly when the request      │
//! │  collides with that row's buffered footprint - the two formulations    │
//! │  are algebraically identical for tenant-level buffers.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A booking ending at `T` with a 24h post-buffer therefore blocks any new
//! request starting before `T+24h`, and frees the item again exactly at
//! `T+24h` (half-open windows).

use chrono::{DateTime, Duration, Utc};

use crate::error::{CoreError, CoreResult, NoticeBound};
use crate::types::Business;

/// Per-tenant lead-time and buffer configuration, lifted out of
/// [`Business`] so the pure components never see storage concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPolicy {
    /// Minimum advance notice, in hours.
    pub min_notice_hours: i64,
    /// Maximum advance notice, in hours.
    pub max_notice_hours: i64,
    /// Hours blocked before each booked window.
    pub pre_buffer_hours: i64,
    /// Hours blocked after each booked window.
    pub post_buffer_hours: i64,
}

impl BufferPolicy {
    /// A policy with no buffers and an effectively open notice window.
    pub const fn unrestricted() -> Self {
        BufferPolicy {
            min_notice_hours: 0,
            max_notice_hours: i64::MAX / 3600,
            pre_buffer_hours: 0,
            post_buffer_hours: 0,
        }
    }

    /// Expands a requested UTC window into the conflict-search window.
    ///
    /// See the module docs for why the post-buffer widens the start side
    /// and the pre-buffer widens the end side.
    pub fn expand_search_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            start - Duration::hours(self.post_buffer_hours),
            end + Duration::hours(self.pre_buffer_hours),
        )
    }

    /// Enforces the advance-notice policy.
    ///
    /// Lead time is `start - now`, floored at whole hours the way the
    /// reference system displays it to customers.
    ///
    /// ## Errors
    /// `NoticeViolation` carrying the violated bound for user display.
    pub fn check_notice(&self, now: DateTime<Utc>, start: DateTime<Utc>) -> CoreResult<()> {
        let lead = start - now;
        let lead_hours = lead.num_hours();

        if lead < Duration::hours(self.min_notice_hours) {
            return Err(CoreError::NoticeViolation {
                lead_hours,
                bound_hours: self.min_notice_hours,
                bound: NoticeBound::Minimum,
            });
        }

        if lead > Duration::hours(self.max_notice_hours) {
            return Err(CoreError::NoticeViolation {
                lead_hours,
                bound_hours: self.max_notice_hours,
                bound: NoticeBound::Maximum,
            });
        }

        Ok(())
    }
}

impl From<&Business> for BufferPolicy {
    fn from(business: &Business) -> Self {
        BufferPolicy {
            min_notice_hours: business.min_notice_hours,
            max_notice_hours: business.max_notice_hours,
            pre_buffer_hours: business.pre_buffer_hours,
            post_buffer_hours: business.post_buffer_hours,
        }
    }
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

    #[test]
    fn test_zero_buffers_leave_window_untouched() {
        let policy = BufferPolicy::unrestricted();
        let (s, e) = policy.expand_search_window(utc(10), utc(12));
        assert_eq!(s, utc(10));
        assert_eq!(e, utc(12));
    }

    #[test]
    fn test_post_buffer_widens_start_side() {
        // A 2h post-buffer means an existing booking ending at our start
        // still collides; the search window must reach back 2h.
        let policy = BufferPolicy {
            post_buffer_hours: 2,
            ..BufferPolicy::unrestricted()
        };
        let (s, e) = policy.expand_search_window(utc(10), utc(12));
        assert_eq!(s, utc(8));
        assert_eq!(e, utc(12));
    }

    #[test]
    fn test_pre_buffer_widens_end_side() {
        let policy = BufferPolicy {
            pre_buffer_hours: 3,
            ..BufferPolicy::unrestricted()
        };
        let (s, e) = policy.expand_search_window(utc(10), utc(12));
        assert_eq!(s, utc(10));
        assert_eq!(e, utc(15));
    }

    #[test]
    fn test_notice_minimum() {
        let policy = BufferPolicy {
            min_notice_hours: 24,
            ..BufferPolicy::unrestricted()
        };
        let now = utc(0);

        let err = policy.check_notice(now, utc(10)).unwrap_err();
        match err {
            CoreError::NoticeViolation {
                bound, bound_hours, ..
            } => {
                assert_eq!(bound, NoticeBound::Minimum);
                assert_eq!(bound_hours, 24);
            }
            other => panic!("unexpected error: {other}"),
        }

        // Exactly at the bound is allowed
        assert!(policy
            .check_notice(now, now + Duration::hours(24))
            .is_ok());
    }

    #[test]
    fn test_notice_maximum() {
        let policy = BufferPolicy {
            max_notice_hours: 48,
            ..BufferPolicy::unrestricted()
        };
        let now = utc(0);

        assert!(policy.check_notice(now, now + Duration::hours(48)).is_ok());

        let err = policy
            .check_notice(now, now + Duration::hours(49))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::NoticeViolation {
                bound: NoticeBound::Maximum,
                ..
            }
        ));
    }
}
