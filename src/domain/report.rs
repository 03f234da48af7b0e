//! Pagination, date filtering and the nested receiving-history view.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::domain::product::Product;
use crate::domain::pvz::Pvz;
use crate::domain::reception::AnyReception;
use crate::error::{PriemkaError, Result};

/// A normalized pagination request.
///
/// `page` is 1-based. Construct through [`PageRequest::normalize`] so
/// out-of-range caller input falls back to defaults instead of erroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    /// Normalize raw caller input against the configured window.
    ///
    /// `page` values below 1 (or absent) become 1. `per_page` values outside
    /// `[1, max_page_size]` (or absent) fall back to the configured default
    /// rather than clamping to the nearest bound; external callers depend on
    /// the fallback, not an error.
    pub fn normalize(page: Option<i64>, per_page: Option<i64>, config: &Config) -> Self {
        let page = match page {
            Some(p) if p >= 1 => p.min(u32::MAX as i64) as u32,
            _ => 1,
        };
        let per_page = match per_page {
            Some(s) if s >= 1 && s <= config.max_page_size as i64 => s as u32,
            _ => config.default_page_size,
        };
        Self { page, per_page }
    }

    /// Row offset of the first item on this page.
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }

    /// Maximum number of rows on this page.
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Inclusive `created_at` bounds for the receiving-history query.
///
/// An absent `end` means "now", resolved at query time; an absent `start`
/// means no lower bound. Both stay `None` internally so the store decides
/// the instant "now" is evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl ReportFilter {
    /// Parse RFC 3339 date-filter inputs from a presentation layer.
    ///
    /// Absent inputs keep the lenient defaults; present-but-unparsable
    /// inputs are rejected with `InvalidInput` instead of silently widening
    /// the range.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        let parse_one = |label: &str, raw: &str| {
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    PriemkaError::InvalidInput(format!("unparsable {label} date {raw:?}: {e}"))
                })
        };
        Ok(Self {
            start: start.map(|raw| parse_one("start", raw)).transpose()?,
            end: end.map(|raw| parse_one("end", raw)).transpose()?,
        })
    }

    /// Whether a timestamp falls inside the filter, with `now` standing in
    /// for an absent upper bound.
    pub fn contains(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| at >= start) && at <= self.end.unwrap_or(now)
    }
}

/// One reception and its full product ledger, newest product first.
#[derive(Debug, Clone, Serialize)]
pub struct ReceptionWithProducts {
    pub reception: AnyReception,
    pub products: Vec<Product>,
}

/// One pickup point with its receiving history, newest reception first.
///
/// This nesting is the read-side contract returned to callers; the wrapper
/// key names are stable API surface.
#[derive(Debug, Clone, Serialize)]
pub struct PvzWithReceptions {
    pub pvz: Pvz,
    pub receptions: Vec<ReceptionWithProducts>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn page_zero_and_size_zero_normalize_to_defaults() {
        let config = Config::default();
        let page = PageRequest::normalize(Some(0), Some(0), &config);
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, config.default_page_size);
    }

    #[test]
    fn absent_values_take_defaults() {
        let config = Config::default();
        let page = PageRequest::normalize(None, None, &config);
        assert_eq!(page, PageRequest { page: 1, per_page: 10 });
        assert_eq!(page.offset(), 0);
        assert_eq!(page.limit(), 10);
    }

    #[test]
    fn oversized_page_size_falls_back_to_default() {
        let config = Config::default();
        let page = PageRequest::normalize(Some(3), Some(31), &config);
        assert_eq!(page.page, 3);
        assert_eq!(page.per_page, config.default_page_size);
        assert_eq!(page.offset(), 20);
    }

    #[test]
    fn in_window_values_pass_through() {
        let config = Config::default();
        let page = PageRequest::normalize(Some(2), Some(30), &config);
        assert_eq!(page, PageRequest { page: 2, per_page: 30 });
    }

    #[test]
    fn filter_bounds_are_inclusive() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 3, 31, 0, 0, 0).unwrap();
        let filter = ReportFilter {
            start: Some(start),
            end: Some(end),
        };
        let now = Utc::now();
        assert!(filter.contains(start, now));
        assert!(filter.contains(end, now));
        assert!(!filter.contains(start - chrono::Duration::seconds(1), now));
        assert!(!filter.contains(end + chrono::Duration::seconds(1), now));
    }

    #[test]
    fn absent_bounds_default_to_unbounded_start_and_now_end() {
        let filter = ReportFilter::default();
        let now = Utc::now();
        assert!(filter.contains(now - chrono::Duration::days(365 * 50), now));
        assert!(filter.contains(now, now));
        assert!(!filter.contains(now + chrono::Duration::seconds(1), now));
    }

    #[test]
    fn parse_rejects_unparsable_dates() {
        let err = ReportFilter::parse(Some("yesterday"), None).unwrap_err();
        assert!(matches!(err, PriemkaError::InvalidInput(_)));

        let filter =
            ReportFilter::parse(Some("2025-03-01T00:00:00Z"), Some("2025-03-31T00:00:00+03:00"))
                .unwrap();
        assert!(filter.start.is_some());
        assert!(filter.end.is_some());
    }

    #[test]
    fn parse_keeps_absent_inputs_lenient() {
        let filter = ReportFilter::parse(None, None).unwrap();
        assert_eq!(filter, ReportFilter::default());
    }
}
