use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::StringLen;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

/// Lifecycle state of a reservation.
///
/// The string form (`"Pending"`, `"Confirmed"`, ...) is the key the state registry
/// matches on and the value stored in `reservations.state`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    Default,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum ReservationStatus {
    #[default]
    #[sea_orm(string_value = "Pending")]
    Pending,
    /// The only state that blocks the product's dates
    #[sea_orm(string_value = "Confirmed")]
    Confirmed,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
    #[sea_orm(string_value = "Completed")]
    Completed,
}

impl ReservationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }

    /// Pending and Confirmed reservations still hold a claim on their dates
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

/// Registry record for a lifecycle state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationState {
    pub id: Uuid,
    pub status: ReservationStatus,
    pub description: String,
    pub active: bool,
}

impl ReservationState {
    pub fn name(&self) -> String {
        self.status.to_string()
    }
}

/// Inclusive-inclusive interval intersection on calendar dates
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start <= b_end && a_end >= b_start
}

/// A time-bounded claim on a product by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub status: ReservationStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: Decimal,
    pub observations: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    /// Bumped by the store on every write; starts at 1
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Both ends count: a 10th..12th stay is 3 days.
    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        ranges_overlap(self.start_date, self.end_date, start, end)
    }

    /// Active state and not yet ended as of `today`
    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        self.status.is_active() && self.end_date >= today
    }
}

/// Input of `save_reservation`: a new reservation when `id` is `None`, otherwise an
/// edit of the dates, price and observations of an existing one.
///
/// Everything is optional so that missing values surface as validation failures
/// with a readable message instead of deserialization errors.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SaveReservation {
    pub id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub total_price: Option<Decimal>,
    /// Registry name of the requested state; `None` means Pending
    #[validate(length(min = 1, max = 50))]
    pub state: Option<String>,
    #[validate(length(max = 2000))]
    pub observations: Option<String>,
}

impl SaveReservation {
    pub fn new(user_id: Uuid, product_id: Uuid, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            user_id: Some(user_id),
            product_id: Some(product_id),
            start_date: Some(start_date),
            end_date: Some(end_date),
            ..Self::default()
        }
    }

    pub fn with_price(mut self, total_price: Decimal) -> Self {
        self.total_price = Some(total_price);
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_observations(mut self, observations: impl Into<String>) -> Self {
        self.observations = Some(observations.into());
        self
    }

    pub fn for_existing(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }
}

/// Offset pagination, newest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl PageRequest {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }
}

fn default_limit() -> usize {
    50
}

/// Query filters for listing reservations
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationFilter {
    pub user_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub status: Option<ReservationStatus>,
    #[serde(flatten)]
    pub page: PageRequest,
}

impl ReservationFilter {
    pub fn matches(&self, reservation: &Reservation) -> bool {
        self.user_id.is_none_or(|id| reservation.user_id == id)
            && self.product_id.is_none_or(|id| reservation.product_id == id)
            && self.status.is_none_or(|status| reservation.status == status)
    }
}

/// Caller-facing history filter; names and missing bounds are resolved by the service
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub states: Vec<String>,
    #[serde(flatten)]
    pub page: PageRequest,
}

/// Resolved history query handed to the repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub user_id: Uuid,
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Empty means every state
    pub states: Vec<ReservationStatus>,
    pub page: PageRequest,
}

impl HistoryQuery {
    /// Start or end falls within `[from, to]`
    pub fn matches(&self, reservation: &Reservation) -> bool {
        let within = |d: NaiveDate| d >= self.from && d <= self.to;

        reservation.user_id == self.user_id
            && (within(reservation.start_date) || within(reservation.end_date))
            && (self.states.is_empty() || self.states.contains(&reservation.status))
    }
}

/// One page of results plus the total number of matches
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: usize,
    pub limit: usize,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            offset: request.offset,
            limit: request.limit,
        }
    }

    pub fn has_more(&self) -> bool {
        ((self.offset + self.items.len()) as u64) < self.total
    }
}

/// Outcome of `can_user_reserve`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Eligibility {
    pub allowed: bool,
    pub message: String,
}

impl Eligibility {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            message: "The user can reserve the product on the selected dates".to_string(),
        }
    }

    pub fn denied(message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn reservation(start: NaiveDate, end: NaiveDate, status: ReservationStatus) -> Reservation {
        let now = Utc::now();
        Reservation {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            product_id: Uuid::now_v7(),
            status,
            start_date: start,
            end_date: end,
            total_price: Decimal::new(10000, 2),
            observations: None,
            confirmed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_overlap_is_inclusive_at_both_ends() {
        let (s, e) = (d(2025, 6, 10), d(2025, 6, 15));

        assert!(ranges_overlap(s, e, d(2025, 6, 14), d(2025, 6, 20)));
        assert!(ranges_overlap(s, e, d(2025, 6, 15), d(2025, 6, 15)));
        assert!(ranges_overlap(s, e, d(2025, 6, 1), d(2025, 6, 10)));
        assert!(ranges_overlap(s, e, d(2025, 6, 11), d(2025, 6, 12)));
        assert!(!ranges_overlap(s, e, d(2025, 6, 16), d(2025, 6, 20)));
        assert!(!ranges_overlap(s, e, d(2025, 6, 1), d(2025, 6, 9)));
    }

    #[test]
    fn test_duration_counts_both_ends() {
        let r = reservation(d(2025, 7, 1), d(2025, 7, 5), ReservationStatus::Pending);
        assert_eq!(r.duration_days(), 5);

        let single = reservation(d(2025, 7, 1), d(2025, 7, 1), ReservationStatus::Pending);
        assert_eq!(single.duration_days(), 1);
    }

    #[test]
    fn test_status_strings_are_registry_names() {
        assert_eq!(ReservationStatus::Confirmed.to_string(), "Confirmed");
        assert_eq!(
            ReservationStatus::from_str("Cancelled").unwrap(),
            ReservationStatus::Cancelled
        );
        assert!(ReservationStatus::from_str("cancelled").is_err());
        assert_eq!(ReservationStatus::default(), ReservationStatus::Pending);
    }

    #[test]
    fn test_active_on() {
        let today = d(2025, 8, 5);
        let r = reservation(d(2025, 8, 1), d(2025, 8, 5), ReservationStatus::Confirmed);
        assert!(r.is_active_on(today));
        assert!(!r.is_active_on(d(2025, 8, 6)));

        let cancelled = reservation(d(2025, 8, 1), d(2025, 8, 10), ReservationStatus::Cancelled);
        assert!(!cancelled.is_active_on(today));
    }

    #[test]
    fn test_history_query_matches_start_or_end() {
        let r = reservation(d(2025, 1, 28), d(2025, 2, 3), ReservationStatus::Completed);
        let mut query = HistoryQuery {
            user_id: r.user_id,
            from: d(2025, 2, 1),
            to: d(2025, 2, 28),
            states: vec![],
            page: PageRequest::default(),
        };
        assert!(query.matches(&r));

        query.states = vec![ReservationStatus::Confirmed];
        assert!(!query.matches(&r));

        query.states = vec![];
        query.from = d(2025, 1, 29);
        query.to = d(2025, 2, 2);
        // Spans the window without either end inside it
        assert!(!query.matches(&r));
    }

    #[test]
    fn test_page_has_more() {
        let page = Page::new(vec![1, 2], 5, PageRequest::new(2, 0));
        assert!(page.has_more());

        let last = Page::new(vec![5], 5, PageRequest::new(2, 4));
        assert!(!last.has_more());
    }
}
