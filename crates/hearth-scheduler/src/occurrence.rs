//! Next-occurrence arithmetic for recurring templates.
//!
//! All calendar math happens in one application-wide time zone; instants go
//! in and come out as UTC. Weekday ordinals are 0 = Sunday … 6 = Saturday,
//! matching chrono's `num_days_from_sunday`.

use chrono::{
    DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use thiserror::Error;

use crate::types::{Frequency, RecurringTemplate};

/// Why a template's schedule cannot be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OccurrenceError {
    #[error("unknown frequency '{0}'")]
    UnknownFrequency(String),

    #[error("show time is missing")]
    MissingShowTime,

    #[error("show time '{0}' is not HH:MM")]
    InvalidShowTime(String),

    #[error("weekday {0} is out of range 0-6")]
    InvalidWeekday(u8),

    #[error("month day {0} is out of range 1-31")]
    InvalidMonthDay(u32),

    /// Date arithmetic left chrono's representable range.
    #[error("occurrence is not representable")]
    Unrepresentable,

    #[error("computed occurrence {computed} is not after {reference}")]
    NotAfterReference {
        computed: DateTime<Utc>,
        reference: DateTime<Utc>,
    },
}

type Result<T> = std::result::Result<T, OccurrenceError>;

/// Set of weekday ordinals packed into the low seven bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    /// An empty slice yields `None`: no filter.
    pub fn from_ordinals(days: &[u8]) -> Result<Option<Self>> {
        let mut bits = 0u8;
        for &day in days {
            if day > 6 {
                return Err(OccurrenceError::InvalidWeekday(day));
            }
            bits |= 1 << day;
        }
        Ok((bits != 0).then_some(Self(bits)))
    }

    pub fn contains(self, ordinal: u32) -> bool {
        ordinal < 7 && self.0 & (1 << ordinal) != 0
    }

    /// Smallest member `>= ordinal` within the same week.
    pub fn first_at_or_after(self, ordinal: u32) -> Option<u32> {
        (ordinal..7).find(|d| self.contains(*d))
    }

    pub fn earliest(self) -> u32 {
        self.0.trailing_zeros()
    }
}

/// A validated recurrence rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub show_time: NaiveTime,
    /// Only consulted for `DAILY` and `WEEKLY`.
    pub weekdays: Option<WeekdaySet>,
    /// Only consulted for `MONTHLY`.
    pub month_day: Option<u32>,
}

impl RecurrenceRule {
    /// Validate raw stored fields.
    pub fn parse(
        frequency: &str,
        show_time: Option<&str>,
        weekdays: Option<&[u8]>,
        month_day: Option<u32>,
    ) -> Result<Self> {
        let frequency: Frequency = frequency.parse()?;
        let raw_time = show_time
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(OccurrenceError::MissingShowTime)?;
        let show_time = NaiveTime::parse_from_str(raw_time, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw_time, "%H:%M:%S"))
            .map_err(|_| OccurrenceError::InvalidShowTime(raw_time.to_string()))?;

        let weekdays = match (frequency, weekdays) {
            (Frequency::Daily | Frequency::Weekly, Some(days)) => WeekdaySet::from_ordinals(days)?,
            _ => None,
        };
        let month_day = match (frequency, month_day) {
            (Frequency::Monthly, Some(day)) if !(1..=31).contains(&day) => {
                return Err(OccurrenceError::InvalidMonthDay(day));
            }
            (Frequency::Monthly, day) => day,
            _ => None,
        };

        Ok(Self {
            frequency,
            show_time,
            weekdays,
            month_day,
        })
    }

    /// Pin an open `MONTHLY` rule to the local day of month of `reference`.
    ///
    /// Without a fixed day every step would start from the previous, possibly
    /// clamped, date and a template set up on the 31st would slide to the
    /// 28th after February.
    pub fn anchored<Z: TimeZone>(self, reference: DateTime<Utc>, tz: &Z) -> Self {
        match (self.frequency, self.month_day) {
            (Frequency::Monthly, None) => Self {
                month_day: Some(reference.with_timezone(tz).day()),
                ..self
            },
            _ => self,
        }
    }

    fn at<Z: TimeZone>(&self, day: NaiveDate, tz: &Z) -> Result<DateTime<Utc>> {
        localize(tz, day.and_time(self.show_time))
    }

    /// `date` moved forward `months` calendar months with `month_day` applied.
    ///
    /// Days past the end of the target month clamp to its last day, so a
    /// `month_day` of 31 lands on April 30 and on February 28/29.
    fn month_target(&self, date: NaiveDate, months: u32) -> Result<NaiveDate> {
        let base = date
            .checked_add_months(Months::new(months))
            .ok_or(OccurrenceError::Unrepresentable)?;
        match self.month_day {
            Some(day) => clamp_day(base, day),
            None => Ok(base),
        }
    }
}

/// Compute the next firing strictly after `reference`.
///
/// * `DAILY`: the following calendar day at `show_time`, then forward to
///   the first day in `weekdays` (if set).
/// * `WEEKLY`: seven days later at `show_time`; with `weekdays`, the first
///   member at or after that weekday, else the earliest member the week after.
/// * `MONTHLY`: one calendar month later with `month_day` applied; if that
///   is not after `reference`, one further month.
pub fn compute_next<Z: TimeZone>(
    rule: &RecurrenceRule,
    reference: DateTime<Utc>,
    tz: &Z,
) -> Result<DateTime<Utc>> {
    let date = reference.with_timezone(tz).date_naive();

    let candidate = match rule.frequency {
        Frequency::Daily => {
            let mut day = add_days(date, 1)?;
            if let Some(set) = rule.weekdays {
                // A non-empty set is hit within six more steps.
                while !set.contains(ordinal(day)) {
                    day = add_days(day, 1)?;
                }
            }
            rule.at(day, tz)?
        }

        Frequency::Weekly => {
            let mut day = add_days(date, 7)?;
            if let Some(set) = rule.weekdays {
                let current = ordinal(day);
                let shift = match set.first_at_or_after(current) {
                    Some(target) => target - current,
                    None => 7 - current + set.earliest(),
                };
                day = add_days(day, u64::from(shift))?;
            }
            rule.at(day, tz)?
        }

        Frequency::Monthly => {
            let first = rule.at(rule.month_target(date, 1)?, tz)?;
            if first > reference {
                first
            } else {
                rule.at(rule.month_target(date, 2)?, tz)?
            }
        }
    };

    if candidate <= reference {
        return Err(OccurrenceError::NotAfterReference {
            computed: candidate,
            reference,
        });
    }
    Ok(candidate)
}

/// [`compute_next`] for a stored template, validating its rule first.
pub fn next_occurrence<Z: TimeZone>(
    template: &RecurringTemplate,
    reference: DateTime<Utc>,
    tz: &Z,
) -> Result<DateTime<Utc>> {
    compute_next(&template.rule()?, reference, tz)
}

/// Advance from the previously scheduled instant until strictly after `now`.
///
/// Anchoring on `prior` keeps the time of day fixed; any occurrences missed
/// while the host was offline collapse into the one firing that led here.
pub fn next_after<Z: TimeZone>(
    rule: &RecurrenceRule,
    prior: DateTime<Utc>,
    now: DateTime<Utc>,
    tz: &Z,
) -> Result<DateTime<Utc>> {
    let mut next = compute_next(rule, prior, tz)?;
    while next <= now {
        next = compute_next(rule, next, tz)?;
    }
    Ok(next)
}

/// First firing strictly after `now` for a freshly created or resumed template.
///
/// Unlike [`compute_next`] this may land on the current day when
/// `show_time` has not yet passed. `WEEKLY` without weekdays anchors on the
/// current weekday; `MONTHLY` without `month_day` anchors on the current day
/// of month.
pub fn first_occurrence<Z: TimeZone>(
    rule: &RecurrenceRule,
    now: DateTime<Utc>,
    tz: &Z,
) -> Result<DateTime<Utc>> {
    let today = now.with_timezone(tz).date_naive();

    match (rule.frequency, rule.weekdays) {
        (Frequency::Daily | Frequency::Weekly, Some(set)) => {
            for offset in 0..=7 {
                let day = add_days(today, offset)?;
                if set.contains(ordinal(day)) {
                    let at = rule.at(day, tz)?;
                    if at > now {
                        return Ok(at);
                    }
                }
            }
            Err(OccurrenceError::Unrepresentable)
        }

        (Frequency::Daily, None) | (Frequency::Weekly, None) => {
            let at = rule.at(today, tz)?;
            if at > now {
                return Ok(at);
            }
            let step = if rule.frequency == Frequency::Daily { 1 } else { 7 };
            rule.at(add_days(today, step)?, tz)
        }

        (Frequency::Monthly, _) => {
            let anchored = rule.anchored(now, tz);
            for months in 0..=2 {
                let at = anchored.at(anchored.month_target(today, months)?, tz)?;
                if at > now {
                    return Ok(at);
                }
            }
            Err(OccurrenceError::Unrepresentable)
        }
    }
}

/// Resolve a local wall-clock time to UTC.
///
/// Ambiguous times (clocks going back) take the earlier instant; times that
/// fall in a gap (clocks going forward) move one hour later.
pub(crate) fn localize<Z: TimeZone>(tz: &Z, naive: NaiveDateTime) -> Result<DateTime<Utc>> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return Ok(dt.with_timezone(&Utc));
    }
    let shifted = naive + chrono::Duration::hours(1);
    tz.from_local_datetime(&shifted)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or(OccurrenceError::Unrepresentable)
}

fn ordinal(day: NaiveDate) -> u32 {
    day.weekday().num_days_from_sunday()
}

fn add_days(day: NaiveDate, n: u64) -> Result<NaiveDate> {
    day.checked_add_days(Days::new(n))
        .ok_or(OccurrenceError::Unrepresentable)
}

fn clamp_day(date: NaiveDate, day: u32) -> Result<NaiveDate> {
    let last = days_in_month(date.year(), date.month())?;
    date.with_day(day.min(last))
        .ok_or(OccurrenceError::Unrepresentable)
}

fn days_in_month(year: i32, month: u32) -> Result<u32> {
    let (y, m) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .ok_or(OccurrenceError::Unrepresentable)
}
