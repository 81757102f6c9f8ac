use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveTime, Offset, Utc};
use std::sync::Mutex;

/// Source of wall-clock time for admission decisions.
///
/// Quota windows and cooldowns read time only through this trait so tests can
/// drive them with [`ManualClock`].
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// UTC offset of the client's local timezone at [`now`](Self::now).
    fn local_offset(&self) -> FixedOffset {
        self.now().with_timezone(&Local).offset().fix()
    }

    /// Calendar date in the client's local timezone.
    fn local_date(&self) -> NaiveDate {
        self.now().with_timezone(&self.local_offset()).date_naive()
    }

    /// First instant of the next local calendar day.
    fn next_local_midnight(&self) -> DateTime<Utc> {
        let offset = self.local_offset();
        let tomorrow = self.local_date().succ_opt().unwrap_or(NaiveDate::MAX);
        let midnight = tomorrow.and_time(NaiveTime::MIN);
        (midnight - Duration::seconds(i64::from(offset.local_minus_utc()))).and_utc()
    }
}

/// `at + secs`, saturating at the latest representable instant.
pub fn add_secs(at: DateTime<Utc>, secs: u64) -> DateTime<Utc> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock with a fixed local offset.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    offset: FixedOffset,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::with_offset(start, Utc.fix())
    }

    pub fn with_offset(start: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            now: Mutex::new(start),
            offset,
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self
            .now
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *now += by;
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }

    pub fn set(&self, to: DateTime<Utc>) {
        let mut now = self
            .now
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *now = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self
            .now
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn local_offset(&self) -> FixedOffset {
        self.offset
    }
}
