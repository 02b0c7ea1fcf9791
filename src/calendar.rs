//! Booking calendar configuration and date selection.
//
// The calendar itself is drawn by whatever front-end hosts the form; this
// module owns the configuration it is given and the selection callback that
// fills the booking form.

use crate::form::{Form, FormError};
use crate::validation::BusinessHours;
use chrono::{Duration, NaiveDate, NaiveTime};
use log::{debug, info};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("{0} is not a business day")]
    ClosedDay(NaiveDate),
    #[error("{0} is in the past")]
    PastDate(NaiveDate),
    #[error(transparent)]
    Form(#[from] FormError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarView {
    Month,
    Week,
    Day,
}

impl CalendarView {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalendarView::Month => "dayGridMonth",
            CalendarView::Week => "timeGridWeek",
            CalendarView::Day => "timeGridDay",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BookingCalendar {
    pub initial_view: CalendarView,
    pub views: Vec<CalendarView>,
    pub selectable: bool,
    pub hours: BusinessHours,
    /// Written into the time field when a date is picked and no time is set yet
    pub default_time: NaiveTime,
}

impl BookingCalendar {
    pub fn new(hours: BusinessHours) -> Self {
        Self {
            initial_view: CalendarView::Month,
            views: vec![CalendarView::Month, CalendarView::Week, CalendarView::Day],
            selectable: true,
            default_time: hours.start,
            hours,
        }
    }

    /// Selection callback: write the picked date into `date` and, when the
    /// time is still empty, the default time into `time`.
    pub fn select(
        &self,
        date: NaiveDate,
        today: NaiveDate,
        form: &mut Form,
    ) -> Result<(), CalendarError> {
        if date < today {
            return Err(CalendarError::PastDate(date));
        }
        if !self.hours.is_business_day(date) {
            return Err(CalendarError::ClosedDay(date));
        }

        form.set("date", &date.format("%Y-%m-%d").to_string())?;
        let time_is_empty = form.value("time").is_some_and(|t| t.trim().is_empty());
        if time_is_empty {
            form.set("time", &self.default_time.format("%H:%M").to_string())?;
        }
        info!("Calendar selection {} written to booking form", date);
        Ok(())
    }

    /// The next `count` selectable days starting at `from`
    pub fn upcoming_business_days(&self, from: NaiveDate, count: usize) -> Vec<NaiveDate> {
        if self.hours.days.is_empty() {
            return Vec::new();
        }
        let days: Vec<NaiveDate> = (0..)
            .map(|offset| from + Duration::days(offset))
            .filter(|day| self.hours.is_business_day(*day))
            .take(count)
            .collect();
        debug!("Upcoming business days from {}: {:?}", from, days);
        days
    }
}
