// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Clinic-local time: which day it is, what hour it is, when a day ends.

use chrono::{
    DateTime, Days, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Timelike, Utc,
};
use frontdesk_core::FrontdeskError;

/// Converts UTC instants into the clinic's fixed local offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClinicCalendar {
    offset: FixedOffset,
}

impl ClinicCalendar {
    pub fn new(utc_offset_minutes: i32) -> Result<Self, FrontdeskError> {
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
            FrontdeskError::Config(format!(
                "utc offset of {utc_offset_minutes} minutes is out of range"
            ))
        })?;
        Ok(Self { offset })
    }

    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    pub fn local(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        now.with_timezone(&self.offset)
    }

    /// The clinic-local calendar day containing `now`.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local(now).date_naive()
    }

    pub fn local_hour(&self, now: DateTime<Utc>) -> u32 {
        self.local(now).hour()
    }

    pub fn local_time(&self, now: DateTime<Utc>) -> NaiveTime {
        self.local(now).time()
    }

    /// The UTC instant at which local `day` ends (next local midnight).
    pub fn end_of_day(&self, day: NaiveDate) -> Result<DateTime<Utc>, FrontdeskError> {
        let next = day
            .checked_add_days(Days::new(1))
            .ok_or_else(|| FrontdeskError::Validation(format!("day {day} is out of range")))?;
        self.offset
            .from_local_datetime(&next.and_time(NaiveTime::MIN))
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| FrontdeskError::Internal(format!("no local midnight after {day}")))
    }
}
