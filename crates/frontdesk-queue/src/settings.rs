// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolved queue settings, parsed once from configuration.

use chrono::NaiveTime;
use frontdesk_config::model::FrontdeskConfig;
use frontdesk_config::parse_clock_time;
use frontdesk_core::types::QueueDefaults;
use frontdesk_core::FrontdeskError;

use crate::admission::{AdmissionPolicy, CapacityTable};
use crate::calendar::ClinicCalendar;

#[derive(Debug, Clone)]
pub struct QueueSettings {
    pub calendar: ClinicCalendar,
    /// Applied to daily queues created on first reference.
    pub defaults: QueueDefaults,
    pub admission: AdmissionPolicy,
    /// Days of identity bindings kept before purging.
    pub binding_retention_days: u32,
}

impl QueueSettings {
    pub fn from_config(config: &FrontdeskConfig) -> Result<Self, FrontdeskError> {
        let queue = &config.queue;
        let online_end_time = parse_clock_time(&queue.online_end_time).ok_or_else(|| {
            FrontdeskError::Config(format!(
                "queue.online_end_time `{}` is not HH:MM",
                queue.online_end_time
            ))
        })?;
        Ok(Self {
            calendar: ClinicCalendar::new(config.clinic.utc_offset_minutes)?,
            defaults: QueueDefaults {
                start_number: queue.default_start_number.max(1),
                online_end_time,
            },
            admission: AdmissionPolicy::new(queue.start_hour, CapacityTable::from_config(queue)),
            binding_retention_days: queue.binding_retention_days,
        })
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            calendar: ClinicCalendar::utc(),
            defaults: QueueDefaults {
                start_number: 1,
                online_end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN),
            },
            admission: AdmissionPolicy::new(7, CapacityTable::new(50)),
            binding_retention_days: 2,
        }
    }
}
