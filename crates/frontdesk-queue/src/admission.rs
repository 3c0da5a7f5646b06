// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admission window: time-of-day gate, open flag, and daily capacity.
//!
//! Each gate yields its own [`RejectionCode`] so callers can tell a patient
//! exactly why a join was refused.

use std::collections::HashMap;

use frontdesk_config::model::QueueConfig;
use frontdesk_core::types::{DailyQueue, QueueStats};
use frontdesk_core::{AdmissionRejection, RejectionCode};

/// Daily capacity per resource, resolved through its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityTable {
    default_max_per_day: u32,
    per_category: HashMap<String, u32>,
    categories: HashMap<String, String>,
}

impl CapacityTable {
    pub fn new(default_max_per_day: u32) -> Self {
        Self {
            default_max_per_day,
            per_category: HashMap::new(),
            categories: HashMap::new(),
        }
    }

    pub fn from_config(config: &QueueConfig) -> Self {
        Self {
            default_max_per_day: config.default_max_per_day,
            per_category: config.max_per_day.clone(),
            categories: config.resource_categories.clone(),
        }
    }

    pub fn with_category(mut self, category: &str, max_per_day: u32) -> Self {
        self.per_category.insert(category.to_string(), max_per_day);
        self
    }

    pub fn with_resource(mut self, resource_id: &str, category: &str) -> Self {
        self.categories
            .insert(resource_id.to_string(), category.to_string());
        self
    }

    pub fn category(&self, resource_id: &str) -> Option<&str> {
        self.categories.get(resource_id).map(String::as_str)
    }

    /// Daily capacity for `resource_id`, falling back to the default.
    pub fn max_per_day(&self, resource_id: &str) -> u32 {
        self.category(resource_id)
            .and_then(|category| self.per_category.get(category))
            .copied()
            .unwrap_or(self.default_max_per_day)
    }

    /// Resources with an explicit category mapping.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }
}

/// Decides whether a new join is currently allowed.
#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    start_hour: u32,
    capacity: CapacityTable,
}

impl AdmissionPolicy {
    pub fn new(start_hour: u32, capacity: CapacityTable) -> Self {
        Self {
            start_hour,
            capacity,
        }
    }

    pub fn start_hour(&self) -> u32 {
        self.start_hour
    }

    pub fn capacity(&self) -> &CapacityTable {
        &self.capacity
    }

    fn rejection(
        &self,
        code: RejectionCode,
        queue: &DailyQueue,
        stats: &QueueStats,
    ) -> AdmissionRejection {
        let max_per_day = self.capacity.max_per_day(&queue.scope.resource_id);
        let issued = stats.issued();
        AdmissionRejection {
            code,
            max_per_day,
            issued,
            remaining: max_per_day.saturating_sub(issued),
            opens_at_hour: self.start_hour,
        }
    }

    /// Gates 1 and 2: local hour and the queue's open flag.
    pub fn check_window(
        &self,
        queue: &DailyQueue,
        stats: &QueueStats,
        local_hour: u32,
    ) -> Result<(), AdmissionRejection> {
        if local_hour < self.start_hour {
            return Err(self.rejection(RejectionCode::TooEarly, queue, stats));
        }
        if !queue.is_open {
            return Err(self.rejection(RejectionCode::QueueClosed, queue, stats));
        }
        Ok(())
    }

    /// Gate 3: tickets issued so far must be below the daily capacity.
    pub fn check_capacity(
        &self,
        queue: &DailyQueue,
        stats: &QueueStats,
    ) -> Result<(), AdmissionRejection> {
        let max_per_day = self.capacity.max_per_day(&queue.scope.resource_id);
        if stats.issued() >= max_per_day {
            return Err(self.rejection(RejectionCode::QueueFull, queue, stats));
        }
        Ok(())
    }

    /// All three gates in order.
    pub fn can_join(
        &self,
        queue: &DailyQueue,
        stats: &QueueStats,
        local_hour: u32,
    ) -> Result<(), AdmissionRejection> {
        self.check_window(queue, stats, local_hour)?;
        self.check_capacity(queue, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Utc};
    use frontdesk_core::types::{Scope, TicketCounters};

    fn queue(resource: &str, is_open: bool) -> DailyQueue {
        DailyQueue {
            scope: Scope::parse(resource, "2026-03-14").unwrap(),
            start_number: 1,
            is_open,
            opened_at: None,
            online_end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            created_at: Utc::now(),
        }
    }

    fn stats(last_ticket: Option<u32>) -> QueueStats {
        QueueStats::from_counters(
            1,
            &TicketCounters {
                last_ticket,
                ..TicketCounters::default()
            },
        )
    }

    fn policy() -> AdmissionPolicy {
        let capacity = CapacityTable::new(50)
            .with_category("dentist", 2)
            .with_resource("dr-lee", "dentist");
        AdmissionPolicy::new(7, capacity)
    }

    #[test]
    fn capacity_resolves_through_category() {
        let table = policy().capacity().clone();
        assert_eq!(table.max_per_day("dr-lee"), 2);
        assert_eq!(table.max_per_day("dr-unknown"), 50);
        let unmapped_category = CapacityTable::new(9).with_resource("dr-x", "surgeon");
        assert_eq!(unmapped_category.max_per_day("dr-x"), 9);
    }

    #[test]
    fn too_early_before_start_hour() {
        let err = policy()
            .can_join(&queue("dr-lee", true), &stats(None), 6)
            .unwrap_err();
        assert_eq!(err.code, RejectionCode::TooEarly);
        assert_eq!(err.opens_at_hour, 7);
        assert!(policy().can_join(&queue("dr-lee", true), &stats(None), 7).is_ok());
    }

    #[test]
    fn closed_queue_rejected() {
        let err = policy()
            .can_join(&queue("dr-lee", false), &stats(None), 9)
            .unwrap_err();
        assert_eq!(err.code, RejectionCode::QueueClosed);
    }

    #[test]
    fn full_queue_reports_context() {
        assert!(policy().can_join(&queue("dr-lee", true), &stats(Some(1)), 9).is_ok());
        let err = policy()
            .can_join(&queue("dr-lee", true), &stats(Some(2)), 9)
            .unwrap_err();
        assert_eq!(err.code, RejectionCode::QueueFull);
        assert_eq!((err.max_per_day, err.issued, err.remaining), (2, 2, 0));
    }

    #[test]
    fn time_gate_checked_before_capacity() {
        let err = policy()
            .can_join(&queue("dr-lee", false), &stats(Some(2)), 3)
            .unwrap_err();
        assert_eq!(err.code, RejectionCode::TooEarly);
    }
}
