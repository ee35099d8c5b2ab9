//! Mock HID report delivery.
//!
//! Stands in for a driver-side report sink: logs each report at trace level
//! (one per poll cycle would flood `info`) and keeps a copy for tests.

use crate::backend::{BackendError, ReportDelivery};
use log::trace;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredReport {
    pub timestamp_us: u64,
    pub bytes: Vec<u8>,
}

/// Recording report sink. Clones share one log.
#[derive(Clone, Debug, Default)]
pub struct MockReportDelivery {
    reports: Arc<Mutex<Vec<DeliveredReport>>>,
}

impl MockReportDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<DeliveredReport> {
        self.reports.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last(&self) -> Option<DeliveredReport> {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }
}

impl ReportDelivery for MockReportDelivery {
    fn deliver_input_report(&self, timestamp_us: u64, report: &[u8]) -> Result<(), BackendError> {
        trace!("[MOCK HID] t={}us report={:02x?}", timestamp_us, report);
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(DeliveredReport {
                timestamp_us,
                bytes: report.to_vec(),
            });
        Ok(())
    }
}
