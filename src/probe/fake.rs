//! Scripted health probe for tests: hands out a queue of reports and
//! counts how many checks actually ran.

use super::{HealthProbe, HealthReport};
use std::collections::VecDeque;
use std::sync::Mutex;

pub struct FakeProbe {
    reports: Mutex<VecDeque<HealthReport>>,
    fallback: HealthReport,
    pub checks: Mutex<Vec<String>>,
}

impl FakeProbe {
    /// Always report the same thing.
    pub fn always(report: HealthReport) -> Self {
        Self {
            reports: Mutex::new(VecDeque::new()),
            fallback: report,
            checks: Mutex::new(Vec::new()),
        }
    }

    /// Hand out `reports` in order, then keep returning the last one.
    pub fn sequence(reports: Vec<HealthReport>) -> Self {
        let fallback = reports
            .last()
            .copied()
            .unwrap_or_else(HealthReport::unhealthy);
        Self {
            reports: Mutex::new(reports.into()),
            fallback,
            checks: Mutex::new(Vec::new()),
        }
    }

    pub fn check_count(&self) -> usize {
        self.checks.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl HealthProbe for FakeProbe {
    async fn check_health(&self, hostname: &str) -> HealthReport {
        self.checks.lock().unwrap().push(hostname.to_string());
        self.reports
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback)
    }
}
