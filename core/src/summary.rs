use crate::CaseOutcome;

/// Running totals for one architecture
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteSummary {
    pub arch: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Already included in `passed`
    pub skipped: usize,
}

impl SuiteSummary {
    pub fn new(arch: impl Into<String>) -> Self {
        Self {
            arch: arch.into(),
            ..Self::default()
        }
    }

    pub fn record(&mut self, outcome: &CaseOutcome) {
        self.total += 1;
        if outcome.is_pass() {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        if matches!(outcome, CaseOutcome::Skipped) {
            self.skipped += 1;
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}
