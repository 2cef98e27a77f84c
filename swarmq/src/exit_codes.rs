#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// The run completed but neither pool connected anything.
    DegradedRun = 10,

    /// Invalid CLI flags/values.
    InvalidInput = 30,

    /// Internal/runtime error (task failures, panics caught at top-level).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn from_report(report: &swarmq_core::RunReport) -> Self {
        if report.connected {
            Self::Success
        } else {
            Self::DegradedRun
        }
    }
}
