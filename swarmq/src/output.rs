use crate::cli::OutputFormat;

mod human;
mod json;

pub(crate) trait OutputFormatter: Send + Sync {
    /// Callback wired into the orchestrator's phase transitions.
    fn progress(&self) -> Option<swarmq_core::ProgressFn>;

    /// Stops any live progress rendering before the report is printed.
    fn finish(&self);

    fn print_report(&self, report: &swarmq_core::RunReport) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new()),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
