use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

/// System-wide usage sampled once at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceUsage {
    pub cpu_percent: f32,
    pub memory_used_bytes: u64,
}

/// Narrow seam over ambient system state so runs can be measured without
/// querying globals directly and tests can substitute fixed values.
pub trait ResourceSampler: Send + 'static {
    fn sample(&mut self) -> ResourceUsage;
}

/// [`sysinfo`]-backed sampler.
///
/// CPU usage is measured between two refreshes, so the baseline refresh
/// happens at construction time; `sample` at the end of the run then
/// reports usage over (roughly) the whole run window.
pub struct SystemSampler {
    sys: System,
}

impl SystemSampler {
    pub fn new() -> Self {
        let refresh = RefreshKind::nothing()
            .with_memory(MemoryRefreshKind::everything())
            .with_cpu(CpuRefreshKind::everything());
        let mut sys = System::new_with_specifics(refresh);
        sys.refresh_cpu_usage();

        Self { sys }
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSampler for SystemSampler {
    fn sample(&mut self) -> ResourceUsage {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();

        ResourceUsage {
            cpu_percent: self.sys.global_cpu_usage(),
            memory_used_bytes: self.sys.used_memory(),
        }
    }
}
