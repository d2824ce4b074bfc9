use serde::{Deserialize, Serialize};
use sysinfo::{Disks, System};

/// Host metrics reported through `GET /stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub mem_total_kb: u64,
    pub mem_available_kb: u64,
    /// Bytes, summed across mounted disks.
    pub disk_total: u64,
    pub disk_free: u64,
    pub disk_used: u64,
    /// Percent across all cores.
    pub cpu_usage: f32,
    pub cpu_count: usize,
    pub load_one: f64,
    pub load_five: f64,
    pub load_fifteen: f64,
    pub system_name: String,
    pub hostname: String,
    pub task_count: usize,
}

impl Stats {
    pub fn collect(sys: &mut System, task_count: usize) -> Self {
        sys.refresh_memory();
        sys.refresh_cpu_usage();

        let disks = Disks::new_with_refreshed_list();
        let disk_total: u64 = disks.iter().map(|disk| disk.total_space()).sum();
        let disk_free: u64 = disks.iter().map(|disk| disk.available_space()).sum();
        let load = System::load_average();

        Stats {
            mem_total_kb: sys.total_memory() / 1024,
            mem_available_kb: sys.available_memory() / 1024,
            disk_total,
            disk_free,
            disk_used: disk_total.saturating_sub(disk_free),
            cpu_usage: (sys.global_cpu_usage() * 100.0).round() / 100.0,
            cpu_count: sys.cpus().len(),
            load_one: load.one,
            load_five: load.five,
            load_fifteen: load.fifteen,
            system_name: System::name().unwrap_or_else(|| "Unknown".to_string()),
            hostname: System::host_name().unwrap_or_else(|| "Unknown".to_string()),
            task_count,
        }
    }

    pub fn mem_used_kb(&self) -> u64 {
        self.mem_total_kb.saturating_sub(self.mem_available_kb)
    }

    pub fn mem_used_percent(&self) -> f64 {
        if self.mem_total_kb == 0 {
            return 0.0;
        }
        self.mem_used_kb() as f64 / self.mem_total_kb as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_percentages() {
        let stats = Stats {
            mem_total_kb: 1000,
            mem_available_kb: 250,
            ..Default::default()
        };

        assert_eq!(stats.mem_used_kb(), 750);
        assert_eq!(stats.mem_used_percent(), 75.0);
        assert_eq!(Stats::default().mem_used_percent(), 0.0);
    }

    #[test]
    fn collect_reports_task_count() {
        let mut sys = System::new();

        let stats = Stats::collect(&mut sys, 7);

        assert_eq!(stats.task_count, 7);
        assert!(stats.mem_total_kb >= stats.mem_available_kb);
        assert_eq!(stats.disk_used, stats.disk_total - stats.disk_free);
    }
}
