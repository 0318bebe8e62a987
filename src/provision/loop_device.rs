//! Shell commands that allocate and reclaim file-backed loop devices.

use shell_escape::unix::escape;

/// Loop devices created on each host during setup, in host order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LoopAllocation {
    entries: Vec<(String, Vec<String>)>,
}

impl LoopAllocation {
    /// Creates an empty allocation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `device` for `host`, keeping first-seen host order.
    pub fn push(&mut self, host: &str, device: String) {
        if !self.entries.iter().any(|(name, _)| name == host) {
            self.entries.push((host.to_owned(), Vec::new()));
        }
        if let Some((_, devices)) = self.entries.iter_mut().find(|(name, _)| name == host) {
            devices.push(device);
        }
    }

    /// Returns the devices recorded for `host`.
    #[must_use]
    pub fn devices(&self, host: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(name, _)| name == host)
            .map_or(&[], |(_, devices)| devices.as_slice())
    }

    /// Iterates hosts and their devices in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(host, devices)| (host.as_str(), devices.as_slice()))
    }

    /// Returns the number of devices across all hosts.
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.entries.iter().map(|(_, devices)| devices.len()).sum()
    }
}

/// Returns the path prefix of backing files for `cluster`.
#[must_use]
pub fn backing_file_prefix(cluster: &str) -> String {
    format!("/LOOP{cluster}-")
}

/// Builds the command that creates the next free backing file of `size` for
/// `cluster`, attaches it to a free loop device and prints the device path.
#[must_use]
pub fn create_command(cluster: &str, size: &str) -> String {
    let file = format!("{}$i", backing_file_prefix(cluster));
    format!(
        "i=0; while [ -f {file} ]; do i=$(($i+1)); done && truncate -s {} {file} && losetup -f --show {file}",
        escape(size.into())
    )
}

/// Builds the command that prints the backing file of `device`.
#[must_use]
pub fn backing_file_command(device: &str) -> String {
    format!(
        "losetup --list -Oback-file --noheadings {}",
        escape(device.into())
    )
}

/// Builds the command that detaches `device`.
#[must_use]
pub fn detach_command(device: &str) -> String {
    format!("losetup -d {}", escape(device.into()))
}

/// Builds the command that removes `backing_file`.
#[must_use]
pub fn remove_command(backing_file: &str) -> String {
    format!("rm {}", escape(backing_file.into()))
}
