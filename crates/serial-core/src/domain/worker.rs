//! Identity of the four polling workers.

use std::fmt;

/// One of the four long-lived relay activities.
///
/// ```text
///  device ──ControllerRx──▶ [to-interface]  ──InterfaceTx──▶ client
///  device ◀─ControllerTx─── [to-controller] ◀─InterfaceRx─── client
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerTask {
    /// Reads the device and fills the to-interface mailbox.
    ControllerRx,
    /// Drains the to-controller mailbox into the device.
    ControllerTx,
    /// Reads the TCP client and fills the to-controller mailbox.
    InterfaceRx,
    /// Drains the to-interface mailbox into the TCP client.
    InterfaceTx,
}

impl WorkerTask {
    /// All workers, in spawn order.
    pub const ALL: [WorkerTask; 4] = [
        WorkerTask::ControllerRx,
        WorkerTask::ControllerTx,
        WorkerTask::InterfaceRx,
        WorkerTask::InterfaceTx,
    ];

    /// Stable short name used in log fields.
    pub fn name(self) -> &'static str {
        match self {
            WorkerTask::ControllerRx => "controller-rx",
            WorkerTask::ControllerTx => "controller-tx",
            WorkerTask::InterfaceRx => "interface-rx",
            WorkerTask::InterfaceTx => "interface-tx",
        }
    }
}

impl fmt::Display for WorkerTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_contains_four_distinct_workers() {
        let unique: HashSet<_> = WorkerTask::ALL.iter().copied().collect();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<_> = WorkerTask::ALL.iter().map(|w| w.name()).collect();
        assert_eq!(names.len(), 4);
    }
}
