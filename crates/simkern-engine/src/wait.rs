//! Adapter that queues a parked process's resumption as an event.

use crate::process::Process;

/// Resumption of a suspended process.
///
/// `wait_ticks` and `wait_until_ended` wrap the caller in one of these
/// and insert it into the future-event list like any other target; when
/// the driver dispatches it, control goes back to the very same carrier
/// instead of a freshly allocated one.
pub(crate) struct WaitTarget {
    process: Process,
}

impl WaitTarget {
    pub(crate) fn new(process: Process) -> Self {
        Self { process }
    }

    pub(crate) fn process(&self) -> &Process {
        &self.process
    }

    pub(crate) fn into_process(self) -> Process {
        self.process
    }
}
