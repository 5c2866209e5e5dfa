//! The unit of domain work the kernel executes.

use std::fmt;
use std::sync::Arc;

use simkern_core::ProcessError;

use crate::manager::EventManager;

/// Executable domain work bound to the kernel.
///
/// A target runs on a [`Process`](crate::Process) carrier when its event
/// is dispatched. It may suspend itself any number of times through the
/// manager it is handed; each suspension returns
/// [`ProcessError::Terminated`] if the process was cancelled while
/// parked, which the target should propagate with `?`.
///
/// Targets are compared by identity (the `Arc` allocation), not by value:
/// [`EventManager::interrupt`] and
/// [`EventManager::schedule_single_process`] look for the exact `Arc`
/// that was scheduled.
pub trait ProcessTarget: Send + Sync {
    /// Short description used in trace output.
    fn description(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }

    /// Run the work. Called on a carrier thread holding control of `evt`.
    fn process(&self, evt: &EventManager) -> Result<(), ProcessError>;
}

/// Whether two target handles refer to the same allocation.
pub(crate) fn same_target(a: &Arc<dyn ProcessTarget>, b: &Arc<dyn ProcessTarget>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// A [`ProcessTarget`] built from a closure.
pub struct FnTarget<F> {
    description: String,
    f: F,
}

impl<F> FnTarget<F>
where
    F: Fn(&EventManager) -> Result<(), ProcessError> + Send + Sync,
{
    /// Wrap `f` with a description for tracing.
    pub fn new(description: impl Into<String>, f: F) -> Self {
        Self {
            description: description.into(),
            f,
        }
    }
}

impl<F> FnTarget<F>
where
    F: Fn(&EventManager) -> Result<(), ProcessError> + Send + Sync + 'static,
{
    /// Wrap `f` and erase it into a shareable target handle.
    pub fn shared(description: impl Into<String>, f: F) -> Arc<dyn ProcessTarget> {
        Arc::new(Self::new(description, f))
    }
}

impl<F> ProcessTarget for FnTarget<F>
where
    F: Fn(&EventManager) -> Result<(), ProcessError> + Send + Sync,
{
    fn description(&self) -> String {
        self.description.clone()
    }

    fn process(&self, evt: &EventManager) -> Result<(), ProcessError> {
        (self.f)(evt)
    }
}

impl<F> fmt::Debug for FnTarget<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTarget")
            .field("description", &self.description)
            .finish()
    }
}
