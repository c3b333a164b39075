use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::{
    host::{NativeToken, Thunk},
    registry::Registry,
    types::TaskId,
};

/// The live submission behind a running handle.
pub(crate) struct Submission {
    pub(crate) id: TaskId,
    pub(crate) token: NativeToken,
    /// Registry of the facade that made the submission.
    pub(crate) registry: Arc<Registry>,
}

impl Submission {
    pub(crate) fn belongs_to(&self, registry: &Arc<Registry>) -> bool {
        Arc::ptr_eq(&self.registry, registry)
    }
}

pub(crate) struct HandleInner {
    body: Arc<dyn Fn() + Send + Sync>,
    running: AtomicBool,
    periodic: AtomicBool,
    current: Mutex<Option<Submission>>,
}

impl HandleInner {
    pub(crate) fn lock(&self) -> MutexGuard<'_, Option<Submission>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    pub(crate) fn set_periodic(&self, periodic: bool) {
        self.periodic.store(periodic, Ordering::Release);
    }

    /// Drop the submission if it is still `id`. Used by cancel-by-id and
    /// when a one-shot task finishes.
    pub(crate) fn clear_if(&self, id: TaskId) -> bool {
        let mut current = self.lock();
        if current.as_ref().is_some_and(|s| s.id == id) {
            *current = None;
            self.set_running(false);
            true
        } else {
            false
        }
    }
}

/// One unit of work, owned by the caller that created it.
///
/// A handle is submitted through a [`TaskFacade`](crate::TaskFacade). It can
/// only carry one live submission at a time; once cancelled, or once a
/// one-shot run has finished, it may be submitted again and receives a
/// fresh id.
///
/// Any `Fn() + Send + Sync` closure is a valid body, so a plain callback
/// needs no adapter type.
pub struct TaskHandle {
    inner: Arc<HandleInner>,
}

impl TaskHandle {
    pub fn new(body: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                body: Arc::new(body),
                running: AtomicBool::new(false),
                periodic: AtomicBool::new(false),
                current: Mutex::new(None),
            }),
        }
    }

    /// True from submission until cancellation, or until a one-shot run ends.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Whether the most recent submission was a repeating one.
    pub fn is_periodic(&self) -> bool {
        self.inner.periodic.load(Ordering::Acquire)
    }

    /// Identifier of the live submission, if any.
    pub fn task_id(&self) -> Option<TaskId> {
        self.inner.lock().as_ref().map(|s| s.id)
    }

    /// Backend-native token of the live submission, for host interop.
    pub fn native_token(&self) -> Option<NativeToken> {
        self.inner.lock().as_ref().map(|s| s.token.clone())
    }

    pub(crate) fn inner(&self) -> &HandleInner {
        &self.inner
    }

    pub(crate) fn downgrade(&self) -> Weak<HandleInner> {
        Arc::downgrade(&self.inner)
    }

    /// A host-side thunk sharing this handle's body.
    pub(crate) fn thunk(&self) -> Thunk {
        let body = Arc::clone(&self.inner.body);
        Box::new(move || body())
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("task_id", &self.task_id())
            .field("running", &self.is_running())
            .field("periodic", &self.is_periodic())
            .finish()
    }
}
