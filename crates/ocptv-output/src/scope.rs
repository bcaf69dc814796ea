use std::thread;

/// Runs `on_unwind` if dropped while the thread is panicking.
///
/// Scopes create one around the user body and drop it before writing the
/// regular end record, so the end record is written exactly once.
pub(crate) struct UnwindGuard<F: FnOnce()> {
    on_unwind: Option<F>,
}

impl<F: FnOnce()> UnwindGuard<F> {
    pub(crate) fn new(on_unwind: F) -> Self {
        Self {
            on_unwind: Some(on_unwind),
        }
    }
}

impl<F: FnOnce()> Drop for UnwindGuard<F> {
    fn drop(&mut self) {
        if thread::panicking() {
            if let Some(on_unwind) = self.on_unwind.take() {
                on_unwind();
            }
        }
    }
}
