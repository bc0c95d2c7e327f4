use std::sync::Mutex;

pub use tokio_util::sync::CancellationToken;

use crate::error::LoadError;

/// First-wins error slot for the tasks of one pipeline.
///
/// Recording an error cancels the pipeline's token; later errors are logged and discarded.
#[derive(Debug)]
pub(crate) struct ErrorSlot {
    first: Mutex<Option<LoadError>>,
    token: CancellationToken,
}

impl ErrorSlot {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self {
            first: Mutex::new(None),
            token,
        }
    }

    pub(crate) fn record(&self, err: LoadError) {
        let mut first = self.first.lock().expect("error slot mutex poisoned");
        match first.as_ref() {
            None => *first = Some(err),
            Some(_) if err.is_cancelled() => {}
            Some(kept) => {
                tracing::debug!(kept = %kept, discarded = %err, "pipeline already failed")
            }
        }
        self.token.cancel();
    }

    pub(crate) fn into_inner(self) -> Option<LoadError> {
        self.first.into_inner().expect("error slot mutex poisoned")
    }
}
