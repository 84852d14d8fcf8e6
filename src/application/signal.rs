use std::sync::Arc;

use tokio::sync::watch;

/// Notification raised by child controllers after a transaction mutation.
///
/// Holds a generation counter; the owner of the matching [`RefreshReceiver`]
/// refreshes balances whenever the counter moved since it last looked.
#[derive(Clone)]
pub struct RefreshSignal {
    sender: Arc<watch::Sender<u64>>,
}

/// Observing half of a [`RefreshSignal`].
pub struct RefreshReceiver {
    receiver: watch::Receiver<u64>,
}

impl RefreshSignal {
    pub fn channel() -> (RefreshSignal, RefreshReceiver) {
        let (sender, receiver) = watch::channel(0);
        (
            RefreshSignal {
                sender: Arc::new(sender),
            },
            RefreshReceiver { receiver },
        )
    }

    pub fn notify(&self) {
        self.sender.send_modify(|generation| *generation += 1);
    }
}

impl RefreshReceiver {
    /// Consume a pending notification. Returns true at most once per batch of
    /// notifications raised since the previous call.
    pub fn take(&mut self) -> bool {
        match self.receiver.has_changed() {
            Ok(true) => {
                self.receiver.borrow_and_update();
                true
            }
            _ => false,
        }
    }
}
