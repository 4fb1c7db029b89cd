//! Single-writer holder of the current [`UiState`]
//!
//! Every change goes through [`StateContainer::update`], which runs the
//! closure against the current snapshot under the channel's write lock and
//! then notifies observers once. Observers never see a half-applied change.

use crate::ui::state::UiState;
use tokio::sync::watch;

#[derive(Debug)]
pub struct StateContainer {
    sender: watch::Sender<UiState>,
}

impl StateContainer {
    pub fn new(initial: UiState) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Clone of the current snapshot
    pub fn snapshot(&self) -> UiState {
        self.sender.borrow().clone()
    }

    /// Read part of the current snapshot without cloning all of it
    pub fn read<R>(&self, f: impl FnOnce(&UiState) -> R) -> R {
        f(&self.sender.borrow())
    }

    /// Compute the next snapshot from the current one and publish it
    ///
    /// The closure must not call back into the container.
    pub fn update(&self, f: impl FnOnce(&mut UiState)) {
        self.sender.send_modify(f);
    }

    /// Receiver notified on every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.sender.subscribe()
    }
}

impl Default for StateContainer {
    fn default() -> Self {
        Self::new(UiState::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_publishes_whole_snapshot() {
        let container = StateContainer::default();
        let mut rx = container.subscribe();

        container.update(|s| {
            s.search_query = "tv".into();
            s.is_refreshing = true;
        });

        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen.search_query, "tv");
        assert!(seen.is_refreshing);
        assert_eq!(container.snapshot(), seen);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let container = StateContainer::default();
        let before = container.snapshot();
        container.update(|s| s.search_query = "printer".into());
        assert_eq!(before.search_query, "");
        assert_eq!(container.read(|s| s.search_query.clone()), "printer");
    }

    #[tokio::test]
    async fn test_observer_wakes_on_change() {
        let container = std::sync::Arc::new(StateContainer::default());
        let mut rx = container.subscribe();

        let writer = container.clone();
        tokio::spawn(async move {
            writer.update(|s| s.bulk_operation_in_progress = true);
        });

        let state = rx.wait_for(|s| s.bulk_operation_in_progress).await.unwrap();
        assert!(state.bulk_operation_in_progress);
    }
}
