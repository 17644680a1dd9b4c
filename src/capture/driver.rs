//! Async driver for [`SelectionCapture`]
//!
//! Events come in over an mpsc channel; the debounce deadline is awaited with
//! `sleep_until`. The loop ends when the sender side is dropped, at which
//! point the capture is destroyed.

use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use super::{CaptureEvent, SelectionCapture, TextSelection};
use crate::tree::SelectionSource;

pub async fn run<T, F>(
    mut capture: SelectionCapture<T::Node, F>,
    tree: Arc<RwLock<T>>,
    mut events: mpsc::Receiver<CaptureEvent>,
) where
    T: SelectionSource,
    F: FnMut(TextSelection<T::Node>),
{
    loop {
        let deadline = capture.next_deadline();
        let wake = sleep_until(deadline.unwrap_or_else(Instant::now));

        tokio::select! {
            event = events.recv() => match event {
                Some(event) => capture.handle_event(event, Instant::now()),
                None => break,
            },
            _ = wake, if deadline.is_some() => {
                let tree = tree.read().await;
                capture.poll(&*tree, Instant::now());
            }
        }
    }

    debug!("Selection event channel closed");
    capture.destroy();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureOptions;
    use crate::tree::{ContentTree, LiveRange, OrderedTree};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_driver_debounces_and_reports() {
        let mut content = ContentTree::new("article");
        let root = content.root();
        let leaf = content.append_text(root, "Hello brave world").unwrap();
        content.select(Some(LiveRange::new(leaf, 6, leaf, 11)));
        let tree = Arc::new(RwLock::new(content));

        let (selection_tx, mut selection_rx) = mpsc::unbounded_channel();
        let capture = SelectionCapture::start(
            root,
            move |s: TextSelection<_>| {
                let _ = selection_tx.send(s.text);
            },
            CaptureOptions::default(),
        );

        let (event_tx, event_rx) = mpsc::channel(8);
        let handle = tokio::spawn(run(capture, Arc::clone(&tree), event_rx));

        event_tx.send(CaptureEvent::PointerUp).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        event_tx.send(CaptureEvent::PointerUp).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        // Second event restarted the window, nothing reported yet
        assert!(selection_rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(selection_rx.recv().await.as_deref(), Some("brave"));

        drop(event_tx);
        handle.await.unwrap();
        assert!(selection_rx.recv().await.is_none());
    }
}
