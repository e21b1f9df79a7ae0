use thiserror::Error;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::debug;

use crate::application::render::EngineProvider;

use super::{DisplaySurface, HighlightCode, WidgetEvent};

#[derive(Debug, Error)]
pub enum WidgetRuntimeError {
    #[error("widget task has stopped")]
    Closed,
    #[error("widget task failed: {0}")]
    Join(String),
}

/// Host-side handle of a widget running on its own task.
///
/// Events are queued and coalesced: every event already waiting when the task
/// wakes is applied before a single render, so at most one render is in flight
/// per widget and the latest attributes always win.
pub struct WidgetHandle {
    events: mpsc::UnboundedSender<WidgetEvent>,
    committed: watch::Receiver<DisplaySurface>,
    task: JoinHandle<()>,
}

impl WidgetHandle {
    pub fn send(&self, event: WidgetEvent) -> Result<(), WidgetRuntimeError> {
        self.events
            .send(event)
            .map_err(|_| WidgetRuntimeError::Closed)
    }

    pub fn set_attribute(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), WidgetRuntimeError> {
        self.send(WidgetEvent::set(name, value))
    }

    /// Receiver that observes every commit.
    pub fn subscribe(&self) -> watch::Receiver<DisplaySurface> {
        self.committed.clone()
    }

    /// Latest committed surface.
    pub fn current(&self) -> DisplaySurface {
        self.committed.borrow().clone()
    }

    /// Stop accepting events, let queued events finish, and return the final surface.
    pub async fn close(self) -> Result<DisplaySurface, WidgetRuntimeError> {
        let Self {
            events,
            committed,
            task,
        } = self;
        drop(events);
        task.await
            .map_err(|err| WidgetRuntimeError::Join(err.to_string()))?;
        let surface = committed.borrow().clone();
        Ok(surface)
    }
}

/// Move `widget` onto a tokio task driven by [`WidgetEvent`]s.
pub fn spawn_widget<P>(widget: HighlightCode<P>) -> WidgetHandle
where
    P: EngineProvider + 'static,
{
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (committed_tx, committed_rx) = watch::channel(widget.surface().clone());
    let task = tokio::spawn(drive(widget, events_rx, committed_tx));

    WidgetHandle {
        events: events_tx,
        committed: committed_rx,
        task,
    }
}

async fn drive<P: EngineProvider>(
    mut widget: HighlightCode<P>,
    mut events: mpsc::UnboundedReceiver<WidgetEvent>,
    committed: watch::Sender<DisplaySurface>,
) {
    while let Some(event) = events.recv().await {
        let mut needs_render = widget.apply(event);
        let mut coalesced = 0usize;
        while let Ok(next) = events.try_recv() {
            needs_render |= widget.apply(next);
            coalesced += 1;
        }

        if needs_render {
            if coalesced > 0 {
                debug!(
                    target = "application::widget::runtime",
                    coalesced, "coalesced queued events into one render"
                );
            }
            let surface = widget.render().clone();
            committed.send_replace(surface);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queued_events_render_once() {
        let handle = spawn_widget(HighlightCode::new());
        let mut commits = handle.subscribe();

        handle.set_attribute("code", "a = 1").expect("send");
        handle.set_attribute("language", "python").expect("send");
        handle.send(WidgetEvent::Attached).expect("send");

        commits.changed().await.expect("commit");
        let surface = commits.borrow_and_update().clone();
        assert_eq!(surface.commits(), 1);
        assert!(surface.has_class("language-python"));

        let last = handle.close().await.expect("close");
        assert_eq!(last.commits(), 1);
    }

    #[tokio::test]
    async fn closed_handle_reports_final_surface() {
        let handle = spawn_widget(HighlightCode::new());
        handle.set_attribute("markdown", "# One").expect("send");
        let surface = handle.close().await.expect("close");

        assert!(surface.inner_html().contains("<h1>One</h1>"));
    }
}
