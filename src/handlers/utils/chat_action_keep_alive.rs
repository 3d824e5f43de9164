// Keeps a chat action ("typing…") visible while a long generation runs.

use teloxide::{
    prelude::*,
    types::{ChatAction, ThreadId},
};
use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{Duration, interval},
};

pub struct ChatActionKeepAlive {
    // Tells the ticker task to stop.
    stop_tx: Option<oneshot::Sender<()>>,

    // The spawned ticker task.
    handle: Option<JoinHandle<()>>,
}

impl ChatActionKeepAlive {
    // Telegram clears a chat action after ~5 s, so `interval_secs` should stay below that.
    pub fn spawn(
        bot: Bot,
        chat_id: ChatId,
        thread_id: Option<ThreadId>,
        action: ChatAction,
        interval_secs: u64,
    ) -> Self {
        // One-shot stop channel; the sender lives in the returned manager.
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            // First tick fires immediately, so the action shows without delay.
            let mut ticker = interval(Duration::from_secs(interval_secs));
            loop {
                tokio::select! {
                    // Re-send the action, keeping it inside the user's topic.
                    _ = ticker.tick() => {
                        let req = bot.send_chat_action(chat_id, action);
                        let req = match thread_id {
                            Some(tid) => req.message_thread_id(tid),
                            None => req,
                        };
                        if let Err(err) = req.await {
                            // Cosmetic only; keep ticking.
                            tracing::warn!("send_chat_action failed: {:?}", err);
                        }
                    }

                    // Stop requested.
                    _ = &mut stop_rx => break,
                }
            }
        });

        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Stop the background task and wait for it to finish.
    pub async fn shutdown(&mut self) {
        // Signal the task; it may already be gone.
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }

        // Wait for it to exit; a join error only means it was aborted.
        if let Some(h) = self.handle.take() {
            let _ = h.await;
        }
    }
}

// Covers early returns that skip `shutdown`.
impl Drop for ChatActionKeepAlive {
    fn drop(&mut self) {
        // Ask the task to stop.
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }

        // Drop can't await, so abort whatever is still running.
        if let Some(h) = &self.handle {
            h.abort();
        }
    }
}
