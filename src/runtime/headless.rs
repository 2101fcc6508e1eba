use super::{BrowserRuntime, RuntimeError};
use crate::events::WindowEvent;
use crate::history::HistoryState;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use tokio::sync::mpsc;

/// Most recent events kept by [`HeadlessRuntime::emitted`].
pub const EMITTED_CAPACITY: usize = 256;

/// One session history entry. `state` is `None` for the initial document load.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub state: Option<HistoryState>,
    pub url: String,
}

#[derive(Debug)]
struct SessionHistory {
    entries: Vec<HistoryEntry>,
    index: usize,
}

/// In-memory runtime used by the CLI driver and the tests.
///
/// History behaves like the browser's session history: `push_state`
/// truncates the forward branch, `back`/`forward` move the cursor and return
/// the state a `popstate` event would carry.
pub struct HeadlessRuntime {
    event_tx: RwLock<Option<mpsc::UnboundedSender<WindowEvent>>>,
    emitted: Mutex<VecDeque<WindowEvent>>,
    history: Mutex<SessionHistory>,
    storage: Mutex<HashMap<String, String>>,
}

impl HeadlessRuntime {
    pub fn new() -> Self {
        Self {
            event_tx: RwLock::new(None),
            emitted: Mutex::new(VecDeque::new()),
            history: Mutex::new(SessionHistory {
                entries: vec![HistoryEntry {
                    state: None,
                    url: "/".to_string(),
                }],
                index: 0,
            }),
            storage: Mutex::new(HashMap::new()),
        }
    }

    /// Forward emitted events to a channel in addition to recording them.
    pub fn with_event_tx(self, event_tx: mpsc::UnboundedSender<WindowEvent>) -> Self {
        *self.event_tx.write() = Some(event_tx);
        self
    }

    /// Replace the event sender (used when each CLI step needs a fresh channel)
    pub fn replace_event_tx(&self, new_tx: mpsc::UnboundedSender<WindowEvent>) {
        *self.event_tx.write() = Some(new_tx);
    }

    /// Stop forwarding events. Dropping the returned sender ends the receiver.
    pub fn take_event_tx(&self) -> Option<mpsc::UnboundedSender<WindowEvent>> {
        self.event_tx.write().take()
    }

    /// Events emitted since the last `clear_emitted`, oldest first, at most
    /// `EMITTED_CAPACITY` of them.
    pub fn emitted(&self) -> Vec<WindowEvent> {
        self.emitted.lock().iter().cloned().collect()
    }

    pub fn clear_emitted(&self) {
        self.emitted.lock().clear();
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().entries.len()
    }

    pub fn current_entry(&self) -> HistoryEntry {
        let history = self.history.lock();
        history.entries[history.index].clone()
    }

    /// Move one entry back. Returns the popstate payload, or `None` at the start.
    pub fn back(&self) -> Option<Option<HistoryState>> {
        let mut history = self.history.lock();
        if history.index == 0 {
            return None;
        }
        history.index -= 1;
        Some(history.entries[history.index].state.clone())
    }

    /// Move one entry forward. Returns the popstate payload, or `None` at the end.
    pub fn forward(&self) -> Option<Option<HistoryState>> {
        let mut history = self.history.lock();
        if history.index + 1 >= history.entries.len() {
            return None;
        }
        history.index += 1;
        Some(history.entries[history.index].state.clone())
    }
}

impl Default for HeadlessRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserRuntime for HeadlessRuntime {
    fn emit(&self, event: WindowEvent) -> Result<(), RuntimeError> {
        {
            let mut emitted = self.emitted.lock();
            if emitted.len() == EMITTED_CAPACITY {
                emitted.pop_front();
            }
            emitted.push_back(event.clone());
        }
        if let Some(tx) = self.event_tx.read().as_ref() {
            tx.send(event).map_err(|_| RuntimeError::ReceiverClosed)?;
        }
        Ok(())
    }

    fn push_state(&self, state: &HistoryState, url: &str) -> Result<(), RuntimeError> {
        let mut history = self.history.lock();
        let keep = history.index + 1;
        history.entries.truncate(keep);
        history.entries.push(HistoryEntry {
            state: Some(state.clone()),
            url: url.to_string(),
        });
        history.index = history.entries.len() - 1;
        Ok(())
    }

    fn replace_state(&self, state: &HistoryState, url: &str) -> Result<(), RuntimeError> {
        let mut history = self.history.lock();
        let index = history.index;
        history.entries[index] = HistoryEntry {
            state: Some(state.clone()),
            url: url.to_string(),
        };
        Ok(())
    }

    fn session_get(&self, key: &str) -> Option<String> {
        self.storage.lock().get(key).cloned()
    }

    fn session_set(&self, key: &str, value: &str) -> Result<(), RuntimeError> {
        self.storage
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), RuntimeError> {
        // Dropping the sender closes the CLI's output loop
        drop(self.take_event_tx());
        Ok(())
    }
}
