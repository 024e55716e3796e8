//! One-shot user-facing messages (toasts).

use std::cell::Cell;
use std::rc::Rc;

use crate::store::{Store, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub text: String,
}

/// Queue of undismissed notices; the UI renders and dismisses them.
#[derive(Clone, Default)]
pub struct NoticeBoard {
    next_id: Rc<Cell<u64>>,
    notices: Store<Vec<Notice>>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, level: NoticeLevel, text: impl Into<String>) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let notice = Notice { id, level, text: text.into() };
        self.notices.update(|list| list.push(notice));
        id
    }

    pub fn info(&self, text: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Info, text)
    }

    pub fn success(&self, text: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Success, text)
    }

    pub fn error(&self, text: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Error, text)
    }

    pub fn dismiss(&self, id: u64) {
        self.notices.update(|list| list.retain(|n| n.id != id));
    }

    pub fn current(&self) -> Vec<Notice> {
        self.notices.get()
    }

    /// Take everything queued so far (CLI output).
    pub fn drain(&self) -> Vec<Notice> {
        let taken = self.notices.get();
        if !taken.is_empty() {
            self.notices.set(Vec::new());
        }
        taken
    }

    pub fn subscribe(&self, callback: impl Fn(&Vec<Notice>) + 'static) -> Subscription {
        self.notices.subscribe(callback)
    }
}

impl std::fmt::Debug for NoticeBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.notices.get()).finish()
    }
}
