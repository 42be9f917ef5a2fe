//! Console panel state.
//!
//! Consecutive entries with the same kind, timestamp and message collapse
//! into one [`ConsoleGroup`] with a repeat count.
//!
//! ## Virtual Scroll
//!
//! Only a window of `view_len` groups is handed to the page at a time. While
//! the view is pinned to the bottom every push scrolls to the newest group;
//! paging up unpins it until the user pages back down to the end. The page
//! pages with the `console_page_*` host commands.

use playground_core::{LogEntry, LogKind};
use playground_protocol::{ConsoleRow, MessageKind};

/// Default number of groups in the visible window
pub const VIEW_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleGroup {
    pub entry: LogEntry,
    pub count: usize,
}

impl ConsoleGroup {
    pub fn to_row(&self) -> ConsoleRow {
        ConsoleRow {
            kind: match self.entry.kind {
                LogKind::Log => MessageKind::Log,
                LogKind::Warn => MessageKind::Warn,
                LogKind::Error => MessageKind::Error,
            },
            message: self.entry.message.clone(),
            timestamp: self.entry.timestamp.clone(),
            count: self.count,
        }
    }
}

/// Group a sequence of entries. Only adjacent entries merge.
pub fn group_entries(entries: &[LogEntry]) -> Vec<ConsoleGroup> {
    let mut groups: Vec<ConsoleGroup> = Vec::new();
    for entry in entries {
        push_grouped(&mut groups, entry.clone());
    }
    groups
}

fn push_grouped(groups: &mut Vec<ConsoleGroup>, entry: LogEntry) {
    match groups.last_mut() {
        Some(last) if last.entry.groups_with(&entry) => last.count += 1,
        _ => groups.push(ConsoleGroup { entry, count: 1 }),
    }
}

#[derive(Debug)]
pub struct ConsolePanel {
    /// Raw entries of the current run
    entries: Vec<LogEntry>,

    /// Grouped view of `entries`, maintained incrementally
    groups: Vec<ConsoleGroup>,

    /// Size of the visible window
    view_len: usize,

    /// Start index for virtual scroll view (0 = at top)
    view_start: usize,

    /// Whether view is pinned to bottom (auto-scroll on new output)
    view_pinned_to_bottom: bool,
}

impl Default for ConsolePanel {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsolePanel {
    pub fn new() -> Self {
        Self::with_view_len(VIEW_LEN)
    }

    pub fn with_view_len(view_len: usize) -> Self {
        Self {
            entries: Vec::new(),
            groups: Vec::new(),
            view_len: view_len.max(1),
            view_start: 0,
            view_pinned_to_bottom: true,
        }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn groups(&self) -> &[ConsoleGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Discard everything. Does not touch the sandbox.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.groups.clear();
        self.view_start = 0;
        self.view_pinned_to_bottom = true;
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry.clone());
        push_grouped(&mut self.groups, entry);

        if self.view_pinned_to_bottom {
            self.scroll_to_end();
        }
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = LogEntry>) {
        for entry in entries {
            self.push(entry);
        }
    }

    pub fn error_count(&self) -> usize {
        self.entries.iter().filter(|e| e.kind == LogKind::Error).count()
    }

    pub fn warning_count(&self) -> usize {
        self.entries.iter().filter(|e| e.kind == LogKind::Warn).count()
    }

    // ========================================================================
    // Virtual Scroll
    // ========================================================================

    /// Groups inside the current window
    pub fn visible_groups(&self) -> &[ConsoleGroup] {
        if self.groups.is_empty() {
            return &[];
        }
        let start = self.view_start.min(self.groups.len().saturating_sub(1));
        let end = (start + self.view_len).min(self.groups.len());
        &self.groups[start..end]
    }

    pub fn is_pinned(&self) -> bool {
        self.view_pinned_to_bottom
    }

    pub fn can_scroll_up(&self) -> bool {
        self.view_start > 0
    }

    pub fn can_scroll_down(&self) -> bool {
        self.view_start + self.view_len < self.groups.len()
    }

    pub fn scroll_page_up(&mut self) {
        if self.view_start > 0 {
            self.view_start = self.view_start.saturating_sub(self.view_len);
            self.view_pinned_to_bottom = false;
        }
    }

    pub fn scroll_page_down(&mut self) {
        if self.can_scroll_down() {
            self.view_start = (self.view_start + self.view_len).min(self.groups.len().saturating_sub(self.view_len));
            if self.view_start + self.view_len >= self.groups.len() {
                self.view_pinned_to_bottom = true;
            }
        }
    }

    pub fn scroll_to_start(&mut self) {
        self.view_start = 0;
        self.view_pinned_to_bottom = false;
    }

    /// Show the newest groups and follow new output
    pub fn scroll_to_end(&mut self) {
        self.view_start = self.groups.len().saturating_sub(self.view_len);
        self.view_pinned_to_bottom = true;
    }

    /// e.g. "101-300 of 500", or None when everything fits
    pub fn scroll_info(&self) -> Option<String> {
        if self.groups.len() <= self.view_len {
            return None;
        }
        let start = self.view_start + 1;
        let end = (self.view_start + self.view_len).min(self.groups.len());
        Some(format!("{}-{} of {}", start, end, self.groups.len()))
    }

    /// Wire rows for the visible window
    pub fn rows(&self) -> Vec<ConsoleRow> {
        self.visible_groups().iter().map(ConsoleGroup::to_row).collect()
    }
}
