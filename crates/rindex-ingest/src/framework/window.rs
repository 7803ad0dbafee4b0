//! Date windows for search APIs that cap how deep one query can page
//!
//! NCBI esearch stops at 9 999 results and RePORTER at offset 14 999. When a
//! query matches more than that, the connector narrows it with a date filter
//! and bisects the range until every window fits under the cap.

use chrono::{Days, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    /// Inclusive
    pub to: NaiveDate,
}

impl DateWindow {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }

    /// Older and newer halves; `None` once the window is a single day
    pub fn split(&self) -> Option<(DateWindow, DateWindow)> {
        let span = (self.to - self.from).num_days();
        if span < 1 {
            return None;
        }
        let mid = self.from.checked_add_days(Days::new(u64::try_from(span / 2).ok()?))?;
        Some((Self::new(self.from, mid), Self::new(mid.succ_opt()?, self.to)))
    }
}

/// Windows still to visit, newest first
#[derive(Debug)]
pub struct WindowStack {
    pending: Vec<DateWindow>,
}

impl WindowStack {
    pub fn new(window: DateWindow) -> Self {
        Self {
            pending: vec![window],
        }
    }

    pub fn pop(&mut self) -> Option<DateWindow> {
        self.pending.pop()
    }

    /// Queue both halves of `window`. False when it cannot be split further.
    pub fn split(&mut self, window: DateWindow) -> bool {
        match window.split() {
            Some((older, newer)) => {
                self.pending.push(older);
                self.pending.push(newer);
                true
            },
            None => false,
        }
    }
}
