// ABOUTME: Open/closed/minimizing state machine for the widget popup
// ABOUTME: Tracks the unread badge raised by bot messages arriving while not open

use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    Closed,
    Open,
    /// Close animation running; becomes `Closed` when its timer fires
    Minimizing,
}

/// Popup visibility plus the unread-notification flag
#[derive(Debug, Default)]
pub struct VisibilityState {
    state: Visibility,
    unread: bool,
}

impl VisibilityState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Visibility {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == Visibility::Open
    }

    pub fn has_unread(&self) -> bool {
        self.unread
    }

    /// `Closed -> Open`, clearing the badge. Returns true when the caller
    /// should schedule the input-focus request.
    pub fn open(&mut self) -> bool {
        match self.state {
            Visibility::Closed => {
                self.state = Visibility::Open;
                self.unread = false;
                true
            }
            Visibility::Open => false,
            Visibility::Minimizing => {
                debug!("Open ignored while minimizing");
                false
            }
        }
    }

    /// `Open -> Minimizing`. Returns true when the caller should schedule
    /// the end of the close animation; re-entrant calls return false.
    pub fn close(&mut self) -> bool {
        match self.state {
            Visibility::Open => {
                self.state = Visibility::Minimizing;
                true
            }
            Visibility::Minimizing => {
                debug!("Close ignored while already minimizing");
                false
            }
            Visibility::Closed => false,
        }
    }

    /// Close animation finished.
    pub fn finish_close(&mut self) {
        if self.state == Visibility::Minimizing {
            self.state = Visibility::Closed;
        }
    }

    /// Record an appended bot message. Returns true if the badge was newly
    /// raised. The panel is still on screen while minimizing.
    pub fn note_bot_message(&mut self) -> bool {
        if self.state != Visibility::Closed || self.unread {
            return false;
        }
        self.unread = true;
        true
    }
}
