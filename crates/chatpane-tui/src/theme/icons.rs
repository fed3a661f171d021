//! Icon sets for Nerd Fonts, Unicode, and ASCII fallback.

use chatpane_engine::{IconStyle, MessageStatus};

/// Icon mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IconMode {
    /// Nerd Font icons.
    Nerd,
    /// Standard Unicode symbols (default, wide compatibility).
    #[default]
    Unicode,
    /// ASCII-only fallback (also used with `NO_COLOR`).
    Ascii,
}

impl From<IconStyle> for IconMode {
    fn from(style: IconStyle) -> Self {
        match style {
            IconStyle::Nerd => Self::Nerd,
            IconStyle::Unicode => Self::Unicode,
            IconStyle::Ascii => Self::Ascii,
        }
    }
}

/// Icon set based on configured mode.
#[derive(Debug, Clone)]
pub struct IconSet {
    mode: IconMode,
}

impl Default for IconSet {
    fn default() -> Self {
        Self::new(IconMode::default())
    }
}

impl IconSet {
    pub fn new(mode: IconMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> IconMode {
        self.mode
    }

    // === Delivery Status ===

    pub fn pending(&self) -> &'static str {
        match self.mode {
            IconMode::Nerd => "󰥔",
            IconMode::Unicode => "◷",
            IconMode::Ascii => "..",
        }
    }

    pub fn sent(&self) -> &'static str {
        match self.mode {
            IconMode::Nerd => "󰄬",
            IconMode::Unicode => "✓",
            IconMode::Ascii => "ok",
        }
    }

    pub fn failed(&self) -> &'static str {
        match self.mode {
            IconMode::Nerd => "󰅖",
            IconMode::Unicode => "✗",
            IconMode::Ascii => "!!",
        }
    }

    /// Icon for a message status.
    pub fn status(&self, status: MessageStatus) -> &'static str {
        match status {
            MessageStatus::Pending => self.pending(),
            MessageStatus::Sent => self.sent(),
            MessageStatus::Failed => self.failed(),
        }
    }

    // === Navigation ===

    pub fn selected(&self) -> &'static str {
        match self.mode {
            IconMode::Nerd => "󰅂",
            IconMode::Unicode => "▸",
            IconMode::Ascii => ">",
        }
    }

    pub fn unread(&self) -> &'static str {
        match self.mode {
            IconMode::Nerd => "󰇘",
            IconMode::Unicode => "●",
            IconMode::Ascii => "*",
        }
    }

    pub fn search(&self) -> &'static str {
        match self.mode {
            IconMode::Nerd => "󰍉",
            IconMode::Unicode => "⌕",
            IconMode::Ascii => "/",
        }
    }

    pub fn send(&self) -> &'static str {
        match self.mode {
            IconMode::Nerd => "󰒊",
            IconMode::Unicode => "➤",
            IconMode::Ascii => ">>",
        }
    }

    /// Separator between footer sections.
    pub fn separator(&self) -> &'static str {
        match self.mode {
            IconMode::Nerd | IconMode::Unicode => " │ ",
            IconMode::Ascii => " | ",
        }
    }
}
