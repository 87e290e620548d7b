use crate::client::citations::Citation;

/// Gap between a citation control and the popup drawn above it, in pixels.
pub const DEFAULT_POPUP_MARGIN: f32 = 8.0;

/// On-screen bounding box of a citation control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPosition {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum PopupState {
    #[default]
    Closed,
    Open {
        citation: Citation,
        position: ScreenPosition,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PopupEvent {
    /// A resolved citation control was activated.
    Activate { citation: Citation, anchor: Rect },
    Close,
    /// Any interaction with the background scrim.
    ScrimPressed,
    /// The user left the conversation view.
    Navigate,
}

/// Holds at most one open citation popup.
#[derive(Debug, Clone)]
pub struct CitationPopupController {
    state: PopupState,
    margin: f32,
}

impl Default for CitationPopupController {
    fn default() -> Self {
        Self::new(DEFAULT_POPUP_MARGIN)
    }
}

impl CitationPopupController {
    pub fn new(margin: f32) -> Self {
        Self {
            state: PopupState::Closed,
            margin,
        }
    }

    pub fn state(&self) -> &PopupState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, PopupState::Open { .. })
    }

    /// The scrim is drawn exactly while a popup is open.
    pub fn scrim_visible(&self) -> bool {
        self.is_open()
    }

    pub fn handle(&mut self, event: PopupEvent) -> &PopupState {
        self.state = match event {
            PopupEvent::Activate { citation, anchor } => PopupState::Open {
                citation,
                position: ScreenPosition {
                    x: anchor.x,
                    y: anchor.y - self.margin,
                },
            },
            PopupEvent::Close | PopupEvent::ScrimPressed | PopupEvent::Navigate => {
                PopupState::Closed
            }
        };
        &self.state
    }
}
