pub mod citations;
pub mod popup;
pub mod session;

pub use citations::{parse_answer, Citation, ParsedAnswer, Segment};
pub use popup::{CitationPopupController, PopupEvent, PopupState, Rect, ScreenPosition};
pub use session::{ChatSession, HttpChatClient, SubmitOutcome, FAILURE_MESSAGE};
