use crate::shared::frame::Frame;

/// What the live loop should do after a frame has been shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayControl {
    Continue,
    /// The viewer asked to end the session (window closed, quit key).
    Stop,
}

/// Presents processed live frames to the user.
pub trait FrameDisplay: Send {
    fn show(&mut self, frame: &Frame) -> Result<DisplayControl, Box<dyn std::error::Error>>;
}
