use crate::error::Result;

/// Destination for claimed record summaries
pub trait Clipboard {
    fn set_text(&mut self, text: &str) -> Result<()>;
}

/// System clipboard via arboard, opened on first write so a missing display
/// only fails the claim, not startup.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        let clipboard = match self.inner.take() {
            Some(c) => c,
            None => arboard::Clipboard::new()?,
        };
        self.inner.insert(clipboard).set_text(text)?;
        Ok(())
    }
}
