use crate::api::{PanoptoApi, Session};
use crate::Result;

pub mod normalize;

/// Caption text layout, inferred from content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionFormat {
    /// SRT/VTT-style cues with indices and timestamp ranges
    Timed,
    /// Already a plain transcript
    Plain,
}

/// A downloaded caption file
#[derive(Debug, Clone)]
pub struct CaptionDocument {
    pub text: String,
    pub format: CaptionFormat,
}

impl CaptionDocument {
    pub fn new(text: String) -> Self {
        let format = if normalize::is_timed_caption(&text) {
            CaptionFormat::Timed
        } else {
            CaptionFormat::Plain
        };

        Self { text, format }
    }

    /// Plain transcript text for this document
    pub fn into_transcript(self) -> String {
        match self.format {
            CaptionFormat::Timed => normalize::normalize(&self.text),
            CaptionFormat::Plain => self.text,
        }
    }
}

/// Downloads the caption file attached to a session
pub struct CaptionFetcher<'a, A: PanoptoApi + ?Sized> {
    api: &'a A,
}

impl<'a, A: PanoptoApi + ?Sized> CaptionFetcher<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Fetch a session's captions. `Ok(None)` means the session has no captions.
    pub async fn fetch(&self, session: &Session) -> Result<Option<CaptionDocument>> {
        let Some(url) = session.caption_url.as_deref() else {
            tracing::debug!("Session {} has no caption URL", session.id);
            return Ok(None);
        };

        tracing::debug!("Downloading captions for session {}", session.id);
        let text = self.api.fetch_caption(url).await?;

        Ok(Some(CaptionDocument::new(text)))
    }
}
