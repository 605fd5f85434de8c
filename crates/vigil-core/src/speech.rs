use anyhow::Result;
use async_trait::async_trait;
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
#[cfg(test)]
use mockall::automock;

/// The speech capability the session talks through. Implemented by the
/// bridge adapter in the service; mocked in tests so coordinator behavior
/// can be verified without a live companion.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SpeechIo: Send {
    /// Requests synthesis of `text`. Fire-and-forget; no audio is consumed
    /// back.
    async fn synthesize(&mut self, text: &str, voice: Option<String>) -> Result<()>;

    /// Begins continuous recognition. Starting an already-running stream is
    /// a no-op on the companion side.
    async fn start_listening(&mut self) -> Result<()>;

    /// Stops recognition. May fail if the stream was never started; the
    /// coordinator swallows that.
    async fn stop_listening(&mut self) -> Result<()>;

    /// Voice names the companion's platform offers. May be empty.
    fn voices(&self) -> Vec<String>;
}

/// One increment from the recognition stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionSegment {
    pub is_final: bool,
    pub text: String,
}

impl RecognitionSegment {
    /// Returns the trimmed text only for finalized, non-empty segments.
    /// Interim partials are discarded and never stored.
    pub fn final_text(&self) -> Option<&str> {
        if !self.is_final {
            return None;
        }
        let text = self.text.trim();
        (!text.is_empty()).then_some(text)
    }
}

/// Drives synthesis and recognition over an injected `SpeechIo` port.
///
/// Voice selection matches the preferred name fuzzily against whatever the
/// platform offers, falling back to the first available voice. With no
/// voices at all synthesis is skipped without error, degrading the session
/// to silent questions.
pub struct SpeechCoordinator<S: SpeechIo> {
    io: S,
    preferred_voice: String,
    matcher: SkimMatcherV2,
}

impl<S: SpeechIo> SpeechCoordinator<S> {
    pub fn new(io: S, preferred_voice: impl Into<String>) -> Self {
        Self {
            io,
            preferred_voice: preferred_voice.into(),
            matcher: SkimMatcherV2::default(),
        }
    }

    pub async fn speak(&mut self, text: &str) -> Result<()> {
        let voices = self.io.voices();
        if voices.is_empty() {
            tracing::debug!("no synthesis voices available, skipping");
            return Ok(());
        }
        let voice = self.select_voice(&voices).to_string();
        self.io.synthesize(text, Some(voice)).await
    }

    /// Best fuzzy match against the preferred name, or the first voice.
    fn select_voice<'a>(&self, voices: &'a [String]) -> &'a str {
        voices
            .iter()
            .filter_map(|v| {
                self.matcher
                    .fuzzy_match(v, &self.preferred_voice)
                    .map(|score| (score, v))
            })
            .max_by_key(|(score, _)| *score)
            .map(|(_, v)| v.as_str())
            .unwrap_or_else(|| voices[0].as_str())
    }

    pub async fn begin_listening(&mut self) -> Result<()> {
        self.io.start_listening().await
    }

    /// Safe to call when recognition was never started or already stopped.
    pub async fn end_listening(&mut self) {
        if let Err(e) = self.io.stop_listening().await {
            tracing::debug!("stop_listening ignored: {e:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_text_discards_interim_and_blank_segments() {
        let interim = RecognitionSegment {
            is_final: false,
            text: "I was say".to_string(),
        };
        assert_eq!(interim.final_text(), None);

        let blank = RecognitionSegment {
            is_final: true,
            text: "   ".to_string(),
        };
        assert_eq!(blank.final_text(), None);

        let finalized = RecognitionSegment {
            is_final: true,
            text: " I was saying that ".to_string(),
        };
        assert_eq!(finalized.final_text(), Some("I was saying that"));
    }

    #[tokio::test]
    async fn test_speak_prefers_matching_voice() {
        let mut io = MockSpeechIo::new();
        io.expect_voices().return_const(vec![
            "Microsoft Zira".to_string(),
            "Google US English".to_string(),
            "Google UK English Male".to_string(),
        ]);
        io.expect_synthesize()
            .withf(|text, voice| {
                text == "Question one." && voice.as_deref() == Some("Google US English")
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let mut coordinator = SpeechCoordinator::new(io, "Google US English");
        coordinator.speak("Question one.").await.unwrap();
    }

    #[tokio::test]
    async fn test_speak_falls_back_to_first_voice() {
        let mut io = MockSpeechIo::new();
        io.expect_voices()
            .return_const(vec!["Samantha".to_string(), "Fred".to_string()]);
        io.expect_synthesize()
            .withf(|_, voice| voice.as_deref() == Some("Samantha"))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut coordinator = SpeechCoordinator::new(io, "Google US English");
        coordinator.speak("Question one.").await.unwrap();
    }

    #[tokio::test]
    async fn test_speak_with_no_voices_skips_without_error() {
        let mut io = MockSpeechIo::new();
        io.expect_voices().return_const(Vec::<String>::new());
        io.expect_synthesize().never();

        let mut coordinator = SpeechCoordinator::new(io, "Google US English");
        assert!(coordinator.speak("Question one.").await.is_ok());
    }

    #[tokio::test]
    async fn test_end_listening_swallows_errors() {
        let mut io = MockSpeechIo::new();
        io.expect_stop_listening()
            .times(2)
            .returning(|| Err(anyhow::anyhow!("recognition was never started")));

        let mut coordinator = SpeechCoordinator::new(io, "Google US English");
        // The no-throw guarantee holds however many times this is called.
        coordinator.end_listening().await;
        coordinator.end_listening().await;
    }
}
