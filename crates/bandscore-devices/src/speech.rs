//! Speech playback stand-ins.

use bandscore_core::traits::SpeechSynthesizer;

/// Writes every utterance to the log instead of a speaker.
#[derive(Debug, Default)]
pub struct LoggingSpeech {
    spoken: usize,
}

impl LoggingSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    /// Utterances requested so far.
    pub fn spoken(&self) -> usize {
        self.spoken
    }
}

impl SpeechSynthesizer for LoggingSpeech {
    fn speak(&mut self, text: &str) {
        self.spoken += 1;
        tracing::info!(target: "bandscore::speech", "speaking: {text}");
    }

    fn cancel(&mut self) {
        tracing::debug!(target: "bandscore::speech", "playback cancelled");
    }

    fn cue(&mut self) {
        tracing::debug!(target: "bandscore::speech", "cue");
    }
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct SilentSpeech;

impl SpeechSynthesizer for SilentSpeech {
    fn speak(&mut self, _text: &str) {}

    fn cancel(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_speech_counts_utterances() {
        let mut speech = LoggingSpeech::new();
        speech.speak("The lecture begins.");
        speech.cancel();
        speech.speak("Repeat after me.");
        assert_eq!(speech.spoken(), 2);
    }
}
