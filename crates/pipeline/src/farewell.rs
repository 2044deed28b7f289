//! End-of-call intent detection
//!
//! A turn is a "wants to end" signal when the lowercased, trimmed message
//! contains any phrase of the closing set as a substring. No word-boundary
//! or exact-match requirement: "ok eso es todo gracias mañana" matches
//! "eso es todo gracias". The check is local and runs regardless of whether
//! the generation provider succeeds.

/// Closing phrases for the service locale (Spanish), comma variants included.
static CLOSING_PHRASES: &[&str] = &[
    "eso es todo gracias",
    "eso es todo, gracias",
    "gracias eso es todo",
    "gracias, eso es todo",
    "eso es todo",
    "gracias, hasta luego",
    "hasta luego",
    "adiós",
    "chao",
    "nos vemos",
    "ya está todo",
    "perfecto gracias",
    "perfecto, gracias",
    "gracias perfecto",
    "listo gracias",
    "listo, gracias",
];

/// Detects caller farewell intent on raw utterance text.
#[derive(Debug, Clone, Default)]
pub struct FarewellDetector;

impl FarewellDetector {
    pub fn new() -> Self {
        Self
    }

    /// True when the message contains any closing phrase as a substring,
    /// case-insensitively.
    pub fn wants_to_end(&self, message: &str) -> bool {
        let message = message.to_lowercase();
        let message = message.trim();
        CLOSING_PHRASES.iter().any(|phrase| message.contains(phrase))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_phrases_match() {
        let detector = FarewellDetector::new();
        assert!(detector.wants_to_end("eso es todo gracias"));
        assert!(detector.wants_to_end("gracias, hasta luego"));
        assert!(detector.wants_to_end("adiós"));
    }

    #[test]
    fn substring_and_case_insensitive() {
        let detector = FarewellDetector::new();
        assert!(detector.wants_to_end("ok eso es todo gracias mañana"));
        assert!(detector.wants_to_end("  ESO ES TODO, GRACIAS  "));
        assert!(detector.wants_to_end("bueno chao pues"));
    }

    #[test]
    fn ordinary_turns_do_not_match() {
        let detector = FarewellDetector::new();
        assert!(!detector.wants_to_end("¿cuánto cuesta el envío?"));
        assert!(!detector.wants_to_end("gracias por el dato, ¿y el horario?"));
        assert!(!detector.wants_to_end(""));
    }
}
