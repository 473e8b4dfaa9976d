use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccuracyVerdict {
    pub accurate: bool,
    /// False when no evaluation actually ran.
    pub verified: bool,
    pub feedback: String,
}

/// Accuracy gate in front of the fix pipeline. It performs no evaluation and
/// always reports the image as accurate; `verified` stays false so callers and
/// event logs can tell the check was bypassed.
pub fn verify_accuracy_bypassed(_image: &str, _context: &str) -> AccuracyVerdict {
    AccuracyVerdict {
        accurate: true,
        verified: false,
        feedback: "accuracy verification bypassed".to_string(),
    }
}
