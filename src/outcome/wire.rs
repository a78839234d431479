//! # Wire encoding of failure outcomes.
//!
//! A worker classifies its failure locally and ships the outcome to the controller as a
//! small JSON envelope:
//!
//! ```text
//! {"v":1,"outcome":{"kind":"recoverable","reason":"...","retry_after":{"secs":1,"nanos":0}}}
//! {"v":1,"outcome":{"kind":"non_recoverable","reason":"..."}}
//! ```
//!
//! ## Rules
//! - The tag and the optional `retry_after` survive a round trip unchanged.
//! - `decode` reports every problem as a [`CodecError`]; it never guesses a kind.
//! - `decode_or_recoverable` is what the controller uses: undecodable payloads become a
//!   recoverable outcome, so a transport glitch is never mistaken for a fatal decision.

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, TaskError};
use crate::outcome::{FailureOutcome, classify};

/// Current envelope version.
pub const WIRE_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct Envelope {
    v: u8,
    outcome: FailureOutcome,
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    v: u8,
    outcome: &'a FailureOutcome,
}

/// Encodes an outcome for transport.
pub fn encode(outcome: &FailureOutcome) -> Result<Vec<u8>, CodecError> {
    let envelope = EnvelopeRef {
        v: WIRE_VERSION,
        outcome,
    };
    Ok(serde_json::to_vec(&envelope)?)
}

/// Worker side: classifies `err` and encodes the result.
pub fn encode_error(err: &TaskError) -> Result<Vec<u8>, CodecError> {
    encode(&classify(err))
}

/// Decodes an outcome, reporting malformed or unsupported payloads.
pub fn decode(bytes: &[u8]) -> Result<FailureOutcome, CodecError> {
    let envelope: Envelope = serde_json::from_slice(bytes)?;
    if envelope.v != WIRE_VERSION {
        return Err(CodecError::UnsupportedVersion {
            found: envelope.v,
            expected: WIRE_VERSION,
        });
    }
    Ok(envelope.outcome)
}

/// Controller side: decodes an outcome, routing any decode failure to recoverable.
pub fn decode_or_recoverable(bytes: &[u8]) -> FailureOutcome {
    match decode(bytes) {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(
                error = %e,
                label = e.as_label(),
                bytes = bytes.len(),
                "undecodable failure outcome; treating as recoverable"
            );
            FailureOutcome::recoverable(format!("undecodable failure outcome: {e}"), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::FailureKind;
    use std::time::Duration;

    #[test]
    fn round_trip_preserves_tag_and_retry_after() {
        let cases = [
            FailureOutcome::recoverable("flaky", None),
            FailureOutcome::recoverable("busy", Some(Duration::from_millis(1500))),
            FailureOutcome::recoverable("tiny", Some(Duration::new(0, 7))),
            FailureOutcome::non_recoverable("Failing task on user defined exception"),
        ];
        for outcome in cases {
            let bytes = encode(&outcome).unwrap();
            assert_eq!(decode(&bytes).unwrap(), outcome);
        }
    }

    #[test]
    fn worker_side_encoding_of_user_error() {
        let bytes = encode_error(&TaskError::non_recoverable("fatal")).unwrap();
        assert_eq!(
            decode(&bytes).unwrap(),
            FailureOutcome::non_recoverable("fatal")
        );
    }

    #[test]
    fn missing_tag_is_an_error_not_a_kind() {
        let err = decode(br#"{"v":1,"outcome":{"reason":"x"}}"#).unwrap_err();
        assert_eq!(err.as_label(), "codec_json");
    }

    #[test]
    fn unknown_version_is_rejected() {
        let err = decode(br#"{"v":9,"outcome":{"kind":"non_recoverable","reason":"x"}}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::UnsupportedVersion { found: 9, .. }
        ));
    }

    #[test]
    fn decode_failures_fall_back_to_recoverable() {
        for bytes in [
            &b""[..],
            b"{",
            br#"{"v":1,"outcome":{"kind":"exploded","reason":"x"}}"#,
            br#"{"v":2,"outcome":{"kind":"non_recoverable","reason":"x"}}"#,
        ] {
            let outcome = decode_or_recoverable(bytes);
            assert_eq!(outcome.kind(), FailureKind::Recoverable);
            assert_eq!(outcome.retry_after(), None);
        }
    }
}
