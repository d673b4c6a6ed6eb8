//! # Start Parameter Decoder
//!
//! There is no documented wire format for quiz start parameters, so decoding is an
//! ordered list of guesses. The first strategy producing plausible text wins.

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use thiserror::Error;

use crate::domain::types::{DecodeMethod, Decoded, TextEncoding};

/// Accepts input with or without trailing `=`.
const STANDARD_INDIFFERENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Minimum share of non-control characters for decoded text to count as text.
const PRINTABLE_RATIO: f64 = 0.9;

/// Latin-1 maps every byte to a char, so it additionally needs mostly ASCII.
const LATIN1_ASCII_RATIO: f64 = 0.75;

const STRATEGIES: [DecodeMethod; 9] = [
    DecodeMethod::StandardBase64,
    DecodeMethod::UrlSafeBase64,
    DecodeMethod::TranslatedBase64,
    DecodeMethod::PaddedBase64,
    DecodeMethod::ReversedBase64,
    DecodeMethod::Hex,
    DecodeMethod::PercentBytes,
    DecodeMethod::BinaryHeader,
    DecodeMethod::Literal,
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("start parameter is empty")]
    EmptyParameter,

    #[error("all decoding methods failed for '{0}'")]
    Exhausted(String),
}

/// Runs the decode chain over a start parameter.
pub fn decode_quiz_param(param: &str) -> Result<Decoded, DecodeError> {
    let raw = param.trim();
    if raw.is_empty() {
        return Err(DecodeError::EmptyParameter);
    }
    tracing::debug!("Attempting to decode parameter: {}", raw);

    let unquoted = match unescape(raw) {
        Some(bytes) => match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => {
                tracing::warn!("URL decoding produced invalid UTF-8, using raw parameter");
                raw.to_string()
            }
        },
        None => raw.to_string(),
    };

    for method in STRATEGIES {
        match attempt(method, raw, &unquoted) {
            Some((text, encoding)) => {
                tracing::debug!("Successfully decoded using {}", method.as_str());
                return Ok(Decoded {
                    method,
                    encoding,
                    text,
                });
            }
            None => tracing::debug!("{} failed", method.as_str()),
        }
    }

    tracing::warn!("All decoding methods failed for parameter {}", raw);
    Err(DecodeError::Exhausted(raw.to_string()))
}

fn attempt(method: DecodeMethod, raw: &str, unquoted: &str) -> Option<(String, TextEncoding)> {
    match method {
        DecodeMethod::StandardBase64 => STANDARD.decode(pad(unquoted)).ok().and_then(text_of),
        DecodeMethod::UrlSafeBase64 => URL_SAFE.decode(pad(unquoted)).ok().and_then(text_of),
        DecodeMethod::TranslatedBase64 => {
            let translated = unquoted.replace('-', "+").replace('_', "/");
            STANDARD.decode(pad(&translated)).ok().and_then(text_of)
        }
        DecodeMethod::PaddedBase64 => {
            let stripped = unquoted.trim_end_matches('=');
            (0..4).find_map(|n| {
                let candidate = format!("{stripped}{}", "=".repeat(n));
                STANDARD.decode(candidate).ok().and_then(text_of)
            })
        }
        DecodeMethod::ReversedBase64 => {
            let reversed: String = unquoted.chars().rev().collect();
            let translated = reversed.replace('-', "+").replace('_', "/");
            STANDARD_INDIFFERENT
                .decode(translated.trim_start_matches('=').trim_end_matches('='))
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
                .filter(|text| is_plausible(text))
                .map(|text| (text, TextEncoding::Utf8))
        }
        DecodeMethod::Hex => hex::decode(unquoted).ok().and_then(text_of),
        DecodeMethod::PercentBytes => unescape(raw).and_then(text_of),
        DecodeMethod::BinaryHeader => {
            let bytes = lenient_base64(unquoted)?;
            if bytes.len() < 4 || text_of(bytes.clone()).is_some() {
                return None;
            }
            let header = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            Some((
                format!(
                    "Binary data ({} bytes, possible header: {header})",
                    bytes.len()
                ),
                TextEncoding::Utf8,
            ))
        }
        DecodeMethod::Literal => {
            is_plausible(unquoted).then(|| (unquoted.to_string(), TextEncoding::Utf8))
        }
    }
}

/// Pads to a multiple of four with `=`.
fn pad(input: &str) -> String {
    let missing = (4 - input.len() % 4) % 4;
    format!("{input}{}", "=".repeat(missing))
}

/// Standard or URL-safe alphabet, padding optional.
fn lenient_base64(input: &str) -> Option<Vec<u8>> {
    let translated = input.replace('-', "+").replace('_', "/");
    STANDARD_INDIFFERENT
        .decode(translated.trim_end_matches('='))
        .ok()
}

/// UTF-8 when valid, otherwise Latin-1. `None` when the result is not plausible text.
pub fn text_of(bytes: Vec<u8>) -> Option<(String, TextEncoding)> {
    let (text, encoding) = match String::from_utf8(bytes) {
        Ok(text) => (text, TextEncoding::Utf8),
        Err(err) => {
            let bytes = err.into_bytes();
            let ascii = bytes.iter().filter(|b| b.is_ascii()).count();
            if (ascii as f64) < bytes.len() as f64 * LATIN1_ASCII_RATIO {
                return None;
            }
            let latin1: String = bytes.into_iter().map(char::from).collect();
            (latin1, TextEncoding::Latin1)
        }
    };
    is_plausible(&text).then_some((text, encoding))
}

pub fn is_plausible(text: &str) -> bool {
    let total = text.chars().count();
    if total == 0 {
        return false;
    }
    let printable = text
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .count();
    printable as f64 / total as f64 >= PRINTABLE_RATIO
}

/// `%XX` unescaping. `None` when the input has no escapes at all.
fn unescape(input: &str) -> Option<Vec<u8>> {
    input
        .contains('%')
        .then(|| urlencoding::decode_binary(input.as_bytes()).into_owned())
}
