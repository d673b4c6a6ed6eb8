//! # Deep Links
//!
//! Parses bot deep links (`https://t.me/<bot>?start=<param>`) and the bare
//! parameters users paste into chat or the API.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use url::Url;

const LINK_HOSTS: [&str; 2] = ["t.me", "telegram.me"];

static START_FALLBACK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"start=([^&#\s]+)").expect("valid regex"));

static LINK_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:https?://)?(?:www\.)?(?:t|telegram)\.me/\S+").expect("valid regex")
});

/// Punctuation that ends a sentence rather than a link.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', '!', '?', ')', ']', '>', '"', '\''];

static BARE_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid regex"));

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LinkError {
    #[error("no URL given")]
    Empty,

    #[error("not a valid URL: {0}")]
    Invalid(String),

    #[error("unsupported host '{0}'")]
    UnsupportedHost(String),

    #[error("link does not name a bot")]
    MissingBot,

    #[error("link points at @{found}, expected @{expected}")]
    WrongBot { expected: String, found: String },

    #[error("could not find start parameter in URL")]
    MissingStartParam,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLink {
    pub bot: String,
    pub start_param: String,
}

/// Parses a `t.me` / `telegram.me` deep link. A missing scheme is tolerated.
pub fn parse_deep_link(input: &str) -> Result<DeepLink, LinkError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(LinkError::Empty);
    }

    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{input}")
    };
    let url = Url::parse(&with_scheme).map_err(|e| LinkError::Invalid(e.to_string()))?;

    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if !LINK_HOSTS.contains(&host) {
        return Err(LinkError::UnsupportedHost(host.to_string()));
    }

    let bot = url
        .path_segments()
        .and_then(|mut segments| segments.next())
        .map(|s| s.trim_start_matches('@'))
        .filter(|s| !s.is_empty())
        .ok_or(LinkError::MissingBot)?
        .to_string();

    let start_param = url
        .query_pairs()
        .find(|(key, _)| key == "start")
        .map(|(_, value)| value.into_owned())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            START_FALLBACK
                .captures(input)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        })
        .ok_or(LinkError::MissingStartParam)?;

    Ok(DeepLink { bot, start_param })
}

/// Like [`parse_deep_link`], but also insists on the expected bot.
pub fn parse_quiz_link(input: &str, expected_bot: &str) -> Result<DeepLink, LinkError> {
    let link = parse_deep_link(input)?;
    if !link.bot.eq_ignore_ascii_case(expected_bot) {
        return Err(LinkError::WrongBot {
            expected: expected_bot.to_string(),
            found: link.bot,
        });
    }
    Ok(link)
}

/// Accepts either a full deep link or a bare start parameter.
pub fn resolve_reference(input: &str, expected_bot: &str) -> Result<String, LinkError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(LinkError::Empty);
    }
    if BARE_PARAM.is_match(input) {
        return Ok(input.to_string());
    }
    parse_quiz_link(input, expected_bot).map(|link| link.start_param)
}

/// Short alphanumeric parameters reference server-side state instead of carrying a payload.
pub fn is_short_code(param: &str, max_len: usize) -> bool {
    !param.is_empty()
        && param.len() < max_len
        && !param.starts_with('{')
        && BARE_PARAM.is_match(param)
}

/// Finds the first deep link to `bot` inside free text and returns its start parameter.
/// Candidates go through [`parse_quiz_link`], so chat and API agree on the parameter.
pub fn find_quiz_link(text: &str, bot: &str) -> Option<String> {
    LINK_IN_TEXT.find_iter(text).find_map(|m| {
        let candidate = m.as_str().trim_end_matches(TRAILING_PUNCTUATION);
        parse_quiz_link(candidate, bot)
            .ok()
            .map(|link| link.start_param)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_standard_link() {
        let link = parse_deep_link("https://t.me/QuizBot?start=abcDEF123").unwrap();
        assert_eq!(link.bot, "QuizBot");
        assert_eq!(link.start_param, "abcDEF123");
    }

    #[test]
    fn test_parse_without_scheme_and_alt_host() {
        let link = parse_deep_link("telegram.me/QuizBot?start=xyz&foo=bar").unwrap();
        assert_eq!(link.bot, "QuizBot");
        assert_eq!(link.start_param, "xyz");

        let link = parse_deep_link("https://www.t.me/QuizBot?start=q1").unwrap();
        assert_eq!(link.start_param, "q1");
    }

    #[test]
    fn test_query_values_are_form_decoded() {
        let link = parse_deep_link("https://t.me/QuizBot?start=eyJ0aXRsZSI6IkEifQ%3D%3D").unwrap();
        assert_eq!(link.start_param, "eyJ0aXRsZSI6IkEifQ==");
    }

    #[test]
    fn test_rejects_foreign_host() {
        assert_eq!(
            parse_deep_link("https://example.com/QuizBot?start=abc"),
            Err(LinkError::UnsupportedHost("example.com".to_string()))
        );
    }

    #[test]
    fn test_missing_parts() {
        assert_eq!(parse_deep_link("   "), Err(LinkError::Empty));
        assert_eq!(parse_deep_link("https://t.me/"), Err(LinkError::MissingBot));
        assert_eq!(
            parse_deep_link("https://t.me/QuizBot"),
            Err(LinkError::MissingStartParam)
        );
    }

    #[test]
    fn test_wrong_bot() {
        let err = parse_quiz_link("https://t.me/OtherBot?start=abc", "QuizBot").unwrap_err();
        assert!(matches!(err, LinkError::WrongBot { .. }));
        assert!(parse_quiz_link("https://t.me/quizbot?start=abc", "QuizBot").is_ok());
    }

    #[test]
    fn test_resolve_reference() {
        assert_eq!(resolve_reference("abc_DEF-1", "QuizBot").unwrap(), "abc_DEF-1");
        assert_eq!(
            resolve_reference("https://t.me/QuizBot?start=zz9", "QuizBot").unwrap(),
            "zz9"
        );
        assert!(resolve_reference("not a link", "QuizBot").is_err());
    }

    #[test]
    fn test_short_code_heuristic() {
        assert!(is_short_code("abcDEF123", 12));
        assert!(!is_short_code("abcDEF123456", 12));
        assert!(!is_short_code("{\"a\":1}", 12));
        assert!(!is_short_code("ab=c", 12));
        assert!(!is_short_code("", 12));
    }

    #[test]
    fn test_find_quiz_link_in_text() {
        let text = "please check https://t.me/QuizBot?start=Ab12_x thanks";
        assert_eq!(find_quiz_link(text, "QuizBot").as_deref(), Some("Ab12_x"));
        assert_eq!(find_quiz_link("https://t.me/Other?start=1", "QuizBot"), None);
    }

    #[test]
    fn test_find_quiz_link_matches_parse() {
        let url = "https://t.me/QuizBot?start=eyJhIjoxfQ%3D%3D";
        let text = format!("look: {url}.");
        let found = find_quiz_link(&text, "QuizBot");
        assert_eq!(found.as_deref(), Some("eyJhIjoxfQ=="));
        assert_eq!(found, Some(parse_quiz_link(url, "QuizBot").unwrap().start_param));

        let text = "t.me/Other?start=1 and t.me/QuizBot?start=%7B%22a%22%3A1%7D";
        assert_eq!(find_quiz_link(text, "QuizBot").as_deref(), Some(r#"{"a":1}"#));
    }
}
