//! MIME type strings and charset names.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ConfigError;

/// The wildcard MIME type.
pub const ANY: &str = "*/*";
pub const TEXT: &str = "text/plain";
pub const JSON: &str = "application/json";
pub const XML: &str = "application/xml";
pub const BINARY: &str = "application/octet-stream";

pub(crate) const CHARSET_PARAM: &str = "charset";

// RFC 2045 token: anything but whitespace, controls and tspecials
static MIME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*([^\s()<>@,;:\\"/\[\]?=]+)/([^\s()<>@,;:\\"/\[\]?=]+)\s*(?:;(.*))?$"#)
        .expect("MIME pattern is valid")
});

static PARAM_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*([^\s()<>@,;:\\"/\[\]?=]+)\s*=\s*("[^"]*"|[^\s()<>@,;:\\"/\[\]?=]+)\s*$"#)
        .expect("MIME parameter pattern is valid")
});

/// A parsed MIME type: `primary/sub; name=value; ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeType {
    pub primary: String,
    pub sub: String,
    pub params: IndexMap<String, String>,
}

impl MimeType {
    /// Parse a MIME type string.
    ///
    /// Primary and sub types are lowercased, parameter names are lowercased,
    /// quoted parameter values are unquoted.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidMimeType(raw.to_string());

        let captures = MIME_PATTERN.captures(raw).ok_or_else(invalid)?;
        let primary = captures[1].to_ascii_lowercase();
        let sub = captures[2].to_ascii_lowercase();

        let mut params = IndexMap::new();
        if let Some(rest) = captures.get(3) {
            for param in rest.as_str().split(';') {
                if param.trim().is_empty() {
                    continue;
                }
                let parts = PARAM_PATTERN.captures(param).ok_or_else(invalid)?;
                let value = parts[2].trim_matches('"').to_string();
                params.insert(parts[1].to_ascii_lowercase(), value);
            }
        }

        Ok(Self {
            primary,
            sub,
            params,
        })
    }

    /// `primary/sub` without parameters.
    pub fn essence(&self) -> String {
        format!("{}/{}", self.primary, self.sub)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn charset(&self) -> Option<&str> {
        self.param(CHARSET_PARAM)
    }
}

/// Strip parameters from a content type string, `text/xml; charset=UTF-8`
/// becomes `text/xml`.
pub fn strip_params(content_type: &str) -> &str {
    match content_type.find(';') {
        Some(index) => content_type[..index].trim(),
        None => content_type.trim(),
    }
}

/// Supported charsets: canonical name followed by its aliases.
const CHARSETS: &[(&str, &[&str])] = &[
    ("UTF-8", &["utf8", "unicode-1-1-utf-8"]),
    ("UTF-16", &["utf16", "unicode"]),
    ("UTF-16BE", &["utf-16be", "unicodebigunmarked", "x-utf-16be"]),
    ("UTF-16LE", &["utf-16le", "unicodelittleunmarked", "x-utf-16le"]),
    ("UTF-32", &["utf32"]),
    ("US-ASCII", &["ascii", "us", "iso646-us", "ansi_x3.4-1968", "cp367"]),
    ("ISO-8859-1", &["latin1", "l1", "iso8859_1", "iso_8859_1", "iso_8859-1", "cp819", "8859_1"]),
    ("ISO-8859-2", &["latin2", "l2", "iso8859_2", "iso_8859-2"]),
    ("ISO-8859-15", &["latin9", "iso8859_15", "iso_8859-15", "8859_15"]),
    ("windows-1252", &["cp1252", "cp5348"]),
    ("windows-1251", &["cp1251", "cp5347"]),
    ("Shift_JIS", &["sjis", "shift-jis", "ms_kanji", "x-sjis"]),
    ("EUC-JP", &["eucjp", "euc_jp", "x-euc-jp"]),
    ("GBK", &["cp936", "windows-936"]),
    ("GB2312", &["gb2312-80", "euc-cn", "euccn"]),
    ("Big5", &["csbig5", "big-5"]),
    ("KOI8-R", &["koi8_r", "koi8", "cskoi8r"]),
];

/// Canonical name of a supported charset, matching names and aliases case
/// insensitively.
pub fn canonical_charset(name: &str) -> Option<&'static str> {
    let name = name.trim();
    CHARSETS.iter().find_map(|(canonical, aliases)| {
        let matches = canonical.eq_ignore_ascii_case(name)
            || aliases.iter().any(|alias| alias.eq_ignore_ascii_case(name));
        matches.then_some(*canonical)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_charset() {
        let mime = MimeType::parse("Text/Plain; charset=UTF-8").unwrap();
        assert_eq!(mime.essence(), "text/plain");
        assert_eq!(mime.charset(), Some("UTF-8"));
    }

    #[test]
    fn test_parse_quoted_params() {
        let mime = MimeType::parse(r#"multipart/mixed; boundary="a b c"; charset=utf-8"#).unwrap();
        assert_eq!(mime.param("boundary"), Some("a b c"));
        assert_eq!(mime.charset(), Some("utf-8"));
    }

    #[test]
    fn test_parse_wildcard() {
        let mime = MimeType::parse(ANY).unwrap();
        assert_eq!(mime.essence(), ANY);
        assert!(mime.params.is_empty());
    }

    #[test]
    fn test_malformed_mime_types() {
        for raw in ["", "text", "text/", "/plain", "text/plain/extra", "text/plain; charset"] {
            assert!(
                matches!(MimeType::parse(raw), Err(ConfigError::InvalidMimeType(_))),
                "expected '{}' to be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_strip_params() {
        assert_eq!(strip_params("text/xml; charset=UTF-8"), "text/xml");
        assert_eq!(strip_params("application/json"), "application/json");
    }

    #[test]
    fn test_canonical_charset() {
        assert_eq!(canonical_charset("utf-8"), Some("UTF-8"));
        assert_eq!(canonical_charset("Latin1"), Some("ISO-8859-1"));
        assert_eq!(canonical_charset(" ascii "), Some("US-ASCII"));
        assert_eq!(canonical_charset("klingon"), None);
    }
}
