//! RFC 2397 `data:` URL parsing and lenient real-world decoding.
//!
//! Grounded on `DataURLFile.__init__` in the reference HTML scanner:
//! unescape HTML entities, then percent-decode, over the *entire* URL
//! text before splitting out the mediatype/parameters/payload. Invalid
//! URLs never raise — they decode to an empty byte buffer.

use std::sync::OnceLock;

use base64::Engine;
use regex::Regex;

fn data_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)^data:([^;,"']+/[^;,"']+)?((?:;[^;,"']*)*),(.*)$"#).unwrap()
    })
}

#[derive(Debug, Clone)]
pub struct DataUrl {
    pub mime_type: String,
    pub encoding: String,
    pub is_base64: bool,
    payload: String,
    valid: bool,
}

impl DataUrl {
    /// Parse a literal `data:` URL (as it appears verbatim in the
    /// document, HTML-entity-encoded and percent-encoded).
    pub fn parse(raw: &str) -> Self {
        let unescaped = html_escape::decode_html_entities(raw);
        let decoded = percent_encoding::percent_decode_str(&unescaped)
            .decode_utf8_lossy()
            .into_owned();

        let Some(caps) = data_url_regex().captures(&decoded) else {
            return Self::invalid();
        };

        let mime_field = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let params_field = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        let payload = caps.get(3).map(|m| m.as_str()).unwrap_or("").to_string();

        // Only a trailing `;base64` terminator marks the payload as
        // base64-encoded; a parameter literally named `base64` earlier in
        // the list (e.g. `;base64;charset=utf-8`) does not count.
        let is_base64 = params_field.ends_with(";base64");

        let params: Vec<&str> = params_field
            .split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        let mut encoding = None;
        for param in &params {
            if param.eq_ignore_ascii_case("utf8") || param.eq_ignore_ascii_case("utf-8") {
                encoding = Some("utf8".to_string());
            } else if let Some(value) = param
                .to_ascii_lowercase()
                .strip_prefix("charset=")
                .map(str::to_string)
            {
                encoding = Some(value);
            }
        }
        let encoding = encoding.unwrap_or_else(|| "ascii".to_string());

        let mime_type = if mime_field.is_empty() {
            "text/plain".to_string()
        } else {
            mime_field.to_string()
        };

        Self {
            mime_type,
            encoding,
            is_base64,
            payload,
            valid: true,
        }
    }

    /// An invalid/unparseable data URL: empty content, never an error.
    pub fn invalid() -> Self {
        Self {
            mime_type: String::new(),
            encoding: String::new(),
            is_base64: false,
            payload: String::new(),
            valid: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Decode the payload into bytes per the resolved encoding/base64-ness.
    pub fn read(&self) -> Vec<u8> {
        if !self.valid {
            return Vec::new();
        }
        if self.is_base64 {
            let cleaned: String = self.payload.chars().filter(|c| !c.is_whitespace()).collect();
            return base64::engine::general_purpose::STANDARD
                .decode(cleaned)
                .unwrap_or_default();
        }
        if let Some(enc) = encoding_rs::Encoding::for_label(self.encoding.as_bytes()) {
            let (bytes, _, _) = enc.encode(&self.payload);
            bytes.into_owned()
        } else {
            self.payload.as_bytes().to_vec()
        }
    }

    pub fn len(&self) -> u64 {
        self.read().len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_base64_image() {
        let url = "data:image/webp;base64,UklGRiQAAABXRUJQVlA4IBgAAAAwAQCdASoBAAEAAQAcJaQAA3AA/v3AgAA=";
        let data = DataUrl::parse(url);
        assert_eq!(data.mime_type, "image/webp");
        assert_eq!(data.encoding, "ascii");
        assert!(data.is_base64);
        assert!(!data.read().is_empty());
    }

    #[test]
    fn parses_utf8_css_with_entity_then_percent_decode() {
        let url = "data:text/css;utf8,body {&#37;20font-family: Arial, sans-serif };";
        let data = DataUrl::parse(url);
        assert_eq!(data.mime_type, "text/css");
        assert_eq!(data.encoding, "utf8");
        assert!(!data.is_base64);
        assert_eq!(data.read(), b"body { font-family: Arial, sans-serif };");
    }

    #[test]
    fn invalid_url_decodes_to_empty() {
        let data = DataUrl::parse("not a data url");
        assert!(!data.is_valid());
        assert!(data.read().is_empty());
    }

    #[test]
    fn charset_param_overrides_default_encoding() {
        let data = DataUrl::parse("data:text/plain;charset=utf-8,hello");
        assert_eq!(data.encoding, "utf-8");
        assert_eq!(data.read(), b"hello");
    }

    #[test]
    fn only_trailing_base64_terminator_counts() {
        let data = DataUrl::parse("data:text/plain;base64;charset=utf-8,aGVsbG8=");
        assert!(!data.is_base64);
        assert_eq!(data.read(), b"aGVsbG8=");
    }

    #[test]
    fn mime_type_without_slash_is_rejected() {
        let data = DataUrl::parse("data:charset=utf-8,hello");
        assert!(!data.is_valid());
        assert!(data.read().is_empty());
    }
}
