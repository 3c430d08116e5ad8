//! Header bags carried by observations and the summaries we derive from them.

use std::collections::BTreeMap;

/// One raw header as reported by the network tap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPair {
    pub name: String,
    pub value: String,
}

impl HeaderPair {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// What the admission filter and record shaping need from response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseSummary {
    /// From `Content-Length`, overridden by the total in `Content-Range`.
    pub size: Option<u64>,
    /// `Content-Type` without parameters, lowercased.
    pub mime_type: Option<String>,
    /// Raw `Content-Disposition` value.
    pub attachment: Option<String>,
}

impl ResponseSummary {
    pub fn from_headers(headers: &[HeaderPair]) -> Self {
        let mut out = ResponseSummary::default();
        for h in headers {
            let name = h.name.trim();
            let value = h.value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                if out.size.is_none() {
                    out.size = value.parse::<u64>().ok();
                }
            } else if name.eq_ignore_ascii_case("content-type") {
                let mime = value.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
                if !mime.is_empty() {
                    out.mime_type = Some(mime);
                }
            } else if name.eq_ignore_ascii_case("content-disposition") {
                out.attachment = Some(value.to_string());
            } else if name.eq_ignore_ascii_case("content-range") {
                // "bytes 0-99/1234": the total wins over a partial Content-Length.
                if let Some(total) = value.rsplit('/').next() {
                    if total != "*" {
                        if let Ok(n) = total.trim().parse::<u64>() {
                            out.size = Some(n);
                        }
                    }
                }
            }
        }
        out
    }

    /// File name announced by `Content-Disposition`, if any.
    pub fn attachment_filename(&self) -> Option<String> {
        self.attachment
            .as_deref()
            .and_then(parse_content_disposition_filename)
    }
}

/// Request-side context lifted out of the request headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub referer: Option<String>,
    pub origin: Option<String>,
    pub cookie: Option<String>,
    /// Remaining interesting headers, lowercased names (authorization etc.).
    pub headers: BTreeMap<String, String>,
}

impl RequestContext {
    pub fn from_headers(headers: &[HeaderPair]) -> Self {
        let mut out = RequestContext::default();
        for h in headers {
            let name = h.name.trim().to_ascii_lowercase();
            let value = h.value.trim().to_string();
            match name.as_str() {
                "referer" => {
                    out.headers.insert(name, value.clone());
                    out.referer = Some(value);
                }
                "origin" => {
                    out.headers.insert(name, value.clone());
                    out.origin = Some(value);
                }
                // Cookies are kept apart from the replayable header bag.
                "cookie" => out.cookie = Some(value),
                "authorization" => {
                    out.headers.insert(name, value);
                }
                _ => {}
            }
        }
        out
    }
}

/// Extracts the filename from a raw Content-Disposition header value.
///
/// `filename*=UTF-8''...` (RFC 5987) takes precedence over `filename=`.
pub fn parse_content_disposition_filename(header_value: &str) -> Option<String> {
    let mut plain: Option<String> = None;

    for param in header_value.trim().split(';') {
        let Some((name, v)) = param.trim().split_once('=') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let v = v.trim();

        if name == "filename*" {
            let rest = v
                .strip_prefix("UTF-8''")
                .or_else(|| v.strip_prefix("utf-8''"));
            if let Some(decoded) = rest.map(percent_decode) {
                if !decoded.is_empty() {
                    return Some(decoded);
                }
            }
        } else if name == "filename" {
            let unquoted = if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
                v[1..v.len() - 1].replace("\\\"", "\"")
            } else {
                v.to_string()
            };
            if !unquoted.is_empty() {
                plain = Some(unquoted);
            }
        }
    }

    plain
}

/// Lossy percent-decoding; malformed escapes are kept verbatim.
pub(crate) fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(h), Some(l)) = (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                out.push(h << 4 | l);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(list: &[(&str, &str)]) -> Vec<HeaderPair> {
        list.iter().map(|(n, v)| HeaderPair::new(n, v)).collect()
    }

    #[test]
    fn response_summary_length_type_and_range() {
        let s = ResponseSummary::from_headers(&pairs(&[
            ("Content-Length", "100"),
            ("Content-Type", "Video/MP4; codecs=avc1"),
            ("Content-Range", "bytes 0-99/5000"),
        ]));
        assert_eq!(s.size, Some(5000));
        assert_eq!(s.mime_type.as_deref(), Some("video/mp4"));
        assert!(s.attachment.is_none());
    }

    #[test]
    fn response_summary_unknown_range_total_keeps_length() {
        let s = ResponseSummary::from_headers(&pairs(&[
            ("content-length", "42"),
            ("content-range", "bytes 0-41/*"),
        ]));
        assert_eq!(s.size, Some(42));
    }

    #[test]
    fn attachment_filename_variants() {
        assert_eq!(
            parse_content_disposition_filename("attachment; filename=\"clip.mp4\"").as_deref(),
            Some("clip.mp4")
        );
        assert_eq!(
            parse_content_disposition_filename("attachment; filename=clip.flv").as_deref(),
            Some("clip.flv")
        );
        assert_eq!(
            parse_content_disposition_filename(
                "attachment; filename=\"fallback.bin\"; filename*=UTF-8''real%20name.webm"
            )
            .as_deref(),
            Some("real name.webm")
        );
        assert_eq!(parse_content_disposition_filename("inline"), None);
    }

    #[test]
    fn request_context_lifts_cookie_out() {
        let ctx = RequestContext::from_headers(&pairs(&[
            ("Referer", "https://site.test/watch"),
            ("Origin", "https://site.test"),
            ("Cookie", "sid=1"),
            ("Authorization", "Bearer t"),
            ("Accept", "*/*"),
        ]));
        assert_eq!(ctx.referer.as_deref(), Some("https://site.test/watch"));
        assert_eq!(ctx.origin.as_deref(), Some("https://site.test"));
        assert_eq!(ctx.cookie.as_deref(), Some("sid=1"));
        assert!(!ctx.headers.contains_key("cookie"));
        assert!(!ctx.headers.contains_key("accept"));
        assert_eq!(ctx.headers.get("authorization").map(String::as_str), Some("Bearer t"));
    }

    #[test]
    fn percent_decode_keeps_malformed_escapes() {
        assert_eq!(percent_decode("a%20b"), "a b");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }
}
