//! `multipart/form-data` body parsing.
//!
//! Works on raw bytes so binary file parts survive intact. Only the
//! non-file fields are surfaced to handlers; file parts are parsed past and
//! dropped.

use std::fmt;

/// One part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    /// `name` from `Content-Disposition`
    pub name: Option<String>,
    /// `filename` from `Content-Disposition`, present for file uploads
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl MultipartPart {
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.file_name.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartError {
    /// `Content-Type` carried no `boundary=` parameter.
    MissingBoundary,
    /// The body does not follow the multipart framing.
    Malformed(&'static str),
    /// Non-file fields exceed the configured memory bound.
    TooLarge { limit: usize },
}

impl fmt::Display for MultipartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MultipartError::MissingBoundary => f.write_str("multipart: missing boundary"),
            MultipartError::Malformed(reason) => write!(f, "multipart: {reason}"),
            MultipartError::TooLarge { limit } => {
                write!(f, "multipart: message too large (limit {limit} bytes)")
            }
        }
    }
}

impl std::error::Error for MultipartError {}

/// Extract boundary from Content-Type header
#[must_use]
pub fn extract_boundary(content_type: &str) -> Option<&str> {
    content_type.split(';').find_map(|part| {
        let boundary = part.trim().strip_prefix("boundary=")?.trim_matches('"');
        (!boundary.is_empty()).then_some(boundary)
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_part(raw: &[u8]) -> MultipartPart {
    let (headers, data) = if let Some(rest) = raw.strip_prefix(b"\r\n") {
        (&raw[..0], rest)
    } else if let Some(pos) = find(raw, b"\r\n\r\n") {
        (&raw[..pos], &raw[pos + 4..])
    } else {
        (raw, &raw[raw.len()..])
    };

    let mut part = MultipartPart {
        name: None,
        file_name: None,
        content_type: None,
        data: data.to_vec(),
    };

    for line in String::from_utf8_lossy(headers).lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if key.trim().eq_ignore_ascii_case("content-disposition") {
            for param in value.split(';').map(str::trim) {
                if let Some(name) = param.strip_prefix("name=") {
                    part.name = Some(name.trim_matches('"').to_string());
                } else if let Some(file_name) = param.strip_prefix("filename=") {
                    part.file_name = Some(file_name.trim_matches('"').to_string());
                }
            }
        } else if key.trim().eq_ignore_ascii_case("content-type") {
            part.content_type = Some(value.to_string());
        }
    }
    part
}

/// Split a multipart body into its parts.
///
/// A preamble before the first boundary is ignored, as is anything after
/// the closing `--boundary--`.
///
/// # Errors
///
/// [`MultipartError::Malformed`] when the opening or closing boundary is
/// missing or a boundary line is not terminated by CRLF.
pub fn parse_multipart(body: &[u8], boundary: &str) -> Result<Vec<MultipartPart>, MultipartError> {
    let delimiter = format!("--{boundary}");
    let separator = format!("\r\n--{boundary}");

    let start = find(body, delimiter.as_bytes())
        .ok_or(MultipartError::Malformed("missing opening boundary"))?;
    let mut pos = start + delimiter.len();
    let mut parts = Vec::new();

    loop {
        let rest = &body[pos..];
        if rest.starts_with(b"--") {
            return Ok(parts);
        }
        let rest = rest
            .strip_prefix(b"\r\n")
            .ok_or(MultipartError::Malformed("boundary not followed by CRLF"))?;
        let end = find(rest, separator.as_bytes())
            .ok_or(MultipartError::Malformed("missing closing boundary"))?;
        parts.push(parse_part(&rest[..end]));
        // Skip the CRLF consumed above, the part and the separator.
        pos += 2 + end + separator.len();
    }
}

/// Non-file fields of a multipart body, in body order.
///
/// Parts without a name are dropped.
///
/// # Errors
///
/// [`MultipartError::TooLarge`] once the field values exceed
/// `max_memory` bytes in total, plus any framing error from
/// [`parse_multipart`].
pub fn form_fields(
    body: &[u8],
    boundary: &str,
    max_memory: usize,
) -> Result<Vec<(String, String)>, MultipartError> {
    let mut used = 0usize;
    let mut fields = Vec::new();
    for part in parse_multipart(body, boundary)? {
        if part.is_file() {
            continue;
        }
        let Some(name) = part.name else {
            continue;
        };
        used += part.data.len();
        if used > max_memory {
            return Err(MultipartError::TooLarge { limit: max_memory });
        }
        fields.push((name, String::from_utf8_lossy(&part.data).into_owned()));
    }
    Ok(fields)
}
