//! CGI response header splitting.

use crate::error::BackendError;

/// Header block of a CGI response.
///
/// Holds the raw header lines (without line terminators) and the offset
/// of the first body byte in the buffer that was parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CgiHeader {
    lines: Vec<String>,
    body_offset: usize,
    terminated: bool,
}

impl CgiHeader {
    /// Raw header lines in the order they appeared.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Index of the first body byte.
    pub fn body_offset(&self) -> usize {
        self.body_offset
    }

    /// Returns true if a blank line ended the header block.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// HTTP status from a `Status: NNN reason` line, if present.
    pub fn status(&self) -> Result<Option<u16>, BackendError> {
        let Some(value) = self
            .lines
            .iter()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("status"))
            .map(|(_, value)| value.trim())
        else {
            return Ok(None);
        };

        let code = value
            .split_whitespace()
            .next()
            .and_then(|token| token.parse::<u16>().ok())
            .filter(|code| (100..=599).contains(code))
            .ok_or_else(|| BackendError::protocol(format!("invalid status line '{value}'")))?;
        Ok(Some(code))
    }

    /// Header fields other than `Status`, as `(name, value)` pairs.
    pub fn fields(&self) -> Result<Vec<(String, String)>, BackendError> {
        let mut fields = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| BackendError::protocol(format!("malformed header line '{line}'")))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(BackendError::protocol(format!("empty header name in '{line}'")));
            }
            if name.eq_ignore_ascii_case("status") {
                continue;
            }
            fields.push((name.to_string(), value.trim().to_string()));
        }
        Ok(fields)
    }
}

/// Splits a CGI output buffer into header lines and the body offset.
///
/// Lines end at `\n`, a trailing `\r` is dropped. The first blank line
/// (`\n\n` or `\n\r\n`) ends the header. Without a blank line every line
/// is a header and the offset is the buffer length.
///
/// # Example
///
/// ```
/// use davgit_git::parse_header;
///
/// let buffer = b"Status: 200 OK\n\nHELLO";
/// let header = parse_header(buffer);
/// assert_eq!(header.lines(), ["Status: 200 OK"]);
/// assert_eq!(&buffer[header.body_offset()..], b"HELLO");
/// ```
pub fn parse_header(buffer: &[u8]) -> CgiHeader {
    let mut header = CgiHeader::default();
    let mut line_start = 0;

    for (idx, byte) in buffer.iter().enumerate() {
        if *byte != b'\n' {
            continue;
        }
        let mut line = &buffer[line_start..idx];
        if let [rest @ .., b'\r'] = line {
            line = rest;
        }
        if line.is_empty() {
            header.body_offset = idx + 1;
            header.terminated = true;
            return header;
        }
        header.lines.push(String::from_utf8_lossy(line).into_owned());
        line_start = idx + 1;
    }

    if line_start < buffer.len() {
        let tail = &buffer[line_start..];
        let tail = tail.strip_suffix(b"\r").unwrap_or(tail);
        header.lines.push(String::from_utf8_lossy(tail).into_owned());
    }
    header.body_offset = buffer.len();
    header
}
