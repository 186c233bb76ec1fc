//! Header scanning for declared-length framing.
//!
//! Only two things are understood about a message's header block:
//! where it ends (`\r\n\r\n`) and the value of the first line starting
//! with `content-length:` (case-insensitive). Everything else is opaque.

/// Sequence that terminates the header block.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Length of [`HEADER_TERMINATOR`].
pub const HEADER_TERMINATOR_LEN: usize = HEADER_TERMINATOR.len();

/// Lower-case prefix of the length header line.
pub const CONTENT_LENGTH_PREFIX: &[u8] = b"content-length:";

const LINE_SEPARATOR: &[u8] = b"\r\n";

/// Position of the first occurrence of `needle` in `haystack`.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Find the offset of the header terminator, starting the search at `from`.
///
/// `from` lets incremental callers skip bytes they already scanned; the
/// returned offset is always relative to the start of `buffer`.
pub fn find_header_end(buffer: &[u8], from: usize) -> Option<usize> {
    let start = from.min(buffer.len());
    find(&buffer[start..], HEADER_TERMINATOR).map(|pos| start + pos)
}

/// Split a header block into lines on `\r\n`.
fn crlf_lines(headers: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut rest = Some(headers);
    std::iter::from_fn(move || {
        let current = rest?;
        match find(current, LINE_SEPARATOR) {
            Some(i) => {
                rest = Some(&current[i + LINE_SEPARATOR.len()..]);
                Some(&current[..i])
            }
            None => {
                rest = None;
                Some(current)
            }
        }
    })
}

fn is_content_length_line(line: &[u8]) -> bool {
    line.len() >= CONTENT_LENGTH_PREFIX.len()
        && line[..CONTENT_LENGTH_PREFIX.len()].eq_ignore_ascii_case(CONTENT_LENGTH_PREFIX)
}

/// Extract the declared body length from a header block.
///
/// Only the first `content-length:` line is considered. Returns `None` when
/// there is no such line or its value is not a non-negative integer.
pub fn content_length(headers: &[u8]) -> Option<usize> {
    let line = crlf_lines(headers).find(|line| is_content_length_line(line))?;
    let value = std::str::from_utf8(&line[CONTENT_LENGTH_PREFIX.len()..]).ok()?;
    value.trim().parse::<usize>().ok()
}

/// Total message length declared by a header block ending at `header_end`.
///
/// `header_end` is the offset of the terminator. The total covers the
/// headers, the terminator and the declared body.
pub fn declared_total(buffer: &[u8], header_end: usize) -> Option<usize> {
    let body = content_length(&buffer[..header_end])?;
    header_end
        .checked_add(HEADER_TERMINATOR_LEN)?
        .checked_add(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_header_end() {
        let buf = b"GET / \r\nHost: x\r\n\r\nbody";
        assert_eq!(find_header_end(buf, 0), Some(15));
        assert_eq!(find_header_end(buf, 10), Some(15));
        assert_eq!(find_header_end(buf, 16), None);
        assert_eq!(find_header_end(b"no terminator\r\n", 0), None);
    }

    #[test]
    fn test_find_header_end_from_past_end() {
        assert_eq!(find_header_end(b"abc", 100), None);
    }

    #[test]
    fn test_content_length_case_insensitive() {
        assert_eq!(content_length(b"GET /\r\nContent-Length: 12"), Some(12));
        assert_eq!(content_length(b"GET /\r\nCONTENT-LENGTH:7"), Some(7));
        assert_eq!(content_length(b"content-length:   3   "), Some(3));
    }

    #[test]
    fn test_content_length_missing() {
        assert_eq!(content_length(b"GET /\r\nHost: example"), None);
        assert_eq!(content_length(b""), None);
    }

    #[test]
    fn test_content_length_malformed() {
        assert_eq!(content_length(b"Content-Length: abc"), None);
        assert_eq!(content_length(b"Content-Length: -5"), None);
        assert_eq!(content_length(b"Content-Length:"), None);
        assert_eq!(content_length(b"Content-Length: \xff\xfe"), None);
    }

    #[test]
    fn test_first_matching_line_decides() {
        // A malformed first line is not rescued by a later valid one.
        let headers = b"Content-Length: x\r\nContent-Length: 4";
        assert_eq!(content_length(headers), None);

        let headers = b"Content-Length: 4\r\nContent-Length: 9";
        assert_eq!(content_length(headers), Some(4));
    }

    #[test]
    fn test_prefix_must_start_line() {
        assert_eq!(content_length(b"X-Content-Length: 4"), None);
        // Bare newlines are not line separators.
        assert_eq!(content_length(b"GET /\nContent-Length: 4"), None);
    }

    #[test]
    fn test_declared_total() {
        let buf = b"GET / \r\nContent-Length: 5\r\n\r\nhello";
        let end = find_header_end(buf, 0).unwrap();
        assert_eq!(declared_total(buf, end), Some(buf.len()));
    }

    #[test]
    fn test_declared_total_overflow() {
        let buf = format!("Content-Length: {}\r\n\r\n", usize::MAX);
        let end = find_header_end(buf.as_bytes(), 0).unwrap();
        assert_eq!(declared_total(buf.as_bytes(), end), None);
    }
}
