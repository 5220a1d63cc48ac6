//! Plain-text frame captures
//!
//! One hex-encoded frame per line. Whitespace inside a line is ignored, and
//! everything after `#` is a comment.

use anyhow::{Context, Result};

/// Parse a capture into raw frames
pub fn parse_capture(text: &str) -> Result<Vec<Vec<u8>>> {
    let mut frames = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let content = line.split('#').next().unwrap_or_default();
        let digits: String = content.chars().filter(|c| !c.is_whitespace()).collect();
        if digits.is_empty() {
            continue;
        }
        let frame = hex::decode(&digits).with_context(|| format!("line {}", index + 1))?;
        frames.push(frame);
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comments_and_blank_lines() {
        let capture = "# session start\n\n0a0B ff # trailing\n   \n01\n";
        let frames = parse_capture(capture).unwrap();
        assert_eq!(frames, vec![vec![0x0a, 0x0b, 0xff], vec![0x01]]);
    }

    #[test]
    fn test_invalid_lines_name_their_position() {
        let err = parse_capture("00\nabc\n").unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));

        let err = parse_capture("zz\n").unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid character"));
    }

    #[test]
    fn test_encoded_line_roundtrips() {
        let line = hex::encode([0x00u8, 0x7f, 0xff]);
        assert_eq!(parse_capture(&line).unwrap(), vec![vec![0x00, 0x7f, 0xff]]);
    }
}
