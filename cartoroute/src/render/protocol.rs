//! Line protocol between the dispatcher and a render worker.
//!
//! A request is seven newline-terminated numeric tokens in fixed order:
//!
//! ```text
//! rect-min-x
//! rect-min-y
//! rect-max-x
//! rect-max-y
//! tile-x
//! tile-y
//! zoom
//! ```
//!
//! After writing the rendered image to its artifact path the worker answers
//! with exactly one line, `tile-x tile-y zoom`. The artifact is readable as
//! soon as that line is observed.
//!
//! Readers accept any whitespace between tokens, so a request written on a
//! single line is understood too.

use std::fmt;
use std::io::{self, BufRead, Write};

use crate::geo::{ProjectedRect, TileCoord};

use super::{RenderError, RenderTask};

/// Number of tokens in a request.
pub const REQUEST_TOKENS: usize = 7;

/// Write a request for `task` and flush it.
pub fn write_request<W: Write + ?Sized>(output: &mut W, task: &RenderTask) -> io::Result<()> {
    let rect = task.rect();
    writeln!(output, "{}", rect.min.x)?;
    writeln!(output, "{}", rect.min.y)?;
    writeln!(output, "{}", rect.max.x)?;
    writeln!(output, "{}", rect.max.y)?;
    writeln!(output, "{}", task.tile().x)?;
    writeln!(output, "{}", task.tile().y)?;
    writeln!(output, "{}", task.zoom())?;
    output.flush()
}

/// Read one request.
///
/// Returns `Ok(None)` on a clean end of input (no partial request pending).
///
/// # Errors
///
/// Returns `RenderError::Protocol` if the input ends in the middle of a
/// request or a token is not a valid number.
pub fn read_request<R: BufRead + ?Sized>(input: &mut R) -> Result<Option<RenderTask>, RenderError> {
    let mut tokens: Vec<String> = Vec::with_capacity(REQUEST_TOKENS);
    let mut line = String::new();

    while tokens.len() < REQUEST_TOKENS {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            if tokens.is_empty() {
                return Ok(None);
            }
            return Err(RenderError::Protocol {
                line: tokens.join(" "),
                reason: format!(
                    "input ended after {} of {} tokens",
                    tokens.len(),
                    REQUEST_TOKENS
                ),
            });
        }
        tokens.extend(line.split_whitespace().map(str::to_string));
    }

    if tokens.len() > REQUEST_TOKENS {
        return Err(RenderError::Protocol {
            line: tokens.join(" "),
            reason: format!("expected {} tokens", REQUEST_TOKENS),
        });
    }

    let rect = ProjectedRect::new(
        parse_token(&tokens[0], "rect-min-x")?,
        parse_token(&tokens[1], "rect-min-y")?,
        parse_token(&tokens[2], "rect-max-x")?,
        parse_token(&tokens[3], "rect-max-y")?,
    );
    let tile = TileCoord::new(
        parse_token(&tokens[4], "tile-x")?,
        parse_token(&tokens[5], "tile-y")?,
    );
    let zoom = parse_token(&tokens[6], "zoom")?;

    Ok(Some(RenderTask::new(rect, tile, zoom)))
}

fn parse_token<T: std::str::FromStr>(token: &str, name: &str) -> Result<T, RenderError> {
    token.parse().map_err(|_| RenderError::Protocol {
        line: token.to_string(),
        reason: format!("invalid {}", name),
    })
}

// =============================================================================
// Completion Line
// =============================================================================

/// The worker's answer to a finished request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCompletion {
    pub tile: TileCoord,
    pub zoom: u32,
}

impl TileCompletion {
    pub fn new(tile: TileCoord, zoom: u32) -> Self {
        Self { tile, zoom }
    }

    /// Parse a `x y zoom` completion line.
    pub fn parse(line: &str) -> Result<Self, RenderError> {
        let malformed = |reason: &str| RenderError::Protocol {
            line: line.trim_end().to_string(),
            reason: reason.to_string(),
        };

        let mut parts = line.split_whitespace();
        let mut next = |name: &str| -> Result<u32, RenderError> {
            parts
                .next()
                .ok_or_else(|| malformed(&format!("missing {}", name)))?
                .parse()
                .map_err(|_| malformed(&format!("invalid {}", name)))
        };

        let x = next("tile-x")?;
        let y = next("tile-y")?;
        let zoom = next("zoom")?;

        if parts.next().is_some() {
            return Err(malformed("trailing data"));
        }

        Ok(Self {
            tile: TileCoord::new(x, y),
            zoom,
        })
    }
}

impl fmt::Display for TileCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.tile.x, self.tile.y, self.zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_request_field_order() {
        let task = RenderTask::new(
            ProjectedRect::new(-1.5, -2.25, 3.0, 4.125),
            TileCoord::new(5, 6),
            7,
        );
        let mut buffer = Vec::new();
        write_request(&mut buffer, &task).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text, "-1.5\n-2.25\n3\n4.125\n5\n6\n7\n");
    }

    #[test]
    fn test_request_keeps_full_precision() {
        let task = RenderTask::for_tile(TileCoord::new(3, 5), 4).unwrap();
        let mut buffer = Vec::new();
        write_request(&mut buffer, &task).unwrap();

        let parsed = read_request(&mut Cursor::new(buffer)).unwrap().unwrap();
        assert_eq!(parsed, task);
    }

    #[test]
    fn test_read_request_on_one_line() {
        let mut input = Cursor::new("0 0 10 10 1 2 3\n");
        let task = read_request(&mut input).unwrap().unwrap();
        assert_eq!(task.tile(), TileCoord::new(1, 2));
        assert_eq!(task.zoom(), 3);
        assert_eq!(task.rect().max.x, 10.0);
    }

    #[test]
    fn test_read_consecutive_requests() {
        let mut input = Cursor::new("0\n0\n1\n1\n0\n0\n1\n5\n5\n6\n6\n1\n1\n2\n");
        let first = read_request(&mut input).unwrap().unwrap();
        let second = read_request(&mut input).unwrap().unwrap();
        assert_eq!(first.zoom(), 1);
        assert_eq!(second.tile(), TileCoord::new(1, 1));
        assert!(read_request(&mut input).unwrap().is_none());
    }

    #[test]
    fn test_read_request_clean_eof() {
        let mut input = Cursor::new("");
        assert!(read_request(&mut input).unwrap().is_none());
    }

    #[test]
    fn test_read_request_truncated() {
        let mut input = Cursor::new("0\n0\n1\n");
        let result = read_request(&mut input);
        assert!(matches!(result, Err(RenderError::Protocol { .. })));
    }

    #[test]
    fn test_read_request_invalid_token() {
        let mut input = Cursor::new("0\n0\n1\n1\nx\n0\n1\n");
        let err = read_request(&mut input).unwrap_err();
        assert!(err.to_string().contains("tile-x"));
    }

    #[test]
    fn test_read_request_rejects_negative_tile() {
        let mut input = Cursor::new("0\n0\n1\n1\n-1\n0\n1\n");
        assert!(read_request(&mut input).is_err());
    }

    #[test]
    fn test_completion_display() {
        let completion = TileCompletion::new(TileCoord::new(12, 34), 6);
        assert_eq!(completion.to_string(), "12 34 6");
    }

    #[test]
    fn test_completion_parse() {
        let completion = TileCompletion::parse("12 34 6\n").unwrap();
        assert_eq!(completion.tile, TileCoord::new(12, 34));
        assert_eq!(completion.zoom, 6);
    }

    #[test]
    fn test_completion_parse_errors() {
        assert!(TileCompletion::parse("12 34\n").is_err());
        assert!(TileCompletion::parse("12 34 6 7\n").is_err());
        assert!(TileCompletion::parse("a b c\n").is_err());
        assert!(TileCompletion::parse("\n").is_err());
    }
}
