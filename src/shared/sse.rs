//! Incremental parser for the cloud's SSE event framing.
//!
//! The stream is line-oriented: fields are `name: value` lines, an event
//! block is everything up to a blank line, and lines may be terminated by
//! `\n`, `\r`, or `\r\n`. Chunks arrive with arbitrary boundaries, so the
//! parser keeps the unconsumed tail (and a flag for a CRLF split across two
//! chunks) between calls to [`SseParser::feed`].
//!
//! Recognized fields are `data:` (accumulated, one trailing newline per
//! line) and `event:` (last one wins). Everything else, including `id:`,
//! `retry:` and `:`-prefixed comment lines, is ignored. A block only yields
//! an [`EventBlock`] when the blank line arrives with both a non-empty data
//! payload and an event name set; either way the blank line clears both.

use tracing::trace;

/// A complete event block: the pending `event:` name and the accumulated
/// `data:` payload at the time the blank line arrived.
///
/// The payload carries one trailing `\n` per `data:` line, so a two-line
/// block assembles to `"line1\nline2\n"`. JSON decoding (and dropping blocks
/// that fail it) happens one layer up; the parser itself never inspects the
/// payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBlock {
    /// Value of the block's last `event:` field. Empty when the field had
    /// no value.
    pub name: String,
    /// Accumulated `data:` payload, newline-terminated per line.
    pub data: String,
}

/// Incremental SSE parser.
///
/// Feed it byte chunks as they arrive; it returns the event blocks each
/// chunk completes. Output is a function of the concatenated byte stream
/// alone, never of where the chunk boundaries fall.
///
/// # Examples
///
/// ```rust
/// use voltstream::SseParser;
///
/// let mut parser = SseParser::new();
/// assert!(parser.feed(b"event: temperature\ndata: {\"c\":21}").is_empty());
/// let blocks = parser.feed(b"\n\n");
/// assert_eq!(blocks.len(), 1);
/// assert_eq!(blocks[0].name, "temperature");
/// assert_eq!(blocks[0].data, "{\"c\":21}\n");
/// ```
#[derive(Debug, Default)]
pub struct SseParser {
    buf: Vec<u8>,
    discard_next_newline: bool,
    event_name: Option<String>,
    data: String,
}

impl SseParser {
    /// Create a parser with empty buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and collect the event blocks it completes.
    ///
    /// Lines are split on raw bytes; `0x0A`/`0x0D` never occur inside UTF-8
    /// continuation sequences, so multi-byte characters split across chunks
    /// reassemble intact before each complete line is decoded.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<EventBlock> {
        self.buf.extend_from_slice(chunk);
        let mut blocks = Vec::new();
        let mut pos = 0;

        // A CRLF terminator split across two feeds: the CR already closed
        // its line, so a leading LF here is the tail of that terminator.
        if self.discard_next_newline {
            if self.buf.is_empty() {
                return blocks;
            }
            self.discard_next_newline = false;
            if self.buf[0] == b'\n' {
                pos = 1;
            }
        }

        while let Some(rel) = self.buf[pos..]
            .iter()
            .position(|&b| b == b'\n' || b == b'\r')
        {
            let term = pos + rel;
            let next = if self.buf[term] == b'\r' {
                match self.buf.get(term + 1) {
                    Some(&b'\n') => term + 2,
                    Some(_) => term + 1,
                    None => {
                        self.discard_next_newline = true;
                        term + 1
                    },
                }
            } else {
                term + 1
            };
            let line = String::from_utf8_lossy(&self.buf[pos..term]).into_owned();
            if let Some(block) = self.process_line(&line) {
                blocks.push(block);
            }
            pos = next;
        }

        self.buf.drain(..pos);
        blocks
    }

    /// Drop all buffered bytes and in-progress event state.
    ///
    /// Called when a (re)connect succeeds so half-parsed lines from a dead
    /// connection never bleed into the new one.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.discard_next_newline = false;
        self.event_name = None;
        self.data.clear();
    }

    fn process_line(&mut self, line: &str) -> Option<EventBlock> {
        if line.is_empty() {
            return self.end_of_block();
        }
        let Some(colon) = line.find(':') else {
            trace!(line, "ignoring line without field separator");
            return None;
        };
        let field = &line[..colon];
        let rest = &line[colon + 1..];
        // `field: value` and `field:value` are both valid; at most one
        // space of padding is removed.
        let value = rest.strip_prefix(' ').unwrap_or(rest);
        match field {
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
            },
            "event" => self.event_name = Some(value.to_string()),
            _ => trace!(field, "ignoring unrecognized field"),
        }
        None
    }

    // Blank line: finalize the block. Emission needs a non-empty payload
    // and a set event name; the blank line clears both regardless.
    fn end_of_block(&mut self) -> Option<EventBlock> {
        let name = self.event_name.take();
        let data = std::mem::take(&mut self.data);
        match name {
            Some(name) if !data.is_empty() => Some(EventBlock { name, data }),
            _ => None,
        }
    }
}
