use log::debug;

/// Size of every response capture buffer, including the terminator slot the
/// collector protocol reserves.
pub const CAPTURE_CAPACITY: usize = 48;

/// Largest number of body bytes a capture keeps.
pub const CAPTURE_LIMIT: usize = CAPTURE_CAPACITY - 1;

/// Bounded sink for a response body.
///
/// Chunks are appended until [`CAPTURE_LIMIT`] bytes are held. Anything past
/// that is dropped and counted, never written.
#[derive(Clone, Debug, Default)]
pub struct CaptureBuffer {
    data: heapless::Vec<u8, CAPTURE_LIMIT>,
    truncated: usize,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.truncated = 0;
    }

    /// Appends as much of `chunk` as fits and returns the number of bytes
    /// kept.
    pub fn extend(&mut self, chunk: &[u8]) -> usize {
        let room = CAPTURE_LIMIT - self.data.len();
        let kept = chunk.len().min(room);

        // `kept` never exceeds the remaining room.
        let _ = self.data.extend_from_slice(&chunk[..kept]);

        let dropped = chunk.len() - kept;
        if dropped > 0 {
            self.truncated += dropped;
            debug!("response truncated, {dropped} bytes dropped");
        }
        kept
    }

    /// The captured body up to the last complete UTF-8 character.
    pub fn as_str(&self) -> &str {
        match core::str::from_utf8(&self.data) {
            Ok(text) => text,
            Err(e) => core::str::from_utf8(&self.data[..e.valid_up_to()]).unwrap_or_default(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes dropped since the last [`clear`](Self::clear).
    pub fn truncated(&self) -> usize {
        self.truncated
    }
}

/// Bounded text copied out of a capture.
pub type BoundedText = heapless::String<CAPTURE_LIMIT>;

/// Copies the valid text of `capture` into a fixed-capacity string.
pub fn text_of(capture: &CaptureBuffer) -> BoundedText {
    let mut text = BoundedText::new();
    // A capture never holds more than the string's capacity.
    let _ = text.push_str(capture.as_str());
    text
}
