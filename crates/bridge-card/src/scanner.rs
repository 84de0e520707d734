//! Streaming extraction of string and number literals from loosely structured text.
//!
//! This is not a JSON parser. Object/array structure, whitespace and punctuation are skipped;
//! every string literal and every run of ASCII digits is copied out, one token per line.
//!
//! ```text
//! FindValue   --'"'------> BuildString   (nothing emitted)
//! FindValue   --digit----> BuildNumber   (digit emitted)
//! BuildString --'"'------> FindValue     ('\n' emitted, quote consumed)
//! BuildString --other----> BuildString   (byte emitted)
//! BuildNumber --digit----> BuildNumber   (digit emitted)
//! BuildNumber --other----> FindValue     ('\n' emitted, terminator consumed)
//! ```
//!
//! A number's terminating byte is swallowed, so `42"x"` yields `42` and then `x"...` is scanned
//! from inside the `x`: the quote after `x` opens a new string.

use crate::buffer::CommandBuffer;

/// Which string literals end up in the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtractMode {
    /// Drop a string literal when the next non-whitespace byte is `:` (an object key).
    #[default]
    ValuesOnly,
    /// Emit every string literal, keys included.
    KeysAndValues,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    FindValue,
    BuildString,
    BuildNumber,
}

#[derive(Debug, Clone)]
pub struct ValueScanner {
    mode: ExtractMode,
    state: ScanState,
    /// Output offset where the current string token started.
    token_start: usize,
    /// Set after a string closes in `ValuesOnly` mode until we know whether it was a key.
    pending_key: Option<usize>,
    full: bool,
}

impl ValueScanner {
    pub fn new(mode: ExtractMode) -> Self {
        Self {
            mode,
            state: ScanState::FindValue,
            token_start: 0,
            pending_key: None,
            full: false,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Whether output has hit buffer capacity. Once full, further input is discarded.
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Scan `input`, appending extracted tokens to `out`. May be called repeatedly as more input
    /// arrives; state carries over between calls.
    ///
    /// A string that overflows the output in `ValuesOnly` mode is still scanned (without output)
    /// until it is known whether it was a key. A key is retracted, which frees room for later
    /// values.
    pub fn feed(&mut self, input: &[u8], out: &mut CommandBuffer) {
        for &c in input {
            if self.full && !self.key_undecided() {
                return;
            }
            self.step(c, out);
        }
    }

    fn key_undecided(&self) -> bool {
        self.mode == ExtractMode::ValuesOnly
            && (self.state == ScanState::BuildString || self.pending_key.is_some())
    }

    fn step(&mut self, c: u8, out: &mut CommandBuffer) {
        match self.state {
            ScanState::FindValue => {
                if let Some(start) = self.pending_key {
                    if c.is_ascii_whitespace() {
                        return;
                    }
                    self.pending_key = None;
                    if c == b':' {
                        out.truncate(start);
                        self.full = false;
                        return;
                    }
                }
                if self.full {
                    return;
                }
                match c {
                    b'"' => {
                        self.token_start = out.len();
                        self.state = ScanState::BuildString;
                    }
                    b'0'..=b'9' => {
                        self.emit(c, out);
                        self.state = ScanState::BuildNumber;
                    }
                    _ => {}
                }
            }
            ScanState::BuildString => {
                if c == b'"' {
                    self.emit(b'\n', out);
                    self.state = ScanState::FindValue;
                    if self.mode == ExtractMode::ValuesOnly {
                        self.pending_key = Some(self.token_start);
                    }
                } else {
                    self.emit(c, out);
                }
            }
            ScanState::BuildNumber => {
                if c.is_ascii_digit() {
                    self.emit(c, out);
                } else {
                    self.emit(b'\n', out);
                    self.state = ScanState::FindValue;
                }
            }
        }
    }

    fn emit(&mut self, c: u8, out: &mut CommandBuffer) {
        if !out.push(c) {
            self.full = true;
        }
    }
}

/// Reset `out` and fill it with the tokens extracted from `input`.
pub fn extract_values(input: &[u8], mode: ExtractMode, out: &mut CommandBuffer) {
    out.reset();
    let mut scanner = ValueScanner::new(mode);
    scanner.feed(input, out);
    if scanner.is_full() {
        tracing::debug!(
            input_len = input.len(),
            capacity = out.capacity(),
            "extracted values truncated at buffer capacity"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BUFFER_CAPACITY;

    fn scan(input: &[u8], mode: ExtractMode) -> Vec<u8> {
        let mut out = CommandBuffer::new();
        extract_values(input, mode, &mut out);
        out.as_slice().to_vec()
    }

    #[test]
    fn object_values_one_per_line() {
        assert_eq!(
            scan(br#"{"a":"hello","b":42}"#, ExtractMode::ValuesOnly),
            b"hello\n42\n"
        );
    }

    #[test]
    fn keys_and_values_follows_raw_state_table() {
        assert_eq!(
            scan(br#"{"a":"hello","b":42}"#, ExtractMode::KeysAndValues),
            b"a\nhello\nb\n42\n"
        );
    }

    #[test]
    fn whitespace_before_colon_still_marks_a_key() {
        assert_eq!(
            scan(b"{ \"name\" :\n \"Ada\" , \"age\"\t: 36 }", ExtractMode::ValuesOnly),
            b"Ada\n36\n"
        );
    }

    #[test]
    fn array_strings_are_values() {
        assert_eq!(
            scan(br#"["x", "y","z"]"#, ExtractMode::ValuesOnly),
            b"x\ny\nz\n"
        );
    }

    #[test]
    fn no_literals_leaves_buffer_empty() {
        assert!(scan(b"{ [ ] , : true null }", ExtractMode::ValuesOnly).is_empty());
        assert!(scan(b"", ExtractMode::KeysAndValues).is_empty());
    }

    #[test]
    fn number_terminator_is_consumed() {
        // The quote ending `7` is swallowed, so `ab` is not treated as a string; the closing
        // quote after it opens one that runs to the end of input.
        assert_eq!(scan(br#"7"ab"cd"#, ExtractMode::KeysAndValues), b"7\ncd");
    }

    #[test]
    fn sign_and_decimal_point_split_numbers() {
        assert_eq!(scan(b"-3.25,", ExtractMode::ValuesOnly), b"3\n25\n");
    }

    #[test]
    fn open_token_at_end_of_input_has_no_newline() {
        assert_eq!(scan(b"123", ExtractMode::ValuesOnly), b"123");
        assert_eq!(scan(b"\"abc", ExtractMode::ValuesOnly), b"abc");
    }

    #[test]
    fn string_bytes_are_copied_verbatim() {
        assert_eq!(
            scan(b"\"a\\nb {1}\"", ExtractMode::ValuesOnly),
            b"a\\nb {1}\n"
        );
    }

    #[test]
    fn feeding_in_pieces_matches_single_feed() {
        let input = br#"{"k": "v1", "n": 1234, "list": ["p", 5]}"#;
        let whole = scan(input, ExtractMode::ValuesOnly);

        let mut out = CommandBuffer::new();
        let mut scanner = ValueScanner::new(ExtractMode::ValuesOnly);
        for chunk in input.chunks(3) {
            scanner.feed(chunk, &mut out);
        }
        assert_eq!(out.as_slice(), whole.as_slice());
        assert_eq!(whole, b"v1\n1234\np\n5\n");
    }

    #[test]
    fn key_crossing_capacity_is_retracted() {
        // The value plus its newline leave two free bytes, so the key `key` overflows.
        let mut input = vec![b'"'];
        input.extend(std::iter::repeat(b'x').take(BUFFER_CAPACITY - 3));
        input.extend_from_slice(br#"","key":"v"}"#);

        let out = scan(&input, ExtractMode::ValuesOnly);
        assert_eq!(out.len(), BUFFER_CAPACITY);
        assert_eq!(&out[BUFFER_CAPACITY - 4..], b"x\nv\n");
    }

    #[test]
    fn key_whose_newline_overflows_is_retracted() {
        // `k` fits exactly; only the newline closing the key hits capacity.
        let mut input = vec![b'"'];
        input.extend(std::iter::repeat(b'x').take(BUFFER_CAPACITY - 2));
        input.extend_from_slice(br#"","k" : 7}"#);

        let mut out = CommandBuffer::new();
        let mut scanner = ValueScanner::new(ExtractMode::ValuesOnly);
        scanner.feed(&input, &mut out);

        // The key is gone; its value takes the freed byte and then its newline overflows.
        assert!(scanner.is_full());
        assert_eq!(out.len(), BUFFER_CAPACITY);
        assert_eq!(&out.as_slice()[BUFFER_CAPACITY - 2..], b"\n7");
    }

    #[test]
    fn value_crossing_capacity_keeps_its_prefix() {
        let mut input = vec![b'"'];
        input.extend(std::iter::repeat(b'x').take(BUFFER_CAPACITY - 2));
        input.extend_from_slice(br#"","abc", 1]"#);

        let out = scan(&input, ExtractMode::ValuesOnly);
        assert_eq!(out.len(), BUFFER_CAPACITY);
        assert_eq!(&out[BUFFER_CAPACITY - 2..], b"\na");
    }

    #[test]
    fn output_stops_at_capacity() {
        let mut input = vec![b'"'];
        input.extend(std::iter::repeat(b'x').take(BUFFER_CAPACITY + 100));
        input.extend_from_slice(b"\" 99 ");

        let mut out = CommandBuffer::new();
        let mut scanner = ValueScanner::new(ExtractMode::ValuesOnly);
        scanner.feed(&input, &mut out);

        assert!(scanner.is_full());
        assert_eq!(out.len(), BUFFER_CAPACITY);
        assert!(out.as_slice().iter().all(|&b| b == b'x'));
    }
}
