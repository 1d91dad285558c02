//! Command frame parser and response encoder.
//!
//! Wire formats, auto-detected from the first byte of a session:
//!
//! ```text
//! STK500v2 ┌───────┬─────┬────────┬────────┬───────┬──────────┬──────────┐
//!          │ 0x1B  │ SEQ │ LEN_HI │ LEN_LO │ 0x0E  │ body     │ CHECKSUM │
//!          │ START │     │   (big-endian)  │ TOKEN │ LEN bytes│ XOR all  │
//!          └───────┴─────┴────────┴────────┴───────┴──────────┴──────────┘
//! STK600   ┌───────┬─────────────┐
//!          │ CMD   │ params…     │   no envelope, no checksum
//!          └───────┴─────────────┘
//! ```
//!
//! The parser consumes one byte per poll and never blocks — a single
//! [`CommandParser::poll_next_command`] call may observe part of the header,
//! part of the body, or nothing at all. The STK500v2 checksum is the XOR of
//! every frame byte, so a correctly received frame's running XOR, trailing
//! checksum included, is zero.

use crate::command::{
    ANSWER_CKSUM_ERROR, CMD_SIGN_ON, FRAME_CAPACITY, HEADER_SIZE, MAX_BODY_SIZE, MESSAGE_START,
    TOKEN, initial_body_length,
};
use crate::transport::Transport;

use log::debug;

/// Wire protocol in use for the current session.
///
/// Decided exactly once, from the first byte seen while idle, and sticky
/// until [`CommandParser::reset`]: a later frame whose first byte matches the
/// other protocol's selector does not switch modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// No byte seen yet — the next idle byte picks the protocol.
    Undetermined,
    /// Token-framed, checksummed STK500v2 envelope.
    Stk500v2,
    /// Bare STK600 command stream.
    Stk600,
}

/// Parser state. Drives which bytes are expected next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for a start marker or bare command byte.
    Idle,
    /// Reading the rest of an STK500v2 header.
    Header,
    /// Reading the command body (plus trailing checksum in STK500v2 mode).
    Body,
    /// A command is assembled and waiting for its response.
    Complete,
}

/// Outcome of a single [`CommandParser::poll_next_command`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollResult {
    /// No byte available, frame still partial, or a completed command is
    /// awaiting its response. Call again.
    Incomplete,
    /// Malformed start byte, bad token, oversized declared length, or an
    /// unknown bare command code. The frame was discarded silently and the
    /// parser is back in idle.
    HeaderError,
    /// XOR mismatch on a fully read STK500v2 frame. The frame was discarded
    /// and an error response has already been transmitted.
    ChecksumError,
    /// A complete, validated command: the command code, also available at
    /// index 0 of [`CommandParser::body`].
    Command(u8),
}

impl core::fmt::Display for PollResult {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Incomplete => write!(f, "incomplete"),
            Self::HeaderError => write!(f, "header error"),
            Self::ChecksumError => write!(f, "checksum error"),
            Self::Command(code) => write!(f, "command {code:#04x}"),
        }
    }
}

/// Streaming command parser.
///
/// One instance per serial link. All state lives here — no globals — so a
/// firmware driving two links simply owns two parsers. The frame buffer is
/// shared between directions: once a command completes, the interpreter
/// builds its answer in place over the command bytes (the status byte
/// overwrites index 1, the echoed command code at index 0 stays) and hands
/// it to [`CommandParser::send_response`], which releases the parser for the
/// next command.
pub struct CommandParser {
    state: State,
    mode: Mode,
    buf: [u8; FRAME_CAPACITY],
    bytes_read: usize,
    bytes_wanted: usize,
    checksum: u8,
    sequence: u8,
    body_size: usize,
}

impl CommandParser {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            mode: Mode::Undetermined,
            buf: [0; FRAME_CAPACITY],
            bytes_read: 0,
            bytes_wanted: 1,
            checksum: 0,
            sequence: 0,
            body_size: 0,
        }
    }

    /// Advance the parser by at most one input byte.
    ///
    /// Returns immediately with [`PollResult::Incomplete`] when the link has
    /// nothing to read or a completed command is still awaiting its
    /// response. Designed to be called from the firmware's main polling
    /// loop; it never waits.
    ///
    /// A transport failure surfaces as the transport's own error; the
    /// four-way parse-result space is unaffected by it.
    pub fn poll_next_command<T: Transport>(
        &mut self,
        link: &mut T,
    ) -> Result<PollResult, T::Error> {
        if self.state == State::Complete || !link.available() {
            return Ok(PollResult::Incomplete);
        }

        let byte = link.read_byte()?;
        self.checksum ^= byte;
        self.buf[self.bytes_read] = byte;
        self.bytes_read += 1;
        if self.bytes_read < self.bytes_wanted {
            return Ok(PollResult::Incomplete);
        }

        match self.state {
            State::Idle => self.dispatch_first_byte(link),
            State::Header => Ok(self.finish_header()),
            State::Body => self.finish_body(link),
            // Unreachable: guarded at the top of the function.
            State::Complete => Ok(PollResult::Incomplete),
        }
    }

    /// Grow the expected body length for the in-flight command.
    ///
    /// Returns `true` if the current target already covers `required` bytes
    /// (command byte included). Otherwise raises the target and returns
    /// `false`; the parser goes back to collecting body bytes and the
    /// command will complete again once `required` bytes have arrived.
    ///
    /// Called by the command interpreter for the XPROG commands, whose real
    /// length is only known from the length-determining byte already read.
    /// `required` must be non-decreasing across calls for a given command;
    /// the target is never shrunk.
    pub fn require_body_size(&mut self, required: usize) -> bool {
        debug_assert!(required <= FRAME_CAPACITY);
        let required = required.min(FRAME_CAPACITY);
        if self.bytes_wanted >= required {
            true
        } else {
            self.bytes_wanted = required;
            if self.state == State::Complete {
                self.state = State::Body;
            }
            false
        }
    }

    /// Transmit a response for the completed command and re-arm the parser.
    ///
    /// `status` overwrites index 1 of the frame buffer; index 0, the echoed
    /// command code, is left untouched. The first `body_size` buffer bytes
    /// form the response body. In STK500v2 mode the body is wrapped in a
    /// header/checksum envelope echoing the captured sequence number; in
    /// STK600 mode the body goes out bare.
    ///
    /// Unconditionally resets the parser to idle afterwards (mode is kept),
    /// which is what allows the next command to be read.
    pub fn send_response<T: Transport>(
        &mut self,
        link: &mut T,
        status: u8,
        body_size: usize,
    ) -> Result<(), T::Error> {
        debug_assert!(body_size <= FRAME_CAPACITY);
        let body_size = body_size.min(FRAME_CAPACITY);
        self.buf[1] = status;

        let result = self.write_frame(link, body_size);
        // The reset happens even when the transport failed mid-frame: a
        // half-written response cannot be salvaged by replaying it, and the
        // parser must come back up ready for the next command.
        self.reset_to_idle();
        result
    }

    fn write_frame<T: Transport>(&mut self, link: &mut T, body_size: usize) -> Result<(), T::Error> {
        if self.mode == Mode::Stk500v2 {
            let header = [
                MESSAGE_START,
                self.sequence,
                (body_size >> 8) as u8,
                (body_size & 0xFF) as u8,
                TOKEN,
            ];
            let mut checksum = 0u8;
            for b in header {
                checksum ^= b;
            }
            for &b in &self.buf[..body_size] {
                checksum ^= b;
            }
            link.write(&header)?;
            link.write(&self.buf[..body_size])?;
            link.write(&[checksum])?;
        } else {
            link.write(&self.buf[..body_size])?;
        }
        link.flush()
    }

    /// Restart the session: back to idle with the protocol mode undecided,
    /// as after power-up. The next idle byte selects the mode again.
    pub fn reset(&mut self) {
        self.reset_to_idle();
        self.mode = Mode::Undetermined;
        self.sequence = 0;
    }

    /// The completed command: code at index 0, parameters after. Empty for
    /// parameterless commands. Valid until the response is sent.
    pub fn body(&self) -> &[u8] {
        &self.buf[..self.body_size]
    }

    /// Size of the completed command body (command byte included, trailing
    /// checksum excluded).
    pub fn body_size(&self) -> usize {
        self.body_size
    }

    /// Mutable view of the whole frame buffer, for building the response in
    /// place before [`CommandParser::send_response`].
    pub fn frame_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Protocol mode of the current session.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    /// Idle-state handler: the byte just read is a start marker (STK500v2)
    /// or a bare command code (STK600). Picks the session mode first if it
    /// is still undecided.
    fn dispatch_first_byte<T: Transport>(&mut self, link: &mut T) -> Result<PollResult, T::Error> {
        if self.mode == Mode::Undetermined {
            match self.buf[0] {
                CMD_SIGN_ON => {
                    self.mode = Mode::Stk600;
                    debug!("link: STK600 mode selected");
                }
                MESSAGE_START => {
                    self.mode = Mode::Stk500v2;
                    debug!("link: STK500v2 mode selected");
                }
                _ => return Ok(self.header_error("no protocol selector")),
            }
        }

        match self.mode {
            Mode::Stk500v2 => {
                if self.buf[0] != MESSAGE_START {
                    return Ok(self.header_error("bad start byte"));
                }
                self.state = State::Header;
                self.bytes_wanted = HEADER_SIZE;
                Ok(PollResult::Incomplete)
            }
            Mode::Stk600 => {
                let Some(wanted) = initial_body_length(self.buf[0]) else {
                    return Ok(self.header_error("unknown command code"));
                };
                self.state = State::Body;
                self.bytes_wanted = wanted;
                if wanted > 1 {
                    Ok(PollResult::Incomplete)
                } else {
                    // Single-byte command: the body is already complete.
                    self.finish_body(link)
                }
            }
            // Unreachable: either selected above or reported as an error.
            Mode::Undetermined => Ok(PollResult::Incomplete),
        }
    }

    /// Header-state handler: all five STK500v2 header bytes are in. Validate
    /// the token, extract the declared body length, capture the sequence
    /// number, and switch to collecting the body plus its checksum byte.
    fn finish_header(&mut self) -> PollResult {
        if self.buf[4] != TOKEN {
            return self.header_error("bad token");
        }
        let declared = u16::from_be_bytes([self.buf[2], self.buf[3]]) as usize;
        if declared > MAX_BODY_SIZE {
            return self.header_error("declared length too large");
        }
        self.sequence = self.buf[1];
        self.state = State::Body;
        self.bytes_read = 0;
        self.bytes_wanted = declared + 1; // one extra for the checksum byte
        PollResult::Incomplete
    }

    /// Shared terminal step for both protocol paths: verify the checksum
    /// where one exists, then surface the command.
    ///
    /// An STK500v2 frame whose running XOR is nonzero was corrupted in
    /// transit; the host is told so immediately with an `ANSWER_CKSUM_ERROR`
    /// response. Header errors, in contrast, are discarded without any
    /// response — that asymmetry is the protocol's, not ours.
    fn finish_body<T: Transport>(&mut self, link: &mut T) -> Result<PollResult, T::Error> {
        if self.mode == Mode::Stk500v2 && self.checksum != 0 {
            debug!("link: frame checksum mismatch");
            self.buf[0] = ANSWER_CKSUM_ERROR;
            self.send_response(link, ANSWER_CKSUM_ERROR, 2)?;
            return Ok(PollResult::ChecksumError);
        }
        self.state = State::Complete;
        // The trailing checksum byte is not part of the body; STK600 frames
        // have no checksum byte but the command byte fills the same slot in
        // the count, so the arithmetic is shared.
        self.body_size = self.bytes_read - 1;
        Ok(PollResult::Command(self.buf[0]))
    }

    fn header_error(&mut self, reason: &'static str) -> PollResult {
        debug!("link: frame discarded: {reason}");
        self.reset_to_idle();
        PollResult::HeaderError
    }

    fn reset_to_idle(&mut self) {
        self.state = State::Idle;
        self.bytes_read = 0;
        self.bytes_wanted = 1;
        self.checksum = 0;
        self.body_size = 0;
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new()
    }
}
