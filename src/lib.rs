//! ISPLink — serial command framing for STK500v2/STK600-compatible
//! in-system programmers.
//!
//! This crate is the framing layer only: it assembles validated command
//! frames from a byte stream and encodes the matching responses. The
//! programming logic that interprets command codes, and the physical serial
//! driver, plug in around it.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Link Stack                              │
//! │                                                             │
//! │  ┌───────────┐   ┌───────────────┐   ┌───────────────────┐  │
//! │  │ Transport │──▶│ CommandParser │──▶│  interpreter      │  │
//! │  │ (trait)   │   │ (framing)     │   │  (board support)  │  │
//! │  └───────────┘   └───────────────┘   └───────────────────┘  │
//! │       ▲                  ▲                     │            │
//! │       │                  └── require_body_size ┤            │
//! │       └────────────── send_response ───────────┘            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The parser is polled from the firmware's main loop, consumes at most one
//! byte per call, and auto-detects which of the two wire protocols the host
//! speaks from the first byte of the session:
//!
//! ```
//! use isp_link::{CommandParser, LoopbackTransport, PollResult, command};
//!
//! let mut link = LoopbackTransport::new();
//! let mut parser = CommandParser::new();
//!
//! link.push_incoming(&[command::CMD_SIGN_ON]);
//! match parser.poll_next_command(&mut link).unwrap() {
//!     PollResult::Command(code) => {
//!         assert_eq!(code, command::CMD_SIGN_ON);
//!         // ... interpret, build the answer in parser.frame_mut() ...
//!         parser.send_response(&mut link, 0x00, 2).unwrap();
//!     }
//!     other => panic!("unexpected: {other}"),
//! }
//! ```

#![deny(unused_must_use)]

pub mod codec;
pub mod command;
pub mod transport;

pub use codec::{CommandParser, Mode, PollResult};
pub use transport::{LoopbackTransport, NullTransport, Transport};
