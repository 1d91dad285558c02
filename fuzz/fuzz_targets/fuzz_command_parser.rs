//! Fuzz target: `CommandParser::poll_next_command`
//!
//! Drives arbitrary byte streams through the command parser, responding to
//! every completed command the way the firmware's dispatch loop would, and
//! asserts that it never panics, never reports an out-of-range body, and is
//! fully reusable after a session reset.
//!
//! cargo fuzz run fuzz_command_parser

#![no_main]

use isp_link::command::MAX_BODY_SIZE;
use isp_link::{CommandParser, LoopbackTransport, PollResult};
use libfuzzer_sys::fuzz_target;

fn run_session(parser: &mut CommandParser, link: &mut LoopbackTransport, data: &[u8]) {
    link.push_incoming(data);
    while link.available() {
        match parser.poll_next_command(link).unwrap() {
            PollResult::Command(code) => {
                assert!(
                    parser.body_size() <= MAX_BODY_SIZE,
                    "body exceeds the hardware limit"
                );
                if let Some(&first) = parser.body().first() {
                    assert_eq!(first, code, "command code must sit at index 0");
                }
                parser.send_response(link, 0x00, 2).unwrap();
            }
            PollResult::Incomplete | PollResult::HeaderError | PollResult::ChecksumError => {}
        }
        // Keep the outbound FIFO from saturating on auto-generated
        // checksum-error responses.
        link.clear_sent();
    }
}

fuzz_target!(|data: &[u8]| {
    let mut parser = CommandParser::new();
    let mut link = LoopbackTransport::new();

    run_session(&mut parser, &mut link, data);

    // After a session reset the parser must accept the same bytes cleanly.
    parser.reset();
    run_session(&mut parser, &mut link, data);
});
