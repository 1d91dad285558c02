//! STK500v2/STK600 framing constants and the fixed command-length table.
//!
//! The STK500v2 envelope wraps every command in a checksummed header frame.
//! STK600-style commands arrive bare on the wire, so the expected byte count
//! must be known from the command code alone: most codes have a fixed length
//! (table below), and the two XPROG codes carry their real length in their
//! second byte, negotiated via
//! [`CommandParser::require_body_size`](crate::codec::CommandParser::require_body_size).

/// First byte of every STK500v2 frame. Also the mode-selection byte for
/// STK500v2 sessions.
pub const MESSAGE_START: u8 = 0x1B;

/// Fixed marker validated at header offset 4 of an STK500v2 frame.
pub const TOKEN: u8 = 0x0E;

/// Sign-on command code. Selects STK600 mode when seen as the first byte of
/// a fresh session.
pub const CMD_SIGN_ON: u8 = 0x01;

/// XPROG tunnel command. Real body length depends on the sub-command byte.
pub const CMD_XPROG: u8 = 0x50;

/// XPROG mode-select command. Real body length depends on the sub-command byte.
pub const CMD_XPROG_SETMODE: u8 = 0x51;

/// Status byte sent back when a received STK500v2 frame fails its checksum.
pub const ANSWER_CKSUM_ERROR: u8 = 0xB0;

/// STK500v2 header size: start, sequence, two length bytes, token.
pub const HEADER_SIZE: usize = 5;

/// Largest accepted command body (STK500 hardware limit).
pub const MAX_BODY_SIZE: usize = 275;

/// Frame buffer capacity: header + body + trailing checksum byte.
pub const FRAME_CAPACITY: usize = HEADER_SIZE + MAX_BODY_SIZE + 1;

/// Total body length (command byte included) for each STK600 command code
/// below 0x40. Zero marks codes with no fixed length.
const CMD_LENGTH: [u8; 64] = [
    0, 1, 3, 2, 3, 1, 5, 11, 0, 0, 0, 0, 0, 1, 6, 5, //
    12, 3, 7, 10, 4, 10, 4, 5, 6, 5, 6, 6, 6, 4, 0, 0, //
    8, 3, 3, 5, 3, 5, 3, 5, 2, 5, 2, 2, 2, 33, 0, 0, //
    9, 3, 3, 5, 3, 5, 3, 4, 2, 4, 2, 2, 2, 0, 0, 0, //
];

/// Expected total length of a bare STK600 command, resolved from its code.
///
/// XPROG commands report 2: the command byte plus the one byte that
/// determines the real length, which the interpreter then negotiates upward.
/// Returns `None` for codes the programmer does not speak.
pub fn initial_body_length(code: u8) -> Option<usize> {
    match code {
        CMD_XPROG | CMD_XPROG_SETMODE => Some(2),
        c if (c as usize) < CMD_LENGTH.len() => match CMD_LENGTH[c as usize] {
            0 => None,
            n => Some(n as usize),
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_on_is_single_byte() {
        assert_eq!(initial_body_length(CMD_SIGN_ON), Some(1));
    }

    #[test]
    fn xprog_codes_need_one_more_byte() {
        assert_eq!(initial_body_length(CMD_XPROG), Some(2));
        assert_eq!(initial_body_length(CMD_XPROG_SETMODE), Some(2));
    }

    #[test]
    fn zero_entries_are_unknown() {
        assert_eq!(initial_body_length(0x00), None);
        assert_eq!(initial_body_length(0x08), None);
        assert_eq!(initial_body_length(0x3F), None);
    }

    #[test]
    fn codes_above_table_are_unknown() {
        assert_eq!(initial_body_length(0x40), None);
        assert_eq!(initial_body_length(0x7F), None);
        assert_eq!(initial_body_length(0xFF), None);
    }

    #[test]
    fn known_lengths_fit_in_the_frame_buffer() {
        for code in 0u8..=0xFF {
            if let Some(len) = initial_body_length(code) {
                assert!(len > 0 && len <= MAX_BODY_SIZE, "code {code:#04x}");
            }
        }
    }

    #[test]
    fn message_start_doubles_as_a_table_entry() {
        // 0x1B only selects STK500v2 while the mode is undetermined; once an
        // STK600 session is up it is an ordinary 6-byte command.
        assert_eq!(initial_body_length(MESSAGE_START), Some(6));
    }
}
