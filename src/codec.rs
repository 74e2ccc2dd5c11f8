/*
 * This file is part of Expansiond.
 *
 * Copyright (C) 2025 Expansiond contributors
 *
 * Expansiond is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Expansiond is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Expansiond. If not, see <https://www.gnu.org/licenses/>.
 */

//! Byte-level wire format for register values.
//!
//! The expansion board speaks fixed-width big-endian integers and
//! NUL-padded ASCII blocks. Nothing here touches hardware; a wrong
//! slice length is a caller bug, not an I/O condition.

/// Encode a 32-bit value as 4 big-endian bytes (fan frequency register).
pub fn encode_u32_be(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

/// Decode 4 big-endian bytes into a 32-bit value.
///
/// Panics if `bytes` is not exactly 4 bytes long; block reads for this
/// register always request 4 bytes, so anything else is a caller bug.
pub fn decode_u32_be(bytes: &[u8]) -> u32 {
    assert_eq!(bytes.len(), 4, "u32 register block must be 4 bytes");
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Decode a fixed-length ASCII block, trimming trailing NUL padding.
pub fn decode_ascii(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u32_round_trip() {
        for v in [0u32, 1, 25, 50, 0x0102_0304, 0xdead_beef, u32::MAX] {
            assert_eq!(decode_u32_be(&encode_u32_be(v)), v);
        }
    }

    #[test]
    fn test_encode_u32_is_big_endian() {
        assert_eq!(encode_u32_be(25), [0x00, 0x00, 0x00, 0x19]);
        assert_eq!(encode_u32_be(0x0102_0304), [0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    #[should_panic(expected = "4 bytes")]
    fn test_decode_u32_wrong_length_panics() {
        decode_u32_be(&[0x01, 0x02]);
    }

    #[test]
    fn test_decode_ascii_trims_trailing_nuls() {
        let raw = [b'M', b'C', b'U', 0, 0, 0, 0, 0, 0];
        assert_eq!(decode_ascii(&raw), "MCU");
    }

    #[test]
    fn test_decode_ascii_keeps_interior_bytes() {
        let raw = [b'v', b'1', b'.', b'0', 0, 0];
        assert_eq!(decode_ascii(&raw), "v1.0");
        // only trailing padding is stripped
        let odd = [b'a', 0, b'b', 0];
        assert_eq!(decode_ascii(&odd), "a\0b");
    }

    #[test]
    fn test_decode_ascii_empty_block() {
        assert_eq!(decode_ascii(&[0, 0, 0]), "");
        assert_eq!(decode_ascii(&[]), "");
    }
}
