//! CRC engines
//!
//! Two bit-wise CRCs, both MSB-first, unreflected, with no final XOR:
//!
//! * [crc8]: init `0xFF`, poly `0x31`. Authenticates every request.
//! * [crc16]: init `0xFFFF`, poly `0x1021`. Protects every response.
//!
//! These are `const fn`, so check values for fixed frames can be baked
//! in at compile time.

/// Initial value of the request CRC
pub const CRC8_INIT: u8 = 0xFF;
/// Generator polynomial of the request CRC
pub const CRC8_POLY: u8 = 0x31;
/// Initial value of the response CRC
pub const CRC16_INIT: u16 = 0xFFFF;
/// Generator polynomial of the response CRC (CCITT)
pub const CRC16_POLY: u16 = 0x1021;

/// Compute the 8-bit request check value over `data`
pub const fn crc8(data: &[u8]) -> u8 {
    let mut crc = CRC8_INIT;
    let mut idx = 0;
    while idx < data.len() {
        crc ^= data[idx];
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ CRC8_POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        idx += 1;
    }
    crc
}

/// Compute the 16-bit response check value over `data`
pub const fn crc16(data: &[u8]) -> u16 {
    let mut crc = CRC16_INIT;
    let mut idx = 0;
    while idx < data.len() {
        crc ^= (data[idx] as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ CRC16_POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        idx += 1;
    }
    crc
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn crc8_check_string() {
        // CRC-8/NRSC-5 check value
        assert_eq!(crc8(b"123456789"), 0xF7);
    }

    #[test]
    fn crc16_check_string() {
        // CRC-16/IBM-3740 (a.k.a. CCITT-FALSE) check value
        assert_eq!(crc16(b"123456789"), 0x29B1);
    }

    #[test]
    fn crc8_fixed_vectors() {
        assert_eq!(crc8(&[]), CRC8_INIT);
        assert_eq!(crc8(&[0x00, 0x00]), 0x81);
        assert_eq!(crc8(&[0xFF, 0xFF]), 0xAC);
        assert_eq!(crc8(&[0x12, 0x0F]), 0x18);
        assert_eq!(crc8(&[0x21, 0x01]), 0x98);
    }

    #[test]
    fn crc16_fixed_vectors() {
        assert_eq!(crc16(&[]), CRC16_INIT);
        assert_eq!(crc16(&[0x00; 6]), 0x0E10);
        assert_eq!(crc16(&[0xFF; 6]), 0x99CF);
        assert_eq!(crc16(&[0x83, 0xFF, 0xE4, 0x0C, 0x01, 0x00]), 0x4634);
    }

    #[test]
    fn usable_in_const() {
        const C: u8 = crc8(&[0x11, 0x00]);
        assert_eq!(C, 0x1B);
    }

    #[test]
    fn single_bit_flip_is_detected() {
        let good = [0x21, 0x01];
        let reference = crc8(&good);
        for byte in 0..good.len() {
            for bit in 0..8 {
                let mut bad = good;
                bad[byte] ^= 1 << bit;
                assert_ne!(crc8(&bad), reference);
            }
        }
    }
}
