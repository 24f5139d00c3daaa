use std::fmt;

const HEX: &[u8] = b"0123456789abcdef";

/// The 16-byte UUID carried in the ZIM header.
///
/// This is not a general-purpose UUID type — it exists solely to format
/// the header's identity bytes in the canonical 8-4-4-4-12 hex grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uuid([u8; 16]);

impl Uuid {
    pub fn new(bytes: [u8; 16]) -> Self {
        Uuid(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    fn hi(&self, i: usize) -> u8 {
        HEX[((self.0[i] >> 4) & 0xF) as usize]
    }

    fn lo(&self, i: usize) -> u8 {
        HEX[(self.0[i] & 0xF) as usize]
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use fmt::Write as _;
        let print_range = |f: &mut fmt::Formatter<'_>, range: std::ops::Range<usize>| {
            for i in range {
                f.write_char(self.hi(i) as char)?;
                f.write_char(self.lo(i) as char)?;
            }
            Ok(())
        };

        print_range(f, 0..4)?;
        f.write_str("-")?;
        print_range(f, 4..6)?;
        f.write_str("-")?;
        print_range(f, 6..8)?;
        f.write_str("-")?;
        print_range(f, 8..10)?;
        f.write_str("-")?;
        print_range(f, 10..16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_canonical_grouping() {
        let bytes: [u8; 16] = [
            0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0x01, 0x23, 0x45, 0x67, 0x89, 0xab,
            0xcd, 0xef,
        ];
        let uuid = Uuid::new(bytes);
        assert_eq!(uuid.to_string(), "01234567-89ab-cdef-0123-456789abcdef");
    }
}
