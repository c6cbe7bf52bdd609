/// Splits addresses into a set index and a tag for a fixed cache geometry
///
/// An address is laid out as `| tag | set index | block offset |`, with the block offset in the
/// low `block_bits` bits. The block offset is discarded, as the simulator works on whole lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressDecoder {
    set_bits: u32,
    block_bits: u32,
    set_mask: u64,
}

impl AddressDecoder {
    /// Creates a decoder. `set_bits + block_bits` must not exceed 64, the configuration layer is
    /// responsible for rejecting anything wider
    pub fn new(set_bits: u32, block_bits: u32) -> Self {
        debug_assert!(set_bits + block_bits <= u64::BITS);
        Self {
            set_bits,
            block_bits,
            set_mask: low_bits_mask(set_bits),
        }
    }

    /// Converts an address into a set and a tag
    ///
    /// The set can be used directly as an index into a collection of sets
    ///
    /// # Arguments
    ///
    /// * `address`: The accessed address
    ///
    /// returns: (u64, u64)
    ///
    /// # Examples
    ///
    /// ```
    /// use csimlib::address::AddressDecoder;
    /// let decoder = AddressDecoder::new(4, 4);
    /// assert_eq!(decoder.decode(0x210), (1, 2));
    /// ```
    #[inline]
    pub fn decode(&self, address: u64) -> (u64, u64) {
        // checked_shr keeps a 64 bit wide field well defined, the result is then simply zero
        let line = address.checked_shr(self.block_bits).unwrap_or(0);
        let set = line & self.set_mask;
        let tag = line.checked_shr(self.set_bits).unwrap_or(0);
        (set, tag)
    }

    /// Number of sets addressable by this decoder
    pub fn num_sets(&self) -> u64 {
        self.set_mask.wrapping_add(1)
    }
}

fn low_bits_mask(bits: u32) -> u64 {
    if bits >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discards_block_offset() {
        let decoder = AddressDecoder::new(4, 4);
        assert_eq!(decoder.decode(0x10), (1, 0));
        assert_eq!(decoder.decode(0x1f), (1, 0));
        assert_eq!(decoder.decode(0x22), (2, 0));
        assert_eq!(decoder.decode(0x110), (1, 1));
    }

    #[test]
    fn zero_block_bits() {
        let decoder = AddressDecoder::new(1, 0);
        assert_eq!(decoder.decode(0x0), (0, 0));
        assert_eq!(decoder.decode(0x2), (0, 1));
        assert_eq!(decoder.decode(0x3), (1, 1));
    }

    #[test]
    fn zero_set_bits_is_fully_associative() {
        let decoder = AddressDecoder::new(0, 6);
        assert_eq!(decoder.num_sets(), 1);
        assert_eq!(decoder.decode(0xdead_beef), (0, 0xdead_beef >> 6));
    }

    #[test]
    fn top_bit_belongs_to_the_tag() {
        let decoder = AddressDecoder::new(8, 6);
        let address = 0x8000_0000_0000_1240u64;
        let (set, tag) = decoder.decode(address);
        assert_eq!(set, (address >> 6) & 0xff);
        assert_eq!(tag, address >> 14);
        assert_eq!(tag >> 49, 1);
    }

    #[test]
    fn full_width_geometry() {
        let decoder = AddressDecoder::new(32, 32);
        assert_eq!(decoder.decode(u64::MAX), (u32::MAX as u64, 0));
        let decoder = AddressDecoder::new(0, 64);
        assert_eq!(decoder.decode(u64::MAX), (0, 0));
    }
}
