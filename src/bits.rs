//! Bit-order helpers for packet slicing.

/// Reverse the bit order of a 16-bit word, so bit 0 becomes bit 15.
///
/// Useful to reinterpret a packet between MSB-first and LSB-first order.
pub fn reverse_bits(word: u16) -> u16 {
    let mut result = 0u16;
    for i in 0..16 {
        if word & (1 << i) != 0 {
            result |= 1 << (15 - i);
        }
    }
    result
}
