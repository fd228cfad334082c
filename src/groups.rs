//! Groups from [RFC 5054](https://tools.ietf.org/html/rfc5054)
//!
//! It is strongly recommended to use them instead of custom generated
//! groups. [`G_3072`] is the default group of this crate; [`G_2048`] is
//! provided for compatibility with peers that negotiated the smaller
//! modulus.

use crate::types::SrpGroup;
use num_bigint::BigUint;
use once_cell::sync::Lazy;

/// RFC 5054 2048-bit group, `g = 2`.
pub static G_2048: Lazy<SrpGroup> = Lazy::new(|| SrpGroup {
    n: BigUint::from_bytes_be(include_bytes!("groups/2048.bin")),
    g: BigUint::from_bytes_be(&[2]),
});

/// RFC 5054 3072-bit group, `g = 5`. The default.
pub static G_3072: Lazy<SrpGroup> = Lazy::new(|| SrpGroup {
    n: BigUint::from_bytes_be(include_bytes!("groups/3072.bin")),
    g: BigUint::from_bytes_be(&[5]),
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modulus_widths() {
        assert_eq!(G_2048.n_byte_len(), 256);
        assert_eq!(G_3072.n_byte_len(), 384);
    }

    #[test]
    fn moduli_are_odd() {
        assert!(G_2048.n.bit(0));
        assert!(G_3072.n.bit(0));
    }
}
