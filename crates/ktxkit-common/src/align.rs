//! Alignment arithmetic.
//!
//! Every section of a KTX2 file starts on some byte boundary: key/value entries
//! on 4 bytes, supercompression global data on 8 bytes, mip levels on
//! `lcm(texel block size, 4)`. These helpers are the single place that math lives.

/// Number of bytes needed to round `value` up to a multiple of `alignment`.
///
/// Returns 0 when `value` is already aligned. An `alignment` of 0 or 1 never pads.
///
/// ```
/// use ktxkit_common::align::padding;
///
/// assert_eq!(padding(13, 4), 3);
/// assert_eq!(padding(16, 4), 0);
/// ```
#[inline]
pub const fn padding(value: u64, alignment: u32) -> u32 {
    if alignment <= 1 {
        return 0;
    }
    let alignment = alignment as u64;
    ((alignment - value % alignment) % alignment) as u32
}

/// Round `value` up to the next multiple of `alignment`.
#[inline]
pub const fn align_up(value: u64, alignment: u32) -> u64 {
    value + padding(value, alignment) as u64
}

/// Greatest common divisor.
#[inline]
pub const fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Least common multiple. Returns 0 if either argument is 0.
#[inline]
pub const fn lcm(a: u32, b: u32) -> u32 {
    if a == 0 || b == 0 {
        return 0;
    }
    a / gcd(a, b) * b
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 4, 0)]
    #[case(1, 4, 3)]
    #[case(3, 4, 1)]
    #[case(4, 4, 0)]
    #[case(81, 8, 7)]
    #[case(120, 16, 8)]
    #[case(7, 1, 0)]
    #[case(7, 0, 0)]
    fn test_padding(#[case] value: u64, #[case] alignment: u32, #[case] expected: u32) {
        assert_eq!(padding(value, alignment), expected);
    }

    #[test]
    fn test_padding_always_reaches_alignment() {
        for alignment in [1u32, 2, 3, 4, 6, 8, 12, 16, 24] {
            for value in 0u64..100 {
                let pad = padding(value, alignment);
                assert_eq!((value + pad as u64) % alignment as u64, 0);
                assert!(pad < alignment);
                if value % alignment as u64 == 0 {
                    assert_eq!(pad, 0);
                }
            }
        }
    }

    #[rstest]
    #[case(1, 4, 4)]
    #[case(2, 4, 4)]
    #[case(3, 4, 12)]
    #[case(6, 4, 12)]
    #[case(8, 4, 8)]
    #[case(16, 4, 16)]
    #[case(0, 4, 0)]
    fn test_lcm(#[case] a: u32, #[case] b: u32, #[case] expected: u32) {
        assert_eq!(lcm(a, b), expected);
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(200, 8), 200);
    }
}
