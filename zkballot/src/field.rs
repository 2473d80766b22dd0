//! Arithmetic over the BN254 scalar field.
//!
//! Every operation is total: inputs outside `[0, r)` are reduced modulo `r` rather than
//! rejected, and `inverse(0)` is defined as `0`.

use crate::*;
use ark_ff::{BigInteger, Field, PrimeField, Zero};

pub use ark_bn254::Fr;

pub fn add(a: Fr, b: Fr) -> Fr {
    a + b
}

pub fn mul(a: Fr, b: Fr) -> Fr {
    a * b
}

/// Multiplicative inverse, with `inverse(0) == 0`.
///
/// The equality-selector gadget depends on this convention to express "not equal"
/// without branching.
pub fn inverse(a: Fr) -> Fr {
    a.inverse().unwrap_or_else(Fr::zero)
}

pub fn fr_from_u64(value: u64) -> Fr {
    Fr::from(value)
}

/// Interpret big-endian bytes of any length as an integer reduced mod r
pub fn fr_from_be_bytes_mod_order(bytes: &[u8]) -> Fr {
    Fr::from_be_bytes_mod_order(bytes)
}

pub fn fr_to_be_bytes(value: &Fr) -> [u8; 32] {
    let bytes = value.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    let start = 32usize.saturating_sub(bytes.len());
    out[start..].copy_from_slice(&bytes[bytes.len() - (32 - start)..]);
    out
}

pub fn fr_to_hex(value: &Fr) -> String {
    format!("0x{}", hex::encode(fr_to_be_bytes(value)))
}

/// The canonical integer of a field element, if it fits in a u64
pub fn fr_to_u64(value: &Fr) -> Option<u64> {
    let limbs = value.into_bigint().0;
    if limbs[1..].iter().all(|limb| *limb == 0) {
        Some(limbs[0])
    } else {
        None
    }
}

/// Little-endian bit decomposition of `value` into exactly `n` bits.
///
/// Returns `None` when the canonical integer does not fit, which is the case where a
/// `Num2Bits(n)` constraint would be unsatisfiable.
pub fn fr_to_bits_le(value: &Fr, n: usize) -> Option<Vec<bool>> {
    let bits = value.into_bigint().to_bits_le();
    if bits.iter().skip(n).any(|bit| *bit) {
        return None;
    }
    let mut out: Vec<bool> = bits.into_iter().take(n).collect();
    out.resize(n, false);
    Some(out)
}

/// Parse a field element from `0x`-prefixed hex or from decimal.
///
/// Values at or above the modulus are reduced, never rejected.
pub fn parse_fr(s: &str) -> Result<Fr, Error> {
    let s = s.trim();
    if let Some(digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if digits.is_empty() {
            return Err(Error::FieldBadFormat("empty hex string".to_owned()));
        }
        let padded = if digits.len() % 2 == 1 {
            format!("0{}", digits)
        } else {
            digits.to_owned()
        };
        let bytes = hex::decode(&padded)
            .map_err(|e| Error::FieldBadFormat(format!("invalid hex: {}", e)))?;
        return Ok(fr_from_be_bytes_mod_order(&bytes));
    }

    if s.is_empty() {
        return Err(Error::FieldBadFormat("empty string".to_owned()));
    }
    let ten = Fr::from(10u64);
    let mut acc = Fr::zero();
    for c in s.chars() {
        let digit = c
            .to_digit(10)
            .ok_or_else(|| Error::FieldBadFormat(format!("invalid decimal digit {:?}", c)))?;
        acc = acc * ten + Fr::from(digit as u64);
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::One;

    const MODULUS_DECIMAL: &str =
        "21888242871839275222246405745257275088548364400416034343698204186575808495617";

    #[test]
    fn inverse_convention() {
        assert_eq!(inverse(Fr::zero()), Fr::zero());

        for v in [1u64, 2, 7, 123456789, u64::MAX].iter() {
            let a = fr_from_u64(*v);
            assert_eq!(mul(a, inverse(a)), Fr::one());
        }

        let minus_one = Fr::zero() - Fr::one();
        assert_eq!(inverse(minus_one), minus_one);
    }

    #[test]
    fn add_wraps_at_modulus() {
        let minus_one = Fr::zero() - Fr::one();
        assert_eq!(add(minus_one, Fr::one()), Fr::zero());
        assert_eq!(add(fr_from_u64(2), fr_from_u64(3)), fr_from_u64(5));
    }

    #[test]
    fn out_of_range_inputs_are_reduced() {
        // r itself reduces to zero, r + 5 to five
        assert_eq!(parse_fr(MODULUS_DECIMAL).unwrap(), Fr::zero());
        let r_plus_5 =
            "21888242871839275222246405745257275088548364400416034343698204186575808495622";
        assert_eq!(parse_fr(r_plus_5).unwrap(), fr_from_u64(5));

        let modulus_bytes = Fr::MODULUS.to_bytes_be();
        assert_eq!(fr_from_be_bytes_mod_order(&modulus_bytes), Fr::zero());

        let wide = parse_fr(&format!("0x{}", "ff".repeat(40))).unwrap();
        assert_eq!(fr_from_be_bytes_mod_order(&[0xff; 40]), wide);
    }

    #[test]
    fn hex_and_decimal_parsing() {
        let a = fr_from_u64(123456789);
        assert_eq!(parse_fr("123456789").unwrap(), a);
        assert_eq!(parse_fr(&fr_to_hex(&a)).unwrap(), a);
        assert_eq!(parse_fr("0x75bcd15").unwrap(), a);
        assert_eq!(fr_to_u64(&a), Some(123456789));

        assert!(parse_fr("").is_err());
        assert!(parse_fr("0x").is_err());
        assert!(parse_fr("12a").is_err());
        assert!(parse_fr("0xzz").is_err());
    }

    #[test]
    fn bit_decomposition() {
        assert_eq!(
            fr_to_bits_le(&fr_from_u64(5), 4),
            Some(vec![true, false, true, false])
        );
        assert_eq!(fr_to_bits_le(&fr_from_u64(16), 4), None);
        assert_eq!(fr_to_bits_le(&(Fr::zero() - Fr::one()), 32), None);
        assert_eq!(fr_to_u64(&(Fr::zero() - Fr::one())), None);
    }
}
