//! Decoding of individual pixel samples from raw payload bytes.
use crate::error::Result;
use crate::typedef::SampleType;
use byteordered::{ByteOrdered, Endian};
use half::f16;
use num_traits::AsPrimitive;
use std::io::Read;
use std::mem::size_of;

/// Interface for primitive types a pixel sample can decode into.
///
/// Implementations read one fixed-width value at a time in the payload's
/// declared byte order. The `f64` view is what the floating rescale
/// operates on, regardless of the source width.
pub trait Sample: 'static + Sized + Copy + AsPrimitive<f64> {
    /// The sample encoding mapped to this type.
    const TYPE: SampleType;

    /// Read a single sample from the given byte source.
    fn from_raw<S, E>(src: S, endianness: E) -> Result<Self>
    where
        S: Read,
        E: Endian;

    /// Decode a byte buffer into samples, in file order. Trailing bytes
    /// short of a full sample are not consumed.
    fn from_raw_vec<E>(bytes: &[u8], endianness: E) -> Result<Vec<Self>>
    where
        E: Endian + Clone,
    {
        let mut cursor = bytes;
        let n = bytes.len() / size_of::<Self>();
        (0..n)
            .map(|_| Self::from_raw(&mut cursor, endianness.clone()))
            .collect()
    }
}

impl Sample for u8 {
    const TYPE: SampleType = SampleType::Uint8;
    fn from_raw_vec<E>(bytes: &[u8], _: E) -> Result<Vec<Self>>
    where
        E: Endian,
    {
        Ok(bytes.to_vec())
    }
    fn from_raw<S, E>(src: S, _: E) -> Result<Self>
    where
        S: Read,
        E: Endian,
    {
        ByteOrdered::native(src).read_u8().map_err(From::from)
    }
}
impl Sample for i8 {
    const TYPE: SampleType = SampleType::Int8;
    fn from_raw_vec<E>(bytes: &[u8], _: E) -> Result<Vec<Self>>
    where
        E: Endian,
    {
        Ok(bytes.iter().map(|b| *b as i8).collect())
    }
    fn from_raw<S, E>(src: S, _: E) -> Result<Self>
    where
        S: Read,
        E: Endian,
    {
        ByteOrdered::native(src).read_i8().map_err(From::from)
    }
}
impl Sample for u16 {
    const TYPE: SampleType = SampleType::Uint16;
    fn from_raw<S, E>(src: S, e: E) -> Result<Self>
    where
        S: Read,
        E: Endian,
    {
        e.read_u16(src).map_err(From::from)
    }
}
impl Sample for i16 {
    const TYPE: SampleType = SampleType::Int16;
    fn from_raw<S, E>(src: S, e: E) -> Result<Self>
    where
        S: Read,
        E: Endian,
    {
        e.read_i16(src).map_err(From::from)
    }
}
impl Sample for u32 {
    const TYPE: SampleType = SampleType::Uint32;
    fn from_raw<S, E>(src: S, e: E) -> Result<Self>
    where
        S: Read,
        E: Endian,
    {
        e.read_u32(src).map_err(From::from)
    }
}
impl Sample for i32 {
    const TYPE: SampleType = SampleType::Int32;
    fn from_raw<S, E>(src: S, e: E) -> Result<Self>
    where
        S: Read,
        E: Endian,
    {
        e.read_i32(src).map_err(From::from)
    }
}
impl Sample for u64 {
    const TYPE: SampleType = SampleType::Uint64;
    fn from_raw<S, E>(src: S, e: E) -> Result<Self>
    where
        S: Read,
        E: Endian,
    {
        e.read_u64(src).map_err(From::from)
    }
}
impl Sample for i64 {
    const TYPE: SampleType = SampleType::Int64;
    fn from_raw<S, E>(src: S, e: E) -> Result<Self>
    where
        S: Read,
        E: Endian,
    {
        e.read_i64(src).map_err(From::from)
    }
}
impl Sample for f16 {
    const TYPE: SampleType = SampleType::Float16;
    fn from_raw<S, E>(src: S, e: E) -> Result<Self>
    where
        S: Read,
        E: Endian,
    {
        e.read_u16(src).map(f16::from_bits).map_err(From::from)
    }
}
impl Sample for f32 {
    const TYPE: SampleType = SampleType::Float32;
    fn from_raw<S, E>(src: S, e: E) -> Result<Self>
    where
        S: Read,
        E: Endian,
    {
        e.read_f32(src).map_err(From::from)
    }
}
impl Sample for f64 {
    const TYPE: SampleType = SampleType::Float64;
    fn from_raw<S, E>(src: S, e: E) -> Result<Self>
    where
        S: Read,
        E: Endian,
    {
        e.read_f64(src).map_err(From::from)
    }
}

#[cfg(test)]
mod tests {
    use super::Sample;
    use byteordered::Endianness;
    use half::f16;

    #[test]
    fn byte_order_is_honored() {
        let bytes = [0x01, 0x02, 0x03, 0x04];
        let le = u16::from_raw_vec(&bytes, Endianness::Little).unwrap();
        assert_eq!(le, vec![0x0201, 0x0403]);
        let be = u16::from_raw_vec(&bytes, Endianness::Big).unwrap();
        assert_eq!(be, vec![0x0102, 0x0304]);
    }

    #[test]
    fn signed_samples_keep_their_sign() {
        let bytes = (-2i16).to_le_bytes();
        let v = i16::from_raw_vec(&bytes, Endianness::Little).unwrap();
        assert_eq!(v, vec![-2]);
    }

    #[test]
    fn trailing_partial_sample_is_left_over() {
        let bytes = [0x01, 0x00, 0x02, 0x00, 0xFF];
        let v = u16::from_raw_vec(&bytes, Endianness::Little).unwrap();
        assert_eq!(v, vec![1, 2]);
    }

    #[test]
    fn half_precision_decodes_through_bits() {
        let one = f16::from_f32(1.5);
        let bytes = one.to_bits().to_be_bytes();
        let v = f16::from_raw_vec(&bytes, Endianness::Big).unwrap();
        assert_eq!(v, vec![one]);
    }
}
