use anyhow::{Result, bail};

/// Plain old data that has a fixed-width little-endian representation
pub trait Pod: Sized + Copy {
    const SIZE: usize;
    fn write_le(&self, buffer: &mut Vec<u8>);
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_pod {
    ($($t:ty),*) => {
        $(
            impl Pod for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                #[inline(always)]
                fn write_le(&self, buffer: &mut Vec<u8>) {
                    buffer.extend_from_slice(&self.to_le_bytes());
                }

                #[inline(always)]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(&bytes[..std::mem::size_of::<$t>()]);
                    <$t>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_pod!(u8, u16, u32, u64, i32, i64);

#[inline(always)]
pub fn write_any<T: Pod>(buffer: &mut Vec<u8>, value: &T) {
    value.write_le(buffer);
}

/// Number of bytes taken by a string written with [`write_short_string`]
pub fn short_string_size(value: &str) -> usize {
    u16::SIZE + value.len()
}

/// Writes a u16 byte count followed by the utf-8 bytes
pub fn write_short_string(buffer: &mut Vec<u8>, value: &str) -> Result<()> {
    let Ok(len) = u16::try_from(value.len()) else {
        bail!("string too long for a u16 length prefix: {} bytes", value.len());
    };
    write_any(buffer, &len);
    buffer.extend_from_slice(value.as_bytes());
    Ok(())
}

/// Writes a u32 byte count followed by the utf-8 bytes
pub fn write_long_string(buffer: &mut Vec<u8>, value: &str) -> Result<()> {
    let Ok(len) = u32::try_from(value.len()) else {
        bail!("string too long for a u32 length prefix: {} bytes", value.len());
    };
    write_any(buffer, &len);
    buffer.extend_from_slice(value.as_bytes());
    Ok(())
}
