use crate::Pod;
use anyhow::{Context, Result, bail};

#[inline(always)]
pub fn advance_window(window: &[u8], offset: usize) -> &[u8] {
    &window[offset..]
}

/// Reads a value from the front of the window and moves the window past it.
pub fn read_consume_pod<T: Pod>(window: &mut &[u8]) -> Result<T> {
    if window.len() < T::SIZE {
        bail!(
            "buffer underrun: need {} bytes, {} remaining",
            T::SIZE,
            window.len()
        );
    }
    let value = T::read_le(window);
    *window = advance_window(window, T::SIZE);
    Ok(value)
}

fn read_advance_bytes<'a>(window: &mut &'a [u8], len: usize) -> Result<&'a [u8]> {
    if window.len() < len {
        bail!(
            "buffer underrun reading string: need {len} bytes, {} remaining",
            window.len()
        );
    }
    let (bytes, rest) = window.split_at(len);
    *window = rest;
    Ok(bytes)
}

/// Parses a string prefixed by its u16 byte count, moves the window forward.
pub fn read_advance_short_string(window: &mut &[u8]) -> Result<String> {
    let len: u16 = read_consume_pod(window).with_context(|| "reading string length")?;
    let bytes = read_advance_bytes(window, len as usize)?;
    String::from_utf8(bytes.to_vec()).with_context(|| "str::from_utf8")
}

/// Parses a string prefixed by its u32 byte count, moves the window forward.
pub fn read_advance_long_string(window: &mut &[u8]) -> Result<String> {
    let len: u32 = read_consume_pod(window).with_context(|| "reading string length")?;
    let bytes = read_advance_bytes(window, len as usize)?;
    String::from_utf8(bytes.to_vec()).with_context(|| "str::from_utf8")
}

/// Reads the short string stored at an absolute offset of `buffer`
pub fn read_short_string_at(buffer: &[u8], offset: u64) -> Result<String> {
    let Ok(offset) = usize::try_from(offset) else {
        bail!("offset {offset} does not fit in memory");
    };
    if offset > buffer.len() {
        bail!("offset {offset} past end of buffer ({} bytes)", buffer.len());
    }
    let mut window = advance_window(buffer, offset);
    read_advance_short_string(&mut window).with_context(|| format!("string at offset {offset}"))
}
