//! Little-endian POD helpers for persisted pages
//!
//! Strings are stored as a `u32` byte length followed by UTF-8 bytes.

extern crate alloc;

use alloc::format;
use alloc::string::String;
use alloc::vec;
use std::io::{Read, Write};

use crate::error::CacheError;

/// Upper bound on a single stored string, to avoid huge allocations from
/// corrupt length prefixes.
const MAX_STRING_LEN: usize = 64 * 1024;

pub(crate) fn write_u8<W: Write>(w: &mut W, v: u8) -> Result<(), CacheError> {
    w.write_all(&[v])?;
    Ok(())
}

pub(crate) fn write_u16<W: Write>(w: &mut W, v: u16) -> Result<(), CacheError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub(crate) fn write_i16<W: Write>(w: &mut W, v: i16) -> Result<(), CacheError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub(crate) fn write_u32<W: Write>(w: &mut W, v: u32) -> Result<(), CacheError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub(crate) fn write_i32<W: Write>(w: &mut W, v: i32) -> Result<(), CacheError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub(crate) fn write_string<W: Write>(w: &mut W, s: &str) -> Result<(), CacheError> {
    if s.len() > MAX_STRING_LEN {
        return Err(CacheError::Io(format!(
            "string length {} exceeds limit {}",
            s.len(),
            MAX_STRING_LEN
        )));
    }
    write_u32(w, s.len() as u32)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

pub(crate) fn read_u8<R: Read>(r: &mut R) -> Result<u8, CacheError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub(crate) fn read_u16<R: Read>(r: &mut R) -> Result<u16, CacheError> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

pub(crate) fn read_i16<R: Read>(r: &mut R) -> Result<i16, CacheError> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(i16::from_le_bytes(buf))
}

pub(crate) fn read_u32<R: Read>(r: &mut R) -> Result<u32, CacheError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn read_i32<R: Read>(r: &mut R) -> Result<i32, CacheError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

pub(crate) fn read_string<R: Read>(r: &mut R) -> Result<String, CacheError> {
    let len = read_u32(r)? as usize;
    if len > MAX_STRING_LEN {
        return Err(CacheError::Io(format!(
            "string length {} exceeds limit {}",
            len, MAX_STRING_LEN
        )));
    }
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| CacheError::InvalidUtf8)
}
