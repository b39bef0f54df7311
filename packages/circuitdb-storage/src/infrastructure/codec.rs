//! Primitive field encoding shared by the writer and the reader

use std::io::{Read, Write};
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use circuitdb_core::shared::models::{VarList, VarValue, Variable};
use circuitdb_core::{Name, Orientation, Point};

use crate::error::{Result, StorageError};

/// Strings longer than this are treated as corruption
pub(crate) const MAX_STRING_LEN: usize = 1 << 20;

/// Upper bound on capacity reserved from an untrusted count
const MAX_PREALLOC: usize = 4096;

pub(crate) const PROTO_PRIMITIVE: u8 = 0;
pub(crate) const PROTO_CELL: u8 = 1;

pub(crate) const PORT_PRIMITIVE: u8 = 0;
pub(crate) const PORT_EXPORT: u8 = 1;

const VAR_INT: u8 = 0;
const VAR_DOUBLE: u8 = 1;
const VAR_BOOL: u8 = 2;
const VAR_TEXT: u8 = 3;

pub(crate) fn write_str<W: Write>(out: &mut W, s: &str) -> Result<()> {
    if s.len() > MAX_STRING_LEN {
        return Err(StorageError::format(format!(
            "string of {} bytes exceeds the {} byte limit",
            s.len(),
            MAX_STRING_LEN
        )));
    }
    out.write_u32::<LittleEndian>(s.len() as u32)?;
    out.write_all(s.as_bytes())?;
    Ok(())
}

pub(crate) fn read_string<R: Read>(input: &mut R) -> Result<String> {
    let len = input.read_u32::<LittleEndian>()? as usize;
    if len > MAX_STRING_LEN {
        return Err(StorageError::format(format!("string length {} out of range", len)));
    }
    let mut buf = vec![0u8; len];
    input.read_exact(&mut buf)?;
    Ok(String::from_utf8(buf)?)
}

pub(crate) fn read_name<R: Read>(input: &mut R) -> Result<Name> {
    let s = read_string(input)?;
    Name::new(&s).map_err(|e| StorageError::format(format!("bad name {:?}", s)).with_source(e))
}

pub(crate) fn write_count<W: Write>(out: &mut W, n: usize) -> Result<()> {
    let n = u32::try_from(n).map_err(|_| StorageError::format(format!("count {} exceeds u32", n)))?;
    out.write_u32::<LittleEndian>(n)?;
    Ok(())
}

pub(crate) fn read_count<R: Read>(input: &mut R) -> Result<usize> {
    Ok(input.read_u32::<LittleEndian>()? as usize)
}

/// `Vec` capacity for `n` untrusted items
pub(crate) fn capacity(n: usize) -> usize {
    n.min(MAX_PREALLOC)
}

pub(crate) fn write_bool<W: Write>(out: &mut W, b: bool) -> Result<()> {
    out.write_u8(b as u8)?;
    Ok(())
}

pub(crate) fn read_bool<R: Read>(input: &mut R) -> Result<bool> {
    match input.read_u8()? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StorageError::format(format!("bad bool byte {}", other))),
    }
}

pub(crate) fn write_point<W: Write>(out: &mut W, p: Point) -> Result<()> {
    out.write_i64::<LittleEndian>(p.x)?;
    out.write_i64::<LittleEndian>(p.y)?;
    Ok(())
}

pub(crate) fn read_point<R: Read>(input: &mut R) -> Result<Point> {
    let x = input.read_i64::<LittleEndian>()?;
    let y = input.read_i64::<LittleEndian>()?;
    Ok(Point::new(x, y))
}

pub(crate) fn read_orientation<R: Read>(input: &mut R) -> Result<Orientation> {
    let code = input.read_u8()?;
    Orientation::from_code(code)
        .ok_or_else(|| StorageError::format(format!("bad orientation code {}", code)))
}

pub(crate) fn write_vars<W: Write>(out: &mut W, vars: &VarList) -> Result<()> {
    write_count(out, vars.len())?;
    for var in vars.iter() {
        write_str(out, &var.key)?;
        match &var.value {
            VarValue::Int(v) => {
                out.write_u8(VAR_INT)?;
                out.write_i64::<LittleEndian>(*v)?;
            }
            VarValue::Double(v) => {
                out.write_u8(VAR_DOUBLE)?;
                out.write_f64::<LittleEndian>(*v)?;
            }
            VarValue::Bool(v) => {
                out.write_u8(VAR_BOOL)?;
                write_bool(out, *v)?;
            }
            VarValue::Text(v) => {
                out.write_u8(VAR_TEXT)?;
                write_str(out, v)?;
            }
        }
    }
    Ok(())
}

pub(crate) fn read_vars<R: Read>(input: &mut R) -> Result<VarList> {
    let n = read_count(input)?;
    let mut vars = Vec::with_capacity(capacity(n));
    for _ in 0..n {
        let key = read_string(input)?;
        let value = match input.read_u8()? {
            VAR_INT => VarValue::Int(input.read_i64::<LittleEndian>()?),
            VAR_DOUBLE => VarValue::Double(input.read_f64::<LittleEndian>()?),
            VAR_BOOL => VarValue::Bool(read_bool(input)?),
            VAR_TEXT => VarValue::Text(Arc::from(read_string(input)?)),
            tag => {
                return Err(StorageError::format(format!(
                    "variable {:?} has unknown value tag {}",
                    key, tag
                )))
            }
        };
        vars.push(Variable::new(&key, value));
    }
    Ok(Arc::from(vars))
}
