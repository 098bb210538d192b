//! # ABI Model and Binary Decoder
//!
//! An account publishes an ABI describing the binary layout of its actions.
//! [`AbiSerializer`] walks that description to turn raw action bytes into a
//! JSON value.
//!
//! ## Supported Types
//!
//! | Kind | Types |
//! |------|-------|
//! | Integers | `bool`, `int8`..`int64`, `uint8`..`uint64`, `varint32`, `varuint32` |
//! | Floats | `float32`, `float64` |
//! | Text/bytes | `name`, `string`, `bytes`, `checksum160`, `checksum256`, `checksum512` |
//! | Time | `time_point`, `time_point_sec`, `block_timestamp_type` |
//! | Tokens | `symbol`, `symbol_code`, `asset`, `extended_asset` |
//! | Composite | typedefs, structs with `base`, arrays `T[]`, optionals `T?` |
//!
//! Decoding is bounded by a wall-clock budget and a nesting limit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::name::Name;

/// Maximum nesting of structs, arrays and optionals.
pub const MAX_DECODE_DEPTH: usize = 32;

/// Longest array of elements that read no input (e.g. empty structs).
pub const MAX_ZERO_WIDTH_ARRAY_LEN: usize = 4096;

/// Maximum typedef chain followed while resolving a type.
const MAX_TYPEDEF_HOPS: usize = 32;

/// Block timestamps count half-second slots from 2000-01-01T00:00:00Z.
const BLOCK_TIMESTAMP_EPOCH_MS: i64 = 946_684_800_000;
const BLOCK_INTERVAL_MS: i64 = 500;

/// Errors raised while building or using an [`AbiSerializer`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    /// The ABI version string is not one we understand.
    #[error("unsupported abi version {0:?}")]
    UnsupportedVersion(String),

    /// A type name resolves to nothing.
    #[error("unknown abi type {0:?}")]
    UnknownType(String),

    /// Input bytes do not match the declared layout.
    #[error("malformed action data: {0}")]
    Malformed(String),

    /// Decoding ran past its time budget.
    #[error("decode exceeded {0:?}")]
    Timeout(Duration),

    /// Nesting went past [`MAX_DECODE_DEPTH`].
    #[error("decode nesting exceeds {}", MAX_DECODE_DEPTH)]
    RecursionLimit,
}

// =============================================================================
// ABI DEFINITION
// =============================================================================

/// A `new_type_name -> type` alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    pub new_type_name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// One field of a struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// A struct layout; fields of `base` come first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

/// Binds an action name to the struct describing its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDef {
    pub name: Name,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub ricardian_contract: String,
}

/// An account's published interface description.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Abi {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub types: Vec<TypeDef>,
    #[serde(default)]
    pub structs: Vec<StructDef>,
    #[serde(default)]
    pub actions: Vec<ActionDef>,
}

// =============================================================================
// SERIALIZER
// =============================================================================

/// Decoder built from one account's [`Abi`].
#[derive(Debug, Clone)]
pub struct AbiSerializer {
    typedefs: HashMap<String, String>,
    structs: HashMap<String, StructDef>,
    actions: HashMap<Name, String>,
}

impl AbiSerializer {
    /// Index an ABI for decoding.
    ///
    /// An empty version string is accepted; anything else must be `eosio::abi/1.x`.
    pub fn new(abi: Abi) -> Result<Self, AbiError> {
        if !abi.version.is_empty() && !abi.version.starts_with("eosio::abi/1.") {
            return Err(AbiError::UnsupportedVersion(abi.version));
        }

        Ok(Self {
            typedefs: abi
                .types
                .into_iter()
                .map(|t| (t.new_type_name, t.type_name))
                .collect(),
            structs: abi.structs.into_iter().map(|s| (s.name.clone(), s)).collect(),
            actions: abi
                .actions
                .into_iter()
                .map(|a| (a.name, a.type_name))
                .collect(),
        })
    }

    /// Payload type of `action`, if the ABI declares it.
    pub fn get_action_type(&self, action: Name) -> Option<&str> {
        self.actions.get(&action).map(String::as_str)
    }

    /// Decode `data` as `type_name` within `max_time`.
    ///
    /// Every input byte must be consumed.
    pub fn binary_to_value(
        &self,
        type_name: &str,
        data: &[u8],
        max_time: Duration,
    ) -> Result<Value, AbiError> {
        let mut ctx = DecodeContext {
            reader: Reader::new(data),
            deadline: Instant::now() + max_time,
            max_time,
            depth: 0,
        };

        let value = self.decode(type_name, &mut ctx)?;
        if ctx.reader.remaining() > 0 {
            return Err(AbiError::Malformed(format!(
                "{} trailing bytes after {}",
                ctx.reader.remaining(),
                type_name
            )));
        }
        Ok(value)
    }

    fn resolve<'a>(&'a self, mut type_name: &'a str) -> Result<&'a str, AbiError> {
        for _ in 0..MAX_TYPEDEF_HOPS {
            match self.typedefs.get(type_name) {
                Some(target) => type_name = target.as_str(),
                None => return Ok(type_name),
            }
        }
        Err(AbiError::UnknownType(type_name.to_string()))
    }

    fn decode(&self, type_name: &str, ctx: &mut DecodeContext<'_>) -> Result<Value, AbiError> {
        ctx.enter()?;
        let result = self.decode_inner(type_name, ctx);
        ctx.depth -= 1;
        result
    }

    fn decode_inner(&self, type_name: &str, ctx: &mut DecodeContext<'_>) -> Result<Value, AbiError> {
        if let Some(element) = type_name.strip_suffix("[]") {
            let len = ctx.reader.varuint32()? as usize;
            let available = ctx.reader.remaining();
            let mut items = Vec::with_capacity(len.min(available));
            for index in 0..len {
                ctx.check_deadline()?;
                items.push(self.decode(element, ctx)?);
                if index == 0 {
                    let width = available - ctx.reader.remaining();
                    check_array_len(element, len, width, available)?;
                }
            }
            return Ok(Value::Array(items));
        }

        if let Some(inner) = type_name.strip_suffix('?') {
            return match ctx.reader.u8()? {
                0 => Ok(Value::Null),
                1 => self.decode(inner, ctx),
                flag => Err(AbiError::Malformed(format!("optional flag {flag}"))),
            };
        }

        let resolved = self.resolve(type_name)?;
        if resolved != type_name {
            return self.decode(resolved, ctx);
        }

        if let Some(value) = decode_builtin(resolved, &mut ctx.reader)? {
            return Ok(value);
        }

        let def = self
            .structs
            .get(resolved)
            .ok_or_else(|| AbiError::UnknownType(resolved.to_string()))?;
        let mut object = Map::new();
        self.decode_struct(def, ctx, &mut object)?;
        Ok(Value::Object(object))
    }

    fn decode_struct(
        &self,
        def: &StructDef,
        ctx: &mut DecodeContext<'_>,
        object: &mut Map<String, Value>,
    ) -> Result<(), AbiError> {
        ctx.enter()?;
        if !def.base.is_empty() {
            let base_name = self.resolve(&def.base)?;
            let base = self
                .structs
                .get(base_name)
                .ok_or_else(|| AbiError::UnknownType(def.base.clone()))?;
            self.decode_struct(base, ctx, object)?;
        }

        for field in &def.fields {
            ctx.check_deadline()?;
            let value = self.decode(&field.type_name, ctx)?;
            object.insert(field.name.clone(), value);
        }
        ctx.depth -= 1;
        Ok(())
    }
}

struct DecodeContext<'a> {
    reader: Reader<'a>,
    deadline: Instant,
    max_time: Duration,
    depth: usize,
}

impl DecodeContext<'_> {
    fn enter(&mut self) -> Result<(), AbiError> {
        self.check_deadline()?;
        if self.depth >= MAX_DECODE_DEPTH {
            return Err(AbiError::RecursionLimit);
        }
        self.depth += 1;
        Ok(())
    }

    fn check_deadline(&self) -> Result<(), AbiError> {
        if Instant::now() > self.deadline {
            return Err(AbiError::Timeout(self.max_time));
        }
        Ok(())
    }
}

// =============================================================================
// BUILT-IN TYPES
// =============================================================================

fn decode_builtin(type_name: &str, reader: &mut Reader<'_>) -> Result<Option<Value>, AbiError> {
    let value = match type_name {
        "bool" => match reader.u8()? {
            0 => Value::Bool(false),
            1 => Value::Bool(true),
            other => return Err(AbiError::Malformed(format!("bool byte {other}"))),
        },
        "int8" => Value::from(reader.array::<1>().map(i8::from_le_bytes)?),
        "uint8" => Value::from(reader.u8()?),
        "int16" => Value::from(reader.array::<2>().map(i16::from_le_bytes)?),
        "uint16" => Value::from(reader.array::<2>().map(u16::from_le_bytes)?),
        "int32" => Value::from(reader.array::<4>().map(i32::from_le_bytes)?),
        "uint32" => Value::from(reader.u32()?),
        "int64" => Value::from(reader.i64()?),
        "uint64" => Value::from(reader.u64()?),
        "varuint32" => Value::from(reader.varuint32()?),
        "varint32" => {
            let raw = reader.varuint32()?;
            Value::from(((raw >> 1) as i32) ^ -((raw & 1) as i32))
        }
        "float32" => float(f64::from(reader.array::<4>().map(f32::from_le_bytes)?)),
        "float64" => float(reader.array::<8>().map(f64::from_le_bytes)?),
        "name" => Value::String(Name::from_u64(reader.u64()?).to_string()),
        "string" => {
            let bytes = reader.sized_bytes()?;
            let text = std::str::from_utf8(bytes)
                .map_err(|e| AbiError::Malformed(format!("string is not utf-8: {e}")))?;
            Value::String(text.to_string())
        }
        "bytes" => Value::String(hex::encode(reader.sized_bytes()?)),
        "checksum160" => Value::String(hex::encode(reader.take(20)?)),
        "checksum256" => Value::String(hex::encode(reader.take(32)?)),
        "checksum512" => Value::String(hex::encode(reader.take(64)?)),
        "time_point" => Value::String(format_micros(reader.i64()?)?),
        "time_point_sec" => Value::String(format_seconds(reader.u32()?)?),
        "block_timestamp_type" => {
            let slot = i64::from(reader.u32()?);
            let millis = BLOCK_TIMESTAMP_EPOCH_MS + slot * BLOCK_INTERVAL_MS;
            Value::String(format_micros(millis * 1_000)?)
        }
        "symbol_code" => Value::String(symbol_code_to_string(reader.u64()?)?),
        "symbol" => {
            let (precision, code) = split_symbol(reader.u64()?)?;
            Value::String(format!("{precision},{code}"))
        }
        "asset" => Value::String(read_asset(reader)?),
        "extended_asset" => {
            let quantity = read_asset(reader)?;
            let contract = Name::from_u64(reader.u64()?);
            serde_json::json!({ "quantity": quantity, "contract": contract.to_string() })
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

/// Element width is a property of the type: only structs can be zero-width,
/// everything else reads at least one byte per element.
fn check_array_len(
    element: &str,
    len: usize,
    width: usize,
    available: usize,
) -> Result<(), AbiError> {
    if width == 0 && len > MAX_ZERO_WIDTH_ARRAY_LEN {
        return Err(AbiError::Malformed(format!(
            "{len} zero-width {element} elements exceed {MAX_ZERO_WIDTH_ARRAY_LEN}"
        )));
    }
    if width > 0 && len > available {
        return Err(AbiError::Malformed(format!(
            "array of {len} {element} cannot fit in {available} bytes"
        )));
    }
    Ok(())
}

fn float(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

fn format_micros(micros: i64) -> Result<String, AbiError> {
    DateTime::<Utc>::from_timestamp_micros(micros)
        .map(|t| t.format("%Y-%m-%dT%H:%M:%S%.3f").to_string())
        .ok_or_else(|| AbiError::Malformed(format!("time point {micros} out of range")))
}

fn format_seconds(secs: u32) -> Result<String, AbiError> {
    DateTime::<Utc>::from_timestamp(i64::from(secs), 0)
        .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string())
        .ok_or_else(|| AbiError::Malformed(format!("time point {secs} out of range")))
}

fn symbol_code_to_string(mut code: u64) -> Result<String, AbiError> {
    let mut text = String::new();
    while code > 0 {
        let ch = (code & 0xff) as u8;
        if !ch.is_ascii_uppercase() {
            return Err(AbiError::Malformed(format!("invalid symbol character {ch:#04x}")));
        }
        text.push(ch as char);
        code >>= 8;
    }
    if text.is_empty() || text.len() > 7 {
        return Err(AbiError::Malformed("symbol code must be 1-7 characters".into()));
    }
    Ok(text)
}

fn split_symbol(raw: u64) -> Result<(u8, String), AbiError> {
    let precision = (raw & 0xff) as u8;
    if precision > 18 {
        return Err(AbiError::Malformed(format!("symbol precision {precision} > 18")));
    }
    Ok((precision, symbol_code_to_string(raw >> 8)?))
}

fn read_asset(reader: &mut Reader<'_>) -> Result<String, AbiError> {
    let amount = i128::from(reader.i64()?);
    let (precision, code) = split_symbol(reader.u64()?)?;

    let sign = if amount < 0 { "-" } else { "" };
    let magnitude = amount.unsigned_abs();
    if precision == 0 {
        return Ok(format!("{sign}{magnitude} {code}"));
    }

    let scale = 10u128.pow(u32::from(precision));
    Ok(format!(
        "{sign}{}.{:0width$} {code}",
        magnitude / scale,
        magnitude % scale,
        width = usize::from(precision)
    ))
}

// =============================================================================
// READER
// =============================================================================

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], AbiError> {
        if len > self.remaining() {
            return Err(AbiError::Malformed(format!(
                "need {len} bytes at offset {}, have {}",
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], AbiError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, AbiError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, AbiError> {
        self.array::<4>().map(u32::from_le_bytes)
    }

    fn u64(&mut self) -> Result<u64, AbiError> {
        self.array::<8>().map(u64::from_le_bytes)
    }

    fn i64(&mut self) -> Result<i64, AbiError> {
        self.array::<8>().map(i64::from_le_bytes)
    }

    fn varuint32(&mut self) -> Result<u32, AbiError> {
        let mut value = 0u64;
        for shift in (0..35).step_by(7) {
            let byte = self.u8()?;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return u32::try_from(value)
                    .map_err(|_| AbiError::Malformed("varuint32 overflow".into()));
            }
        }
        Err(AbiError::Malformed("varuint32 longer than 5 bytes".into()))
    }

    fn sized_bytes(&mut self) -> Result<&'a [u8], AbiError> {
        let len = self.varuint32()? as usize;
        self.take(len)
    }
}
