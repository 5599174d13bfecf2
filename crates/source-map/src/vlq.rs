//! Base64 VLQ codec for the `mappings` field of a v3 source map.

use crate::SourceMapError;

const BASE64_CHARS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const BASE64_VALUES: [i8; 128] = {
    let mut table = [-1i8; 128];
    let mut i = 0;
    while i < BASE64_CHARS.len() {
        table[BASE64_CHARS[i] as usize] = i as i8;
        i += 1;
    }
    table
};

const VLQ_SHIFT: u32 = 5;
const VLQ_CONTINUATION: u64 = 0x20;
const VLQ_MASK: u64 = 0x1F;

/// Appends the VLQ encoding of `value` to `out`.
pub fn encode(value: i64, out: &mut String) {
    // Sign goes into the least significant bit
    let mut unsigned: u64 = if value < 0 {
        (value.unsigned_abs() << 1) | 1
    } else {
        (value as u64) << 1
    };

    loop {
        let mut digit = unsigned & VLQ_MASK;
        unsigned >>= VLQ_SHIFT;
        if unsigned > 0 {
            digit |= VLQ_CONTINUATION;
        }
        out.push(BASE64_CHARS[digit as usize] as char);
        if unsigned == 0 {
            break;
        }
    }
}

/// One segment of a decoded `mappings` string, with absolute values.
///
/// Lines and columns are 0-based here, exactly as encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedSegment {
    pub generated_line: u32,
    pub generated_column: u32,
    pub source: Option<u32>,
    pub original_line: u32,
    pub original_column: u32,
    pub name: Option<u32>,
}

/// Decodes a full `mappings` string into absolute segments.
pub fn decode_mappings(mappings: &str) -> Result<Vec<DecodedSegment>, SourceMapError> {
    let bytes = mappings.as_bytes();
    let mut segments = Vec::new();

    let mut generated_line = 0u32;
    let mut generated_column = 0i64;
    let mut source = 0i64;
    let mut original_line = 0i64;
    let mut original_column = 0i64;
    let mut name = 0i64;

    let mut pos = 0;
    while pos < bytes.len() {
        match bytes[pos] {
            b';' => {
                generated_line =
                    generated_line
                        .checked_add(1)
                        .ok_or(SourceMapError::InvalidVlq {
                            offset: pos,
                            reason: "too many lines",
                        })?;
                generated_column = 0;
                pos += 1;
                continue;
            }
            b',' => {
                pos += 1;
                continue;
            }
            _ => {}
        }

        let mut fields = [0i64; 5];
        let mut count = 0;
        while pos < bytes.len() && bytes[pos] != b',' && bytes[pos] != b';' {
            if count == fields.len() {
                return Err(SourceMapError::InvalidVlq {
                    offset: pos,
                    reason: "segment has more than five fields",
                });
            }
            fields[count] = decode_value(bytes, &mut pos)?;
            count += 1;
        }

        let column = accumulate(&mut generated_column, fields[0], Field::GeneratedColumn, pos)?;
        let mut segment = DecodedSegment {
            generated_line,
            generated_column: column,
            source: None,
            original_line: 0,
            original_column: 0,
            name: None,
        };

        match count {
            1 => {}
            4 | 5 => {
                segment.source = Some(accumulate(&mut source, fields[1], Field::Source, pos)?);
                segment.original_line =
                    accumulate(&mut original_line, fields[2], Field::OriginalLine, pos)?;
                segment.original_column =
                    accumulate(&mut original_column, fields[3], Field::OriginalColumn, pos)?;
                if count == 5 {
                    segment.name = Some(accumulate(&mut name, fields[4], Field::Name, pos)?);
                }
            }
            _ => {
                return Err(SourceMapError::InvalidVlq {
                    offset: pos,
                    reason: "segment must have 1, 4 or 5 fields",
                })
            }
        }

        segments.push(segment);
    }

    Ok(segments)
}

/// The relative fields of a segment.
#[derive(Clone, Copy)]
enum Field {
    GeneratedColumn,
    Source,
    OriginalLine,
    OriginalColumn,
    Name,
}

impl Field {
    fn negative(self) -> &'static str {
        match self {
            Field::GeneratedColumn => "negative generated column",
            Field::Source => "negative source index",
            Field::OriginalLine => "negative original line",
            Field::OriginalColumn => "negative original column",
            Field::Name => "negative name index",
        }
    }

    fn out_of_range(self) -> &'static str {
        match self {
            Field::GeneratedColumn => "generated column out of range",
            Field::Source => "source index out of range",
            Field::OriginalLine => "original line out of range",
            Field::OriginalColumn => "original column out of range",
            Field::Name => "name index out of range",
        }
    }
}

/// Adds a relative field to its running total. The new absolute value must
/// fit in a `u32`.
fn accumulate(
    total: &mut i64,
    delta: i64,
    field: Field,
    offset: usize,
) -> Result<u32, SourceMapError> {
    let sum = total
        .checked_add(delta)
        .ok_or(SourceMapError::InvalidVlq {
            offset,
            reason: field.out_of_range(),
        })?;
    let value = u32::try_from(sum).map_err(|_| SourceMapError::InvalidVlq {
        offset,
        reason: if sum < 0 {
            field.negative()
        } else {
            field.out_of_range()
        },
    })?;
    *total = sum;
    Ok(value)
}

/// Decodes one VLQ value starting at `*pos`, advancing past it.
fn decode_value(bytes: &[u8], pos: &mut usize) -> Result<i64, SourceMapError> {
    let mut result: u64 = 0;
    let mut shift = 0u32;

    loop {
        let Some(&byte) = bytes.get(*pos) else {
            return Err(SourceMapError::InvalidVlq {
                offset: *pos,
                reason: "unterminated value",
            });
        };
        let digit = BASE64_VALUES.get(byte as usize).copied().unwrap_or(-1);
        if digit < 0 {
            return Err(SourceMapError::InvalidVlq {
                offset: *pos,
                reason: "invalid base64 character",
            });
        }
        if shift > 60 {
            return Err(SourceMapError::InvalidVlq {
                offset: *pos,
                reason: "value overflows 64 bits",
            });
        }
        *pos += 1;

        let digit = digit as u64;
        result |= (digit & VLQ_MASK) << shift;
        shift += VLQ_SHIFT;

        if digit & VLQ_CONTINUATION == 0 {
            break;
        }
    }

    let magnitude = (result >> 1) as i64;
    Ok(if result & 1 == 1 { -magnitude } else { magnitude })
}
