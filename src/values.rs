//! Typed element buffers and their byte encoding.
//!
//! Pools carry raw bytes in native byte order; this module converts between
//! those bytes and typed vectors according to an operand's element type.

use byteorder::{ByteOrder, NativeEndian};
use serde::Serialize;

use crate::error::{VtsError, VtsResult};
use crate::hal::OperandType;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TypedValues {
    Float32(Vec<f32>),
    Int32(Vec<i32>),
    Uint32(Vec<u32>),
    Quant8(Vec<u8>),
}

impl TypedValues {
    pub fn len(&self) -> usize {
        match self {
            TypedValues::Float32(v) => v.len(),
            TypedValues::Int32(v) => v.len(),
            TypedValues::Uint32(v) => v.len(),
            TypedValues::Quant8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TypedValues::Float32(_) => "float32",
            TypedValues::Int32(_) => "int32",
            TypedValues::Uint32(_) => "uint32",
            TypedValues::Quant8(_) => "quant8",
        }
    }

    /// True if this buffer can hold elements of `operand_type`.
    pub fn matches(&self, operand_type: OperandType) -> bool {
        match self {
            TypedValues::Float32(_) => matches!(
                operand_type,
                OperandType::Float32 | OperandType::TensorFloat32
            ),
            TypedValues::Int32(_) => {
                matches!(operand_type, OperandType::Int32 | OperandType::TensorInt32)
            }
            TypedValues::Uint32(_) => operand_type == OperandType::Uint32,
            TypedValues::Quant8(_) => operand_type == OperandType::TensorQuant8Asymm,
        }
    }

    pub fn byte_len(&self) -> usize {
        match self {
            TypedValues::Quant8(v) => v.len(),
            other => other.len() * 4,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.byte_len()];
        match self {
            TypedValues::Float32(v) => NativeEndian::write_f32_into(v, &mut bytes),
            TypedValues::Int32(v) => NativeEndian::write_i32_into(v, &mut bytes),
            TypedValues::Uint32(v) => NativeEndian::write_u32_into(v, &mut bytes),
            TypedValues::Quant8(v) => bytes.copy_from_slice(v),
        }
        bytes
    }

    /// Decode `bytes` as elements of `operand_type`.
    ///
    /// # Errors
    ///
    /// [`VtsError::Decode`] when the length is not a whole number of
    /// elements.
    pub fn decode(operand_type: OperandType, bytes: &[u8]) -> VtsResult<Self> {
        let size = operand_type.element_size();
        if bytes.len() % size != 0 {
            return Err(VtsError::Decode(format!(
                "{} bytes is not a whole number of {:?} elements",
                bytes.len(),
                operand_type
            )));
        }
        let count = bytes.len() / size;

        let values = match operand_type {
            OperandType::Float32 | OperandType::TensorFloat32 => {
                let mut out = vec![0f32; count];
                NativeEndian::read_f32_into(bytes, &mut out);
                TypedValues::Float32(out)
            }
            OperandType::Int32 | OperandType::TensorInt32 => {
                let mut out = vec![0i32; count];
                NativeEndian::read_i32_into(bytes, &mut out);
                TypedValues::Int32(out)
            }
            OperandType::Uint32 => {
                let mut out = vec![0u32; count];
                NativeEndian::read_u32_into(bytes, &mut out);
                TypedValues::Uint32(out)
            }
            OperandType::TensorQuant8Asymm => TypedValues::Quant8(bytes.to_vec()),
        };
        Ok(values)
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            TypedValues::Float32(v) => Some(v),
            _ => None,
        }
    }
}

/// Native-endian bytes of an f32 slice.
pub fn f32_bytes(values: &[f32]) -> Vec<u8> {
    TypedValues::Float32(values.to_vec()).to_bytes()
}
