// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Element-type and reduction-operator catalog.
//!
//! The raw lookups ([`datatype_size`], [`datatype_name`], [`redop_name`]) are
//! reporting helpers and never fail: an out-of-range value maps to a 4-byte
//! width and the name `"Unknown"`.

use std::fmt;

use thiserror::Error;

use crate::ffi::{RawDataType, RawRedOp};

/// Width reported for a datatype value outside the catalog.
pub const DEFAULT_DATATYPE_SIZE: usize = 4;

pub const UNKNOWN_NAME: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown {kind} value {value}")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: i32,
}

/// `ncclDataType_t` values the synthetic surface exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ElementType {
    Int8 = 0,
    Int32 = 2,
    Uint32 = 3,
    Int64 = 4,
    Uint64 = 5,
    Float16 = 6,
    Float32 = 7,
    Float64 = 8,
    Bfloat16 = 9,
}

impl ElementType {
    pub const ALL: [ElementType; 9] = [
        ElementType::Int8,
        ElementType::Uint32,
        ElementType::Int32,
        ElementType::Uint64,
        ElementType::Int64,
        ElementType::Float16,
        ElementType::Float32,
        ElementType::Float64,
        ElementType::Bfloat16,
    ];

    pub fn from_raw(raw: RawDataType) -> Option<Self> {
        match raw {
            0 => Some(Self::Int8),
            2 => Some(Self::Int32),
            3 => Some(Self::Uint32),
            4 => Some(Self::Int64),
            5 => Some(Self::Uint64),
            6 => Some(Self::Float16),
            7 => Some(Self::Float32),
            8 => Some(Self::Float64),
            9 => Some(Self::Bfloat16),
            _ => None,
        }
    }

    pub const fn raw(self) -> RawDataType {
        self as RawDataType
    }

    pub const fn size_bytes(self) -> usize {
        match self {
            Self::Int8 => 1,
            Self::Float16 | Self::Bfloat16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
            Self::Int64 | Self::Uint64 | Self::Float64 => 8,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Int8 => "Int8",
            Self::Uint32 => "Uint32",
            Self::Int32 => "Int32",
            Self::Uint64 => "Uint64",
            Self::Int64 => "Int64",
            Self::Float16 => "Float16",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
            Self::Bfloat16 => "Bfloat16",
        }
    }

    /// Bytes occupied by `count` elements of this type.
    pub const fn bytes_for(self, count: usize) -> usize {
        count.saturating_mul(self.size_bytes())
    }
}

impl TryFrom<RawDataType> for ElementType {
    type Error = UnknownValue;

    fn try_from(value: RawDataType) -> Result<Self, Self::Error> {
        Self::from_raw(value).ok_or(UnknownValue {
            kind: "datatype",
            value,
        })
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `ncclRedOp_t` built-in operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ReduceOperator {
    Sum = 0,
    Prod = 1,
    Max = 2,
    Min = 3,
    Avg = 4,
}

impl ReduceOperator {
    pub const ALL: [ReduceOperator; 5] = [
        ReduceOperator::Sum,
        ReduceOperator::Prod,
        ReduceOperator::Max,
        ReduceOperator::Min,
        ReduceOperator::Avg,
    ];

    pub fn from_raw(raw: RawRedOp) -> Option<Self> {
        match raw {
            0 => Some(Self::Sum),
            1 => Some(Self::Prod),
            2 => Some(Self::Max),
            3 => Some(Self::Min),
            4 => Some(Self::Avg),
            _ => None,
        }
    }

    pub const fn raw(self) -> RawRedOp {
        self as RawRedOp
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Sum => "Sum",
            Self::Prod => "Prod",
            Self::Max => "Max",
            Self::Min => "Min",
            Self::Avg => "Avg",
        }
    }
}

impl TryFrom<RawRedOp> for ReduceOperator {
    type Error = UnknownValue;

    fn try_from(value: RawRedOp) -> Result<Self, Self::Error> {
        Self::from_raw(value).ok_or(UnknownValue {
            kind: "reduction operator",
            value,
        })
    }
}

impl fmt::Display for ReduceOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn datatype_size(raw: RawDataType) -> usize {
    ElementType::from_raw(raw).map_or(DEFAULT_DATATYPE_SIZE, ElementType::size_bytes)
}

pub fn datatype_name(raw: RawDataType) -> &'static str {
    ElementType::from_raw(raw).map_or(UNKNOWN_NAME, ElementType::name)
}

pub fn redop_name(raw: RawRedOp) -> &'static str {
    ReduceOperator::from_raw(raw).map_or(UNKNOWN_NAME, ReduceOperator::name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ElementType::Int8, 1)]
    #[case(ElementType::Uint32, 4)]
    #[case(ElementType::Int32, 4)]
    #[case(ElementType::Uint64, 8)]
    #[case(ElementType::Int64, 8)]
    #[case(ElementType::Float16, 2)]
    #[case(ElementType::Float32, 4)]
    #[case(ElementType::Float64, 8)]
    #[case(ElementType::Bfloat16, 2)]
    fn test_element_widths(#[case] ty: ElementType, #[case] width: usize) {
        assert_eq!(ty.size_bytes(), width);
        assert_eq!(datatype_size(ty.raw()), width);
        assert_eq!(ElementType::from_raw(ty.raw()), Some(ty));
    }

    #[test]
    fn test_catalog_is_closed() {
        assert_eq!(ElementType::ALL.len(), 9);
        let mut raws: Vec<_> = ElementType::ALL.iter().map(|t| t.raw()).collect();
        raws.sort_unstable();
        raws.dedup();
        assert_eq!(raws.len(), 9);
    }

    #[rstest]
    #[case(-1)]
    #[case(1)]
    #[case(10)]
    #[case(i32::MAX)]
    fn test_unknown_datatype_defaults(#[case] raw: RawDataType) {
        assert_eq!(datatype_size(raw), DEFAULT_DATATYPE_SIZE);
        assert_eq!(datatype_name(raw), "Unknown");
        let err = ElementType::try_from(raw).unwrap_err();
        assert_eq!(err.value, raw);
    }

    #[test]
    fn test_redop_names() {
        let names: Vec<_> = ReduceOperator::ALL.iter().map(|op| op.to_string()).collect();
        assert_eq!(names, ["Sum", "Prod", "Max", "Min", "Avg"]);
        assert_eq!(redop_name(4), "Avg");
        assert_eq!(redop_name(5), "Unknown");
        assert_eq!(redop_name(-3), "Unknown");
    }

    #[test]
    fn test_bytes_for_saturates() {
        assert_eq!(ElementType::Bfloat16.bytes_for(16 * 1024 * 1024), 32 * 1024 * 1024);
        assert_eq!(ElementType::Float64.bytes_for(usize::MAX), usize::MAX);
    }
}
