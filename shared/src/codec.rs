//! Label encodings for the categorical churn features.
//!
//! Codes are the enum discriminants and must match the label encoding used
//! when the model was trained. Anything that turns a category into a number
//! goes through this module.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{EnumCount as EnumCountMacro, EnumIter, EnumString, IntoStaticStr};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unknown {kind} value '{value}', expected one of: {}", .allowed.join(", "))]
    UnknownCategory {
        kind: CategoryKind,
        value: String,
        allowed: Vec<&'static str>,
    },
    #[error("{kind} has no category with code {code}")]
    UnknownCode { kind: CategoryKind, code: u32 },
}

/// The closed enumerations the model knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum CategoryKind {
    Contract,
    InternetService,
    PaymentMethod,
    Gender,
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CategoryKind::Contract => "Contract",
            CategoryKind::InternetService => "InternetService",
            CategoryKind::PaymentMethod => "PaymentMethod",
            CategoryKind::Gender => "Gender",
        };
        f.write_str(name)
    }
}

impl CategoryKind {
    pub fn encode(self, value: &str) -> Result<u32, CodecError> {
        match self {
            CategoryKind::Contract => Contract::encode(value),
            CategoryKind::InternetService => InternetService::encode(value),
            CategoryKind::PaymentMethod => PaymentMethod::encode(value),
            CategoryKind::Gender => Gender::encode(value),
        }
    }

    pub fn decode(self, code: u32) -> Result<&'static str, CodecError> {
        match self {
            CategoryKind::Contract => Contract::decode(code).map(Into::into),
            CategoryKind::InternetService => InternetService::decode(code).map(Into::into),
            CategoryKind::PaymentMethod => PaymentMethod::decode(code).map(Into::into),
            CategoryKind::Gender => Gender::decode(code).map(Into::into),
        }
    }

    /// All permitted values, in code order.
    pub fn values(self) -> Vec<&'static str> {
        match self {
            CategoryKind::Contract => Contract::values(),
            CategoryKind::InternetService => InternetService::values(),
            CategoryKind::PaymentMethod => PaymentMethod::values(),
            CategoryKind::Gender => Gender::values(),
        }
    }

    pub fn cardinality(self) -> usize {
        match self {
            CategoryKind::Contract => Contract::COUNT,
            CategoryKind::InternetService => InternetService::COUNT,
            CategoryKind::PaymentMethod => PaymentMethod::COUNT,
            CategoryKind::Gender => Gender::COUNT,
        }
    }
}

/// A categorical feature whose variants carry their training-time code.
pub trait Category:
    Copy + IntoEnumIterator + FromStr + Into<&'static str> + 'static
{
    const KIND: CategoryKind;

    fn code(self) -> u32;

    fn encode(value: &str) -> Result<u32, CodecError> {
        value
            .parse::<Self>()
            .map(Self::code)
            .map_err(|_| CodecError::UnknownCategory {
                kind: Self::KIND,
                value: value.to_string(),
                allowed: Self::values(),
            })
    }

    fn decode(code: u32) -> Result<Self, CodecError> {
        Self::iter()
            .find(|category| category.code() == code)
            .ok_or(CodecError::UnknownCode {
                kind: Self::KIND,
                code,
            })
    }

    fn values() -> Vec<&'static str> {
        Self::iter().map(Into::into).collect()
    }
}

macro_rules! impl_category {
    ($ty:ty, $kind:expr) => {
        impl Category for $ty {
            const KIND: CategoryKind = $kind;

            fn code(self) -> u32 {
                self as u32
            }
        }
    };
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
    EnumIter, EnumString, IntoStaticStr, EnumCountMacro,
)]
#[repr(u32)]
pub enum Contract {
    #[serde(rename = "Month-to-month")]
    #[strum(serialize = "Month-to-month")]
    MonthToMonth = 0,
    #[serde(rename = "One year")]
    #[strum(serialize = "One year")]
    OneYear = 1,
    #[serde(rename = "Two year")]
    #[strum(serialize = "Two year")]
    TwoYear = 2,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
    EnumIter, EnumString, IntoStaticStr, EnumCountMacro,
)]
#[repr(u32)]
pub enum InternetService {
    #[serde(rename = "DSL")]
    #[strum(serialize = "DSL")]
    Dsl = 0,
    #[serde(rename = "Fiber optic")]
    #[strum(serialize = "Fiber optic")]
    FiberOptic = 1,
    #[serde(rename = "No")]
    #[strum(serialize = "No")]
    NoService = 2,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
    EnumIter, EnumString, IntoStaticStr, EnumCountMacro,
)]
#[repr(u32)]
pub enum PaymentMethod {
    #[serde(rename = "Electronic check")]
    #[strum(serialize = "Electronic check")]
    ElectronicCheck = 0,
    #[serde(rename = "Mailed check")]
    #[strum(serialize = "Mailed check")]
    MailedCheck = 1,
    #[serde(rename = "Bank transfer (automatic)")]
    #[strum(serialize = "Bank transfer (automatic)")]
    BankTransfer = 2,
    #[serde(rename = "Credit card (automatic)")]
    #[strum(serialize = "Credit card (automatic)")]
    CreditCard = 3,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
    EnumIter, EnumString, IntoStaticStr, EnumCountMacro,
)]
#[repr(u32)]
pub enum Gender {
    Female = 0,
    Male = 1,
}

impl_category!(Contract, CategoryKind::Contract);
impl_category!(InternetService, CategoryKind::InternetService);
impl_category!(PaymentMethod, CategoryKind::PaymentMethod);
impl_category!(Gender, CategoryKind::Gender);
