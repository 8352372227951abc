//! Value Objects for the shop

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self { Self(Uuid::now_v7()) }
            pub fn from_uuid(uuid: Uuid) -> Self { Self(uuid) }
            pub fn into_uuid(self) -> Uuid { self.0 }
        }

        impl Default for $name {
            fn default() -> Self { Self::new() }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;
            fn from_str(s: &str) -> Result<Self, Self::Err> { Uuid::parse_str(s).map(Self) }
        }
    };
}

uuid_id!(
    /// Catalog product identifier
    ProductId
);
uuid_id!(
    /// Order header identifier
    OrderId
);
uuid_id!(OrderItemId);
uuid_id!(
    /// Identity issued by the hosted auth service; profiles share it as their id.
    UserId
);

/// Integer amount in Toman.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn new(amount: i64) -> Self { Self(amount) }
    pub fn amount(&self) -> i64 { self.0 }
    /// Saturates instead of overflowing; order pricing uses the checked forms.
    pub fn times(&self, qty: Quantity) -> Money { Money(self.0.saturating_mul(i64::from(qty.value()))) }

    pub fn checked_times(&self, qty: Quantity) -> Option<Money> { self.0.checked_mul(i64::from(qty.value())).map(Money) }

    pub fn checked_add(&self, other: Money) -> Option<Money> { self.0.checked_add(other.0).map(Money) }
}

impl std::ops::Add for Money {
    type Output = Money;
    fn add(self, other: Money) -> Money { Money(self.0.saturating_add(other.0)) }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::ZERO, |acc, m| acc + m) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} تومان", self.0) }
}

/// Ordered quantity of a single product, always within `1..=999`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub const MAX: u32 = 999;

    pub fn new(value: u32) -> Result<Self, QuantityError> {
        if value == 0 { return Err(QuantityError::Zero); }
        if value > Self::MAX { return Err(QuantityError::TooLarge); }
        Ok(Self(value))
    }

    /// Clamps any count into the valid range.
    pub fn clamped(value: u32) -> Self { Self(value.clamp(1, Self::MAX)) }

    pub fn value(&self) -> u32 { self.0 }

    pub fn saturating_add(&self, other: Quantity) -> Self { Self::clamped(self.0.saturating_add(other.0)) }

    pub fn as_i32(&self) -> i32 {
        // MAX fits comfortably in i32
        self.0 as i32
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;
    fn try_from(value: u32) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> u32 { q.0 }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuantityError {
    #[error("تعداد باید حداقل ۱ باشد")]
    Zero,
    #[error("تعداد نمی‌تواند بیشتر از ۹۹۹ باشد")]
    TooLarge,
}
