use crate::error::{LedgerError, Result, StorageError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of fractional digits carried by every monetary value.
pub const MONEY_SCALE: u32 = 2;

/// Exclusive upper bound on the magnitude of any monetary value (`10^18`),
/// the range of a `NUMERIC(20, 2)` column.
pub const MONEY_LIMIT: Decimal = Decimal::from_parts(0xA764_0000, 0x0DE0_B6B3, 0, false, 0);

/// Validates range and precision and normalises a monetary value to
/// [`MONEY_SCALE`].
fn to_money(value: Decimal, what: &str) -> Result<Decimal> {
    if value.abs() >= MONEY_LIMIT {
        return Err(LedgerError::invalid(format!(
            "{what} must be less than {MONEY_LIMIT} in magnitude, got {value}"
        )));
    }
    if value.normalize().scale() > MONEY_SCALE {
        return Err(LedgerError::invalid(format!(
            "{what} must have at most {MONEY_SCALE} fractional digits, got {value}"
        )));
    }
    let mut money = value;
    money.rescale(MONEY_SCALE);
    Ok(money)
}

/// Positive identity of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct AccountId(i64);

impl AccountId {
    pub fn new(id: i64) -> Result<Self> {
        if id > 0 {
            Ok(Self(id))
        } else {
            Err(LedgerError::invalid(format!(
                "account id must be a positive integer, got {id}"
            )))
        }
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for AccountId {
    type Error = LedgerError;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<AccountId> for i64 {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A non-negative account balance with two fractional digits.
///
/// The only way to lower a balance is [`Balance::debit`], which refuses to go
/// below zero, so a `Balance` value can never be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Balance(Decimal);

impl Balance {
    pub const ZERO: Self = Self(Decimal::from_parts(0, 0, 0, false, MONEY_SCALE));

    pub fn new(value: Decimal) -> Result<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(LedgerError::invalid(format!(
                "balance must be non-negative, got {value}"
            )));
        }
        to_money(value, "balance").map(Self)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Returns the balance after withdrawing `amount`, or `None` if it would
    /// go negative.
    pub fn debit(self, amount: Amount) -> Option<Self> {
        (self.0 >= amount.0).then(|| Self(self.0 - amount.0))
    }

    /// Returns the balance after depositing `amount`.
    ///
    /// Fails with a constraint violation if the result would leave the
    /// representable range, like a `NUMERIC(20, 2)` column overflowing.
    pub fn credit(self, amount: Amount) -> Result<Self> {
        match self.0.checked_add(amount.0) {
            Some(sum) if sum < MONEY_LIMIT && sum.scale() == MONEY_SCALE => Ok(Self(sum)),
            _ => Err(StorageError::ConstraintViolation(format!(
                "crediting {amount} to {self} exceeds the balance limit of {MONEY_LIMIT}"
            ))
            .into()),
        }
    }
}

impl TryFrom<Decimal> for Balance {
    type Error = LedgerError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Balance> for Decimal {
    fn from(balance: Balance) -> Self {
        balance.0
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A strictly positive amount of money moved by a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value <= Decimal::ZERO {
            return Err(LedgerError::invalid(format!(
                "amount must be a positive decimal, got {value}"
            )));
        }
        to_money(value, "amount").map(Self)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = LedgerError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An account row: identity plus its latest committed balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub balance: Balance,
}

impl Account {
    pub fn new(id: AccountId, balance: Balance) -> Self {
        Self { id, balance }
    }
}
