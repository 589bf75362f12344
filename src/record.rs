//! Transaction records carried by ledger blocks

use crate::error::LedgerError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a sender or receiver name
pub const MAX_PARTY_LENGTH: usize = 256;

/// Decimal places kept when parsing user-entered amounts
pub const AMOUNT_SCALE: u32 = 2;

/// A single transfer of `amount` from `sender` to `receiver`.
///
/// Records are validated on construction and cannot be changed afterwards.
/// Equality follows the field values, so two records with the same parties
/// and an equal amount (`10` vs `10.00`) hash identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRecord")]
pub struct Record {
    pub(crate) sender: String,
    pub(crate) receiver: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub(crate) amount: Decimal,
}

#[derive(Deserialize)]
struct RawRecord {
    sender: String,
    receiver: String,
    #[serde(with = "rust_decimal::serde::str")]
    amount: Decimal,
}

impl TryFrom<RawRecord> for Record {
    type Error = LedgerError;

    fn try_from(raw: RawRecord) -> Result<Self, Self::Error> {
        Record::new(raw.sender, raw.receiver, raw.amount)
    }
}

impl Record {
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: Decimal,
    ) -> Result<Self, LedgerError> {
        let sender = sender.into().trim().to_string();
        let receiver = receiver.into().trim().to_string();

        validate_party("Sender", &sender)?;
        validate_party("Receiver", &receiver)?;

        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(LedgerError::InvalidRecord(format!(
                "Amount cannot be negative: {}",
                amount
            )));
        }

        Ok(Record {
            sender,
            receiver,
            amount,
        })
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Amount text fed to the block hash. Trailing zeros are stripped so the
    /// encoding agrees with `Decimal` equality.
    pub fn canonical_amount(&self) -> String {
        self.amount.normalize().to_string()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} -> {}: {:.2}",
            self.sender, self.receiver, self.amount
        )
    }
}

fn validate_party(role: &str, name: &str) -> Result<(), LedgerError> {
    if name.is_empty() {
        return Err(LedgerError::InvalidRecord(format!(
            "{} cannot be empty",
            role
        )));
    }
    if name.len() > MAX_PARTY_LENGTH {
        return Err(LedgerError::InvalidRecord(format!(
            "{} too long: {} bytes (max: {})",
            role,
            name.len(),
            MAX_PARTY_LENGTH
        )));
    }
    Ok(())
}

/// Parse a user-entered amount, rounding half-away-from-zero to cents.
pub fn parse_amount(input: &str) -> Result<Decimal, LedgerError> {
    let trimmed = input.trim().trim_start_matches('$');
    let amount = Decimal::from_str(trimmed)
        .map_err(|e| LedgerError::InvalidRecord(format!("Invalid amount '{}': {}", input, e)))?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(LedgerError::InvalidRecord(format!(
            "Amount cannot be negative: {}",
            input.trim()
        )));
    }
    Ok(amount.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero))
}
