//! Ledger data models: accounts, entries, transfers

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::LedgerError;

// ============================================================================
// Currency
// ============================================================================

/// Supported account currencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Cad,
    Pln,
}

impl Currency {
    pub const ALL: [Currency; 4] = [Currency::Usd, Currency::Eur, Currency::Cad, Currency::Pln];

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Cad => "CAD",
            Currency::Pln => "PLN",
        }
    }

    pub fn is_supported(code: &str) -> bool {
        code.parse::<Currency>().is_ok()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "CAD" => Ok(Currency::Cad),
            "PLN" => Ok(Currency::Pln),
            other => Err(LedgerError::InvalidArgument(format!(
                "unsupported currency: {}",
                other
            ))),
        }
    }
}

// ============================================================================
// Rows
// ============================================================================

/// Account row. Balance is in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Account {
    pub id: i64,
    pub owner: String,
    pub balance: i64,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

/// Ledger line. Positive amounts credit the account, negative amounts debit it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Entry {
    pub id: i64,
    pub account_id: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// Record of money moved between two accounts. `amount` is always positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Transfer {
    pub id: i64,
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transfer[{}] {} -> {} amount={}",
            self.id, self.from_account_id, self.to_account_id, self.amount
        )
    }
}

// ============================================================================
// Parameters
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAccountParams {
    pub owner: String,
    pub balance: i64,
    pub currency: Currency,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListAccountsParams {
    /// Restrict to one owner; `None` lists every account.
    pub owner: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateEntryParams {
    pub account_id: i64,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntriesParams {
    pub account_id: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTransferParams {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
}

/// Transfers where `from_account_id = from` OR `to_account_id = to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListTransfersParams {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Transfer request handed to the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferParams {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
}

impl TransferParams {
    pub fn new(from_account_id: i64, to_account_id: i64, amount: i64) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
        }
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.amount <= 0 {
            return Err(LedgerError::InvalidArgument(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }
        if self.from_account_id == self.to_account_id {
            return Err(LedgerError::InvalidArgument(format!(
                "cannot transfer from account {} to itself",
                self.from_account_id
            )));
        }
        Ok(())
    }
}

/// Everything a committed transfer created or changed.
///
/// Accounts are placed by id, independent of the order in which their
/// balances were updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TransferResult {
    pub transfer: Transfer,
    pub from_account: Account,
    pub to_account: Account,
    pub from_entry: Entry,
    pub to_entry: Entry,
}

impl TransferResult {
    /// Look up one of the two updated accounts by its id.
    pub fn account(&self, id: i64) -> Option<&Account> {
        [&self.from_account, &self.to_account]
            .into_iter()
            .find(|a| a.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::error::ErrorKind;

    #[test]
    fn test_currency_roundtrip() {
        for c in Currency::ALL {
            assert_eq!(c.as_str().parse::<Currency>().unwrap(), c);
        }
        assert!(Currency::is_supported("PLN"));
        assert!(!Currency::is_supported("GBP"));
        assert!(!Currency::is_supported("usd"));
    }

    #[test]
    fn test_currency_serde_uses_codes() {
        let json = serde_json::to_string(&Currency::Cad).unwrap();
        assert_eq!(json, "\"CAD\"");
        let c: Currency = serde_json::from_str("\"EUR\"").unwrap();
        assert_eq!(c, Currency::Eur);
        assert!(serde_json::from_str::<Currency>("\"JPY\"").is_err());
    }

    #[test]
    fn test_transfer_params_validation() {
        assert!(TransferParams::new(1, 2, 10).validate().is_ok());

        let err = TransferParams::new(1, 1, 10).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = TransferParams::new(1, 2, 0).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = TransferParams::new(1, 2, -5).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
