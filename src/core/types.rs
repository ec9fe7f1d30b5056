use crate::core::validation::{Code, FieldReader, ValidationError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

pub const IDENTITY_ID_PREFIX: &str = "user";
pub const ACCOUNT_ID_PREFIX: &str = "acct";
pub const BALANCE_ID_PREFIX: &str = "blnc";
pub const TRANSACTION_ID_PREFIX: &str = "tran";

/// Declares a closed set of STET wire codes.
///
/// Unknown codes are rejected rather than carried through as raw strings.
macro_rules! stet_code {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum $name {
            $(#[serde(rename = $code)] $variant),+
        }

        impl Code for $name {
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            fn as_code(self) -> &'static str {
                match self {
                    $(Self::$variant => $code),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_code())
            }
        }
    };
}

stet_code!(
    /// Honorific attached to an identity.
    IdentityPrefix {
        Doctor = "DOCT",
        Madame = "MADM",
        Miss = "MISS",
        Mister = "MIST",
    }
);

stet_code!(
    AccountType {
        Cash = "CACC",
        Card = "CARD",
    }
);

stet_code!(
    AccountUsage {
        Private = "PRIV",
        Organisation = "ORGA",
    }
);

stet_code!(
    /// How a balance amount was computed.
    BalanceType {
        ClosingBooked = "CLBD",
        Expected = "XPCD",
        ValueDate = "VALU",
        InterimAvailable = "ITAV",
        PreviouslyClosedBooked = "PRCD",
        Other = "OTHR",
    }
);

stet_code!(
    CreditDebitIndicator {
        Credit = "CRDT",
        Debit = "DBIT",
    }
);

stet_code!(
    TransactionStatus {
        Booked = "BOOK",
        Pending = "PDNG",
        Future = "FUTR",
        Info = "INFO",
    }
);

/// The authenticated end user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: String,
    pub prefix: IdentityPrefix,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
}

impl Identity {
    pub const SCHEMA: &'static str = "Identity";

    pub fn try_from_value(value: &Value) -> Result<Self, ValidationError> {
        let mut reader = FieldReader::new(Self::SCHEMA, value)?;
        let fields = (
            reader.id("id", IDENTITY_ID_PREFIX),
            reader.code::<IdentityPrefix>("prefix"),
            reader.non_empty("first_name"),
            reader.non_empty("last_name"),
            reader.date("date_of_birth"),
        );

        match fields {
            (Some(id), Some(prefix), Some(first_name), Some(last_name), Some(date_of_birth)) => {
                Ok(Self {
                    id,
                    prefix,
                    first_name,
                    last_name,
                    date_of_birth,
                })
            }
            _ => Err(reader.into_error()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: String,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    pub usage: AccountUsage,
    /// Always uppercase.
    pub iban: String,
    pub name: String,
    pub currency: String,
}

impl Account {
    pub const SCHEMA: &'static str = "Account";

    pub fn try_from_value(value: &Value) -> Result<Self, ValidationError> {
        let mut reader = FieldReader::new(Self::SCHEMA, value)?;
        let fields = (
            reader.id("id", ACCOUNT_ID_PREFIX),
            reader.code::<AccountType>("type"),
            reader.code::<AccountUsage>("usage"),
            reader.iban("iban"),
            reader.non_empty("name"),
            reader.currency("currency"),
        );

        match fields {
            (
                Some(id),
                Some(account_type),
                Some(usage),
                Some(iban),
                Some(name),
                Some(currency),
            ) => Ok(Self {
                id,
                account_type,
                usage,
                iban,
                name,
                currency,
            }),
            _ => Err(reader.into_error()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Balance {
    pub id: String,
    pub name: String,
    /// Minor currency units.
    pub amount: i64,
    pub currency: Option<String>,
    #[serde(rename = "type")]
    pub balance_type: BalanceType,
}

impl Balance {
    pub const SCHEMA: &'static str = "Balance";

    pub fn try_from_value(value: &Value) -> Result<Self, ValidationError> {
        let mut reader = FieldReader::new(Self::SCHEMA, value)?;
        let fields = (
            reader.id("id", BALANCE_ID_PREFIX),
            reader.non_empty("name"),
            reader.integer("amount"),
            reader.optional_currency("currency"),
            reader.code::<BalanceType>("type"),
        );

        match fields {
            (Some(id), Some(name), Some(amount), Some(currency), Some(balance_type)) => {
                Ok(Self {
                    id,
                    name,
                    amount,
                    currency,
                    balance_type,
                })
            }
            _ => Err(reader.into_error()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub id: String,
    pub label: String,
    /// Minor currency units; direction lives in `crdt_dbit_indicator`.
    pub amount: i64,
    pub crdt_dbit_indicator: CreditDebitIndicator,
    pub status: TransactionStatus,
    pub currency: Option<String>,
    pub date_operation: DateTime<Utc>,
    /// Set once the transaction has settled.
    pub date_processed: Option<DateTime<Utc>>,
}

impl Transaction {
    pub const SCHEMA: &'static str = "Transaction";

    pub fn try_from_value(value: &Value) -> Result<Self, ValidationError> {
        let mut reader = FieldReader::new(Self::SCHEMA, value)?;
        let fields = (
            reader.id("id", TRANSACTION_ID_PREFIX),
            reader.non_empty("label"),
            reader.integer("amount"),
            reader.code::<CreditDebitIndicator>("crdt_dbit_indicator"),
            reader.code::<TransactionStatus>("status"),
            reader.optional_currency("currency"),
            reader.timestamp("date_operation"),
            reader.optional_timestamp("date_processed"),
        );

        match fields {
            (
                Some(id),
                Some(label),
                Some(amount),
                Some(crdt_dbit_indicator),
                Some(status),
                Some(currency),
                Some(date_operation),
                Some(date_processed),
            ) => Ok(Self {
                id,
                label,
                amount,
                crdt_dbit_indicator,
                status,
                currency,
                date_operation,
                date_processed,
            }),
            _ => Err(reader.into_error()),
        }
    }
}

/// One account with everything fetched beneath it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountDetails {
    #[serde(flatten)]
    pub account: Account,
    pub balances: Vec<Balance>,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FullUserData {
    pub identity: Identity,
    pub accounts: Vec<AccountDetails>,
}

/// Pagination passed straight through to the transactions endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionQuery {
    pub page: u32,
    pub count: u32,
}

impl Default for TransactionQuery {
    fn default() -> Self {
        Self { page: 1, count: 10 }
    }
}

impl TransactionQuery {
    pub fn new(page: u32, count: u32) -> Self {
        Self { page, count }
    }

    /// First page holding `count` transactions.
    pub fn first(count: u32) -> Self {
        Self { page: 1, count }
    }
}
