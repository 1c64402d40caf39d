//! Shapes consumed from the execution engine when a block is committed.
//!
//! Engines in the wild disagree on how a receipt's status is written: an
//! integer, a hex quantity string, a boolean, or nothing at all. All of them
//! collapse into [`ReceiptStatus`] here so nothing downstream has to care.

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A committed block together with its transactions and receipts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineBlock {
    pub number: U64,
    pub hash: B256,
    #[serde(default)]
    pub parent_hash: B256,
    #[serde(default)]
    pub timestamp: U64,
    #[serde(default)]
    pub transactions: Vec<EngineTransaction>,
    #[serde(default)]
    pub receipts: Vec<EngineReceipt>,
}

/// A transaction as included in a committed block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineTransaction {
    pub hash: B256,
    pub from: Address,
    /// Recipient address (None for contract creation)
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(default)]
    pub value: U256,
    #[serde(default)]
    pub nonce: U64,
    #[serde(default)]
    pub input: Bytes,
}

/// Execution outcome of one transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineReceipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub status: ReceiptStatus,
    #[serde(default)]
    pub gas_used: U64,
    #[serde(default)]
    pub contract_address: Option<Address>,
    #[serde(default)]
    pub log_count: U64,
}

/// Normalized receipt status.
///
/// A missing or `null` status is read as [`ReceiptStatus::Failure`], so a
/// receipt of unknown outcome can never allocate a contract address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiptStatus {
    Success,
    #[default]
    Failure,
}

impl ReceiptStatus {
    pub fn is_success(self) -> bool {
        matches!(self, ReceiptStatus::Success)
    }

    fn from_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(ReceiptStatus::Success),
            0 => Some(ReceiptStatus::Failure),
            _ => None,
        }
    }

    fn parse_str(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw {
            "true" => return Some(ReceiptStatus::Success),
            "false" => return Some(ReceiptStatus::Failure),
            _ => {}
        }

        let code = match raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
        {
            Some(hex) => u64::from_str_radix(hex, 16).ok()?,
            None => raw.parse::<u64>().ok()?,
        };
        Self::from_code(code)
    }
}

impl From<bool> for ReceiptStatus {
    fn from(success: bool) -> Self {
        if success {
            ReceiptStatus::Success
        } else {
            ReceiptStatus::Failure
        }
    }
}

impl Serialize for ReceiptStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let code = if self.is_success() { "0x1" } else { "0x0" };
        serializer.serialize_str(code)
    }
}

impl<'de> Deserialize<'de> for ReceiptStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde_json::Value;

        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(ReceiptStatus::Failure),
            Some(Value::Bool(flag)) => Ok(ReceiptStatus::from(flag)),
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(Self::from_code)
                .ok_or_else(|| D::Error::custom(format!("invalid receipt status: {n}"))),
            Some(Value::String(s)) => Self::parse_str(&s)
                .ok_or_else(|| D::Error::custom(format!("invalid receipt status: {s:?}"))),
            Some(other) => Err(D::Error::custom(format!(
                "invalid receipt status: {other}"
            ))),
        }
    }
}
