//! Contract state reads.
//!
//! The engine never talks to a node directly. Every on-chain quantity it needs
//! is expressed as a [`ContractCall`] and answered by a [`ContractReader`].

use async_trait::async_trait;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::TraitError;
use crate::ids::Address;

// =============================================================================
// CALLS
// =============================================================================

/// Argument of a view call.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallArg {
    /// Unsigned integer argument (pool id, ...)
    Uint(u64),
    /// Address argument (holder, ...)
    Address(Address),
}

impl fmt::Display for CallArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallArg::Uint(v) => write!(f, "{v}"),
            CallArg::Address(a) => write!(f, "{a}"),
        }
    }
}

/// A read-only contract method invocation.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCall {
    /// Contract address
    pub contract: Address,
    /// Method name (e.g. `totalSupply`)
    pub method: String,
    /// Positional arguments
    #[serde(default)]
    pub args: Vec<CallArg>,
}

impl ContractCall {
    /// Create a call with no arguments.
    pub fn new(contract: Address, method: impl Into<String>) -> Self {
        Self {
            contract,
            method: method.into(),
            args: Vec::new(),
        }
    }

    /// Append a positional argument.
    pub fn arg(mut self, arg: CallArg) -> Self {
        self.args.push(arg);
        self
    }

    /// Lookup key in the `address.method(arg,...)` form.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ContractCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.contract, self.method)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

/// Value returned by a view call.
///
/// Serialized as a string: `0x`-prefixed for addresses, decimal digits for
/// integers (18-decimal amounts overflow JSON-safe numbers). Plain JSON
/// numbers are accepted on input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractValue {
    /// Raw unsigned integer (token amounts are 18-decimal fixed point)
    Uint(u128),
    /// Address
    Address(Address),
}

impl ContractValue {
    /// The integer value, or an error if the call returned an address.
    pub fn as_uint(&self) -> Result<u128, TraitError> {
        match self {
            ContractValue::Uint(v) => Ok(*v),
            ContractValue::Address(a) => Err(TraitError::UnexpectedValue(format!(
                "expected integer, got address {a}"
            ))),
        }
    }

    /// The address value, or an error if the call returned an integer.
    pub fn as_address(&self) -> Result<&Address, TraitError> {
        match self {
            ContractValue::Address(a) => Ok(a),
            ContractValue::Uint(v) => Err(TraitError::UnexpectedValue(format!(
                "expected address, got integer {v}"
            ))),
        }
    }
}

impl Serialize for ContractValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ContractValue::Uint(v) => serializer.serialize_str(&v.to_string()),
            ContractValue::Address(a) => serializer.serialize_str(a.as_str()),
        }
    }
}

struct ContractValueVisitor;

impl<'de> Visitor<'de> for ContractValueVisitor {
    type Value = ContractValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an unsigned integer, a decimal string or a 0x address")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(ContractValue::Uint(u128::from(v)))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Self::Value, E> {
        Ok(ContractValue::Uint(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        if v.starts_with("0x") || v.starts_with("0X") {
            return Ok(ContractValue::Address(Address::new(v)));
        }
        v.parse::<u128>()
            .map(ContractValue::Uint)
            .map_err(|e| E::custom(format!("invalid integer {v:?}: {e}")))
    }
}

impl<'de> Deserialize<'de> for ContractValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ContractValueVisitor)
    }
}

// =============================================================================
// READER
// =============================================================================

/// Trait for contract state readers.
#[async_trait]
pub trait ContractReader: Send + Sync {
    /// Execute a single view call.
    async fn read(&self, call: &ContractCall) -> Result<ContractValue, TraitError>;

    /// Execute several view calls.
    ///
    /// Results are positional. The default issues every read concurrently;
    /// multicall-capable readers should override it.
    async fn read_batch(
        &self,
        calls: &[ContractCall],
    ) -> Vec<Result<ContractValue, TraitError>> {
        futures::future::join_all(calls.iter().map(|call| self.read(call))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    #[async_trait]
    impl ContractReader for Fixed {
        async fn read(&self, call: &ContractCall) -> Result<ContractValue, TraitError> {
            match call.method.as_str() {
                "totalSupply" => Ok(ContractValue::Uint(42)),
                _ => Err(TraitError::CallReverted(call.key())),
            }
        }
    }

    #[test]
    fn test_call_key() {
        let call = ContractCall::new(Address::new("0xABC"), "poolInfo").arg(CallArg::Uint(3));
        assert_eq!(call.key(), "0xabc.poolInfo(3)");

        let call = ContractCall::new(Address::new("0xabc"), "balanceOf")
            .arg(CallArg::Address(Address::new("0xDEF")));
        assert_eq!(call.key(), "0xabc.balanceOf(0xdef)");
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(ContractValue::Uint(7).as_uint().unwrap(), 7);
        assert!(ContractValue::Uint(7).as_address().is_err());
        let addr = ContractValue::Address(Address::new("0x1"));
        assert_eq!(addr.as_address().unwrap().as_str(), "0x1");
        assert!(addr.as_uint().is_err());
    }

    #[test]
    fn test_value_serde_accepts_strings_and_numbers() {
        let v: ContractValue = serde_json::from_str("\"1000000000000000000000000\"").unwrap();
        assert_eq!(v, ContractValue::Uint(1_000_000_000_000_000_000_000_000));
        let v: ContractValue = serde_json::from_str("12").unwrap();
        assert_eq!(v, ContractValue::Uint(12));
        let v: ContractValue = serde_json::from_str("\"0xAbC\"").unwrap();
        assert_eq!(v, ContractValue::Address(Address::new("0xabc")));
        assert!(serde_json::from_str::<ContractValue>("\"twelve\"").is_err());

        let json = serde_json::to_string(&ContractValue::Uint(5)).unwrap();
        assert_eq!(json, "\"5\"");
    }

    #[tokio::test]
    async fn test_default_read_batch_is_positional() {
        let reader = Fixed;
        let calls = vec![
            ContractCall::new(Address::new("0x1"), "totalSupply"),
            ContractCall::new(Address::new("0x1"), "missing"),
        ];
        let results = reader.read_batch(&calls).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap(), &ContractValue::Uint(42));
        assert!(results[1].is_err());
    }
}
