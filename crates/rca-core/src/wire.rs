//! Versioned JSON wire format for contracts.
//!
//! The wire form is the [`Contract`] model with a `version` field in front.
//! Keys are camelCase (`resetClocks`); expressions are objects tagged by `op`.

use serde::{Deserialize, Serialize};

use crate::contract::Contract;
use crate::error::ContractError;

pub const CURRENT_VERSION: &str = "1";

#[derive(Serialize, Deserialize, Debug)]
pub struct WireContract {
    pub version: String,
    #[serde(flatten)]
    pub contract: Contract,
}

impl WireContract {
    pub fn from_contract(contract: &Contract) -> Self {
        Self {
            version: CURRENT_VERSION.to_string(),
            contract: contract.clone(),
        }
    }

    pub fn into_contract(self) -> Result<Contract, ContractError> {
        if self.version != CURRENT_VERSION {
            return Err(ContractError::Format(format!(
                "unsupported version {:?} (expected {CURRENT_VERSION:?})",
                self.version
            )));
        }
        Ok(self.contract)
    }
}

/// Deserialize a wire JSON document. Only checks the version; call
/// [`Contract::build`] to validate the automaton.
pub fn import_contract_json(json: &str) -> Result<Contract, ContractError> {
    let wire: WireContract = serde_json::from_str(json)?;
    wire.into_contract()
}

pub fn export_contract_json(contract: &Contract) -> Result<String, ContractError> {
    Ok(serde_json::to_string_pretty(&WireContract::from_contract(
        contract,
    ))?)
}
