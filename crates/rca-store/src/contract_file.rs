use std::fs;
use std::path::Path;

use rca_core::{Contract, ContractError, export_contract_json, import_contract_json};

use crate::error::{Result, StoreError};

/// Read a contract, choosing the format by extension: `.json` is the
/// versioned wire format, `.toml` the same model written as TOML.
pub fn load_contract(path: &Path) -> Result<Contract> {
    let text = fs::read_to_string(path)?;
    let contract = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => import_contract_json(&text)?,
        Some("toml") => toml::from_str(&text)
            .map_err(|e| ContractError::Format(format!("{}: {e}", path.display())))?,
        other => {
            return Err(StoreError::InvalidData(format!(
                "unsupported contract extension {:?} for {}",
                other.unwrap_or(""),
                path.display()
            )));
        }
    };
    tracing::debug!(
        name = %contract.name,
        modes = contract.modes.len(),
        transitions = contract.transitions.len(),
        "loaded contract from {}",
        path.display()
    );
    Ok(contract)
}

/// Write `contract` in the wire format, creating parent directories.
pub fn save_contract_json(path: &Path, contract: &Contract) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, export_contract_json(contract)?)?;
    Ok(())
}
