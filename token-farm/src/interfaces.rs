use crate::*;

#[derive(Deserialize, Serialize)]
#[serde(crate = "near_sdk::serde")]
#[cfg_attr(not(target_arch = "wasm32"), derive(Debug))]
pub struct ContractParams {
    pub owner_id: AccountId,
    pub is_active: bool,
    pub default_apy: u32,
    /// registered tokens and their per-token figures, index-aligned
    pub tokens: Vec<AccountId>,
    pub apys: Vec<u32>,
    pub total_staked: Vec<U128>,
    pub total_funding: Vec<U128>,
    /// Number of accounts currently registered.
    pub accounts_registered: u64,
}
