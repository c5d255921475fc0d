use crate::*;

#[derive(Deserialize, Serialize)]
#[serde(crate = "near_sdk::serde")]
#[cfg_attr(not(target_arch = "wasm32"), derive(Debug))]
pub struct ContractParams {
    pub owner_id: AccountId,
    pub is_active: bool,
    pub reward_token: AccountId,
    pub stake_token: AccountId,
    pub booster_token: AccountId,
    pub base_apy: u32,
    pub total_staked: U128,
    pub total_nft_staked: U128,
    pub total_funding: U128,
    /// Number of accounts currently registered.
    pub accounts_registered: u64,
}
