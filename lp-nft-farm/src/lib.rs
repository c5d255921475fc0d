use std::collections::HashMap;

use near_sdk::borsh::{self, BorshDeserialize, BorshSerialize};
use near_sdk::collections::LookupMap;
use near_sdk::json_types::U128;
#[allow(unused_imports)]
use near_sdk::serde::{Deserialize, Serialize};
use near_sdk::{
    assert_one_yocto, env, log, near_bindgen, require, AccountId, Balance, PanicOnDefault,
    Promise, PromiseOrValue, PromiseResult, ONE_YOCTO,
};

use farm_lib::constants::*;
use farm_lib::errors::*;
use farm_lib::helpers::*;
use farm_lib::interest::accrued_interest;
use farm_lib::interfaces::*;

pub mod interfaces;
pub mod token_standards;
pub mod vault;

use crate::interfaces::*;
use crate::vault::*;

/// Booster category identifier: a token id on the booster multi token contract.
pub type TokenId = String;

/// Single-balance staking ledger with booster-adjusted interest. Accounts
/// stake one token and earn interest in the reward token at
/// `base_apy + sum(bonus * quantity)` over their deposited boosters. Interest
/// is paid from a reserve anyone can fund; the stake principal is never used
/// to pay rewards.
#[near_bindgen]
#[derive(BorshDeserialize, BorshSerialize, PanicOnDefault)]
pub struct Contract {
    pub owner_id: AccountId,
    /// if staking / unstaking / claiming is opened
    pub is_active: bool,
    /// token funding the reserve and paying interest
    pub reward_token: AccountId,
    /// token accepted for staking - an LP share of the pool backing it
    pub stake_token: AccountId,
    /// multi token contract whose token ids are the booster categories
    pub booster_token: AccountId,
    /// APY (whole percents) earned by any nonzero stake balance
    pub base_apy: u32,
    /// bonus percentage points per booster category. A category with a
    /// configured nonzero bonus is whitelisted, there is no separate list.
    booster_apys: LookupMap<TokenId, u32>,
    /// user vaults
    pub vaults: LookupMap<AccountId, Vault>,
    /// total amount of currently staked tokens
    pub total_stake: Balance,
    /// total quantity of deposited boosters, across all categories
    pub total_boost: u128,
    /// reward reserve
    pub total_fund: Balance,
    /// individual reserve contributions. Informational only - the reserve is
    /// commingled and funders cannot withdraw.
    funder_fund: LookupMap<AccountId, Balance>,
    /// total number of accounts with a vault
    pub accounts_registered: u64,
}

#[near_bindgen]
impl Contract {
    /// Initializes the ledger.
    /// Parameters:
    /// * `reward_token`: NEP-141 contract paying funding deposits and interest.
    /// * `stake_token`: NEP-141 contract accepted for staking.
    /// * `booster_token`: multi token contract providing booster categories.
    /// * `booster_bonuses`: optional seed of (category, bonus) pairs, same
    ///    validation as `set_apy_by_token_id`.
    #[init]
    pub fn new(
        owner_id: AccountId,
        reward_token: AccountId,
        stake_token: AccountId,
        booster_token: AccountId,
        base_apy: u32,
        booster_bonuses: Option<Vec<(TokenId, u32)>>,
    ) -> Self {
        let mut c = Self {
            owner_id,
            is_active: true,
            reward_token,
            stake_token,
            booster_token,
            base_apy,
            booster_apys: LookupMap::new(b"b".to_vec()),
            vaults: LookupMap::new(b"v".to_vec()),
            total_stake: 0,
            total_boost: 0,
            total_fund: 0,
            funder_fund: LookupMap::new(b"u".to_vec()),
            accounts_registered: 0,
        };
        for (token_id, bonus) in booster_bonuses.unwrap_or_default() {
            c.insert_bonus(&token_id, bonus);
        }
        c
    }

    // ************ //
    // view methods //
    // ************ //

    pub fn get_contract_params(&self) -> ContractParams {
        ContractParams {
            owner_id: self.owner_id.clone(),
            is_active: self.is_active,
            reward_token: self.reward_token.clone(),
            stake_token: self.stake_token.clone(),
            booster_token: self.booster_token.clone(),
            base_apy: self.base_apy,
            total_staked: self.total_stake.into(),
            total_nft_staked: self.total_boost.into(),
            total_funding: self.total_fund.into(),
            accounts_registered: self.accounts_registered,
        }
    }

    /// Effective APY of an account: 0 without a stake balance, otherwise the
    /// base APY plus every deposited booster's bonus times its quantity.
    pub fn get_total_apy_of_user(&self, account_id: AccountId) -> U128 {
        match self.vaults.get(&account_id) {
            Some(v) => U128(self.total_apy(&v)),
            None => U128(0),
        }
    }

    pub fn balances(&self, account_id: AccountId) -> U128 {
        self.vaults
            .get(&account_id)
            .map(|v| v.balance)
            .unwrap_or(0)
            .into()
    }

    /// Accrual clock of the account (unix seconds); 0 when nothing is staked.
    pub fn stake_dates(&self, account_id: AccountId) -> u64 {
        self.vaults
            .get(&account_id)
            .map(|v| v.stake_date)
            .unwrap_or(0)
    }

    pub fn total_staked(&self) -> U128 {
        self.total_stake.into()
    }

    pub fn total_nft_staked(&self) -> U128 {
        self.total_boost.into()
    }

    pub fn total_funding(&self) -> U128 {
        self.total_fund.into()
    }

    /// Reserve contribution made by `account_id`.
    pub fn funding(&self, account_id: AccountId) -> U128 {
        self.funder_fund.get(&account_id).unwrap_or(0).into()
    }

    /// Bonus percentage points of a booster category; 0 when unconfigured.
    pub fn nft_apys(&self, token_id: TokenId) -> u32 {
        self.booster_apys.get(&token_id).unwrap_or(0)
    }

    /// A category is whitelisted iff it carries a nonzero bonus.
    pub fn is_in_whitelist(&self, token_id: TokenId) -> bool {
        self.nft_apys(token_id) > 0
    }

    /// Quantity of a booster category deposited by `account_id`.
    pub fn nft_balances(&self, account_id: AccountId, token_id: TokenId) -> U128 {
        self.vaults
            .get(&account_id)
            .map(|v| v.booster_quantity(&token_id))
            .unwrap_or(0)
            .into()
    }

    /// Categories the account currently holds a nonzero deposit of, in
    /// first-deposit order.
    pub fn get_user_nft_ids(&self, account_id: AccountId) -> Vec<TokenId> {
        self.vaults
            .get(&account_id)
            .map(|v| v.booster_ids)
            .unwrap_or_default()
    }

    pub fn get_user_nft_ids_length(&self, account_id: AccountId) -> u64 {
        self.vaults
            .get(&account_id)
            .map(|v| v.booster_ids.len() as u64)
            .unwrap_or(0)
    }

    pub fn is_nft_id_exist(&self, account_id: AccountId, token_id: TokenId) -> bool {
        self.vaults
            .get(&account_id)
            .map(|v| v.booster_ids.contains(&token_id))
            .unwrap_or(false)
    }

    /// Balance `account_id` holds on the reward token contract.
    pub fn get_reward_token_balance(&self, account_id: AccountId) -> Promise {
        ext_ft::ext(self.reward_token.clone())
            .with_static_gas(GAS_FOR_POOL_VIEW)
            .ft_balance_of(account_id)
    }

    /// Balance `account_id` holds on the stake token contract.
    pub fn get_stake_token_balance(&self, account_id: AccountId) -> Promise {
        ext_ft::ext(self.stake_token.clone())
            .with_static_gas(GAS_FOR_POOL_VIEW)
            .ft_balance_of(account_id)
    }

    /// Values `lp_amount` stake-token shares in the reward token, reading the
    /// pool reserve and share supply live from the pool contract.
    pub fn lp_share_value(&self, lp_amount: U128) -> Promise {
        ext_pool::ext(self.stake_token.clone())
            .with_static_gas(GAS_FOR_POOL_VIEW)
            .get_reserve(self.reward_token.clone())
            .and(
                ext_pool::ext(self.stake_token.clone())
                    .with_static_gas(GAS_FOR_POOL_VIEW)
                    .ft_total_supply(),
            )
            .then(
                Self::ext(env::current_account_id())
                    .with_static_gas(GAS_FOR_CALLBACK)
                    .lp_share_value_callback(lp_amount),
            )
    }

    #[private]
    pub fn lp_share_value_callback(&self, lp_amount: U128) -> U128 {
        require!(
            env::promise_results_count() == 2,
            "expected reserve and total supply results"
        );
        let reserve = promise_result_u128(0, "pool reserve query failed");
        let supply = promise_result_u128(1, "pool total supply query failed");
        share_value(lp_amount.0, reserve, supply).into()
    }

    // ******************* //
    // transaction methods //
    // ******************* //

    // Stake and funding deposits arrive through `ft_transfer_call`, booster
    // deposits through `mt_transfer_call`, see token_standards.rs.

    /// Withdraws the whole stake balance plus the accrued interest - when the
    /// reserve can cover it. A short reserve forfeits the interest, the
    /// balance is returned regardless. Boosters stay deposited.
    /// Requires 1 yNEAR payment for wallet 2FA.
    #[payable]
    pub fn unstake(&mut self) -> Promise {
        self.assert_is_active();
        assert_one_yocto();
        let user = env::predecessor_account_id();
        let mut v = self.vaults.get(&user).unwrap_or_default();
        assert!(v.balance > 0, "{}", ERR_INSUFFICIENT_FUNDS);

        let now = now_seconds();
        let owed = accrued_interest(
            v.balance,
            now.saturating_sub(v.stake_date),
            self.total_apy(&v),
        );
        let interest = if owed > 0 && self.total_fund >= owed {
            self.total_fund -= owed;
            owed
        } else {
            if owed > 0 {
                log!("reserve cannot cover {} interest, paying principal only", owed);
            }
            0
        };
        let principal = v.balance;
        v.balance = 0;
        v.stake_date = 0;
        self.total_stake -= principal;
        self.vaults.insert(&user, &v);
        log!("@{} unstaked {}, interest paid: {}", user, principal, interest);

        if interest > 0 {
            self.transfer_interest(user.clone(), interest);
        }
        self.transfer_principal(user, principal)
    }

    /// Withdraws the accrued interest without touching the stake balance.
    /// Unlike `unstake` this aborts when the reserve cannot pay.
    pub fn claim(&mut self) {
        self.assert_is_active();
        let user = env::predecessor_account_id();
        let mut v = self.vaults.get(&user).unwrap_or_default();
        assert!(v.balance > 0, "{}", ERR_LP_CLAIM_BALANCE);

        let now = now_seconds();
        let prev_stake_date = v.stake_date;
        let owed = accrued_interest(
            v.balance,
            now.saturating_sub(prev_stake_date),
            self.total_apy(&v),
        );
        assert!(self.total_fund >= owed, "{}", ERR_LP_CLAIM_FUNDING);
        self.total_fund -= owed;
        v.stake_date = now;
        self.vaults.insert(&user, &v);
        log!("@{} claimed {} interest", user, owed);
        if owed > 0 {
            self.transfer_claimed(user, owed, prev_stake_date);
        }
    }

    /// Withdraws `amount` of one booster category back to the caller.
    /// Requires 1 yNEAR payment for wallet 2FA.
    #[payable]
    pub fn unstake_nft(&mut self, token_id: TokenId, amount: U128) -> Promise {
        assert_one_yocto();
        let user = env::predecessor_account_id();
        self._unstake_boosters(&user, &[token_id.clone()], &[amount]);
        ext_mt::ext(self.booster_token.clone())
            .with_attached_deposit(ONE_YOCTO)
            .with_static_gas(GAS_FOR_MT_TRANSFER)
            .mt_transfer(
                user.clone(),
                token_id.clone(),
                amount,
                None,
                Some("unstaking booster".to_string()),
            )
            .then(
                Self::ext(env::current_account_id())
                    .with_static_gas(GAS_FOR_CALLBACK)
                    .booster_return_callback(user, vec![token_id], vec![amount]),
            )
    }

    /// Withdraws several booster categories in one call.
    /// Requires 1 yNEAR payment for wallet 2FA.
    #[payable]
    pub fn batch_unstake_nfts(&mut self, token_ids: Vec<TokenId>, amounts: Vec<U128>) -> Promise {
        assert_one_yocto();
        let user = env::predecessor_account_id();
        self._unstake_boosters(&user, &token_ids, &amounts);
        ext_mt::ext(self.booster_token.clone())
            .with_attached_deposit(ONE_YOCTO)
            .with_static_gas(GAS_FOR_MT_TRANSFER)
            .mt_batch_transfer(
                user.clone(),
                token_ids.clone(),
                amounts.clone(),
                None,
                Some("unstaking boosters".to_string()),
            )
            .then(
                Self::ext(env::current_account_id())
                    .with_static_gas(GAS_FOR_CALLBACK)
                    .booster_return_callback(user, token_ids, amounts),
            )
    }

    // ******************* //
    //     management      //
    // ******************* //

    /// Sets the APY (whole percents) every staked balance earns before boosts.
    pub fn set_base_apy(&mut self, apy: u32) {
        self.assert_owner();
        self.base_apy = apy;
        log!("base APY set to {}%", apy);
    }

    /// Sets the bonus of one booster category, which also whitelists it.
    pub fn set_apy_by_token_id(&mut self, token_id: TokenId, apy: u32) {
        self.assert_owner();
        self.insert_bonus(&token_id, apy);
        log!("booster {} bonus set to {} percentage points", token_id, apy);
    }

    /// Opens or closes stake / unstake / claim / booster operations.
    pub fn set_active(&mut self, is_open: bool) {
        self.assert_owner();
        self.is_active = is_open;
    }

    /*****************
     * internal methods */

    pub(crate) fn assert_is_active(&self) {
        assert!(self.is_active, "{}", ERR_NOT_ACTIVE);
    }

    fn assert_owner(&self) {
        assert!(
            env::predecessor_account_id() == self.owner_id,
            "{}",
            ERR_NOT_OWNER
        );
    }

    fn insert_bonus(&mut self, token_id: &TokenId, bonus: u32) {
        assert!(!token_id.is_empty() && bonus > 0, "{}", ERR_NFT_APY_ARGS);
        self.booster_apys.insert(token_id, &bonus);
    }

    pub(crate) fn bonus_of(&self, token_id: &TokenId) -> u32 {
        self.booster_apys.get(token_id).unwrap_or(0)
    }

    /// Existing vault of `user`, or a fresh one (registering the account).
    /// Also the recovery path when a failed-transfer callback races account
    /// closure.
    pub(crate) fn vault_or_new(&mut self, user: &AccountId) -> Vault {
        match self.vaults.get(user) {
            Some(v) => v,
            None => {
                self.accounts_registered += 1;
                Vault::default()
            }
        }
    }

    /// Pays `amount` of the reward token; the callback restores the reserve
    /// if the transfer fails.
    pub(crate) fn transfer_interest(&mut self, user: AccountId, amount: Balance) -> Promise {
        ext_ft::ext(self.reward_token.clone())
            .with_attached_deposit(ONE_YOCTO)
            .with_static_gas(GAS_FOR_FT_TRANSFER)
            .ft_transfer(user.clone(), U128(amount), Some("interest".to_string()))
            .then(
                Self::ext(env::current_account_id())
                    .with_static_gas(GAS_FOR_CALLBACK)
                    .interest_payout_callback(user, U128(amount)),
            )
    }

    #[private]
    pub fn interest_payout_callback(&mut self, user: AccountId, amount: U128) {
        if promise_result_as_failed() {
            log!(
                "paying {} interest to @{} failed. Restoring the reserve",
                amount.0,
                user
            );
            self.total_fund += amount.0;
        }
    }

    fn transfer_principal(&mut self, user: AccountId, amount: Balance) -> Promise {
        ext_ft::ext(self.stake_token.clone())
            .with_attached_deposit(ONE_YOCTO)
            .with_static_gas(GAS_FOR_FT_TRANSFER)
            .ft_transfer(user.clone(), U128(amount), Some("unstaking".to_string()))
            .then(
                Self::ext(env::current_account_id())
                    .with_static_gas(GAS_FOR_CALLBACK)
                    .return_principal_callback(user, U128(amount)),
            )
    }

    #[private]
    pub fn return_principal_callback(&mut self, user: AccountId, amount: U128) {
        if promise_result_as_failed() {
            log!(
                "returning {} stake tokens to @{} failed. Recovering account state",
                amount.0,
                user
            );
            let mut v = self.vault_or_new(&user);
            v.balance += amount.0;
            v.stake_date = now_seconds();
            self.total_stake += amount.0;
            self.vaults.insert(&user, &v);
        }
    }

    fn transfer_claimed(
        &mut self,
        user: AccountId,
        amount: Balance,
        prev_stake_date: u64,
    ) -> Promise {
        ext_ft::ext(self.reward_token.clone())
            .with_attached_deposit(ONE_YOCTO)
            .with_static_gas(GAS_FOR_FT_TRANSFER)
            .ft_transfer(user.clone(), U128(amount), Some("claim".to_string()))
            .then(
                Self::ext(env::current_account_id())
                    .with_static_gas(GAS_FOR_CALLBACK)
                    .claim_payout_callback(user, U128(amount), prev_stake_date),
            )
    }

    #[private]
    pub fn claim_payout_callback(&mut self, user: AccountId, amount: U128, prev_stake_date: u64) {
        if promise_result_as_failed() {
            log!(
                "claim transfer of {} to @{} failed. Restoring the accrual clock",
                amount.0,
                user
            );
            self.total_fund += amount.0;
            let mut v = self.vault_or_new(&user);
            v.stake_date = prev_stake_date;
            self.vaults.insert(&user, &v);
        }
    }

    #[private]
    pub fn booster_return_callback(
        &mut self,
        user: AccountId,
        token_ids: Vec<TokenId>,
        amounts: Vec<U128>,
    ) {
        if promise_result_as_failed() {
            log!(
                "returning boosters to @{} failed. Recovering account state",
                user
            );
            let mut v = self.vault_or_new(&user);
            for (id, amount) in token_ids.iter().zip(amounts.iter()) {
                if !v.booster_ids.contains(id) {
                    v.booster_ids.push(id.clone());
                }
                *v.boosters.entry(id.clone()).or_insert(0) += amount.0;
                self.total_boost += amount.0;
            }
            self.vaults.insert(&user, &v);
        }
    }
}

fn promise_result_u128(index: u64, err: &str) -> Balance {
    match env::promise_result(index) {
        PromiseResult::Successful(bytes) => near_sdk::serde_json::from_slice::<U128>(&bytes)
            .expect(err)
            .0,
        _ => env::panic_str(err),
    }
}
