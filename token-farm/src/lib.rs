use std::collections::HashMap;

use near_sdk::borsh::{self, BorshDeserialize, BorshSerialize};
use near_sdk::collections::LookupMap;
use near_sdk::json_types::U128;
#[allow(unused_imports)]
use near_sdk::serde::{Deserialize, Serialize};
use near_sdk::{
    assert_one_yocto, env, log, near_bindgen, AccountId, Balance, PanicOnDefault, Promise,
    PromiseOrValue, ONE_YOCTO,
};

use farm_lib::constants::*;
use farm_lib::errors::*;
use farm_lib::helpers::*;
use farm_lib::interest::accrued_interest;
use farm_lib::interfaces::*;

pub mod interfaces;
pub mod vault;

use crate::interfaces::*;
use crate::vault::*;

/// Interest-bearing deposit ledger for arbitrary NEP-141 tokens. Every stake
/// call opens an independent position with its own accrual clock; interest is
/// paid from a per-token reward reserve which anybody can top up.
#[near_bindgen]
#[derive(BorshDeserialize, BorshSerialize, PanicOnDefault)]
pub struct Contract {
    pub owner_id: AccountId,
    /// if staking / unstaking / claiming is opened
    pub is_active: bool,
    /// every token ever staked or funded, in registration order
    pub tokens: Vec<AccountId>,
    /// per-token APY in whole percents; a missing entry reads as DEFAULT_APY
    apys: LookupMap<AccountId, u32>,
    /// user vaults
    pub vaults: LookupMap<AccountId, Vault>,
    /// total amount of currently staked tokens, per token
    total_stake: LookupMap<AccountId, Balance>,
    /// reward reserve, per token
    total_fund: LookupMap<AccountId, Balance>,
    /// individual reserve contributions per (token, funder). Informational
    /// only - the reserve is commingled and funders cannot withdraw.
    funder_fund: LookupMap<(AccountId, AccountId), Balance>,
    /// total number of accounts with a vault
    pub accounts_registered: u64,
}

#[near_bindgen]
impl Contract {
    #[init]
    pub fn new(owner_id: AccountId) -> Self {
        Self {
            owner_id,
            is_active: true,
            tokens: Vec::new(),
            apys: LookupMap::new(b"a".to_vec()),
            vaults: LookupMap::new(b"v".to_vec()),
            total_stake: LookupMap::new(b"s".to_vec()),
            total_fund: LookupMap::new(b"f".to_vec()),
            funder_fund: LookupMap::new(b"u".to_vec()),
            accounts_registered: 0,
        }
    }

    // ************ //
    // view methods //
    // ************ //

    pub fn get_contract_params(&self) -> ContractParams {
        ContractParams {
            owner_id: self.owner_id.clone(),
            is_active: self.is_active,
            default_apy: DEFAULT_APY,
            tokens: self.tokens.clone(),
            apys: self.tokens.iter().map(|t| self.apy_of(t)).collect(),
            total_staked: to_U128s(&self.tokens.iter().map(|t| self.staked_total(t)).collect()),
            total_funding: to_U128s(&self.tokens.iter().map(|t| self.funding_total(t)).collect()),
            accounts_registered: self.accounts_registered,
        }
    }

    /// APY of the given token; tokens which were never configured earn the
    /// default rate.
    pub fn get_apy(&self, token: AccountId) -> u32 {
        self.apy_of(&token)
    }

    pub fn get_token_array(&self) -> Vec<AccountId> {
        self.tokens.clone()
    }

    pub fn total_staked(&self, token: AccountId) -> U128 {
        self.staked_total(&token).into()
    }

    pub fn total_funding(&self, token: AccountId) -> U128 {
        self.funding_total(&token).into()
    }

    /// Reserve contribution made by `account_id` for `token`.
    pub fn funding(&self, token: AccountId, account_id: AccountId) -> U128 {
        self.funder_fund.get(&(token, account_id)).unwrap_or(0).into()
    }

    /// Id of the most recently opened position of `account_id` for `token`.
    /// 0 means no position was ever opened.
    pub fn last_stake_ids(&self, token: AccountId, account_id: AccountId) -> u64 {
        self.vaults
            .get(&account_id)
            .and_then(|v| v.stakes.get(&token).map(|ps| ps.len() as u64))
            .unwrap_or(0)
    }

    /// Principal held by one position. Closed and unknown positions read as 0.
    pub fn balances(&self, token: AccountId, account_id: AccountId, stake_id: u64) -> U128 {
        self.position(&token, &account_id, stake_id)
            .map(|p| p.principal)
            .unwrap_or(0)
            .into()
    }

    /// Accrual clock of one position (unix seconds). 0 marks a closed slot.
    pub fn stake_dates(&self, token: AccountId, account_id: AccountId, stake_id: u64) -> u64 {
        self.position(&token, &account_id, stake_id)
            .map(|p| p.opened_at)
            .unwrap_or(0)
    }

    /// Legacy two-step unstake request timestamp. Kept for interface
    /// compatibility, always 0 after any operation.
    pub fn unstake_request_dates(
        &self,
        token: AccountId,
        account_id: AccountId,
        stake_id: u64,
    ) -> u64 {
        self.position(&token, &account_id, stake_id)
            .map(|p| p.unstake_requested_at)
            .unwrap_or(0)
    }

    /// Sum of principals over every position ever issued to `account_id`.
    pub fn get_total_balance_of_user(&self, token: AccountId, account_id: AccountId) -> U128 {
        self.vaults
            .get(&account_id)
            .and_then(|v| {
                v.stakes
                    .get(&token)
                    .map(|ps| ps.iter().map(|p| p.principal).sum::<Balance>())
            })
            .unwrap_or(0)
            .into()
    }

    /// Balance `account_id` holds on the `token` contract itself.
    pub fn get_token_balance(&self, token: AccountId, account_id: AccountId) -> Promise {
        ext_ft::ext(token)
            .with_static_gas(GAS_FOR_POOL_VIEW)
            .ft_balance_of(account_id)
    }

    // ******************* //
    // transaction methods //
    // ******************* //

    // Deposits (staking and funding) arrive through `ft_transfer_call`, see
    // the NEP-141 receiver in vault.rs.

    /// Withdraws `amount` from one stake position, plus the interest accrued
    /// on the whole position since its accrual clock was last reset - when
    /// the reserve can cover it. A short reserve forfeits the interest, the
    /// principal is paid out regardless.
    /// Requires 1 yNEAR payment for wallet 2FA.
    #[payable]
    pub fn unstake_certain_amount(
        &mut self,
        token: AccountId,
        stake_id: u64,
        amount: U128,
    ) -> Promise {
        self.assert_is_active();
        assert_one_yocto();
        let user = env::predecessor_account_id();
        self._unstake(&user, &token, stake_id, amount.0)
    }

    /// Full exit from one stake position.
    /// Requires 1 yNEAR payment for wallet 2FA.
    #[payable]
    pub fn unstake(&mut self, token: AccountId, stake_id: u64) -> Promise {
        self.assert_is_active();
        assert_one_yocto();
        let user = env::predecessor_account_id();
        let principal = {
            let v = self.vaults.get(&user).expect(ERR_WRONG_STAKE_ID);
            let positions = v.stakes.get(&token).expect(ERR_WRONG_STAKE_ID);
            assert!(
                1 <= stake_id && stake_id <= positions.len() as u64,
                "{}",
                ERR_WRONG_STAKE_ID
            );
            positions[(stake_id - 1) as usize].principal
        };
        self._unstake(&user, &token, stake_id, principal)
    }

    /// Withdraws the accrued interest of one position without touching the
    /// principal. Unlike `unstake` this aborts when the reserve cannot pay.
    pub fn claim(&mut self, token: AccountId, stake_id: u64) {
        self.assert_is_active();
        let user = env::predecessor_account_id();
        let mut v = self.vaults.get(&user).expect(ERR_WRONG_STAKE_ID);
        let now = now_seconds();
        let apy = self.apy_of(&token);
        let reserve = self.funding_total(&token);
        let owed;
        let prev_opened_at;
        {
            let positions = v.stakes.get_mut(&token).expect(ERR_WRONG_STAKE_ID);
            assert!(
                1 <= stake_id && stake_id <= positions.len() as u64,
                "{}",
                ERR_WRONG_STAKE_ID
            );
            let pos = &mut positions[(stake_id - 1) as usize];
            assert!(pos.principal > 0, "{}", ERR_CLAIM_BALANCE);
            prev_opened_at = pos.opened_at;
            owed = accrued_interest(
                pos.principal,
                now.saturating_sub(pos.opened_at),
                apy as u128,
            );
            assert!(reserve >= owed, "{}", ERR_CLAIM_FUNDING);
            pos.opened_at = now;
            pos.unstake_requested_at = 0;
        }
        self.total_fund.insert(&token, &(reserve - owed));
        self.vaults.insert(&user, &v);
        log!(
            "@{} claimed {} {} interest from stake {}",
            user,
            owed,
            token,
            stake_id
        );
        if owed > 0 {
            self.transfer_claimed(user, token, stake_id, owed, prev_opened_at);
        }
    }

    // ******************* //
    //     management      //
    // ******************* //

    /// Sets the APY (whole percents) of one token.
    pub fn set_apy(&mut self, token: AccountId, apy: u32) {
        self.assert_owner();
        self.apys.insert(&token, &apy);
        log!("APY of {} set to {}%", token, apy);
    }

    /// Opens or closes stake / unstake / claim operations.
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

    pub(crate) fn apy_of(&self, token: &AccountId) -> u32 {
        self.apys.get(token).unwrap_or(DEFAULT_APY)
    }

    pub(crate) fn staked_total(&self, token: &AccountId) -> Balance {
        self.total_stake.get(token).unwrap_or(0)
    }

    pub(crate) fn funding_total(&self, token: &AccountId) -> Balance {
        self.total_fund.get(token).unwrap_or(0)
    }

    pub(crate) fn register_token(&mut self, token: &AccountId) {
        if !self.tokens.contains(token) {
            self.tokens.push(token.clone());
        }
    }

    fn position(
        &self,
        token: &AccountId,
        account_id: &AccountId,
        stake_id: u64,
    ) -> Option<StakePosition> {
        if stake_id == 0 {
            return None;
        }
        self.vaults.get(account_id).and_then(|v| {
            v.stakes
                .get(token)
                .and_then(|ps| ps.get((stake_id - 1) as usize).cloned())
        })
    }

    pub(crate) fn recovered_vault(&mut self, user: &AccountId) -> Vault {
        match self.vaults.get(user) {
            Some(v) => v,
            None => {
                // the vault can only be gone if another TX closed it in the
                // meantime, recreate it
                self.accounts_registered += 1;
                Vault::default()
            }
        }
    }

    /// Sends principal + interest in one transfer. The ledger is already
    /// settled; the callback undoes the settlement if the transfer fails.
    pub(crate) fn transfer_payout(
        &mut self,
        user: AccountId,
        token: AccountId,
        stake_id: u64,
        principal: Balance,
        interest: Balance,
    ) -> Promise {
        ext_ft::ext(token.clone())
            .with_attached_deposit(ONE_YOCTO)
            .with_static_gas(GAS_FOR_FT_TRANSFER)
            .ft_transfer(
                user.clone(),
                U128(principal + interest),
                Some("unstaking".to_string()),
            )
            .then(
                Self::ext(env::current_account_id())
                    .with_static_gas(GAS_FOR_CALLBACK)
                    .transfer_payout_callback(
                        user,
                        token,
                        stake_id,
                        U128(principal),
                        U128(interest),
                    ),
            )
    }

    #[private]
    pub fn transfer_payout_callback(
        &mut self,
        user: AccountId,
        token: AccountId,
        stake_id: u64,
        principal: U128,
        interest: U128,
    ) {
        if promise_result_as_failed() {
            log!(
                "transferring {} {} to @{} failed. Recovering stake {}",
                principal.0 + interest.0,
                token,
                user,
                stake_id
            );
            let mut v = self.recovered_vault(&user);
            let positions = v.stakes.entry(token.clone()).or_insert_with(Vec::new);
            while (positions.len() as u64) < stake_id {
                positions.push(StakePosition::default());
            }
            let pos = &mut positions[(stake_id - 1) as usize];
            pos.principal += principal.0;
            pos.opened_at = now_seconds();
            self.total_stake
                .insert(&token, &(self.staked_total(&token) + principal.0));
            if interest.0 > 0 {
                self.total_fund
                    .insert(&token, &(self.funding_total(&token) + interest.0));
            }
            self.vaults.insert(&user, &v);
        }
    }

    pub(crate) fn transfer_claimed(
        &mut self,
        user: AccountId,
        token: AccountId,
        stake_id: u64,
        interest: Balance,
        prev_opened_at: u64,
    ) -> Promise {
        ext_ft::ext(token.clone())
            .with_attached_deposit(ONE_YOCTO)
            .with_static_gas(GAS_FOR_FT_TRANSFER)
            .ft_transfer(user.clone(), U128(interest), Some("claim".to_string()))
            .then(
                Self::ext(env::current_account_id())
                    .with_static_gas(GAS_FOR_CALLBACK)
                    .transfer_claimed_callback(
                        user,
                        token,
                        stake_id,
                        U128(interest),
                        prev_opened_at,
                    ),
            )
    }

    #[private]
    pub fn transfer_claimed_callback(
        &mut self,
        user: AccountId,
        token: AccountId,
        stake_id: u64,
        interest: U128,
        prev_opened_at: u64,
    ) {
        if promise_result_as_failed() {
            log!(
                "claim transfer of {} {} to @{} failed. Restoring the accrual clock",
                interest.0,
                token,
                user
            );
            self.total_fund
                .insert(&token, &(self.funding_total(&token) + interest.0));
            let mut v = self.recovered_vault(&user);
            let positions = v.stakes.entry(token.clone()).or_insert_with(Vec::new);
            while (positions.len() as u64) < stake_id {
                positions.push(StakePosition::default());
            }
            positions[(stake_id - 1) as usize].opened_at = prev_opened_at;
            self.vaults.insert(&user, &v);
        }
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
#[allow(unused_imports)]
mod tests {
    use near_contract_standards::fungible_token::receiver::FungibleTokenReceiver;
    use near_sdk::test_utils::{accounts, VMContextBuilder};
    use near_sdk::{testing_env, Balance};

    use super::*;

    const START: u64 = 1_600_000_000;
    const DAY: u64 = ONE_DAY;
    const YEAR: u64 = 31_536_000;

    fn acc_owner() -> AccountId {
        "owner".parse().unwrap()
    }

    fn acc_token1() -> AccountId {
        "token1".parse().unwrap()
    }

    fn acc_token2() -> AccountId {
        "token2".parse().unwrap()
    }

    fn acc_u1() -> AccountId {
        "user1".parse().unwrap()
    }

    fn acc_u2() -> AccountId {
        "user2".parse().unwrap()
    }

    fn setup_contract(predecessor: AccountId) -> (VMContextBuilder, Contract) {
        let mut context = VMContextBuilder::new();
        testing_env!(context.build());
        let contract = Contract::new(acc_owner());
        testing_env!(context
            .predecessor_account_id(predecessor.clone())
            .signer_account_id(predecessor)
            .block_timestamp(START * SECOND)
            .build());
        (context, contract)
    }

    /// deposits `amount` of `token` as a stake of `user` at unix time `ts`
    fn stake(
        ctx: &mut VMContextBuilder,
        ctr: &mut Contract,
        user: &AccountId,
        token: &AccountId,
        amount: u128,
        ts: u64,
    ) {
        testing_env!(ctx
            .attached_deposit(0)
            .predecessor_account_id(token.clone())
            .signer_account_id(user.clone())
            .block_timestamp(ts * SECOND)
            .build());
        ctr.ft_on_transfer(user.clone(), amount.into(), "".to_string());
    }

    /// deposits `amount` of `token` into the reward reserve
    fn fund(
        ctx: &mut VMContextBuilder,
        ctr: &mut Contract,
        funder: &AccountId,
        token: &AccountId,
        amount: u128,
        ts: u64,
    ) {
        testing_env!(ctx
            .attached_deposit(0)
            .predecessor_account_id(token.clone())
            .signer_account_id(funder.clone())
            .block_timestamp(ts * SECOND)
            .build());
        ctr.ft_on_transfer(funder.clone(), amount.into(), FUNDING_MSG.to_string());
    }

    fn set_caller(ctx: &mut VMContextBuilder, user: &AccountId, deposit: Balance, ts: u64) {
        testing_env!(ctx
            .attached_deposit(deposit)
            .predecessor_account_id(user.clone())
            .signer_account_id(user.clone())
            .block_timestamp(ts * SECOND)
            .build());
    }

    #[test]
    fn test_funding_accumulates() {
        let (mut ctx, mut ctr) = setup_contract(acc_u1());
        fund(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 1000 * E18, START);
        assert_eq!(ctr.total_funding(acc_token1()).0, 1000 * E18);
        assert_eq!(ctr.funding(acc_token1(), acc_u1()).0, 1000 * E18);

        fund(&mut ctx, &mut ctr, &acc_u2(), &acc_token1(), 1000 * E18, START);
        assert_eq!(ctr.total_funding(acc_token1()).0, 2000 * E18);
        assert_eq!(ctr.funding(acc_token1(), acc_u2()).0, 1000 * E18);

        fund(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 1000 * E18, START);
        assert_eq!(ctr.total_funding(acc_token1()).0, 3000 * E18);
        assert_eq!(ctr.funding(acc_token1(), acc_u1()).0, 2000 * E18);

        // funding does not create stake
        assert_eq!(ctr.total_staked(acc_token1()).0, 0);
        assert_eq!(ctr.get_token_array(), vec![acc_token1()]);
    }

    #[test]
    #[should_panic(expected = "fundingContract _amount should be more than 0")]
    fn test_funding_zero() {
        let (mut ctx, mut ctr) = setup_contract(acc_u1());
        fund(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 0, START);
    }

    #[test]
    fn test_apy_defaults_and_set() {
        let (mut ctx, mut ctr) = setup_contract(acc_owner());
        assert_eq!(ctr.get_apy(acc_token1()), 12);
        set_caller(&mut ctx, &acc_owner(), 0, START);
        ctr.set_apy(acc_token1(), 20);
        assert_eq!(ctr.get_apy(acc_token1()), 20);
        ctr.set_apy(acc_token1(), 12);
        assert_eq!(ctr.get_apy(acc_token1()), 12);
        // other tokens stay on the default
        assert_eq!(ctr.get_apy(acc_token2()), 12);
    }

    #[test]
    #[should_panic(expected = "can only be called by the owner")]
    fn test_set_apy_not_owner() {
        let (mut ctx, mut ctr) = setup_contract(acc_u1());
        set_caller(&mut ctx, &acc_u1(), 0, START);
        ctr.set_apy(acc_token1(), 20);
    }

    #[test]
    fn test_stake_opens_new_position_each_call() {
        let (mut ctx, mut ctr) = setup_contract(acc_u1());
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 1000 * E18, START);
        assert_eq!(ctr.last_stake_ids(acc_token1(), acc_u1()), 1);
        assert_eq!(ctr.balances(acc_token1(), acc_u1(), 1).0, 1000 * E18);
        assert_eq!(ctr.stake_dates(acc_token1(), acc_u1(), 1), START);
        assert_eq!(ctr.total_staked(acc_token1()).0, 1000 * E18);

        // a second stake call mints a fresh position instead of topping up
        stake(
            &mut ctx,
            &mut ctr,
            &acc_u1(),
            &acc_token1(),
            2000 * E18,
            START + 100,
        );
        assert_eq!(ctr.last_stake_ids(acc_token1(), acc_u1()), 2);
        assert_eq!(ctr.balances(acc_token1(), acc_u1(), 1).0, 1000 * E18);
        assert_eq!(ctr.stake_dates(acc_token1(), acc_u1(), 1), START);
        assert_eq!(ctr.balances(acc_token1(), acc_u1(), 2).0, 2000 * E18);
        assert_eq!(ctr.stake_dates(acc_token1(), acc_u1(), 2), START + 100);
        assert_eq!(ctr.total_staked(acc_token1()).0, 3000 * E18);
        assert_eq!(ctr.get_total_balance_of_user(acc_token1(), acc_u1()).0, 3000 * E18);

        // an unrelated account starts its own id sequence
        stake(&mut ctx, &mut ctr, &acc_u2(), &acc_token1(), 200 * E18, START + 200);
        assert_eq!(ctr.last_stake_ids(acc_token1(), acc_u2()), 1);
        assert_eq!(ctr.total_staked(acc_token1()).0, 3200 * E18);
        assert_eq!(ctr.get_total_balance_of_user(acc_token1(), acc_u2()).0, 200 * E18);
    }

    #[test]
    #[should_panic(expected = "stake amount should bigger than 0")]
    fn test_stake_zero() {
        let (mut ctx, mut ctr) = setup_contract(acc_u1());
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 0, START);
    }

    #[test]
    fn test_token_registry_order_and_dedup() {
        let (mut ctx, mut ctr) = setup_contract(acc_u1());
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), E18, START);
        fund(&mut ctx, &mut ctr, &acc_u1(), &acc_token2(), E18, START);
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token2(), E18, START);
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), E18, START);
        assert_eq!(ctr.get_token_array(), vec![acc_token1(), acc_token2()]);
    }

    #[test]
    fn test_unstake_all_pays_interest_and_closes() {
        let (mut ctx, mut ctr) = setup_contract(acc_u1());
        fund(&mut ctx, &mut ctr, &acc_owner(), &acc_token1(), 1000 * E18, START);
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 1000 * E18, START);

        set_caller(&mut ctx, &acc_u1(), 1, START + 10 * DAY);
        ctr.unstake(acc_token1(), 1);

        assert_eq!(ctr.balances(acc_token1(), acc_u1(), 1).0, 0);
        assert_eq!(ctr.stake_dates(acc_token1(), acc_u1(), 1), 0);
        assert_eq!(ctr.unstake_request_dates(acc_token1(), acc_u1(), 1), 0);
        assert_eq!(ctr.total_staked(acc_token1()).0, 0);
        // 1000 tokens, 12% APY, 10 days of daily compounding
        assert_eq!(
            ctr.total_funding(acc_token1()).0,
            1000 * E18 - 3_292_539_451_578_716_000
        );
        // the id stays issued
        assert_eq!(ctr.last_stake_ids(acc_token1(), acc_u1()), 1);
    }

    #[test]
    fn test_unstake_partial_accrues_on_full_principal() {
        let (mut ctx, mut ctr) = setup_contract(acc_u1());
        fund(&mut ctx, &mut ctr, &acc_owner(), &acc_token1(), 1000 * E18, START);
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 1000 * E18, START);

        set_caller(&mut ctx, &acc_u1(), 1, START + 10 * DAY);
        ctr.unstake_certain_amount(acc_token1(), 1, U128(500 * E18));

        assert_eq!(ctr.balances(acc_token1(), acc_u1(), 1).0, 500 * E18);
        // the clock restarts on the remaining balance
        assert_eq!(ctr.stake_dates(acc_token1(), acc_u1(), 1), START + 10 * DAY);
        assert_eq!(ctr.total_staked(acc_token1()).0, 500 * E18);
        // interest is computed on the whole 1000 held for 10 days, not on the
        // 500 being withdrawn
        assert_eq!(
            ctr.total_funding(acc_token1()).0,
            1000 * E18 - 3_292_539_451_578_716_000
        );
    }

    #[test]
    fn test_unstake_other_positions_untouched() {
        let (mut ctx, mut ctr) = setup_contract(acc_u1());
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 1000 * E18, START);
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 2000 * E18, START);

        set_caller(&mut ctx, &acc_u1(), 1, START + DAY);
        ctr.unstake(acc_token1(), 1);

        assert_eq!(ctr.balances(acc_token1(), acc_u1(), 1).0, 0);
        assert_eq!(ctr.balances(acc_token1(), acc_u1(), 2).0, 2000 * E18);
        assert_eq!(ctr.stake_dates(acc_token1(), acc_u1(), 2), START);
        assert_eq!(ctr.get_total_balance_of_user(acc_token1(), acc_u1()).0, 2000 * E18);
    }

    #[test]
    #[should_panic(expected = "wrong stake id")]
    fn test_unstake_wrong_stake_id() {
        let (mut ctx, mut ctr) = setup_contract(acc_u1());
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 1000 * E18, START);
        set_caller(&mut ctx, &acc_u1(), 1, START + DAY);
        ctr.unstake_certain_amount(acc_token1(), 10, U128(1000 * E18));
    }

    #[test]
    #[should_panic(expected = "wrong stake id")]
    fn test_unstake_closed_position() {
        let (mut ctx, mut ctr) = setup_contract(acc_u1());
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 1000 * E18, START);
        set_caller(&mut ctx, &acc_u1(), 1, START + DAY);
        ctr.unstake(acc_token1(), 1);
        set_caller(&mut ctx, &acc_u1(), 1, START + 2 * DAY);
        ctr.unstake_certain_amount(acc_token1(), 1, U128(E18));
    }

    #[test]
    #[should_panic(expected = "amount should bigger than 0")]
    fn test_unstake_zero_amount() {
        let (mut ctx, mut ctr) = setup_contract(acc_u1());
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 1000 * E18, START);
        set_caller(&mut ctx, &acc_u1(), 1, START + DAY);
        ctr.unstake_certain_amount(acc_token1(), 1, U128(0));
    }

    #[test]
    #[should_panic(expected = "insufficient funds")]
    fn test_unstake_more_than_principal() {
        let (mut ctx, mut ctr) = setup_contract(acc_u1());
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 1000 * E18, START);
        set_caller(&mut ctx, &acc_u1(), 1, START + DAY);
        ctr.unstake_certain_amount(acc_token1(), 1, U128(1001 * E18));
    }

    #[test]
    fn test_unstake_short_reserve_pays_principal_only() {
        let (mut ctx, mut ctr) = setup_contract(acc_u1());
        fund(&mut ctx, &mut ctr, &acc_owner(), &acc_token1(), E18, START);
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 1000 * E18, START);

        set_caller(&mut ctx, &acc_u1(), 1, START + 10 * DAY);
        ctr.unstake(acc_token1(), 1);

        // interest (~3.29) exceeds the 1 token reserve: forfeited, reserve untouched
        assert_eq!(ctr.total_funding(acc_token1()).0, E18);
        assert_eq!(ctr.balances(acc_token1(), acc_u1(), 1).0, 0);
        assert_eq!(ctr.stake_dates(acc_token1(), acc_u1(), 1), 0);
        assert_eq!(ctr.total_staked(acc_token1()).0, 0);
    }

    #[test]
    fn test_claim_pays_interest_only() {
        let (mut ctx, mut ctr) = setup_contract(acc_u1());
        fund(&mut ctx, &mut ctr, &acc_owner(), &acc_token1(), 1000 * E18, START);
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 1000 * E18, START);

        set_caller(&mut ctx, &acc_u1(), 0, START + YEAR);
        ctr.claim(acc_token1(), 1);

        // principal untouched, clock restarted, reserve charged
        assert_eq!(ctr.balances(acc_token1(), acc_u1(), 1).0, 1000 * E18);
        assert_eq!(ctr.stake_dates(acc_token1(), acc_u1(), 1), START + YEAR);
        assert_eq!(
            ctr.total_funding(acc_token1()).0,
            1000 * E18 - 127_474_615_638_402_212_000
        );
        assert_eq!(ctr.total_staked(acc_token1()).0, 1000 * E18);
    }

    #[test]
    #[should_panic(expected = "wrong stake id")]
    fn test_claim_wrong_stake_id() {
        let (mut ctx, mut ctr) = setup_contract(acc_u1());
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 1000 * E18, START);
        set_caller(&mut ctx, &acc_u1(), 0, START + DAY);
        ctr.claim(acc_token1(), 10);
    }

    #[test]
    #[should_panic(expected = "balance must bigger than 0")]
    fn test_claim_closed_position() {
        let (mut ctx, mut ctr) = setup_contract(acc_u1());
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 1000 * E18, START);
        set_caller(&mut ctx, &acc_u1(), 1, START + 10 * DAY);
        ctr.unstake(acc_token1(), 1);
        set_caller(&mut ctx, &acc_u1(), 0, START + 11 * DAY);
        ctr.claim(acc_token1(), 1);
    }

    #[test]
    #[should_panic(expected = "not enough to pay interest")]
    fn test_claim_short_reserve_aborts() {
        let (mut ctx, mut ctr) = setup_contract(acc_u1());
        fund(&mut ctx, &mut ctr, &acc_owner(), &acc_token1(), E18, START);
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 1_000_000 * E18, START);
        set_caller(&mut ctx, &acc_u1(), 0, START + 2 * YEAR);
        ctr.claim(acc_token1(), 1);
    }

    #[test]
    #[should_panic(expected = "contract is not active")]
    fn test_stake_when_paused() {
        let (mut ctx, mut ctr) = setup_contract(acc_owner());
        set_caller(&mut ctx, &acc_owner(), 0, START);
        ctr.set_active(false);
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 1000 * E18, START);
    }

    #[test]
    #[should_panic(expected = "contract is not active")]
    fn test_unstake_when_paused() {
        let (mut ctx, mut ctr) = setup_contract(acc_u1());
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 1000 * E18, START);
        set_caller(&mut ctx, &acc_owner(), 0, START);
        ctr.set_active(false);
        set_caller(&mut ctx, &acc_u1(), 1, START + DAY);
        ctr.unstake(acc_token1(), 1);
    }

    #[test]
    #[should_panic(expected = "contract is not active")]
    fn test_claim_when_paused() {
        let (mut ctx, mut ctr) = setup_contract(acc_u1());
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 1000 * E18, START);
        set_caller(&mut ctx, &acc_owner(), 0, START);
        ctr.set_active(false);
        set_caller(&mut ctx, &acc_u1(), 0, START + DAY);
        ctr.claim(acc_token1(), 1);
    }

    #[test]
    fn test_unpause_restores_operation() {
        let (mut ctx, mut ctr) = setup_contract(acc_u1());
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 1000 * E18, START);

        set_caller(&mut ctx, &acc_owner(), 0, START);
        ctr.set_active(false);
        set_caller(&mut ctx, &acc_owner(), 0, START + DAY);
        ctr.set_active(true);

        // the pause changed no balances or timestamps
        assert_eq!(ctr.balances(acc_token1(), acc_u1(), 1).0, 1000 * E18);
        assert_eq!(ctr.stake_dates(acc_token1(), acc_u1(), 1), START);

        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 1000 * E18, START + DAY);
        assert_eq!(ctr.get_total_balance_of_user(acc_token1(), acc_u1()).0, 2000 * E18);
    }

    #[test]
    #[should_panic(expected = "Requires attached deposit of exactly 1 yoctoNEAR")]
    fn test_unstake_requires_one_yocto() {
        let (mut ctx, mut ctr) = setup_contract(acc_u1());
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 1000 * E18, START);
        set_caller(&mut ctx, &acc_u1(), 0, START + DAY);
        ctr.unstake(acc_token1(), 1);
    }

    #[test]
    fn test_per_token_isolation() {
        let (mut ctx, mut ctr) = setup_contract(acc_u1());
        fund(&mut ctx, &mut ctr, &acc_owner(), &acc_token1(), 1000 * E18, START);
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 1000 * E18, START);
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token2(), 700 * E18, START);

        // ids are tracked per (token, account)
        assert_eq!(ctr.last_stake_ids(acc_token1(), acc_u1()), 1);
        assert_eq!(ctr.last_stake_ids(acc_token2(), acc_u1()), 1);

        set_caller(&mut ctx, &acc_u1(), 1, START + 10 * DAY);
        ctr.unstake(acc_token1(), 1);

        // the second token's position and reserve stay untouched
        assert_eq!(ctr.balances(acc_token2(), acc_u1(), 1).0, 700 * E18);
        assert_eq!(ctr.total_staked(acc_token2()).0, 700 * E18);
        assert_eq!(ctr.total_funding(acc_token2()).0, 0);
    }

    #[test]
    fn test_contract_params() {
        let (mut ctx, mut ctr) = setup_contract(acc_u1());
        stake(&mut ctx, &mut ctr, &acc_u1(), &acc_token1(), 1000 * E18, START);
        let p = ctr.get_contract_params();
        assert_eq!(p.owner_id, acc_owner());
        assert!(p.is_active);
        assert_eq!(p.tokens, vec![acc_token1()]);
        assert_eq!(p.apys, vec![12]);
        assert_eq!(p.total_staked, vec![U128(1000 * E18)]);
        assert_eq!(p.accounts_registered, 1);
    }
}
