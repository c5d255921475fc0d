pub mod constants {
    use near_sdk::{Balance, Gas};

    /// Gas constants
    /// Amount of gas for fungible token transfers.
    pub const TGAS: Gas = Gas::ONE_TERA;
    pub const GAS_FOR_FT_TRANSFER: Gas = Gas(10 * TGAS.0);
    pub const GAS_FOR_MT_TRANSFER: Gas = Gas(20 * TGAS.0);
    pub const GAS_FOR_CALLBACK: Gas = Gas(5 * TGAS.0);
    pub const GAS_FOR_POOL_VIEW: Gas = Gas(5 * TGAS.0);

    /// one second in nanoseconds
    pub const SECOND: u64 = 1_000_000_000;
    /// one day in seconds
    pub const ONE_DAY: u64 = 24 * 60 * 60;

    /// E18 is 1 whole token for 18-decimal assets. Also the fixed-point base
    /// of the daily rate math.
    pub const E18: Balance = 1_000_000_000_000_000_000;

    /// APY (whole percents) of assets which were never configured explicitly.
    pub const DEFAULT_APY: u32 = 12;
    /// daily rate denominator: 100 (percent) * 365 (days per year)
    pub const APY_DIVISOR: u128 = 36_500;

    /// `ft_transfer_call` message which routes a deposit into the reward
    /// reserve instead of staking it.
    pub const FUNDING_MSG: &str = "funding";
}

pub mod errors {
    // amounts
    pub const ERR_FUND_AMOUNT: &str = "fundingContract _amount should be more than 0";
    pub const ERR_STAKE_AMOUNT: &str = "stake amount should bigger than 0";
    pub const ERR_LP_STAKE_AMOUNT: &str = "stake amount should be more than 0";
    pub const ERR_UNSTAKE_AMOUNT: &str = "amount should bigger than 0";

    // identifiers
    pub const ERR_WRONG_STAKE_ID: &str = "wrong stake id";
    pub const ERR_NOT_IN_WHITELIST: &str = "nft id not in whitelist";
    pub const ERR_NFT_APY_ARGS: &str = "nft id and apy must be positive";

    // authorization / gating
    pub const ERR_NOT_OWNER: &str = "can only be called by the owner";
    pub const ERR_NOT_ACTIVE: &str = "contract is not active";

    // user-side balances
    pub const ERR_INSUFFICIENT_FUNDS: &str = "insufficient funds";
    pub const ERR_NOT_ENOUGH_NFT: &str = "not enough staked nft tokens";

    // claim preconditions: claim hard-fails on a short reserve while the
    // unstake family silently degrades to a principal-only payout.
    pub const ERR_CLAIM_BALANCE: &str = "balance must bigger than 0";
    pub const ERR_LP_CLAIM_BALANCE: &str = "balance should more than 0";
    pub const ERR_CLAIM_FUNDING: &str = "not enough to pay interest";
    pub const ERR_LP_CLAIM_FUNDING: &str = "total funding not enough to pay interest";
}

pub mod helpers {
    use near_sdk::json_types::U128;
    use near_sdk::{env, Balance, PromiseResult};
    use uint::construct_uint;

    construct_uint! {
        /// 256-bit unsigned integer.
        pub struct U256(4);
    }

    #[allow(non_snake_case)]
    pub fn to_U128s(v: &Vec<Balance>) -> Vec<U128> {
        v.iter().map(|x| U128::from(*x)).collect()
    }

    /// Value of `shares` pool shares expressed in the underlying asset:
    /// `shares * reserve / total_supply`, floored. An empty pool values every
    /// share at zero.
    pub fn share_value(shares: Balance, reserve: Balance, total_supply: Balance) -> Balance {
        if total_supply == 0 {
            return 0;
        }
        (U256::from(shares) * U256::from(reserve) / U256::from(total_supply)).as_u128()
    }

    /// Current block timestamp in unix seconds.
    pub fn now_seconds() -> u64 {
        env::block_timestamp() / crate::constants::SECOND
    }

    /// Returns true if the promise was failed. Otherwise returns false.
    /// Fails if called outside a callback that received 1 promise result.
    pub fn promise_result_as_failed() -> bool {
        near_sdk::require!(
            env::promise_results_count() == 1,
            "Contract expected a result on the callback"
        );
        match env::promise_result(0) {
            PromiseResult::Failed => true,
            _ => false,
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_share_value() {
        use crate::constants::E18;
        // 1 share of a 50/50 pool holding 2000 base tokens over 1000 shares
        assert_eq!(share_value(E18, 2000 * E18, 1000 * E18), 2 * E18);
        // floors: 1 share, reserve 1, supply 3 shares
        assert_eq!(share_value(E18, 1, 3 * E18), 0);
        assert_eq!(share_value(3, 1, 3), 1);
        // tiny amounts below the ratio threshold value to zero
        assert_eq!(share_value(1, 999, 1000), 0);
        assert_eq!(share_value(0, 2000 * E18, 1000 * E18), 0);
        // empty pool
        assert_eq!(share_value(E18, 0, 0), 0);
    }
}

pub mod interest {
    use crate::constants::*;
    use crate::helpers::U256;
    use near_sdk::Balance;

    /// Fixed-point power: `x^n` where `base` represents 1.0. Square-and-multiply,
    /// flooring after every step.
    fn rpow(mut x: U256, mut n: u64, base: U256) -> U256 {
        let mut z = base;
        while n > 0 {
            if n & 1 == 1 {
                z = z * x / base;
            }
            x = x * x / base;
            n >>= 1;
        }
        z
    }

    /// `principal` grown at `apy` whole percents, compounded daily over `days`.
    pub fn compound_amount(principal: Balance, days: u64, apy: u128) -> Balance {
        if principal == 0 || days == 0 || apy == 0 {
            return principal;
        }
        let one = U256::from(E18);
        let daily_rate = U256::from(apy) * one / U256::from(APY_DIVISOR);
        let factor = rpow(one + daily_rate, days, one);
        (U256::from(principal) * factor / one).as_u128()
    }

    /// Interest owed on `principal` at `apy` after `elapsed` seconds.
    /// Only whole elapsed days accrue; anything under one day is zero.
    pub fn accrued_interest(principal: Balance, elapsed: u64, apy: u128) -> Balance {
        compound_amount(principal, elapsed / ONE_DAY, apy) - principal
    }

}

pub mod interfaces {
    use near_sdk::json_types::U128;
    use near_sdk::{ext_contract, AccountId};

    #[ext_contract(ext_ft)]
    pub trait FungibleToken {
        fn ft_transfer(&mut self, receiver_id: AccountId, amount: U128, memo: Option<String>);
        fn ft_balance_of(&self, account_id: AccountId) -> U128;
    }

    /// NEP-245 style multi token interface. Booster categories are token ids
    /// on a single multi token contract; quantities ride on `amount`.
    #[ext_contract(ext_mt)]
    pub trait MultiToken {
        fn mt_transfer(
            &mut self,
            receiver_id: AccountId,
            token_id: String,
            amount: U128,
            approval: Option<(AccountId, u64)>,
            memo: Option<String>,
        );
        fn mt_batch_transfer(
            &mut self,
            receiver_id: AccountId,
            token_ids: Vec<String>,
            amounts: Vec<U128>,
            approvals: Option<Vec<Option<(AccountId, u64)>>>,
            memo: Option<String>,
        );
    }

    /// Read side of the liquidity pool backing an LP share token.
    #[ext_contract(ext_pool)]
    pub trait LiquidityPool {
        fn get_reserve(&self, token_id: AccountId) -> U128;
        fn ft_total_supply(&self) -> U128;
    }
}
