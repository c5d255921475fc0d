//! Vault is information per user about their stake balance and boosters.

use crate::*;

#[derive(BorshSerialize, BorshDeserialize, Default)]
pub struct Vault {
    /// amount of stake tokens locked in this vault
    pub balance: Balance,
    /// unix seconds of the last interest settlement; 0 when nothing is staked
    pub stake_date: u64,
    /// deposited booster quantity per category
    pub boosters: HashMap<TokenId, u128>,
    /// categories with a nonzero deposit, in first-deposit order
    pub booster_ids: Vec<TokenId>,
}

impl Vault {
    #[inline]
    pub fn booster_quantity(&self, token_id: &TokenId) -> u128 {
        self.boosters.get(token_id).copied().unwrap_or(0)
    }
}

impl Contract {
    /// Effective APY of the vault: nothing accrues without a stake balance,
    /// otherwise every deposited booster adds `bonus * quantity` percentage
    /// points on top of the base APY.
    pub(crate) fn total_apy(&self, v: &Vault) -> u128 {
        if v.balance == 0 {
            return 0;
        }
        let mut apy = self.base_apy as u128;
        for id in &v.booster_ids {
            apy += self.bonus_of(id) as u128 * v.booster_quantity(id);
        }
        apy
    }

    /// Pays out the interest accrued since the last settlement and restarts
    /// the accrual clock. A reserve which cannot cover the payout forfeits
    /// it. Interest is never folded into the stake balance.
    pub(crate) fn settle(&mut self, user: &AccountId, v: &mut Vault) {
        if v.balance == 0 {
            return;
        }
        let now = now_seconds();
        let owed = accrued_interest(
            v.balance,
            now.saturating_sub(v.stake_date),
            self.total_apy(v),
        );
        v.stake_date = now;
        if owed == 0 {
            return;
        }
        if self.total_fund >= owed {
            self.total_fund -= owed;
            self.transfer_interest(user.clone(), owed);
        } else {
            log!("reserve cannot cover {} interest, forfeiting", owed);
        }
    }

    /// Adds a deposit to the reward reserve. Open to anyone; contributions
    /// are tracked per funder but never withdrawable.
    pub(crate) fn _fund(&mut self, funder: &AccountId, amount: Balance) {
        assert!(amount > 0, "{}", ERR_FUND_AMOUNT);
        self.total_fund += amount;
        let contributed = self.funder_fund.get(funder).unwrap_or(0);
        self.funder_fund.insert(funder, &(contributed + amount));
        log!("@{} funded {}", funder, amount);
    }

    /// Grows the single stake balance of `user`, settling the interest
    /// accrued so far on the previous balance.
    pub(crate) fn _stake(&mut self, user: &AccountId, amount: Balance) {
        self.assert_is_active();
        assert!(amount > 0, "{}", ERR_LP_STAKE_AMOUNT);
        let mut v = self.vault_or_new(user);
        self.settle(user, &mut v);
        v.balance += amount;
        v.stake_date = now_seconds();
        self.total_stake += amount;
        self.vaults.insert(user, &v);
        log!("@{} staked {} {}", user, amount, self.stake_token);
    }

    /// Deposits booster quantities. Every category must be whitelisted, i.e.
    /// carry a configured nonzero bonus.
    pub(crate) fn _stake_boosters(
        &mut self,
        user: &AccountId,
        token_ids: &[TokenId],
        amounts: &[U128],
    ) {
        self.assert_is_active();
        require!(
            token_ids.len() == amounts.len(),
            "token ids and amounts length mismatch"
        );
        for (id, amount) in token_ids.iter().zip(amounts.iter()) {
            assert!(self.bonus_of(id) > 0, "{}", ERR_NOT_IN_WHITELIST);
            assert!(amount.0 > 0, "deposited booster amount must be positive");
        }
        let mut v = self.vault_or_new(user);
        self.settle(user, &mut v);
        for (id, amount) in token_ids.iter().zip(amounts.iter()) {
            if !v.booster_ids.contains(id) {
                v.booster_ids.push(id.clone());
            }
            *v.boosters.entry(id.clone()).or_insert(0) += amount.0;
            self.total_boost += amount.0;
        }
        self.vaults.insert(user, &v);
        log!("@{} deposited boosters {:?}", user, token_ids);
    }

    /// Removes booster quantities from the vault; the actual transfer back to
    /// the user is issued by the caller. A category drained to zero leaves
    /// the enumeration list - in the batch and the single path alike.
    pub(crate) fn _unstake_boosters(
        &mut self,
        user: &AccountId,
        token_ids: &[TokenId],
        amounts: &[U128],
    ) {
        self.assert_is_active();
        require!(
            token_ids.len() == amounts.len(),
            "token ids and amounts length mismatch"
        );
        let mut v = self.vaults.get(user).unwrap_or_default();
        for (id, amount) in token_ids.iter().zip(amounts.iter()) {
            assert!(self.bonus_of(id) > 0, "{}", ERR_NOT_IN_WHITELIST);
            assert!(amount.0 > 0, "withdrawn booster amount must be positive");
            assert!(v.booster_quantity(id) >= amount.0, "{}", ERR_NOT_ENOUGH_NFT);
        }
        self.settle(user, &mut v);
        for (id, amount) in token_ids.iter().zip(amounts.iter()) {
            let quantity = v.boosters.get_mut(id).expect(ERR_NOT_ENOUGH_NFT);
            *quantity -= amount.0;
            if *quantity == 0 {
                v.boosters.remove(id);
                v.booster_ids.retain(|x| x != id);
            }
            self.total_boost -= amount.0;
        }
        self.vaults.insert(user, &v);
        log!("@{} withdrew boosters {:?}", user, token_ids);
    }
}
