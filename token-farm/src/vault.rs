//! Vault is information per user about their stake positions.

use near_contract_standards::fungible_token::receiver::FungibleTokenReceiver;

use crate::*;

#[derive(BorshSerialize, BorshDeserialize, Default)]
pub struct Vault {
    /// stake positions per token; a position id is its 1-based index, so the
    /// vector only ever grows and closed slots keep their id
    pub stakes: HashMap<AccountId, Vec<StakePosition>>,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Default)]
pub struct StakePosition {
    /// amount currently staked in this slot
    pub principal: Balance,
    /// unix seconds of the last accrual reset; 0 marks a closed slot
    pub opened_at: u64,
    /// legacy two-step unstake request timestamp, always zeroed
    pub unstake_requested_at: u64,
}

impl Contract {
    /// Adds a deposit to the reward reserve of `token`. Open to anyone;
    /// contributions are tracked per funder but never withdrawable.
    pub(crate) fn _fund(&mut self, token: &AccountId, funder: &AccountId, amount: Balance) {
        assert!(amount > 0, "{}", ERR_FUND_AMOUNT);
        self.total_fund
            .insert(token, &(self.funding_total(token) + amount));
        let key = (token.clone(), funder.clone());
        let contributed = self.funder_fund.get(&key).unwrap_or(0);
        self.funder_fund.insert(&key, &(contributed + amount));
        self.register_token(token);
        log!("@{} funded {} {}", funder, amount, token);
    }

    /// Opens a brand-new position for (token, user). Repeated stakes never
    /// top up an existing slot, each one gets its own accrual clock.
    pub(crate) fn _stake(&mut self, user: &AccountId, token: &AccountId, amount: Balance) {
        self.assert_is_active();
        assert!(amount > 0, "{}", ERR_STAKE_AMOUNT);
        let mut v = match self.vaults.get(user) {
            Some(v) => v,
            None => {
                self.accounts_registered += 1;
                Vault::default()
            }
        };
        let stake_id;
        {
            let positions = v.stakes.entry(token.clone()).or_insert_with(Vec::new);
            positions.push(StakePosition {
                principal: amount,
                opened_at: now_seconds(),
                unstake_requested_at: 0,
            });
            stake_id = positions.len() as u64;
        }
        self.total_stake
            .insert(token, &(self.staked_total(token) + amount));
        self.register_token(token);
        self.vaults.insert(user, &v);
        log!("@{} staked {} {} as stake {}", user, amount, token, stake_id);
    }

    /// Withdraws `amount` of the position's principal together with the
    /// interest accrued on the whole principal - if the reserve covers it.
    pub(crate) fn _unstake(
        &mut self,
        user: &AccountId,
        token: &AccountId,
        stake_id: u64,
        amount: Balance,
    ) -> Promise {
        let mut v = self.vaults.get(user).expect(ERR_WRONG_STAKE_ID);
        let now = now_seconds();
        let apy = self.apy_of(token);
        let reserve = self.funding_total(token);
        let owed;
        let interest;
        {
            let positions = v.stakes.get_mut(token).expect(ERR_WRONG_STAKE_ID);
            assert!(
                1 <= stake_id && stake_id <= positions.len() as u64,
                "{}",
                ERR_WRONG_STAKE_ID
            );
            let pos = &mut positions[(stake_id - 1) as usize];
            assert!(pos.opened_at > 0, "{}", ERR_WRONG_STAKE_ID);
            assert!(amount > 0, "{}", ERR_UNSTAKE_AMOUNT);
            assert!(amount <= pos.principal, "{}", ERR_INSUFFICIENT_FUNDS);

            // interest accrues on the full principal regardless of how much
            // leaves the position
            owed = accrued_interest(
                pos.principal,
                now.saturating_sub(pos.opened_at),
                apy as u128,
            );
            interest = if owed > 0 && reserve >= owed { owed } else { 0 };

            pos.principal -= amount;
            pos.unstake_requested_at = 0;
            pos.opened_at = if pos.principal == 0 { 0 } else { now };
        }
        if interest > 0 {
            self.total_fund.insert(token, &(reserve - interest));
        } else if owed > 0 {
            log!(
                "reserve of {} cannot cover {} interest, paying principal only",
                token,
                owed
            );
        }
        self.total_stake
            .insert(token, &(self.staked_total(token) - amount));
        self.vaults.insert(user, &v);
        log!(
            "@{} unstaked {} {} from stake {}, interest paid: {}",
            user,
            amount,
            token,
            stake_id,
            interest
        );
        self.transfer_payout(user.clone(), token.clone(), stake_id, amount, interest)
    }
}

// token deposits are done through NEP-141 ft_transfer_call.
#[near_bindgen]
impl FungibleTokenReceiver for Contract {
    /// Routes incoming token deposits. A transfer with the "funding" message
    /// tops up the reward reserve of the sending token; anything else opens a
    /// new stake position for the sender. The calling token contract is the
    /// asset identifier.
    fn ft_on_transfer(
        &mut self,
        sender_id: AccountId,
        amount: U128,
        msg: String,
    ) -> PromiseOrValue<U128> {
        let token = env::predecessor_account_id();
        if msg == FUNDING_MSG {
            self._fund(&token, &sender_id, amount.0);
        } else {
            self._stake(&sender_id, &token, amount.0);
        }
        PromiseOrValue::Value(U128(0))
    }
}
