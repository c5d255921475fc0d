use crate::*;

use near_contract_standards::fungible_token::receiver::FungibleTokenReceiver;

/// FT Receiver
/// Stake and funding deposits are done through NEP-141 `ft_transfer_call`.
#[near_bindgen]
impl FungibleTokenReceiver for Contract {
    /// Routes incoming fungible deposits:
    /// - reward token with the "funding" message tops up the reward reserve,
    /// - the stake token grows the sender's stake balance,
    /// - anything else is refunded in full.
    fn ft_on_transfer(
        &mut self,
        sender_id: AccountId,
        amount: U128,
        msg: String,
    ) -> PromiseOrValue<U128> {
        let token = env::predecessor_account_id();
        if token == self.reward_token && msg == FUNDING_MSG {
            self._fund(&sender_id, amount.0);
            return PromiseOrValue::Value(U128(0));
        }
        if token == self.stake_token {
            self._stake(&sender_id, amount.0);
            return PromiseOrValue::Value(U128(0));
        }
        log!(
            "refunding {} {} from @{}: token not accepted here",
            amount.0,
            token,
            sender_id
        );
        PromiseOrValue::Value(amount)
    }
}

/// Receiver half of the NEP-245 multi token standard. Booster deposits come
/// through `mt_transfer_call` / `mt_batch_transfer_call` on the booster token
/// contract, so a batch deposit is a single receiver call.
pub trait MultiTokenReceiver {
    fn mt_on_transfer(
        &mut self,
        sender_id: AccountId,
        token_ids: Vec<TokenId>,
        amounts: Vec<U128>,
        msg: String,
    ) -> PromiseOrValue<Vec<U128>>;
}

#[near_bindgen]
impl MultiTokenReceiver for Contract {
    /// Deposits booster quantities for `sender_id`. Transfers from any
    /// contract other than the configured booster token are refunded in full.
    #[allow(unused_variables)]
    fn mt_on_transfer(
        &mut self,
        sender_id: AccountId,
        token_ids: Vec<TokenId>,
        amounts: Vec<U128>,
        msg: String,
    ) -> PromiseOrValue<Vec<U128>> {
        if env::predecessor_account_id() != self.booster_token {
            log!(
                "only boosters from {} are supported, refunding",
                self.booster_token
            );
            return PromiseOrValue::Value(amounts);
        }
        self._stake_boosters(&sender_id, &token_ids, &amounts);
        PromiseOrValue::Value(vec![U128(0); token_ids.len()])
    }
}
