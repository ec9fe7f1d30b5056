use crate::core::{
    errors::Dsp2Error,
    types::{Account, Balance, FullUserData, Identity, Transaction, TransactionQuery},
};
use async_trait::async_trait;

/// Read access to a user's STET account information
#[async_trait]
pub trait AccountInformation {
    /// Identity of the authenticated user
    async fn get_identity(&self) -> Result<Identity, Dsp2Error>;

    /// Every account of the user; may be empty
    async fn get_accounts(&self) -> Result<Vec<Account>, Dsp2Error>;

    async fn get_account(&self, account_id: &str) -> Result<Account, Dsp2Error>;

    async fn get_balances(&self, account_id: &str) -> Result<Vec<Balance>, Dsp2Error>;

    /// One page of transactions, in server order
    async fn get_transactions(
        &self,
        account_id: &str,
        query: TransactionQuery,
    ) -> Result<Vec<Transaction>, Dsp2Error>;

    /// Identity plus every account with its balances and first transactions
    async fn get_full_user_data(
        &self,
        transactions_per_account: u32,
    ) -> Result<FullUserData, Dsp2Error>;
}
