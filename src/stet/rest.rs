use crate::core::config::Endpoints;
use crate::core::errors::Dsp2Error;
use crate::core::kernel::RestClient;
use crate::core::types::{Account, Balance, Identity, Transaction, TransactionQuery};
use crate::core::validation::{validate_list, ListPolicy};
use tracing::instrument;

/// Thin typed wrapper around `RestClient` for the STET resource endpoints
///
/// Every response body is validated against its schema before it is returned.
#[derive(Clone, Debug)]
pub struct StetRest<R: RestClient> {
    client: R,
    endpoints: Endpoints,
    list_policy: ListPolicy,
}

impl<R: RestClient> StetRest<R> {
    pub fn new(client: R, endpoints: Endpoints) -> Self {
        Self {
            client,
            endpoints,
            list_policy: ListPolicy::default(),
        }
    }

    pub fn with_list_policy(mut self, list_policy: ListPolicy) -> Self {
        self.list_policy = list_policy;
        self
    }

    pub fn transport(&self) -> &R {
        &self.client
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    #[instrument(skip(self))]
    pub async fn get_identity(&self) -> Result<Identity, Dsp2Error> {
        let data = self.client.get(&self.endpoints.identity, &[]).await?;
        Ok(Identity::try_from_value(&data)?)
    }

    #[instrument(skip(self))]
    pub async fn get_accounts(&self) -> Result<Vec<Account>, Dsp2Error> {
        let data = self.client.get(&self.endpoints.accounts, &[]).await?;
        Ok(validate_list(
            Account::SCHEMA,
            &data,
            self.list_policy,
            Account::try_from_value,
        )?)
    }

    /// The id is interpolated as given; malformed ids surface as a server-side error.
    #[instrument(skip(self))]
    pub async fn get_account(&self, account_id: &str) -> Result<Account, Dsp2Error> {
        let data = self
            .client
            .get(&self.endpoints.account_path(account_id), &[])
            .await?;
        Ok(Account::try_from_value(&data)?)
    }

    #[instrument(skip(self))]
    pub async fn get_balances(&self, account_id: &str) -> Result<Vec<Balance>, Dsp2Error> {
        let data = self
            .client
            .get(&self.endpoints.balances_path(account_id), &[])
            .await?;
        Ok(validate_list(
            Balance::SCHEMA,
            &data,
            self.list_policy,
            Balance::try_from_value,
        )?)
    }

    #[instrument(skip(self))]
    pub async fn get_transactions(
        &self,
        account_id: &str,
        query: TransactionQuery,
    ) -> Result<Vec<Transaction>, Dsp2Error> {
        let page = query.page.to_string();
        let count = query.count.to_string();
        let params = [("page", page.as_str()), ("count", count.as_str())];

        let data = self
            .client
            .get(&self.endpoints.transactions_path(account_id), &params)
            .await?;
        Ok(validate_list(
            Transaction::SCHEMA,
            &data,
            self.list_policy,
            Transaction::try_from_value,
        )?)
    }
}
