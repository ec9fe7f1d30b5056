use crate::core::config::Dsp2Config;
use crate::core::errors::Dsp2Error;
use crate::core::kernel::{ReqwestRest, RestClient};
use crate::core::traits::AccountInformation;
use crate::core::types::{
    Account, AccountDetails, Balance, FullUserData, Identity, Transaction, TransactionQuery,
};
use crate::core::validation::ListPolicy;
use crate::stet::auth::Authenticator;
use crate::stet::rest::StetRest;
use async_trait::async_trait;
use futures_util::future::try_join_all;
use tracing::{debug, instrument};

/// STET account-information client
///
/// Every operation first makes sure a token is held, authenticating (once, even
/// under concurrent use) when none is, then fetches and validates the resource.
pub struct Dsp2Client<R: RestClient = ReqwestRest> {
    auth: Authenticator,
    rest: StetRest<R>,
}

impl<R: RestClient> std::fmt::Debug for Dsp2Client<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dsp2Client")
            .field("auth", &self.auth)
            .field("endpoints", self.rest.endpoints())
            .finish_non_exhaustive()
    }
}

impl<R: RestClient> Dsp2Client<R> {
    /// Wrap an existing transport; no network activity happens here.
    pub fn with_rest(config: &Dsp2Config, rest: R) -> Result<Self, Dsp2Error> {
        let auth = Authenticator::new(
            config.username.clone(),
            config.password.clone(),
            config.endpoints.token.clone(),
        )?;

        Ok(Self {
            auth,
            rest: StetRest::new(rest, config.endpoints.clone()),
        })
    }

    /// Keep the valid items of a list response instead of failing on the first bad one
    pub fn with_list_policy(mut self, list_policy: ListPolicy) -> Self {
        self.rest = self.rest.with_list_policy(list_policy);
        self
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.auth
    }

    pub fn transport(&self) -> &R {
        self.rest.transport()
    }

    /// Run a fresh password grant and attach the token to the session
    pub async fn authenticate(&self) -> Result<String, Dsp2Error> {
        self.auth.authenticate(self.rest.transport()).await
    }

    /// Authenticate only when no token has been obtained yet
    pub async fn ensure_authenticated(&self) -> Result<(), Dsp2Error> {
        self.auth.ensure_authenticated(self.rest.transport()).await
    }

    async fn fetch_account_details(
        &self,
        account: Account,
        query: TransactionQuery,
    ) -> Result<AccountDetails, Dsp2Error> {
        let (balances, transactions) = tokio::try_join!(
            self.rest.get_balances(&account.id),
            self.rest.get_transactions(&account.id, query)
        )?;

        Ok(AccountDetails {
            account,
            balances,
            transactions,
        })
    }
}

impl Dsp2Client<ReqwestRest> {
    /// Build a reqwest-backed client from configuration without authenticating
    pub fn new(config: &Dsp2Config) -> Result<Self, Dsp2Error> {
        crate::stet::builder::build_client(config)
    }

    /// Build a reqwest-backed client and authenticate immediately
    pub async fn connect(config: &Dsp2Config) -> Result<Self, Dsp2Error> {
        crate::stet::builder::connect(config).await
    }
}

#[async_trait]
impl<R: RestClient + 'static> AccountInformation for Dsp2Client<R> {
    async fn get_identity(&self) -> Result<Identity, Dsp2Error> {
        self.ensure_authenticated().await?;
        self.rest.get_identity().await
    }

    async fn get_accounts(&self) -> Result<Vec<Account>, Dsp2Error> {
        self.ensure_authenticated().await?;
        self.rest.get_accounts().await
    }

    async fn get_account(&self, account_id: &str) -> Result<Account, Dsp2Error> {
        self.ensure_authenticated().await?;
        self.rest.get_account(account_id).await
    }

    async fn get_balances(&self, account_id: &str) -> Result<Vec<Balance>, Dsp2Error> {
        self.ensure_authenticated().await?;
        self.rest.get_balances(account_id).await
    }

    async fn get_transactions(
        &self,
        account_id: &str,
        query: TransactionQuery,
    ) -> Result<Vec<Transaction>, Dsp2Error> {
        self.ensure_authenticated().await?;
        self.rest.get_transactions(account_id, query).await
    }

    /// Performs `2 + 2 * accounts` GETs. Per-account fetches run concurrently and
    /// the first failure drops the rest; account order follows the accounts listing.
    #[instrument(skip(self))]
    async fn get_full_user_data(
        &self,
        transactions_per_account: u32,
    ) -> Result<FullUserData, Dsp2Error> {
        self.ensure_authenticated().await?;

        let identity = self.rest.get_identity().await?;
        let accounts = self.rest.get_accounts().await?;
        debug!(accounts = accounts.len(), "Fetching per-account details");

        let query = TransactionQuery::first(transactions_per_account);
        let accounts = try_join_all(
            accounts
                .into_iter()
                .map(|account| self.fetch_account_details(account, query)),
        )
        .await?;

        Ok(FullUserData { identity, accounts })
    }
}
