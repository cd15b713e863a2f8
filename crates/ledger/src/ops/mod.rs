use sea_orm::DatabaseConnection;

use crate::{
    CurrencyBox, ResultEngine,
    balance::AggregationService,
    limit::{LimitService, SqlStorage},
    permissions::PermissionFactory,
    settings::LedgerSettings,
    subjects::Context,
};

mod limits;
mod requests;

pub use requests::RequestChanges;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    currencies: CurrencyBox,
    permissions: PermissionFactory,
    limits: LimitService<SqlStorage>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn currencies(&self) -> &CurrencyBox {
        &self.currencies
    }

    fn context(&self) -> Context<'_> {
        Context {
            currencies: &self.currencies,
            permissions: &self.permissions,
        }
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    settings: LedgerSettings,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Currencies, rates and limit configuration. Defaults apply otherwise.
    pub fn settings(mut self, settings: LedgerSettings) -> EngineBuilder {
        self.settings = settings;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let aggregation = AggregationService::new(self.settings.rate_source());
        Ok(Engine {
            database: self.database,
            currencies: self.settings.currency_box(),
            permissions: PermissionFactory::new(self.settings.limits, aggregation),
            limits: LimitService::new(SqlStorage),
        })
    }
}
