//! SQL database probing for Postgres and MySQL.
//!
//! A probe connects with a DSN derived from the locator, pings, and when the
//! locator carries a `tables` option, lists the tables of the target database.

use super::util::Presence;
use super::{Probe, ProbeContext};
use crate::dispatch::ConfigError;
use crate::error::{unavailable, Context, Result, Unavailable};
use crate::locator::Locator;
use async_trait::async_trait;
use std::fmt;
use url::Url;

#[cfg(feature = "db-postgres")]
const POSTGRES_TABLES: &str = "SELECT table_name::text FROM information_schema.tables \
     WHERE table_catalog = $1 AND table_schema = 'public'";
#[cfg(feature = "db-mysql")]
const MYSQL_TABLES: &str =
    "SELECT CAST(table_name AS CHAR) FROM information_schema.tables WHERE table_schema = ?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    MySql,
}

impl Dialect {
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
        }
    }

    /// Database connected to when the locator names none.
    ///
    /// Postgres has no connectable `information_schema` database, so it falls
    /// back to the `postgres` maintenance database every server carries.
    pub fn default_database(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "information_schema",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqlProbe {
    display: String,
    dialect: Dialect,
    dsn: Url,
    database: String,
    tables: Option<Presence>,
}

impl SqlProbe {
    pub fn from_locator(locator: &Locator, dialect: Dialect) -> Result<Self, ConfigError> {
        let path = locator.path();
        let named = path.strip_prefix('/').unwrap_or(path);
        if named.contains('/') {
            return Err(ConfigError::InvalidDatabase {
                locator: locator.to_string(),
                name: named.to_string(),
            });
        }

        let tables = Presence::from_options(locator.options(), "tables");
        if named.is_empty() && tables.is_some() {
            return Err(ConfigError::DatabaseRequired {
                locator: locator.to_string(),
            });
        }
        let database = if named.is_empty() {
            dialect.default_database().to_string()
        } else {
            named.to_string()
        };

        let mut dsn = locator
            .url_without_options()
            .ok_or_else(|| ConfigError::MissingHost {
                locator: locator.to_string(),
            })?;
        dsn.set_path(&format!("/{database}"));
        if dialect == Dialect::Postgres {
            default_sslmode(&mut dsn);
        }

        Ok(Self {
            display: locator.to_string(),
            dialect,
            dsn,
            database,
            tables,
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn dsn(&self) -> &Url {
        &self.dsn
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn tables(&self) -> Option<&Presence> {
        self.tables.as_ref()
    }

    #[cfg(feature = "db-postgres")]
    async fn check_postgres(&self) -> Result<()> {
        use sqlx::postgres::{PgConnectOptions, PgConnection};
        use sqlx::Connection;
        use std::str::FromStr;

        let options = PgConnectOptions::from_str(self.dsn.as_str())?;
        let mut conn = PgConnection::connect_with(&options)
            .await
            .map_err(unavailable)?;

        let outcome = async {
            conn.ping().await.map_err(unavailable)?;
            if let Some(tables) = &self.tables {
                let existing: Vec<String> = sqlx::query_scalar(POSTGRES_TABLES)
                    .bind(self.database.as_str())
                    .fetch_all(&mut conn)
                    .await
                    .with_context(|| format!("failed to list tables of `{}`", self.database))?;
                check_tables(tables, existing)?;
            }
            Ok(())
        }
        .await;

        if let Err(err) = conn.close().await {
            tracing::debug!(error = %err, "postgres connection close failed");
        }
        outcome
    }

    #[cfg(feature = "db-mysql")]
    async fn check_mysql(&self) -> Result<()> {
        use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
        use sqlx::Connection;
        use std::str::FromStr;

        let options = MySqlConnectOptions::from_str(self.dsn.as_str())?;
        let mut conn = MySqlConnection::connect_with(&options)
            .await
            .map_err(unavailable)?;

        let outcome = async {
            conn.ping().await.map_err(unavailable)?;
            if let Some(tables) = &self.tables {
                let existing: Vec<String> = sqlx::query_scalar(MYSQL_TABLES)
                    .bind(self.database.as_str())
                    .fetch_all(&mut conn)
                    .await
                    .with_context(|| format!("failed to list tables of `{}`", self.database))?;
                check_tables(tables, existing)?;
            }
            Ok(())
        }
        .await;

        if let Err(err) = conn.close().await {
            tracing::debug!(error = %err, "mysql connection close failed");
        }
        outcome
    }

    async fn check(&self) -> Result<()> {
        match self.dialect {
            #[cfg(feature = "db-postgres")]
            Dialect::Postgres => self.check_postgres().await,
            #[cfg(not(feature = "db-postgres"))]
            Dialect::Postgres => Err(crate::err!(
                "postgres probing requires the `db-postgres` feature"
            )),
            #[cfg(feature = "db-mysql")]
            Dialect::MySql => self.check_mysql().await,
            #[cfg(not(feature = "db-mysql"))]
            Dialect::MySql => Err(crate::err!("mysql probing requires the `db-mysql` feature")),
        }
    }
}

fn check_tables(required: &Presence, existing: Vec<String>) -> Result<()> {
    required.missing(existing).map_err(|missing| {
        if missing.is_empty() {
            Unavailable::msg("no tables found").into()
        } else {
            Unavailable::msg(format!("missing tables: {}", missing.join(", "))).into()
        }
    })
}

/// Postgres connections default to `sslmode=disable` unless one is given.
fn default_sslmode(dsn: &mut Url) {
    let mut pairs: Vec<(String, String)> = dsn
        .query_pairs()
        .filter(|(key, value)| !(key == "sslmode" && value.is_empty()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if !pairs.iter().any(|(key, _)| key == "sslmode") {
        pairs.push(("sslmode".to_string(), "disable".to_string()));
    }

    dsn.query_pairs_mut().clear().extend_pairs(pairs);
}

#[async_trait]
impl Probe for SqlProbe {
    async fn attempt(&self, ctx: &ProbeContext) -> Result<()> {
        ctx.bounded(self.check()).await
    }
}

impl fmt::Display for SqlProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::parse;

    fn probe(input: &str, dialect: Dialect) -> Result<SqlProbe, ConfigError> {
        SqlProbe::from_locator(&parse(input).expect("locator"), dialect)
    }

    #[test]
    fn postgres_dsn_defaults_sslmode_and_strips_options() {
        let probe = probe(
            "postgres://app:pw@localhost:5432/orders?connect_timeout=3#tables=items",
            Dialect::Postgres,
        )
        .expect("probe");
        assert_eq!(
            probe.dsn().as_str(),
            "postgres://app:pw@localhost:5432/orders?connect_timeout=3&sslmode=disable"
        );
        assert_eq!(probe.database(), "orders");
        assert_eq!(
            probe.tables(),
            Some(&Presence::AllOf(vec!["items".to_string()]))
        );
    }

    #[test]
    fn explicit_sslmode_is_kept() {
        let probe = probe("postgres://localhost/orders?sslmode=require", Dialect::Postgres)
            .expect("probe");
        assert_eq!(
            probe.dsn().as_str(),
            "postgres://localhost/orders?sslmode=require"
        );
    }

    #[test]
    fn default_database_depends_on_dialect() {
        let mysql = probe("mysql://root@localhost:3306", Dialect::MySql).expect("probe");
        assert_eq!(mysql.database(), "information_schema");
        assert_eq!(
            mysql.dsn().as_str(),
            "mysql://root@localhost:3306/information_schema"
        );

        let postgres = probe("postgres://localhost", Dialect::Postgres).expect("probe");
        assert_eq!(postgres.database(), "postgres");
    }

    #[test]
    fn tables_without_database_is_a_config_error() {
        let err = probe("mysql://root@localhost:3306/#tables", Dialect::MySql)
            .expect_err("database is required");
        assert!(matches!(err, ConfigError::DatabaseRequired { .. }));
    }

    #[test]
    fn nested_database_name_is_rejected() {
        let err = probe("postgres://localhost/a/b", Dialect::Postgres).expect_err("invalid name");
        assert!(matches!(err, ConfigError::InvalidDatabase { .. }));
    }

    #[test]
    fn table_check_reports_missing_names() {
        let required = Presence::AllOf(vec!["a".to_string(), "b".to_string()]);
        let err = check_tables(&required, vec!["a".to_string()]).expect_err("b missing");
        assert!(err.is_unavailable());
        assert_eq!(err.to_string(), "missing tables: b");

        let err = check_tables(&Presence::Any, Vec::new()).expect_err("empty database");
        assert_eq!(err.to_string(), "no tables found");
    }
}
