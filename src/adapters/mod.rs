pub mod dry_run;
pub mod gas_oracle;
pub mod postgres;

pub use dry_run::DryRunFiller;
pub use gas_oracle::ProviderGasOracle;
pub use postgres::PostgresStore;
