//! Database dispatch macros for reducing code duplication.
//!
//! Per-dialect code lives in parallel `mysql`/`postgres`/`sqlite` submodules;
//! these macros generate the match over [`DbPool`](crate::db::pool::DbPool) that
//! routes a call to the right one.

/// Macro for generating database dispatch match arms.
///
/// This macro generates match arms for `DbPool` variants, reducing the need
/// to manually write repetitive match statements.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(pool, {
///     MySql(p) => mysql::fetch_rows(p, sql, params).await,
///     Postgres(p) => postgres::fetch_rows(p, sql, params).await,
///     SQLite(p) => sqlite::fetch_rows(p, sql, params).await,
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($pool:expr, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $pool {
            $(
                $crate::db::pool::DbPool::$variant($p) => $body,
            )+
        }
    };
}

pub use impl_db_dispatch;
