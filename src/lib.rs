//! Client access layer for the Timely time-series store.
//!
//! ```no_run
//! use timely::prelude::*;
//!
//! timely::series_model! {
//!     pub struct Vehicle {
//!         value,
//!         position_lat: lazy,
//!         position_long: lazy,
//!     }
//! }
//!
//! timely::init_logging();
//! let conn = timely::connect(&ConnectionConfig::from_env()?);
//! let vehicle = Series::<Vehicle>::new(conn, "vehicle.42");
//! vehicle.add(1_700_000_000_000i64, [("value", 1), ("position_lat", 52)])?;
//! # Ok::<(), TimelyError>(())
//! ```

use std::sync::Arc;

use env_logger::Env;

pub use timely_core::series_model;
pub use timely_core::{config, connection, decode, error, schema, series, time, transport};
pub use timely_proto as proto;

use timely_core::config::ConnectionConfig;
use timely_core::connection::Connection;

const ENV_TIMELY_LOGLEVEL: &str = "TIMELY_LOGLEVEL";

pub mod prelude {
    pub use timely_core::prelude::*;
}

/// Install `env_logger` filtered by `TIMELY_LOGLEVEL`; a no-op if a logger is already set.
pub fn init_logging() {
    let _ = env_logger::try_init_from_env(Env::new().filter(ENV_TIMELY_LOGLEVEL));
}

/// Open a connection and make it the process-wide default.
pub fn connect(config: &ConnectionConfig) -> Arc<Connection> {
    let conn = Arc::new(Connection::open(config));
    if connection::set_current(conn.clone()).is_some() {
        log::info!("replaced default connection with {}", config.address());
    }
    conn
}
