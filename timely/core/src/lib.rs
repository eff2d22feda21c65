pub mod config;
pub mod connection;
pub mod decode;
pub mod error;
pub mod schema;
pub mod series;
pub mod time;
pub mod transport;

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::Lazy;
}

pub mod prelude {
    // --- Connection ---
    pub use crate::config::ConnectionConfig;
    pub use crate::connection::{current, reset_current, set_current, Connection, Session};
    pub use crate::transport::{TcpTransport, Transport};

    // --- Decoded Replies ---
    pub use crate::decode::{Info, Members};

    // --- Series Modelling ---
    pub use crate::schema::{DimensionOptions, Schema, SeriesModel};
    pub use crate::series::{GetOptions, Query, QueryRange, Record, Selection, Series, Shape};
    pub use crate::time::{coerce_to_id, SampleTime};

    // --- Error Handling ---
    pub use crate::error::{Result, TimelyError, TransportError};

    pub use timely_proto::prelude::{Ele, EleExt, Format, FromEle, Reply};
}
