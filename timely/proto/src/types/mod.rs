mod convert;
mod ele;
mod error;
mod reply;

pub use convert::{EleExt, FromEle};
pub use ele::Ele;
pub use error::ProtoError;
pub use reply::Reply;
