pub mod codec;
pub mod protocol;
pub mod types;

pub mod prelude {
    // --- Protocol Structures ---
    pub use crate::protocol::command::{Command, Opcode};
    pub use crate::protocol::format::Format;

    // --- Core Data Types ---
    pub use crate::types::Ele;
    pub use crate::types::Reply;

    // --- Type Conversion ---
    pub use crate::types::{EleExt, FromEle};

    // --- Wire Codec ---
    pub use crate::codec::{decode_frame, encode_command, encode_frame, Frame};

    // --- Error Handling ---
    pub use crate::types::ProtoError;
}
