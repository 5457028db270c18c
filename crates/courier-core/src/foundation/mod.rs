//! Foundation layer - contracts every other layer builds on.
//!
//! - Message contexts and transport identity
//! - Body text encodings
//! - Reserved property names
//! - Argument and format errors

pub mod context;
pub mod encoding;
pub mod error;
pub mod properties;

pub use context::{
    AsAnyContext, BasicMessageContext, BusMessageContext, EntityType, MessageContext,
    NOT_AVAILABLE, Properties, StreamMessageContext, TransportIdentity,
};
pub use encoding::TextEncoding;
pub use error::{ArgumentError, ArgumentResult, CorrelationFormatError, require_non_blank};
