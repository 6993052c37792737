//! Protobuf wire messages.
//!
//! Field tags are part of the protocol; never renumber them.
//!
//! ```text
//! message WireEnvelope {
//!   string call_id = 1;
//!   WireKind kind = 2;
//!   WireShape shape = 3;           // StreamStart only
//!   WireDirection direction = 4;   // StreamData / StreamEnd / StreamError
//!   optional string method = 5;    // call-opening envelopes only
//!   bytes payload = 6;             // JSON
//!   optional WireError error = 7;
//!   map<string, string> metadata = 8;
//! }
//! ```

use std::collections::HashMap;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WireEnvelope {
    #[prost(string, tag = "1")]
    pub call_id: String,
    #[prost(enumeration = "WireKind", tag = "2")]
    pub kind: i32,
    #[prost(enumeration = "WireShape", tag = "3")]
    pub shape: i32,
    #[prost(enumeration = "WireDirection", tag = "4")]
    pub direction: i32,
    #[prost(string, optional, tag = "5")]
    pub method: Option<String>,
    #[prost(bytes = "vec", tag = "6")]
    pub payload: Vec<u8>,
    #[prost(message, optional, tag = "7")]
    pub error: Option<WireError>,
    #[prost(map = "string, string", tag = "8")]
    pub metadata: HashMap<String, String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WireError {
    #[prost(uint32, tag = "1")]
    pub code: u32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(string, optional, tag = "3")]
    pub detail: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum WireKind {
    Unspecified = 0,
    UnaryRequest = 1,
    UnaryResponse = 2,
    StreamStart = 3,
    StreamData = 4,
    StreamEnd = 5,
    StreamError = 6,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum WireShape {
    Unspecified = 0,
    Unary = 1,
    ServerStream = 2,
    ClientStream = 3,
    Duplex = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum WireDirection {
    Unspecified = 0,
    ToCallee = 1,
    ToCaller = 2,
}
