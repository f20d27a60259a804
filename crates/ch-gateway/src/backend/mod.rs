//! Clearing House backend client.

pub mod sender;

pub use sender::{
    classify, BackendReply, BackendSender, BackendTransport, HttpTransport, SERVICE_TOKEN_HEADER,
};
