//! Services the bridge serves out of the box.
//!
//! `Echo` exercises every call shape and is what clients use to check a
//! connection end to end:
//!
//! | Method        | Shape         | Behaviour                                   |
//! |---------------|---------------|---------------------------------------------|
//! | `Echo/run`    | unary         | returns the request payload                 |
//! | `Echo/count`  | server-stream | writes `1..=n` for `{"n": n}`               |
//! | `Echo/sum`    | client-stream | returns the sum of the numbers it receives  |
//! | `Echo/chat`   | duplex        | writes back every item it receives          |

use crate::error::BridgeError;

use models::RpcError;
use mux_core::{ServiceDescriptor, ServiceTable};

use futures_util::StreamExt;
use log::debug;
use serde_json::json;

/// Largest `n` accepted by `Echo/count`.
pub const MAX_COUNT: u64 = 10_000;

pub fn echo_service() -> Result<ServiceDescriptor, BridgeError> {
    let service = ServiceDescriptor::new("Echo")?
        .unary("run", |request| async move { Ok(request.payload) })?
        .server_stream("count", |request, mut sink| async move {
            let n = request.payload["n"]
                .as_u64()
                .ok_or_else(|| RpcError::handler("expected {\"n\": <non-negative integer>}"))?;
            if n > MAX_COUNT {
                return Err(RpcError::handler(format!("n must be at most {MAX_COUNT}")));
            }

            for i in 1..=n {
                sink.write(json!(i))
                    .map_err(|e| RpcError::handler(e.to_string()))?;
            }
            Ok(())
        })?
        .client_stream("sum", |mut requests| async move {
            let mut total = 0.0;
            let mut count = 0_u64;
            while let Some(item) = requests.next().await {
                let item = item?;
                total += item
                    .as_f64()
                    .ok_or_else(|| RpcError::handler(format!("not a number: {item}")))?;
                count += 1;
            }
            debug!("Echo/sum added {count} numbers");
            Ok(json!(total))
        })?
        .duplex("chat", |mut requests, mut sink| async move {
            while let Some(item) = requests.next().await {
                sink.write(item?)
                    .map_err(|e| RpcError::handler(e.to_string()))?;
            }
            Ok(())
        })?;

    Ok(service)
}

/// Every service the bridge registers at startup.
pub fn bridge_services() -> Result<ServiceTable, BridgeError> {
    let mut table = ServiceTable::new();
    table.register_service(echo_service()?)?;
    Ok(table)
}
