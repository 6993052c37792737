//! Service registration.
//!
//! A [`ServiceDescriptor`] maps method names to [`Handler`]s; a
//! [`ServiceTable`] maps service names to descriptors. Shapes are checked
//! when a method is declared, so dispatch never has to guess what kind of
//! handler it is about to drive.

mod descriptor;
mod handler;
mod table;

pub use descriptor::{MethodEntry, ServiceDescriptor};
pub use handler::{
    ClientStreamFn, DuplexFn, Handler, HandlerFuture, Request, ServerStreamFn, UnaryFn,
};
pub use table::ServiceTable;
