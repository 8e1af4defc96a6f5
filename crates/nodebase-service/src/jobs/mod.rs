//! Background job pipeline: fire-and-forget dispatch plus the worker that
//! consumes dispatched events.

mod dispatcher;
mod worker;

pub use dispatcher::{DispatchAck, JobDispatcher};
pub use worker::JobWorker;
