//! External synthesis engine: job descriptor and process invocation.

mod descriptor;
mod invoker;

pub use descriptor::{SynthesisDescriptor, DESCRIPTOR_FILE};
pub use invoker::SynthesisInvoker;
