pub mod features;
pub mod namespaces;

pub mod prelude;
