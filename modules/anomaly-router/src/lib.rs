pub mod builder;
pub mod registry;

pub use builder::RoutingTableBuilder;
pub use registry::{HandlerRegistry, RegistryBuilder};
