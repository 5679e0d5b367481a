pub use super::features::Entity as Features;
pub use super::namespaces::Entity as Namespaces;
