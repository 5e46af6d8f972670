//! Ordered registry of flowers.
//!
//! Registration order is execution order: the provisioner performs no
//! dependency analysis, so an operator expresses "B needs A" by adding A
//! first. Registration happens once, as a single batch.

use std::any::Any;
use std::collections::HashSet;

use crate::error::FloristError;
use crate::flower::Flower;

/// The ordered, de-duplicated set of flowers of one provisioner.
#[derive(Default)]
pub struct Registry {
    flowers: Vec<Box<dyn Flower>>,
    sealed: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `flowers` in order.
    ///
    /// The whole batch is rejected, and nothing is registered, if a flower
    /// has an empty name or description, if two flowers share a name, or if
    /// a batch was already added.
    pub fn add_flowers(&mut self, flowers: Vec<Box<dyn Flower>>) -> Result<(), FloristError> {
        if self.sealed {
            return Err(FloristError::Registration(
                "flowers can be added only once".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for (index, flower) in flowers.iter().enumerate() {
            let name = flower.name();
            if name.is_empty() {
                return Err(FloristError::Registration(format!(
                    "flower {} has an empty name",
                    index + 1
                )));
            }
            if flower.description().is_empty() {
                return Err(FloristError::Registration(format!(
                    "flower '{}' has an empty description",
                    name
                )));
            }
            if !seen.insert(name.to_string()) {
                return Err(FloristError::Registration(format!(
                    "flower '{}' is already registered",
                    name
                )));
            }
        }
        tracing::debug!(count = flowers.len(), "flowers registered");
        self.flowers = flowers;
        self.sealed = true;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.flowers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flowers.is_empty()
    }

    /// Flower names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.flowers.iter().map(|f| f.name()).collect()
    }

    /// Flowers in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Flower> {
        self.flowers.iter().map(|f| f.as_ref())
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Flower>> {
        self.flowers.iter_mut()
    }

    /// Looks up a flower by name.
    pub fn flower(&self, name: &str) -> Option<&dyn Flower> {
        self.iter().find(|f| f.name() == name)
    }

    /// Looks up a flower by name and concrete type, for callbacks that set
    /// configure-time fields.
    pub fn flower_mut<T: Flower>(&mut self, name: &str) -> Option<&mut T> {
        let flower = self.flowers.iter_mut().find(|f| f.name() == name)?;
        let flower: &mut dyn Flower = &mut **flower;
        let any: &mut dyn Any = flower;
        any.downcast_mut::<T>()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;
    use crate::env::Env;
    use crate::flower::Host;

    struct Named {
        name: &'static str,
        description: &'static str,
        value: u32,
    }

    impl Named {
        fn boxed(name: &'static str) -> Box<dyn Flower> {
            Box::new(Self {
                name,
                description: "test flower",
                value: 0,
            })
        }
    }

    impl Flower for Named {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            self.description
        }

        fn init(&mut self, _env: &Env) -> Result<()> {
            Ok(())
        }

        fn install(&self, _host: &Host) -> Result<()> {
            Ok(())
        }

        fn configure(&self, _host: &Host) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_registration_order_is_kept() {
        let mut registry = Registry::new();
        registry
            .add_flowers(vec![Named::boxed("c"), Named::boxed("a"), Named::boxed("b")])
            .expect("registration should succeed");
        assert_eq!(registry.names(), vec!["c", "a", "b"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = Registry::new();
        let err = registry
            .add_flowers(vec![Named::boxed("A"), Named::boxed("A")])
            .unwrap_err();
        assert_eq!(err.to_string(), "registration error: flower 'A' is already registered");
        assert!(registry.is_empty(), "a rejected batch must not be partially registered");
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut registry = Registry::new();
        let err = registry.add_flowers(vec![Named::boxed("")]).unwrap_err();
        assert!(err.to_string().contains("empty name"), "got: {}", err);
    }

    #[test]
    fn test_empty_description_rejected() {
        let mut registry = Registry::new();
        let flower: Box<dyn Flower> = Box::new(Named {
            name: "x",
            description: "",
            value: 0,
        });
        let err = registry.add_flowers(vec![flower]).unwrap_err();
        assert!(err.to_string().contains("'x' has an empty description"), "got: {}", err);
    }

    #[test]
    fn test_second_batch_rejected() {
        let mut registry = Registry::new();
        registry
            .add_flowers(vec![Named::boxed("a")])
            .expect("first batch should succeed");
        let err = registry.add_flowers(vec![Named::boxed("b")]).unwrap_err();
        assert!(matches!(err, FloristError::Registration(_)));
        assert_eq!(registry.names(), vec!["a"]);
    }

    #[test]
    fn test_second_batch_rejected_after_empty_batch() {
        let mut registry = Registry::new();
        registry.add_flowers(Vec::new()).expect("empty batch is allowed");
        assert!(registry.add_flowers(vec![Named::boxed("a")]).is_err());
    }

    #[test]
    fn test_flower_mut_downcasts() {
        let mut registry = Registry::new();
        registry
            .add_flowers(vec![Named::boxed("a"), Named::boxed("b")])
            .expect("registration should succeed");

        registry
            .flower_mut::<Named>("b")
            .expect("flower b should be a Named")
            .value = 7;

        assert!(registry.flower("b").is_some());
        assert!(registry.flower("z").is_none());
        assert_eq!(registry.flower_mut::<Named>("b").map(|f| f.value), Some(7));
        assert_eq!(registry.flower_mut::<Named>("a").map(|f| f.value), Some(0));
    }
}
