use crate::{
    traits::{Entity, EntityIdentity},
    translate::{TranslateError, Translator},
};
use std::{
    any::{Any, TypeId, type_name},
    collections::HashMap,
    sync::Arc,
};

// One registered translator, type-erased behind `Any`.
struct Registered {
    entity: &'static str,
    view: &'static str,
    translator: Box<dyn Any + Send + Sync>,
}

///
/// TranslatorRegistry
///
/// Resolves translators by `(entity, view)` type pair. Built once at startup
/// and shared read-only across operations.
///

#[derive(Default)]
pub struct TranslatorRegistry {
    translators: HashMap<(TypeId, TypeId), Registered>,
}

impl TranslatorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one translator. A second translator for the same pair is rejected.
    pub fn register<T: Translator>(&mut self, translator: T) -> Result<(), TranslateError> {
        let key = (TypeId::of::<T::Entity>(), TypeId::of::<T::View>());
        let entity = <T::Entity as EntityIdentity>::ENTITY_NAME;
        let view = type_name::<T::View>();

        if self.translators.contains_key(&key) {
            return Err(TranslateError::AlreadyRegistered { entity, view });
        }

        let erased: Arc<dyn Translator<Entity = T::Entity, View = T::View>> = Arc::new(translator);
        self.translators.insert(
            key,
            Registered {
                entity,
                view,
                translator: Box::new(erased),
            },
        );
        tracing::debug!(entity, view, "translator registered");

        Ok(())
    }

    /// Builder form of [`Self::register`].
    pub fn with<T: Translator>(mut self, translator: T) -> Result<Self, TranslateError> {
        self.register(translator)?;

        Ok(self)
    }

    pub fn resolve<E, V>(&self) -> Result<Arc<dyn Translator<Entity = E, View = V>>, TranslateError>
    where
        E: Entity,
        V: 'static,
    {
        self.translators
            .get(&(TypeId::of::<E>(), TypeId::of::<V>()))
            .and_then(|registered| {
                registered
                    .translator
                    .downcast_ref::<Arc<dyn Translator<Entity = E, View = V>>>()
            })
            .cloned()
            .ok_or_else(|| TranslateError::NotRegistered {
                entity: E::ENTITY_NAME,
                view: type_name::<V>(),
            })
    }

    #[must_use]
    pub fn contains<E: Entity, V: 'static>(&self) -> bool {
        self.translators
            .contains_key(&(TypeId::of::<E>(), TypeId::of::<V>()))
    }

    /// Registered `(entity, view)` names, sorted.
    #[must_use]
    pub fn pairs(&self) -> Vec<(&'static str, &'static str)> {
        let mut pairs = self
            .translators
            .values()
            .map(|registered| (registered.entity, registered.view))
            .collect::<Vec<_>>();
        pairs.sort_unstable();

        pairs
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.translators.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.translators.is_empty()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{ErrorClass, ErrorOrigin, InternalError},
        test_support::{Address, Organization},
    };

    struct AddressLine;

    impl Translator for AddressLine {
        type Entity = Address;
        type View = String;
    }

    struct AddressLength;

    impl Translator for AddressLength {
        type Entity = Address;
        type View = usize;
    }

    #[test]
    fn resolves_by_entity_and_view_pair() {
        let registry = TranslatorRegistry::new()
            .with(AddressLine)
            .and_then(|registry| registry.with(AddressLength))
            .expect("registry");

        assert_eq!(registry.len(), 2);
        assert!(registry.contains::<Address, String>());
        assert!(registry.resolve::<Address, usize>().is_ok());
        assert!(!registry.contains::<Organization, String>());
    }

    #[test]
    fn missing_pair_is_not_registered() {
        let registry = TranslatorRegistry::new();

        let err = registry
            .resolve::<Organization, String>()
            .err()
            .expect("nothing registered");
        assert!(matches!(
            err,
            TranslateError::NotRegistered {
                entity: "Organization",
                ..
            }
        ));

        let err = InternalError::from(err);
        assert_eq!(err.class, ErrorClass::NotFound);
        assert_eq!(err.origin, ErrorOrigin::Translate);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = TranslatorRegistry::new();
        registry.register(AddressLine).expect("first registration");

        let err = registry
            .register(AddressLine)
            .expect_err("second registration");
        assert!(matches!(err, TranslateError::AlreadyRegistered { .. }));
        assert_eq!(err.class(), ErrorClass::InvariantViolation);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn pairs_are_sorted_by_name() {
        let registry = TranslatorRegistry::new()
            .with(AddressLength)
            .and_then(|registry| registry.with(AddressLine))
            .expect("registry");

        let pairs = registry.pairs();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|(entity, _)| *entity == "Address"));
        assert!(pairs[0] <= pairs[1]);
    }
}
