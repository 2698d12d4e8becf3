///
/// entity!
///
/// Declare an entity struct and its registration table in one place.
/// Relation fields are marked with `=> relation`; their target and
/// cardinality come from the field type through `RelationField`.
///
/// ```ignore
/// versio::entity! {
///     #[derive(Clone, Debug, Default)]
///     pub struct Channel {
///         pub name: String,
///         pub service: Option<Key<Service>> => relation,
///     }
///
///     path: "registry::Channel",
/// }
/// ```
///

#[macro_export]
macro_rules! entity {
    (
        $(#[$meta:meta])*
        $vis:vis struct $entity:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty $(=> $rel:ident)?
            ),* $(,)?
        }

        path: $path:literal $(,)?
    ) => {
        $(#[$meta])*
        $vis struct $entity {
            $(
                $(#[$fmeta])*
                $fvis $field : $ty
            ),*
        }

        impl $crate::traits::Path for $entity {
            const PATH: &'static str = $path;
        }

        impl $crate::traits::EntityIdentity for $entity {
            const ENTITY_NAME: &'static str = stringify!($entity);
        }

        impl $crate::traits::Entity for $entity {
            const MODEL: &'static $crate::model::EntityModel = &$crate::model::EntityModel {
                path: $path,
                entity_name: stringify!($entity),
                relations: &[
                    $($(
                        $crate::__entity_relation!($rel, $field, $ty),
                    )?)*
                ],
            };

            fn relation_targets(&self, field: &str) -> Option<Vec<$crate::arena::Slot>> {
                $($(
                    if field == $crate::__entity_relation!(@name $rel, $field) {
                        return Some($crate::arena::RelationField::slots(&self.$field));
                    }
                )?)*
                let _ = field;

                None
            }

            fn remap_relations(
                &mut self,
                remap: &mut dyn FnMut($crate::arena::Slot) -> $crate::arena::Slot,
            ) {
                $($(
                    $crate::__entity_relation!(@check $rel);
                    $crate::arena::RelationField::remap(&mut self.$field, remap);
                )?)*
                let _ = remap;
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __entity_relation {
    (relation, $field:ident, $ty:ty) => {
        $crate::model::RelationModel::new(
            stringify!($field),
            <<$ty as $crate::arena::RelationField>::Target as $crate::traits::EntityIdentity>::ENTITY_NAME,
            <<$ty as $crate::arena::RelationField>::Target as $crate::traits::Entity>::model,
            <$ty as $crate::arena::RelationField>::CARDINALITY,
        )
    };
    (@name relation, $field:ident) => {
        stringify!($field)
    };
    (@check relation) => {};
    ($other:ident, $($rest:tt)*) => {
        compile_error!(concat!("unknown field marker `", stringify!($other), "`; expected `relation`"))
    };
    (@name $other:ident, $($rest:tt)*) => {
        compile_error!(concat!("unknown field marker `", stringify!($other), "`; expected `relation`"))
    };
    (@check $other:ident) => {
        compile_error!(concat!("unknown field marker `", stringify!($other), "`; expected `relation`"))
    };
}
