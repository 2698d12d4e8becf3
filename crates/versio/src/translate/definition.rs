//! Declarative per-field translation rules.
//!
//! A translator declares its rules once per call and `finish` runs them in
//! declaration order. A non-fatal failure is recorded under the rule's field
//! path and the remaining rules still run; rules that `requires` a failed
//! field are skipped and reported. Fatal errors abort at once.

use crate::{
    arena::Key,
    traits::Entity,
    translate::{
        CodeTable, Issues, PathSegment, TranslateContext, TranslateError, render_path,
    },
};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Debug,
    marker::PhantomData,
};

///
/// ToView
/// Direction marker: entity source, view target.
///

#[derive(Clone, Copy, Debug)]
pub struct ToView;

///
/// ToEntity
/// Direction marker: view source, entity target.
///

#[derive(Clone, Copy, Debug)]
pub struct ToEntity;

type Apply<'s, S, T> =
    Box<dyn FnOnce(&S, &mut T, &mut TranslateContext<'_>) -> Result<(), TranslateError> + 's>;

struct Rule<'s, S, T> {
    field: &'static str,
    requires: Vec<&'static str>,
    apply: Apply<'s, S, T>,
}

///
/// Translation
///
/// Lazy rule list translating `source` into `target` in direction `D`.
///

pub struct Translation<'s, S, T, D> {
    source: &'s S,
    target: T,
    rules: Vec<Rule<'s, S, T>>,
    _direction: PhantomData<D>,
}

impl<'s, E: Entity, V> Translation<'s, E, V, ToView> {
    /// Start a view translation of `entity` into `view`.
    pub fn to_view(entity: &'s E, view: V) -> Self {
        Self::start(entity, view)
    }
}

impl<'s, V, E: Entity> Translation<'s, V, E, ToEntity> {
    /// Start an entity translation of `view` into `entity`.
    pub fn to_entity(view: &'s V, entity: E) -> Self {
        Self::start(view, entity)
    }
}

impl<'s, S, T, D> Translation<'s, S, T, D> {
    const fn start(source: &'s S, target: T) -> Self {
        Self {
            source,
            target,
            rules: Vec::new(),
            _direction: PhantomData,
        }
    }

    fn rule(
        mut self,
        field: &'static str,
        apply: impl FnOnce(&S, &mut T, &mut TranslateContext<'_>) -> Result<(), TranslateError> + 's,
    ) -> Self {
        self.rules.push(Rule {
            field,
            requires: Vec::new(),
            apply: Box::new(apply),
        });

        self
    }

    /// Copy a scalar.
    #[must_use]
    pub fn field(self, field: &'static str, copy: impl FnOnce(&S, &mut T) + 's) -> Self {
        self.rule(field, move |source, target, _| {
            copy(source, target);
            Ok(())
        })
    }

    /// Copy a scalar that may fail validation.
    #[must_use]
    pub fn try_field(
        self,
        field: &'static str,
        copy: impl FnOnce(&S, &mut T) -> Result<(), TranslateError> + 's,
    ) -> Self {
        self.rule(field, move |source, target, _| copy(source, target))
    }

    /// Skip the most recently declared rule when any of `fields` failed.
    /// Dependencies must be declared before the dependent rule.
    #[must_use]
    pub fn requires(mut self, fields: &[&'static str]) -> Self {
        if let Some(rule) = self.rules.last_mut() {
            rule.requires.extend_from_slice(fields);
        }

        self
    }

    /// Run every rule and return the target, or every non-fatal failure.
    pub fn finish(self, ctx: &mut TranslateContext<'_>) -> Result<T, TranslateError> {
        let Self {
            source,
            mut target,
            rules,
            ..
        } = self;

        let mut declared = BTreeSet::new();
        let mut failed = BTreeSet::new();
        let mut issues = Issues::new();

        for rule in rules {
            for &dependency in &rule.requires {
                if !declared.contains(dependency) {
                    return Err(TranslateError::UnknownDependency {
                        field: rule.field,
                        dependency,
                    });
                }
            }
            declared.insert(rule.field);

            if let Some(&dependency) = rule.requires.iter().find(|dep| failed.contains(*dep)) {
                issues.absorb(rule.field, TranslateError::DependencyFailed { dependency });
                failed.insert(rule.field);
                continue;
            }

            match (rule.apply)(source, &mut target, ctx) {
                Ok(()) => {}
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    issues.absorb(rule.field, err);
                    failed.insert(rule.field);
                }
            }
        }

        issues.into_result(target)
    }
}

///
/// ToView rules
///

impl<'s, S, T> Translation<'s, S, T, ToView> {
    /// Map an enumeration key to its display code.
    #[must_use]
    pub fn map_code<K>(
        self,
        field: &'static str,
        table: &'s CodeTable<K>,
        get: impl FnOnce(&S) -> K + 's,
        set: impl FnOnce(&mut T, String) + 's,
    ) -> Self
    where
        K: Clone + Ord + Debug,
    {
        self.rule(field, move |source, target, _| {
            let code = table.code(&get(source))?;
            set(target, code.to_string());
            Ok(())
        })
    }

    /// Translate one optional reference.
    #[must_use]
    pub fn reference<R, W>(
        self,
        field: &'static str,
        get: impl FnOnce(&S) -> Option<Key<R>> + 's,
        set: impl FnOnce(&mut T, Option<W>) + 's,
    ) -> Self
    where
        R: Entity,
        W: 'static,
    {
        self.rule(field, move |source, target, ctx| {
            let view = get(source).map(|key| ctx.view_of::<R, W>(key)).transpose()?;
            set(target, view);
            Ok(())
        })
    }

    /// Translate a reference list; element failures are reported as `field[i]`.
    #[must_use]
    pub fn collection<R, W>(
        self,
        field: &'static str,
        get: impl FnOnce(&S) -> Vec<Key<R>> + 's,
        set: impl FnOnce(&mut T, Vec<W>) + 's,
    ) -> Self
    where
        R: Entity,
        W: 'static,
    {
        self.rule(field, move |source, target, ctx| {
            let views = ctx.views_of::<R, W>(&get(source))?;
            set(target, views);
            Ok(())
        })
    }

    /// Translate a keyed reference map (per language, per category);
    /// element failures are reported as `field[key]`.
    #[must_use]
    pub fn keyed<K, R, W>(
        self,
        field: &'static str,
        get: impl FnOnce(&S) -> BTreeMap<K, Key<R>> + 's,
        set: impl FnOnce(&mut T, BTreeMap<K, W>) + 's,
    ) -> Self
    where
        K: Ord + Debug,
        R: Entity,
        W: 'static,
    {
        self.rule(field, move |source, target, ctx| {
            let views = translate_keyed(get(source), |key| ctx.view_of::<R, W>(key))?;
            set(target, views);
            Ok(())
        })
    }
}

///
/// ToEntity rules
///

impl<'s, S, T> Translation<'s, S, T, ToEntity> {
    /// Map a display code back to its enumeration key.
    #[must_use]
    pub fn map_key<K>(
        self,
        field: &'static str,
        table: &'s CodeTable<K>,
        get: impl FnOnce(&S) -> &str + 's,
        set: impl FnOnce(&mut T, K) + 's,
    ) -> Self
    where
        K: Clone + Ord + Debug,
    {
        self.rule(field, move |source, target, _| {
            let key = table.key(get(source))?;
            set(target, key);
            Ok(())
        })
    }

    /// Translate one optional nested view back to an entity key.
    #[must_use]
    pub fn reference<R, W>(
        self,
        field: &'static str,
        get: impl FnOnce(&S) -> Option<&W> + 's,
        set: impl FnOnce(&mut T, Option<Key<R>>) + 's,
    ) -> Self
    where
        R: Entity,
        W: 'static,
    {
        self.rule(field, move |source, target, ctx| {
            let key = get(source)
                .map(|view| ctx.entity_of::<R, W>(view))
                .transpose()?;
            set(target, key);
            Ok(())
        })
    }

    /// Translate a nested view list; element failures are reported as `field[i]`.
    #[must_use]
    pub fn collection<R, W>(
        self,
        field: &'static str,
        get: impl FnOnce(&S) -> &[W] + 's,
        set: impl FnOnce(&mut T, Vec<Key<R>>) + 's,
    ) -> Self
    where
        R: Entity,
        W: 'static,
    {
        self.rule(field, move |source, target, ctx| {
            let keys = ctx.entities_of::<R, W>(get(source))?;
            set(target, keys);
            Ok(())
        })
    }

    /// Translate a keyed view map; element failures are reported as `field[key]`.
    #[must_use]
    pub fn keyed<K, R, W>(
        self,
        field: &'static str,
        get: impl FnOnce(&S) -> &BTreeMap<K, W> + 's,
        set: impl FnOnce(&mut T, BTreeMap<K, Key<R>>) + 's,
    ) -> Self
    where
        K: Clone + Ord + Debug,
        R: Entity,
        W: 'static,
    {
        self.rule(field, move |source, target, ctx| {
            let entries = get(source)
                .iter()
                .map(|(key, view)| (key.clone(), view))
                .collect::<BTreeMap<_, _>>();
            let keys = translate_keyed(entries, |view| ctx.entity_of::<R, W>(view))?;
            set(target, keys);
            Ok(())
        })
    }
}

// Translate every entry; non-fatal failures are collected under `[key]`.
fn translate_keyed<K, A, B>(
    entries: BTreeMap<K, A>,
    mut translate: impl FnMut(A) -> Result<B, TranslateError>,
) -> Result<BTreeMap<K, B>, TranslateError>
where
    K: Ord + Debug,
{
    let mut out = BTreeMap::new();
    let mut issues = Issues::new();

    for (key, value) in entries {
        match translate(value) {
            Ok(translated) => {
                out.insert(key, translated);
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                let path = render_path(&[PathSegment::Key(format!("{key:?}"))]);
                issues.absorb(&path, err);
            }
        }
    }

    issues.into_result(out)
}

///
/// TESTS
///
