use crate::{
    arena::{EntityArena, Key, Slot},
    config::TranslateConfig,
    obs::sink::{self, MetricsEvent},
    trace::CloneTraceCache,
    traits::Entity,
    translate::{Direction, Issues, PathSegment, TranslateError, TranslatorRegistry, render_path},
};

///
/// VersionMode
///
/// How `persist` treats an entity that already has a stored original.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum VersionMode {
    /// Overwrite the original in place.
    #[default]
    Update,

    /// Store a new instance and record it as the original's clone.
    NewVersion,
}

// Rollback state for one top-level write.
struct Journal {
    arena_len: usize,
    checkpoint: u64,
    undo: Vec<Undo>,
}

enum Undo {
    Restore(Box<dyn FnOnce(&mut EntityArena)>),
    Unmark(Slot),
}

impl Journal {
    fn roll_back(self, arena: &mut EntityArena, cache: &mut CloneTraceCache) {
        for undo in self.undo.into_iter().rev() {
            match undo {
                Undo::Restore(restore) => restore(arena),
                Undo::Unmark(clone) => {
                    cache.unmark_processed(clone);
                }
            }
        }
        let discarded = arena.len().saturating_sub(self.arena_len);
        arena.truncate(self.arena_len);
        let records = cache.roll_back(self.checkpoint);

        tracing::debug!(discarded, records, "write rolled back");
    }
}

///
/// TranslateContext
///
/// Per-operation state threaded through every translator call: the arena,
/// the operation's clone trace cache, the translator registry, and the
/// current nesting depth.
///

pub struct TranslateContext<'op> {
    arena: &'op mut EntityArena,
    cache: &'op mut CloneTraceCache,
    registry: &'op TranslatorRegistry,
    config: &'op TranslateConfig,
    mode: VersionMode,
    depth: u32,
    journal: Option<Journal>,
}

impl<'op> TranslateContext<'op> {
    pub fn new(
        arena: &'op mut EntityArena,
        cache: &'op mut CloneTraceCache,
        registry: &'op TranslatorRegistry,
        config: &'op TranslateConfig,
        mode: VersionMode,
    ) -> Self {
        Self {
            arena,
            cache,
            registry,
            config,
            mode,
            depth: 0,
            journal: None,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> VersionMode {
        self.mode
    }

    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    #[must_use]
    pub fn arena(&self) -> &EntityArena {
        self.arena
    }

    #[must_use]
    pub fn cache(&self) -> &CloneTraceCache {
        self.cache
    }

    ///
    /// READS
    ///

    /// Copy of the stored instance at `key`.
    pub fn load<E: Entity>(&self, key: Key<E>) -> Result<E, TranslateError> {
        Ok(self.arena.get(key)?.clone())
    }

    /// Translate the entity at `key` with the registered `E -> V` translator.
    pub fn view_of<E, V>(&mut self, key: Key<E>) -> Result<V, TranslateError>
    where
        E: Entity,
        V: 'static,
    {
        let translator = self.registry.resolve::<E, V>()?;
        let entity = self.load(key)?;

        let result = self.nested(Direction::ToView, E::ENTITY_NAME, |ctx| {
            translator.to_view(key, &entity, ctx)
        })?;
        self.mark_processed(key);

        Ok(result)
    }

    /// Translate a list of entities. Non-fatal failures are collected per
    /// index and reported together once every element has been tried.
    pub fn views_of<E, V>(&mut self, keys: &[Key<E>]) -> Result<Vec<V>, TranslateError>
    where
        E: Entity,
        V: 'static,
    {
        let mut views = Vec::with_capacity(keys.len());
        let mut issues = Issues::new();

        for (i, &key) in keys.iter().enumerate() {
            match self.view_of(key) {
                Ok(view) => views.push(view),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => issues.absorb(&render_path(&[PathSegment::Index(i)]), err),
            }
        }

        issues.into_result(views)
    }

    ///
    /// WRITES
    ///

    /// Translate a view back to an entity with the registered `E <- V`
    /// translator. The translator stores the result through `persist`.
    ///
    /// A top-level write is all or nothing: on error every instance it
    /// stored, overwrote, or recorded is undone. A successful `NewVersion`
    /// write rewires the clones it created onto each other.
    pub fn entity_of<E, V>(&mut self, view: &V) -> Result<Key<E>, TranslateError>
    where
        E: Entity,
        V: 'static,
    {
        let translator = self.registry.resolve::<E, V>()?;

        self.atomic(|ctx| {
            ctx.nested(Direction::ToEntity, E::ENTITY_NAME, |ctx| {
                translator.to_entity(view, ctx)
            })
        })
    }

    pub fn entities_of<E, V>(&mut self, views: &[V]) -> Result<Vec<Key<E>>, TranslateError>
    where
        E: Entity,
        V: 'static,
    {
        self.atomic(|ctx| {
            let mut keys = Vec::with_capacity(views.len());
            let mut issues = Issues::new();

            for (i, view) in views.iter().enumerate() {
                match ctx.entity_of(view) {
                    Ok(key) => keys.push(key),
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) => issues.absorb(&render_path(&[PathSegment::Index(i)]), err),
                }
            }

            issues.into_result(keys)
        })
    }

    /// Store a translated entity.
    ///
    /// - no original: insert a new instance
    /// - `Update`: overwrite the original in place
    /// - `NewVersion`: insert a new instance and record `(original, new)` in
    ///   the clone trace cache before returning
    /// - `NewVersion` of a clone made in this operation: overwrite the clone
    ///   in place, it already is the new version
    pub fn persist<E: Entity>(
        &mut self,
        original: Option<Key<E>>,
        entity: E,
    ) -> Result<Key<E>, TranslateError> {
        let key = match (original, self.mode) {
            (None, _) => self.arena.insert(entity)?,
            (Some(original), VersionMode::NewVersion)
                if self.cache.original_of(original).is_none() =>
            {
                self.arena.get(original)?;
                self.cache.check_original(E::ENTITY_NAME, original.slot())?;

                let clone = self.arena.insert(entity)?;
                self.cache.record_clone(original, clone)?;
                clone
            }
            (Some(original), _) => {
                let previous = self.arena.replace(original, entity)?;
                if let Some(journal) = self.journal.as_mut() {
                    journal.undo.push(Undo::Restore(Box::new(move |arena: &mut EntityArena| {
                        // the slot predates the write, so it is still there
                        let _ = arena.replace(original, previous);
                    })));
                }
                original
            }
        };
        self.mark_processed(key);

        Ok(key)
    }

    /// Flag `key` as visited when it is a traced clone. Disabled by
    /// `translate.mark_processed = false`.
    pub fn mark_processed<E: Entity>(&mut self, key: Key<E>) -> bool {
        if !self.config.mark_processed {
            return false;
        }

        let newly = self.cache.is_processed(key) == Some(false);
        let marked = self.cache.mark_processed(key);
        if newly && let Some(journal) = self.journal.as_mut() {
            journal.undo.push(Undo::Unmark(key.slot()));
        }

        marked
    }

    ///
    /// ATOMICITY
    ///

    // Run `f` as one write. Only the outermost call journals; nested writes
    // join it.
    fn atomic<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, TranslateError>,
    ) -> Result<T, TranslateError> {
        if self.journal.is_some() {
            return f(self);
        }

        let checkpoint = self.cache.checkpoint();
        self.journal = Some(Journal {
            arena_len: self.arena.len(),
            checkpoint,
            undo: Vec::new(),
        });

        let result = f(self).and_then(|value| {
            if self.mode == VersionMode::NewVersion && self.cache.checkpoint() > checkpoint {
                self.cache.rewire_since(&mut *self.arena, checkpoint)?;
            }
            Ok(value)
        });

        if let Some(journal) = self.journal.take()
            && result.is_err()
        {
            journal.roll_back(self.arena, self.cache);
        }

        result
    }

    ///
    /// NESTING
    ///

    fn nested<T>(
        &mut self,
        direction: Direction,
        entity: &'static str,
        f: impl FnOnce(&mut Self) -> Result<T, TranslateError>,
    ) -> Result<T, TranslateError> {
        if self.depth >= self.config.max_depth {
            let err = TranslateError::DepthExceeded {
                max_depth: self.config.max_depth,
            };
            record_outcome(direction, entity, Err(&err));

            return Err(err);
        }

        self.depth += 1;
        tracing::debug!(%direction, entity, depth = self.depth, "translate");
        let result = f(self);
        self.depth -= 1;

        record_outcome(direction, entity, result.as_ref().map(|_| ()));

        result
    }
}

fn record_outcome(direction: Direction, entity: &'static str, outcome: Result<(), &TranslateError>) {
    match outcome {
        Ok(()) => sink::record(MetricsEvent::Translate { direction, entity }),
        Err(err) => {
            if err.is_fatal() {
                tracing::warn!(%direction, entity, error = %err, "translation aborted");
            }
            sink::record(MetricsEvent::TranslateFailed {
                direction,
                entity,
                class: err.class(),
            });
        }
    }
}

///
/// TESTS
///
