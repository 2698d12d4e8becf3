mod common;

use common::{Folder, Statute, Summary, chapter, index, init_tracing, statute_graph};
use std::collections::BTreeSet;
use versio::{
    arena::{EntityArena, Key, Slot},
    trace::{CloneTraceCache, TraceError},
    traits::Entity,
};

fn clone_of<E: Entity + Clone>(
    arena: &mut EntityArena,
    cache: &mut CloneTraceCache,
    original: Key<E>,
) -> Key<E> {
    let copy = arena.get(original).expect("original").clone();
    let clone = arena.insert(copy).expect("insert clone");
    cache.record_clone(original, clone).expect("record clone");

    clone
}

fn slots(found: Vec<Slot>) -> BTreeSet<Slot> {
    found.into_iter().collect()
}

///
/// StatuteClones
///
/// A statute graph where every instance has a traced clone.
///

struct StatuteClones {
    arena: EntityArena,
    cache: CloneTraceCache,
    statute: Key<Statute>,
    chapters: Vec<Key<common::Chapter>>,
    summary: Key<Summary>,
}

impl StatuteClones {
    fn new(rewired: bool) -> Self {
        let mut arena = EntityArena::new();
        let mut cache = CloneTraceCache::new(index());
        let original = statute_graph(&mut arena);
        let source = arena.get(original).expect("statute").clone();

        let chapters = source
            .chapters
            .iter()
            .map(|&chapter| clone_of(&mut arena, &mut cache, chapter))
            .collect::<Vec<_>>();
        let summary = source
            .summaries
            .values()
            .map(|&summary| clone_of(&mut arena, &mut cache, summary))
            .next()
            .expect("summary");
        let statute = clone_of(&mut arena, &mut cache, original);

        if rewired {
            let cloned = arena.get_mut(statute).expect("statute clone");
            cloned.chapters.clone_from(&chapters);
            for value in cloned.summaries.values_mut() {
                *value = summary;
            }
            for &chapter in &chapters {
                arena.get_mut(chapter).expect("chapter clone").statute = Some(statute);
            }
        }

        Self {
            arena,
            cache,
            statute,
            chapters,
            summary,
        }
    }

    fn cascade(&self, roots: &[Slot]) -> Result<Vec<Slot>, TraceError> {
        self.cache.cascade_from(&self.arena, roots)
    }
}

#[test]
fn mutual_references_terminate() {
    init_tracing();

    let graph = StatuteClones::new(true);

    let from_statute = graph.cascade(&[graph.statute.slot()]).expect("cascade");
    assert_eq!(
        slots(from_statute),
        BTreeSet::from([
            graph.chapters[0].slot(),
            graph.chapters[1].slot(),
            graph.summary.slot(),
        ])
    );

    let from_chapter = graph.cascade(&[graph.chapters[0].slot()]).expect("cascade");
    assert_eq!(
        slots(from_chapter),
        BTreeSet::from([
            graph.statute.slot(),
            graph.chapters[1].slot(),
            graph.summary.slot(),
        ])
    );
}

#[test]
fn referring_clones_are_found_before_rewiring() {
    init_tracing();

    let graph = StatuteClones::new(false);

    // the summary clone is only reachable backward, through the statute clone
    // that still holds the original summary
    let found = graph.cascade(&[graph.summary.slot()]).expect("cascade");

    assert_eq!(found[0], graph.statute.slot());
    assert_eq!(
        slots(found),
        BTreeSet::from([
            graph.statute.slot(),
            graph.chapters[0].slot(),
            graph.chapters[1].slot(),
        ])
    );
}

#[test]
fn processed_clones_are_left_out() {
    init_tracing();

    let mut graph = StatuteClones::new(true);
    assert!(graph.cache.mark_processed(graph.chapters[1]));
    assert!(graph.cache.mark_processed(graph.chapters[1]));
    assert_eq!(graph.cache.is_processed(graph.chapters[1]), Some(true));

    let found = graph.cascade(&[graph.statute.slot()]).expect("cascade");

    assert_eq!(
        slots(found),
        BTreeSet::from([graph.chapters[0].slot(), graph.summary.slot()])
    );
}

#[test]
fn cascade_is_repeatable() {
    init_tracing();

    let graph = StatuteClones::new(true);
    let roots = [graph.statute.slot(), graph.statute.slot()];

    let first = graph.cascade(&roots).expect("cascade");
    let second = graph.cascade(&roots).expect("cascade");

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    assert_eq!(graph.cache.pending().len(), 4);
}

#[test]
fn folder_children_follow_the_root_clone() {
    init_tracing();

    let mut arena = EntityArena::new();
    let mut cache = CloneTraceCache::new(index());
    let folder = |name: &str, children: Vec<Key<Folder>>| Folder {
        name: name.to_string(),
        children,
    };

    let c1 = arena.insert(folder("c1", vec![])).expect("insert");
    let c2 = arena.insert(folder("c2", vec![])).expect("insert");
    let root = arena.insert(folder("root", vec![c1, c2])).expect("insert");

    let root_clone = clone_of(&mut arena, &mut cache, root);
    let c1_clone = clone_of(&mut arena, &mut cache, c1);
    let c2_clone = clone_of(&mut arena, &mut cache, c2);
    arena.get_mut(root_clone).expect("root clone").children = vec![c1_clone, c2_clone];

    let found = cache
        .cascade_from(&arena, &[root_clone.slot()])
        .expect("cascade");
    assert_eq!(found, vec![c1_clone.slot(), c2_clone.slot()]);

    // unrelated folders are never pulled in
    let stray = arena.insert(folder("stray", vec![])).expect("insert");
    let stray_clone = clone_of(&mut arena, &mut cache, stray);
    let found = cache
        .cascade_from(&arena, &[root_clone.slot()])
        .expect("cascade");
    assert!(!found.contains(&stray_clone.slot()));
}

#[test]
fn entities_outside_the_arena_are_rejected() {
    init_tracing();

    let graph = StatuteClones::new(true);
    let missing = Slot::new(9_999);

    let err = graph.cascade(&[missing]).expect_err("no such slot");
    assert_eq!(err, TraceError::UnknownEntity(missing));
}

#[test]
fn chapter_without_statute_has_nothing_to_cascade() {
    init_tracing();

    let mut arena = EntityArena::new();
    let mut cache = CloneTraceCache::new(index());
    let loose = arena.insert(chapter("Appendix")).expect("insert");
    let clone = clone_of(&mut arena, &mut cache, loose);

    let found = cache.cascade_from(&arena, &[clone.slot()]).expect("cascade");
    assert!(found.is_empty());
}
