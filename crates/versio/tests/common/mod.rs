#![allow(dead_code)]

use serde::Serialize;
use std::{
    collections::BTreeMap,
    sync::{Arc, LazyLock},
};
use versio::{
    arena::{EntityArena, Key},
    model::NavigationIndex,
    translate::{
        CodeTable, TranslateContext, TranslateError, Translation, Translator, TranslatorRegistry,
    },
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_test_writer()
        .try_init();
}

///
/// Entities
///

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Lang {
    En,
    Fi,
}

versio::entity! {
    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct Statute {
        pub title: String,
        pub status: u32,
        pub chapters: Vec<Key<Chapter>> => relation,
        pub summaries: BTreeMap<Lang, Key<Summary>> => relation,
    }

    path: "statutes::Statute",
}

versio::entity! {
    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct Chapter {
        pub heading: String,
        pub statute: Option<Key<Statute>> => relation,
    }

    path: "statutes::Chapter",
}

versio::entity! {
    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct Summary {
        pub text: String,
    }

    path: "statutes::Summary",
}

versio::entity! {
    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct Folder {
        pub name: String,
        pub children: Vec<Key<Folder>> => relation,
    }

    path: "files::Folder",
}

pub fn index() -> Arc<NavigationIndex> {
    Arc::new(
        NavigationIndex::builder()
            .root::<Statute>()
            .root::<Folder>()
            .build()
            .expect("navigation index"),
    )
}

/// Statute with two chapters pointing back at it and one Finnish summary.
pub fn statute_graph(arena: &mut EntityArena) -> Key<Statute> {
    let first = arena.insert(chapter("General provisions")).expect("insert");
    let second = arena.insert(chapter("Permits")).expect("insert");
    let summary = arena
        .insert(Summary {
            text: "Rakentamislaki".to_string(),
        })
        .expect("insert");
    let statute = arena
        .insert(Statute {
            title: "Building Act".to_string(),
            status: 1,
            chapters: vec![first, second],
            summaries: BTreeMap::from([(Lang::Fi, summary)]),
        })
        .expect("insert");

    for key in [first, second] {
        arena.get_mut(key).expect("chapter").statute = Some(statute);
    }

    statute
}

pub fn chapter(heading: &str) -> Chapter {
    Chapter {
        heading: heading.to_string(),
        statute: None,
    }
}

///
/// Views
///

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ChapterView {
    pub id: Option<Key<Chapter>>,
    pub heading: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SummaryView {
    pub id: Option<Key<Summary>>,
    pub text: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StatuteView {
    pub id: Option<Key<Statute>>,
    pub title: String,
    pub status: String,
    pub chapters: Vec<ChapterView>,
    pub summaries: BTreeMap<Lang, SummaryView>,
}

pub static STATUSES: LazyLock<CodeTable<u32>> = LazyLock::new(|| {
    CodeTable::new("statute_status", [("draft", 0), ("in_force", 1), ("repealed", 2)])
        .expect("status table")
});

///
/// Translators
///

pub struct StatuteTranslator;

impl Translator for StatuteTranslator {
    type Entity = Statute;
    type View = StatuteView;

    fn to_view(
        &self,
        key: Key<Statute>,
        entity: &Statute,
        ctx: &mut TranslateContext<'_>,
    ) -> Result<StatuteView, TranslateError> {
        let view = StatuteView {
            id: Some(key),
            ..StatuteView::default()
        };
        Translation::to_view(entity, view)
            .field("title", |e: &Statute, v: &mut StatuteView| {
                v.title.clone_from(&e.title);
            })
            .map_code(
                "status",
                &STATUSES,
                |e: &Statute| e.status,
                |v: &mut StatuteView, code| v.status = code,
            )
            .collection(
                "chapters",
                |e: &Statute| e.chapters.clone(),
                |v: &mut StatuteView, chapters| v.chapters = chapters,
            )
            .keyed(
                "summaries",
                |e: &Statute| e.summaries.clone(),
                |v: &mut StatuteView, summaries| v.summaries = summaries,
            )
            .finish(ctx)
    }

    fn to_entity(
        &self,
        view: &StatuteView,
        ctx: &mut TranslateContext<'_>,
    ) -> Result<Key<Statute>, TranslateError> {
        let start = view
            .id
            .map(|id| ctx.load(id))
            .transpose()?
            .unwrap_or_default();

        let entity = Translation::to_entity(view, start)
            .try_field("title", |v: &StatuteView, e: &mut Statute| {
                if v.title.trim().is_empty() {
                    return Err(TranslateError::invalid("title must not be blank"));
                }
                e.title.clone_from(&v.title);
                Ok(())
            })
            .map_key(
                "status",
                &STATUSES,
                |v: &StatuteView| v.status.as_str(),
                |e: &mut Statute, status| e.status = status,
            )
            .collection(
                "chapters",
                |v: &StatuteView| v.chapters.as_slice(),
                |e: &mut Statute, chapters| e.chapters = chapters,
            )
            .keyed(
                "summaries",
                |v: &StatuteView| &v.summaries,
                |e: &mut Statute, summaries| e.summaries = summaries,
            )
            .finish(ctx)?;

        ctx.persist(view.id, entity)
    }
}

pub struct ChapterTranslator;

impl Translator for ChapterTranslator {
    type Entity = Chapter;
    type View = ChapterView;

    fn to_view(
        &self,
        key: Key<Chapter>,
        entity: &Chapter,
        ctx: &mut TranslateContext<'_>,
    ) -> Result<ChapterView, TranslateError> {
        let view = ChapterView {
            id: Some(key),
            ..ChapterView::default()
        };
        Translation::to_view(entity, view)
            .field("heading", |e: &Chapter, v: &mut ChapterView| {
                v.heading.clone_from(&e.heading);
            })
            .finish(ctx)
    }

    fn to_entity(
        &self,
        view: &ChapterView,
        ctx: &mut TranslateContext<'_>,
    ) -> Result<Key<Chapter>, TranslateError> {
        let start = view
            .id
            .map(|id| ctx.load(id))
            .transpose()?
            .unwrap_or_default();

        let entity = Translation::to_entity(view, start)
            .try_field("heading", |v: &ChapterView, e: &mut Chapter| {
                if v.heading.is_empty() {
                    return Err(TranslateError::invalid("heading must not be empty"));
                }
                e.heading.clone_from(&v.heading);
                Ok(())
            })
            .finish(ctx)?;

        ctx.persist(view.id, entity)
    }
}

pub struct SummaryTranslator;

impl Translator for SummaryTranslator {
    type Entity = Summary;
    type View = SummaryView;

    fn to_view(
        &self,
        key: Key<Summary>,
        entity: &Summary,
        _ctx: &mut TranslateContext<'_>,
    ) -> Result<SummaryView, TranslateError> {
        Ok(SummaryView {
            id: Some(key),
            text: entity.text.clone(),
        })
    }

    fn to_entity(
        &self,
        view: &SummaryView,
        ctx: &mut TranslateContext<'_>,
    ) -> Result<Key<Summary>, TranslateError> {
        ctx.persist(
            view.id,
            Summary {
                text: view.text.clone(),
            },
        )
    }
}

/// Read-only headline projection.
pub struct StatuteHeadline;

impl Translator for StatuteHeadline {
    type Entity = Statute;
    type View = String;

    fn to_view(
        &self,
        _key: Key<Statute>,
        entity: &Statute,
        _ctx: &mut TranslateContext<'_>,
    ) -> Result<String, TranslateError> {
        Ok(entity.title.to_uppercase())
    }
}

pub fn registry() -> Arc<TranslatorRegistry> {
    let registry = TranslatorRegistry::new()
        .with(StatuteTranslator)
        .and_then(|registry| registry.with(ChapterTranslator))
        .and_then(|registry| registry.with(SummaryTranslator))
        .and_then(|registry| registry.with(StatuteHeadline))
        .expect("translator registry");

    Arc::new(registry)
}
