//! Property-based tests for the overlay lifecycle and annotation tools
//!
//! Uses proptest to drive arbitrary resize and load sequences through a
//! session backed by an in-memory viewport.

mod common;

use common::{create_test_pdf, NullRenderer, TestViewport};
use proptest::prelude::*;
use redact_core::{
    AnnotationObject, Color, EditorConfig, EditorSession, Interactive, RectangleOptions,
    SelectedFile, TextOptions, PDF_MEDIA_TYPE,
};

type Session = EditorSession<TestViewport, NullRenderer>;

fn loaded_session(viewport: &TestViewport) -> Session {
    let mut session = EditorSession::new(EditorConfig::default(), viewport.clone(), NullRenderer);
    load(&mut session, "doc.pdf");
    session
}

fn load(session: &mut Session, name: &str) {
    let ticket = session
        .select_file(&SelectedFile::new(name, PDF_MEDIA_TYPE))
        .unwrap();
    session.finish_load(ticket, create_test_pdf(1)).unwrap();
}

fn window_size() -> impl Strategy<Value = (u32, u32)> {
    (0u32..1200, 0u32..1200)
}

#[derive(Debug, Clone)]
enum LifecycleEvent {
    Load,
    Unload,
    Resize(u32, u32),
    AddRectangle,
}

fn lifecycle_event() -> impl Strategy<Value = LifecycleEvent> {
    prop_oneof![
        Just(LifecycleEvent::Load),
        Just(LifecycleEvent::Unload),
        window_size().prop_map(|(w, h)| LifecycleEvent::Resize(w, h)),
        Just(LifecycleEvent::AddRectangle),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn surface_tracks_viewport_after_every_resize(
        initial in window_size(),
        resizes in prop::collection::vec(window_size(), 1..12)
    ) {
        let viewport = TestViewport::new(initial.0, initial.1);
        let mut session = loaded_session(&viewport);

        let surface = session.surface().unwrap();
        prop_assert_eq!((surface.width(), surface.height()), initial);

        for (w, h) in resizes {
            viewport.resize_window(w, h);
            session.on_window_resize().unwrap();
            let surface = session.surface().unwrap();
            prop_assert_eq!(surface.width(), w);
            prop_assert_eq!(surface.height(), h);
        }
    }

    #[test]
    fn resize_never_moves_objects(
        resizes in prop::collection::vec(window_size(), 1..10),
        x in -500.0f32..2000.0,
        y in -500.0f32..2000.0
    ) {
        let viewport = TestViewport::new(800, 600);
        let mut session = loaded_session(&viewport);
        let rect = session
            .add_rectangle(RectangleOptions { x: Some(x), y: Some(y), ..Default::default() })
            .unwrap();

        for (w, h) in resizes {
            viewport.resize_window(w, h);
            session.on_window_resize().unwrap();
        }

        let bounds = session.surface().unwrap().object(rect.id).unwrap().bounds();
        prop_assert_eq!((bounds.x, bounds.y), (x, y));
    }

    #[test]
    fn never_more_than_one_live_surface(
        events in prop::collection::vec(lifecycle_event(), 1..40)
    ) {
        let viewport = TestViewport::new(640, 480);
        let mut session = EditorSession::new(EditorConfig::default(), viewport.clone(), NullRenderer);

        for event in events {
            match event {
                LifecycleEvent::Load => load(&mut session, "doc.pdf"),
                LifecycleEvent::Unload => session.unload(),
                LifecycleEvent::Resize(w, h) => {
                    viewport.resize_window(w, h);
                    session.on_window_resize().unwrap();
                }
                LifecycleEvent::AddRectangle => {
                    let _ = session.add_rectangle(RectangleOptions::default());
                }
            }
            prop_assert!(viewport.live_layers() <= 1);
            prop_assert_eq!(viewport.live_layers(), usize::from(session.surface().is_some()));
        }

        drop(session);
        prop_assert_eq!(viewport.live_layers(), 0);
        prop_assert!(viewport.state.borrow().max_live_layers <= 1);
    }

    #[test]
    fn overrides_replace_only_given_fields(
        x in prop::option::of(-100.0f32..1000.0),
        width in prop::option::of(1.0f32..500.0),
        selectable in prop::option::of(any::<bool>())
    ) {
        let viewport = TestViewport::new(800, 600);
        let mut session = loaded_session(&viewport);
        let rect = session
            .add_rectangle(RectangleOptions { x, width, selectable, ..Default::default() })
            .unwrap();

        prop_assert_eq!(rect.x, x.unwrap_or(100.0));
        prop_assert_eq!(rect.y, 100.0);
        prop_assert_eq!(rect.width, width.unwrap_or(150.0));
        prop_assert_eq!(rect.height, 50.0);
        prop_assert_eq!(rect.selectable, selectable.unwrap_or(true));
    }
}

#[test]
fn rectangle_then_text_yields_two_objects_in_order() {
    let viewport = TestViewport::new(800, 600);
    let mut session = loaded_session(&viewport);

    session.add_rectangle(RectangleOptions::default()).unwrap();
    session.add_text(None, TextOptions::default()).unwrap();

    let objects = session.surface().unwrap().objects();
    assert_eq!(objects.len(), 2);

    match &objects[0] {
        AnnotationObject::Rectangle(rect) => {
            assert_eq!((rect.x, rect.y, rect.width, rect.height), (100.0, 100.0, 150.0, 50.0));
            assert_eq!(rect.fill, Color::rgba(0, 0, 0, 0.5));
            assert!(rect.selectable);
        }
        other => panic!("expected rectangle first, got {:?}", other),
    }
    match &objects[1] {
        AnnotationObject::Text(label) => {
            assert_eq!((label.x, label.y), (150.0, 200.0));
            assert_eq!(label.font_size, 20.0);
            assert_eq!(label.fill, Color::BLUE);
            assert_eq!(label.text, "Sample Text");
            assert_eq!(label.width, 200.0);
        }
        other => panic!("expected text second, got {:?}", other),
    }
}

#[test]
fn loading_twice_never_leaves_two_surfaces() {
    let viewport = TestViewport::new(640, 480);
    let mut session = EditorSession::new(EditorConfig::default(), viewport.clone(), NullRenderer);
    load(&mut session, "a.pdf");
    load(&mut session, "b.pdf");

    assert_eq!(viewport.live_layers(), 1);
    assert_eq!(viewport.state.borrow().max_live_layers, 1);
}
