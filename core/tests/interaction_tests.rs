//! Integration Tests for the Interaction Engine
//!
//! These tests drive the full stack — session, router, fabric, widget
//! state machines, and drawing — through the headless backend halves.
//!
//! # Test Coverage
//!
//! 1. **Click flow**: scripted mouse input reaches the right widget,
//!    cycles its machine, and redraws its sigil.
//! 2. **Focus flow**: keyboard events follow the latest focus request;
//!    the previous holder is revoked.
//! 3. **Layout flow**: window splitting, borders, and junction glyphs
//!    land on the screen grid.
//! 4. **Lifecycle**: unmanaged-object errors, fatal backend conditions,
//!    and clean shutdown.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::timeout;

use weft_core::backend::headless::{Grid, HeadlessScreen, ScriptedInput};
use weft_core::{
    Attribute, Button, Event, EventKind, FiniteStateMachine, Key, MousePolicy, Panel, RawEvent,
    RetCode, Session, SessionConfig, SessionError, Sigil, StateFn, StateId, Widget, WidgetId,
};

const TICK: Duration = Duration::from_millis(500);

fn sigil(glyph: char) -> Sigil {
    Sigil::new(glyph, Attribute::WHITE, Attribute::BLACK)
}

fn region(x: i32, y: i32, w: i32, h: i32) -> weft_core::Region {
    weft_core::Region::new(x, y, w, h)
}

struct Rig {
    session: Session<HeadlessScreen>,
    grid: Arc<Mutex<Grid>>,
    feed: mpsc::Sender<RawEvent>,
}

fn rig(width: i32, height: i32) -> Rig {
    rig_with_config(width, height, SessionConfig::default())
}

fn rig_with_config(width: i32, height: i32, config: SessionConfig) -> Rig {
    // RUST_LOG=trace surfaces router/fabric diagnostics on failures.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let (screen, grid) = HeadlessScreen::new(width, height);
    let (input, feed) = ScriptedInput::new();
    let session = Session::with_config(screen, input, config);
    Rig {
        session,
        grid,
        feed,
    }
}

async fn next_event(session: &mut Session<HeadlessScreen>) -> Event {
    timeout(TICK, session.next_event())
        .await
        .expect("timed out waiting for an event")
        .expect("event stream ended")
}

/// The `(widget, state)` tag the runtime attaches to bubbled output.
fn tag(ev: &Event) -> (WidgetId, i32) {
    let ints = ev.args.ints().expect("bubbled event carries an id tag");
    (
        WidgetId::from_i32(ints[0]).expect("valid widget id"),
        ints[1],
    )
}

/// A single-state machine that reports every key as an `Ok` output
/// carrying the key's debug name, and ignores everything else.
fn key_reporter() -> FiniteStateMachine {
    let mut fsm = FiniteStateMachine::empty();
    let s = fsm.add_state(
        StateFn::on_input(|raw| match raw {
            RawEvent::Key(k) => Event::output(RetCode::Ok).with_strs([format!("{:?}", k.key)]),
            _ => Event::output(RetCode::Nop),
        }),
        sigil('k'),
    );
    fsm.add_transition(s, RetCode::Ok, s);
    fsm.add_transition(s, RetCode::Nop, s);
    fsm.set_state(s);
    fsm
}

// ============================================================================
// Click flow
// ============================================================================

#[tokio::test]
async fn test_click_activates_then_cycles_button() {
    let mut rig = rig(80, 24);
    let root = rig.session.root();

    let sigils = [sigil('A'), sigil('B'), sigil('C')];
    let button = rig.session.insert(Button::new(&region(2, 2, 4, 1), &sigils));
    rig.session.manage(root, button).await.unwrap();

    // The freshly managed button shows its first face.
    assert_eq!(rig.grid.lock().glyph(3, 2), 'A');

    // First click: entry -> first active state. Same face.
    rig.feed.send(RawEvent::left_click(3, 2)).await.unwrap();
    let ev = next_event(&mut rig.session).await;
    assert_eq!(ev.kind, EventKind::Output);
    assert_eq!(ev.rc(), RetCode::Ok);
    assert_eq!(tag(&ev).0, button);
    assert_eq!(rig.grid.lock().glyph(3, 2), 'A');

    // Second click advances to the next face.
    rig.feed.send(RawEvent::left_click(3, 2)).await.unwrap();
    let ev = next_event(&mut rig.session).await;
    assert_eq!(tag(&ev).0, button);
    assert_eq!(rig.grid.lock().glyph(3, 2), 'B');

    // Two more clicks wrap back around to the first face.
    rig.feed.send(RawEvent::left_click(3, 2)).await.unwrap();
    next_event(&mut rig.session).await;
    rig.feed.send(RawEvent::left_click(3, 2)).await.unwrap();
    next_event(&mut rig.session).await;
    assert_eq!(rig.grid.lock().glyph(3, 2), 'A');
}

#[tokio::test]
async fn test_click_outside_region_changes_nothing() {
    let mut rig = rig(80, 24);
    let root = rig.session.root();

    let button = rig
        .session
        .insert(Button::new(&region(2, 2, 4, 1), &[sigil('A'), sigil('B')]));
    rig.session.manage(root, button).await.unwrap();

    // A miss, then a hit: the first event to arrive is from the hit.
    rig.feed.send(RawEvent::left_click(40, 20)).await.unwrap();
    rig.feed.send(RawEvent::left_click(2, 2)).await.unwrap();

    let ev = next_event(&mut rig.session).await;
    assert_eq!(tag(&ev).0, button);
    assert_eq!(
        rig.session.widget_state(button).unwrap(),
        StateId(2),
        "one transition, from the single hit"
    );
}

#[tokio::test]
async fn test_click_in_nested_container_translates_coordinates() {
    let mut rig = rig(80, 24);
    let root = rig.session.root();

    let panel = rig
        .session
        .insert(Panel::new(&region(10, 5, 30, 10), Attribute::WHITE, Attribute::BLACK));
    rig.session.manage(root, panel).await.unwrap();

    let button = rig
        .session
        .insert(Button::new(&region(3, 2, 5, 1), &[sigil('X'), sigil('Y')]));
    rig.session.manage(panel, button).await.unwrap();

    // The button's face is painted at the absolute position.
    assert_eq!(rig.grid.lock().glyph(13, 7), 'X');

    // Click it at its absolute screen cell; two clicks cycle the face.
    rig.feed.send(RawEvent::left_click(14, 7)).await.unwrap();
    next_event(&mut rig.session).await;
    rig.feed.send(RawEvent::left_click(14, 7)).await.unwrap();
    next_event(&mut rig.session).await;
    assert_eq!(rig.grid.lock().glyph(13, 7), 'Y');
}

#[tokio::test]
async fn test_overlapping_buttons_topmost_wins() {
    let mut rig = rig(80, 24);
    let root = rig.session.root();

    let lower = rig
        .session
        .insert(Button::new(&region(0, 0, 10, 1), &[sigil('a'), sigil('b')]));
    rig.session.manage(root, lower).await.unwrap();
    let upper = rig
        .session
        .insert(Button::new(&region(5, 0, 10, 1), &[sigil('c'), sigil('d')]));
    rig.session.manage(root, upper).await.unwrap();

    // A click in the overlap goes exclusively to the widget on top.
    rig.feed.send(RawEvent::left_click(6, 0)).await.unwrap();
    let ev = next_event(&mut rig.session).await;
    assert_eq!(tag(&ev).0, upper);

    // The lower button is still in its entry state: its first event
    // after a direct hit is the entry transition, proving the overlap
    // click never reached it.
    rig.feed.send(RawEvent::left_click(1, 0)).await.unwrap();
    let ev = next_event(&mut rig.session).await;
    assert_eq!(tag(&ev), (lower, 2));
}

#[tokio::test]
async fn test_overlapping_buttons_broadcast_policy() {
    let config = SessionConfig {
        mouse_policy: MousePolicy::Broadcast,
        ..SessionConfig::default()
    };
    let mut rig = rig_with_config(80, 24, config);
    let root = rig.session.root();

    let lower = rig
        .session
        .insert(Button::new(&region(0, 0, 10, 1), &[sigil('a'), sigil('b')]));
    rig.session.manage(root, lower).await.unwrap();
    let upper = rig
        .session
        .insert(Button::new(&region(5, 0, 10, 1), &[sigil('c'), sigil('d')]));
    rig.session.manage(root, upper).await.unwrap();

    // Both widgets hear about the overlap click; sibling order is
    // unspecified.
    rig.feed.send(RawEvent::left_click(6, 0)).await.unwrap();
    let first = tag(&next_event(&mut rig.session).await).0;
    let second = tag(&next_event(&mut rig.session).await).0;
    let mut got = [first, second];
    got.sort_by_key(|id| id.as_i32());
    let mut want = [lower, upper];
    want.sort_by_key(|id| id.as_i32());
    assert_eq!(got, want);
}

// ============================================================================
// Focus flow
// ============================================================================

#[tokio::test]
async fn test_keys_follow_focus_and_revocation() {
    let mut rig = rig(80, 24);
    let root = rig.session.root();

    let first = rig
        .session
        .insert(Widget::new(&region(0, 0, 1, 1), key_reporter()).accepts_focus());
    rig.session.manage(root, first).await.unwrap();

    rig.feed.send(RawEvent::key(Key::Char('x'))).await.unwrap();
    let ev = next_event(&mut rig.session).await;
    assert_eq!(tag(&ev).0, first);
    assert_eq!(ev.outcome.payload.strs().unwrap()[0], "Char('x')");

    // A second widget takes focus; the first holder is revoked.
    let second = rig
        .session
        .insert(Widget::new(&region(1, 0, 1, 1), key_reporter()));
    rig.session.manage(root, second).await.unwrap();
    rig.session.request_focus(second).await.unwrap();

    rig.feed.send(RawEvent::key(Key::Enter)).await.unwrap();
    let ev = next_event(&mut rig.session).await;
    assert_eq!(tag(&ev).0, second);
    assert_eq!(ev.outcome.payload.strs().unwrap()[0], "Enter");
}

#[tokio::test]
async fn test_focus_request_rejected_for_containers() {
    let mut rig = rig(80, 24);
    let root = rig.session.root();
    assert!(matches!(
        rig.session.request_focus(root).await,
        Err(SessionError::NotAWidget)
    ));
}

// ============================================================================
// Layout flow
// ============================================================================

#[tokio::test]
async fn test_spec_scenario_through_session() {
    let mut rig = rig(80, 24);
    let root = rig.session.root();
    let edges = rig.session.edges(root).unwrap();

    // Horizontal center line: two 80x12 regions.
    let mid = rig.session.split(root, &edges.left, &edges.right, 12).unwrap();
    {
        let regions = rig.session.regions(root).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!((regions[0].w, regions[0].h), (80, 12));
        assert_eq!((regions[1].w, regions[1].h), (80, 12));
        assert!(!regions[0].bottommost);
        assert!(regions[1].bottommost);
    }

    // Vertical split confined to the top half: three regions total.
    rig.session.split(root, &edges.top, &mid, 40).unwrap();
    let regions = rig.session.regions(root).unwrap();
    assert_eq!(regions.len(), 3);
    assert_eq!(
        (regions[0].x, regions[0].y, regions[0].w, regions[0].h),
        (0, 0, 40, 12)
    );
    assert_eq!(
        (regions[1].x, regions[1].y, regions[1].w, regions[1].h),
        (40, 0, 40, 12)
    );
    assert_eq!(
        (regions[2].x, regions[2].y, regions[2].w, regions[2].h),
        (0, 12, 80, 12)
    );
}

#[tokio::test]
async fn test_border_glyphs_on_screen() {
    let mut rig = rig(80, 24);
    let root = rig.session.root();
    let edges = rig.session.edges(root).unwrap();

    rig.session.split(root, &edges.left, &edges.right, 12).unwrap();
    rig.session.add_border(root).unwrap();
    rig.session.refresh(root).unwrap();

    let grid = rig.grid.lock();
    // Window corners.
    assert_eq!(grid.glyph(0, 0), '\u{250C}');
    assert_eq!(grid.glyph(79, 0), '\u{2510}');
    assert_eq!(grid.glyph(0, 23), '\u{2514}');
    assert_eq!(grid.glyph(79, 23), '\u{2518}');
    // The partition line tees into the frame.
    assert_eq!(grid.glyph(0, 12), '\u{251C}');
    assert_eq!(grid.glyph(79, 12), '\u{2524}');
    // Edge runs.
    assert_eq!(grid.glyph(40, 0), '\u{2500}');
    assert_eq!(grid.glyph(40, 12), '\u{2500}');
    assert_eq!(grid.glyph(0, 6), '\u{2502}');
    assert_eq!(grid.glyph(79, 18), '\u{2502}');
}

#[tokio::test]
async fn test_border_reserves_region_space() {
    let mut rig = rig(80, 24);
    let root = rig.session.root();
    let edges = rig.session.edges(root).unwrap();

    rig.session.split(root, &edges.left, &edges.right, 12).unwrap();
    rig.session.add_border(root).unwrap();

    let regions = rig.session.regions(root).unwrap();
    assert_eq!(
        (regions[0].x, regions[0].y, regions[0].w, regions[0].h),
        (1, 1, 78, 11)
    );
    assert_eq!(
        (regions[1].x, regions[1].y, regions[1].w, regions[1].h),
        (1, 13, 78, 10)
    );

    assert!(matches!(
        rig.session.add_border(root),
        Err(SessionError::Layout(_))
    ));
}

#[tokio::test]
async fn test_later_children_paint_over_earlier() {
    let mut rig = rig(80, 24);
    let root = rig.session.root();

    let under = rig
        .session
        .insert(Widget::new(&region(0, 0, 4, 1), FiniteStateMachine::round_robin(&[sigil('X')])));
    rig.session.manage(root, under).await.unwrap();
    let over = rig
        .session
        .insert(Widget::new(&region(2, 0, 4, 1), FiniteStateMachine::round_robin(&[sigil('O')])));
    rig.session.manage(root, over).await.unwrap();

    rig.session.refresh(root).unwrap();
    let grid = rig.grid.lock();
    assert_eq!(grid.glyph(0, 0), 'X');
    assert_eq!(grid.glyph(1, 0), 'X');
    assert_eq!(grid.glyph(2, 0), 'O');
    assert_eq!(grid.glyph(5, 0), 'O');
}

#[tokio::test]
async fn test_print_translates_through_nested_frames() {
    let mut rig = rig(80, 24);
    let root = rig.session.root();

    let panel = rig
        .session
        .insert(Panel::new(&region(10, 5, 30, 10), Attribute::WHITE, Attribute::BLACK));
    rig.session.manage(root, panel).await.unwrap();

    rig.session
        .print(panel, 1, 1, Attribute::GREEN, Attribute::BLACK, "hi")
        .unwrap();
    let grid = rig.grid.lock();
    assert_eq!(grid.glyph(11, 6), 'h');
    assert_eq!(grid.glyph(12, 6), 'i');
}

// ============================================================================
// Lifecycle and error reporting
// ============================================================================

#[tokio::test]
async fn test_unmanaged_object_operations_fail() {
    let mut rig = rig(80, 24);

    let detached = rig
        .session
        .insert(Button::new(&region(0, 0, 2, 1), &[sigil('A')]));

    assert!(matches!(
        rig.session
            .set_cell(detached, 0, 0, '!', Attribute::WHITE, Attribute::BLACK),
        Err(SessionError::Unmanaged)
    ));
    assert!(matches!(
        rig.session.register_clickable(detached, &region(0, 0, 2, 1)).await,
        Err(SessionError::Unmanaged)
    ));
    assert!(matches!(
        rig.session.dispatch(detached, Event::new(EventKind::Restart)).await,
        Err(SessionError::Unmanaged)
    ));
}

#[tokio::test]
async fn test_manage_rejects_remanage_and_leaf_containers() {
    let mut rig = rig(80, 24);
    let root = rig.session.root();

    let button = rig
        .session
        .insert(Button::new(&region(0, 0, 2, 1), &[sigil('A')]));
    rig.session.manage(root, button).await.unwrap();
    assert!(matches!(
        rig.session.manage(root, button).await,
        Err(SessionError::AlreadyManaged)
    ));

    let other = rig
        .session
        .insert(Button::new(&region(4, 0, 2, 1), &[sigil('B')]));
    assert!(matches!(
        rig.session.manage(button, other).await,
        Err(SessionError::NotAContainer)
    ));
}

#[tokio::test]
async fn test_cell_write_out_of_bounds() {
    let mut rig = rig(80, 24);
    let root = rig.session.root();

    let panel = rig
        .session
        .insert(Panel::new(&region(0, 0, 5, 3), Attribute::WHITE, Attribute::BLACK));
    rig.session.manage(root, panel).await.unwrap();

    assert!(matches!(
        rig.session
            .set_cell(panel, 5, 0, '!', Attribute::WHITE, Attribute::BLACK),
        Err(SessionError::OutOfBounds { x: 5, y: 0, w: 5, h: 3 })
    ));
}

#[tokio::test]
async fn test_transition_error_surfaces_and_preserves_state() {
    let mut rig = rig(80, 24);
    let root = rig.session.root();

    // A machine whose only state answers Ok but defines no transitions:
    // every input trips a reported table error.
    let mut fsm = FiniteStateMachine::empty();
    let s = fsm.add_state(
        StateFn::on_input(|_| Event::output(RetCode::Ok)),
        sigil('!'),
    );
    fsm.set_state(s);

    let widget = rig
        .session
        .insert(Widget::new(&region(0, 0, 1, 1), fsm).clickable());
    rig.session.manage(root, widget).await.unwrap();

    rig.feed.send(RawEvent::left_click(0, 0)).await.unwrap();
    let ev = next_event(&mut rig.session).await;
    assert_eq!(ev.kind, EventKind::Error);
    assert_eq!(ev.rc(), RetCode::Fail);
    assert!(ev.outcome.payload.strs().unwrap()[0].contains("no transition"));

    // The machine is still in its original state.
    assert_eq!(rig.session.widget_state(widget).unwrap(), s);
}

#[tokio::test]
async fn test_logic_state_fn_receives_dispatched_events() {
    let mut rig = rig(80, 24);
    let root = rig.session.root();

    // An indicator: it reacts to toolkit events rather than raw input.
    let mut fsm = FiniteStateMachine::empty();
    let s = fsm.add_state(
        StateFn::on_event(|ev| match ev.kind {
            EventKind::Restart => Event::output(RetCode::Ok).with_strs(["reset"]),
            _ => Event::output(RetCode::Nop),
        }),
        sigil('i'),
    );
    fsm.add_transition(s, RetCode::Ok, s);
    fsm.add_transition(s, RetCode::Nop, s);
    fsm.set_state(s);

    let indicator = rig.session.insert(Widget::new(&region(0, 0, 1, 1), fsm));
    rig.session.manage(root, indicator).await.unwrap();

    rig.session
        .dispatch(indicator, Event::new(EventKind::Restart))
        .await
        .unwrap();
    let ev = next_event(&mut rig.session).await;
    assert_eq!(tag(&ev).0, indicator);
    assert_eq!(ev.outcome.payload.strs().unwrap()[0], "reset");
}

#[tokio::test]
async fn test_fatal_backend_condition_ends_the_session() {
    let mut rig = rig(80, 24);

    // Dropping the input feed makes the scripted backend report a fatal
    // condition, which terminates the router.
    drop(rig.feed);

    let ev = next_event(&mut rig.session).await;
    assert_eq!(ev.kind, EventKind::Error);
    assert_eq!(ev.rc(), RetCode::Fail);

    let after = timeout(TICK, rig.session.next_event())
        .await
        .expect("timed out");
    assert!(after.is_none(), "the session is over after a fatal error");
}

#[tokio::test]
async fn test_shutdown_stops_every_handler_and_closes_backend() {
    let mut rig = rig(80, 24);
    let root = rig.session.root();

    let panel = rig
        .session
        .insert(Panel::new(&region(0, 0, 40, 10), Attribute::WHITE, Attribute::BLACK));
    rig.session.manage(root, panel).await.unwrap();
    let button = rig
        .session
        .insert(Button::new(&region(1, 1, 4, 1), &[sigil('A'), sigil('B')]));
    rig.session.manage(panel, button).await.unwrap();

    timeout(Duration::from_secs(2), rig.session.shutdown())
        .await
        .expect("shutdown should complete once all handlers exit");
    assert!(rig.grid.lock().closed());
}
