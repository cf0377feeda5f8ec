//! End-to-end compositor scenarios against the in-memory device.

use pretty_assertions::assert_eq;
use vtdev::{TerminalOp, VirtualTerminal};
use vtgrid::{Cell, Pos, Size};
use vtkeys::InputEvent;
use vtscreen::{RefreshKind, ScreenConfig, TerminalScreen, VirtualScreen, VirtualScreenConfig};

fn started_screen(size: Size) -> TerminalScreen<VirtualTerminal> {
    let mut screen =
        TerminalScreen::new(VirtualTerminal::new(size), ScreenConfig::default()).unwrap();
    screen.start().unwrap();
    screen.terminal_mut().take_ops();
    screen
}

fn put_chars(ops: &[TerminalOp]) -> Vec<char> {
    ops.iter()
        .filter_map(|op| match op {
            TerminalOp::PutChar(ch) => Some(*ch),
            _ => None,
        })
        .collect()
}

fn count_moves(ops: &[TerminalOp]) -> usize {
    ops.iter()
        .filter(|op| matches!(op, TerminalOp::MoveTo(_)))
        .count()
}

#[test]
fn hello_compositor() {
    let mut screen = started_screen(Size::new(80, 24));
    screen.set_cursor(None);
    screen.set_character(Pos::new(10, 5), &Cell::new('H'));
    screen.set_character(Pos::new(11, 5), &Cell::new('i'));
    screen.refresh(RefreshKind::Automatic).unwrap();

    assert_eq!(screen.front_buffer(), screen.back_buffer());

    let device = screen.terminal_mut();
    assert_eq!(device.buffer().get(10, 5).unwrap().character(), 'H');
    assert_eq!(device.buffer().get(11, 5).unwrap().character(), 'i');
    let ops = device.take_ops();
    assert!(ops.contains(&TerminalOp::MoveTo(Pos::new(10, 5))));
    assert_eq!(put_chars(&ops), vec!['H', 'i']);
}

#[test]
fn double_width_replacement_repairs_the_shadow() {
    let mut screen = started_screen(Size::new(80, 24));
    screen.set_cursor(None);
    screen.set_character(Pos::new(5, 3), &Cell::new('中'));
    screen.refresh(RefreshKind::Complete).unwrap();
    screen.terminal_mut().take_ops();

    screen.set_character(Pos::new(5, 3), &Cell::new('A'));
    screen.refresh(RefreshKind::Delta).unwrap();

    let device = screen.terminal_mut();
    let ops = device.take_ops();
    assert_eq!(put_chars(&ops), vec!['A', ' ']);
    assert_eq!(device.buffer().get(5, 3).unwrap().character(), 'A');
    assert_eq!(device.buffer().get(6, 3).unwrap().character(), ' ');
}

#[test]
fn refresh_is_idempotent() {
    let mut screen = started_screen(Size::new(40, 12));
    screen.set_cursor(None);
    screen.new_text_graphics().put_string(Pos::new(2, 2), "steady");
    screen.refresh(RefreshKind::Automatic).unwrap();
    screen.terminal_mut().take_ops();

    screen.refresh(RefreshKind::Automatic).unwrap();
    let ops = screen.terminal_mut().take_ops();
    assert_eq!(put_chars(&ops), Vec::<char>::new());
}

#[test]
fn delta_refresh_is_minimal_for_one_cell() {
    let mut screen = started_screen(Size::new(40, 12));
    screen.set_cursor(None);
    screen.new_text_graphics().put_string(Pos::new(0, 0), "base");
    screen.refresh(RefreshKind::Automatic).unwrap();
    screen.terminal_mut().take_ops();

    screen.set_character(Pos::new(20, 6), &Cell::new('x'));
    screen.refresh(RefreshKind::Delta).unwrap();
    let ops = screen.terminal_mut().take_ops();
    assert!(count_moves(&ops) <= 1);
    assert_eq!(put_chars(&ops), vec!['x']);
}

#[test]
fn automatic_refresh_goes_complete_past_the_threshold() {
    let mut screen = started_screen(Size::new(10, 4));
    screen.set_cursor(None);
    screen.refresh(RefreshKind::Automatic).unwrap();
    screen.terminal_mut().take_ops();

    // Touch more than 75% of the 40 cells.
    for row in 0..4 {
        for col in 0..8 {
            screen.set_character(Pos::new(col, row), &Cell::new('#'));
        }
    }
    screen.refresh(RefreshKind::Automatic).unwrap();
    let ops = screen.terminal_mut().take_ops();
    // A complete refresh starts by clearing the device.
    assert!(ops.contains(&TerminalOp::Clear));
}

#[test]
fn automatic_refresh_stays_delta_below_the_threshold() {
    let mut screen = started_screen(Size::new(10, 4));
    screen.set_cursor(None);
    screen.refresh(RefreshKind::Automatic).unwrap();
    screen.terminal_mut().take_ops();

    screen.set_character(Pos::new(0, 0), &Cell::new('#'));
    screen.refresh(RefreshKind::Automatic).unwrap();
    let ops = screen.terminal_mut().take_ops();
    assert!(!ops.contains(&TerminalOp::Clear));
}

#[test]
fn resize_round_trip() {
    let mut screen = started_screen(Size::new(80, 24));
    screen.set_cursor(None);
    screen.set_character(Pos::new(0, 0), &Cell::new('a'));
    screen.set_character(Pos::new(79, 23), &Cell::new('z'));
    screen.refresh(RefreshKind::Automatic).unwrap();

    screen.terminal_mut().set_size(Size::new(120, 40));
    let resized = screen.do_resize_if_necessary();
    assert_eq!(resized, Some(Size::new(120, 40)));
    assert_eq!(screen.size(), Size::new(120, 40));
    assert_eq!(screen.back_buffer().size(), Size::new(120, 40));
    assert_eq!(screen.front_buffer().size(), Size::new(120, 40));

    // Old content is preserved, the new region is blank.
    assert_eq!(screen.back_buffer().get(0, 0).unwrap().character(), 'a');
    assert_eq!(screen.back_buffer().get(79, 23).unwrap().character(), 'z');
    assert_eq!(screen.back_buffer().get(100, 30).unwrap(), &Cell::default());

    // The resize event also reaches the input queue.
    assert_eq!(
        screen.poll_input().unwrap(),
        Some(InputEvent::Resize(Size::new(120, 40)))
    );

    // The next refresh redraws everything.
    screen.terminal_mut().take_ops();
    screen.refresh(RefreshKind::Automatic).unwrap();
    let ops = screen.terminal_mut().take_ops();
    assert!(ops.contains(&TerminalOp::Clear));
}

#[test]
fn scroll_hint_reaches_the_device() {
    let mut screen = started_screen(Size::new(20, 10));
    screen.set_cursor(None);
    screen.new_text_graphics().put_string(Pos::new(0, 9), "bottom");
    screen.refresh(RefreshKind::Automatic).unwrap();
    screen.terminal_mut().take_ops();

    screen.scroll_lines(0, 9, 1);
    screen.scroll_lines(0, 9, 1);
    screen.refresh(RefreshKind::Delta).unwrap();
    let ops = screen.terminal_mut().take_ops();
    // Accumulated into a single hardware scroll of distance two.
    assert!(ops.contains(&TerminalOp::ScrollLines {
        first: 0,
        last: 9,
        distance: 2
    }));
}

#[test]
fn conflicting_scroll_hints_fall_back_to_cell_updates() {
    let mut screen = started_screen(Size::new(20, 10));
    screen.set_cursor(None);
    screen.refresh(RefreshKind::Automatic).unwrap();
    screen.terminal_mut().take_ops();

    screen.scroll_lines(0, 9, 1);
    screen.scroll_lines(2, 5, 1);
    screen.refresh(RefreshKind::Delta).unwrap();
    let ops = screen.terminal_mut().take_ops();
    assert!(
        !ops.iter()
            .any(|op| matches!(op, TerminalOp::ScrollLines { .. }))
    );
}

#[test]
fn stopped_screen_draws_nothing() {
    let mut screen =
        TerminalScreen::new(VirtualTerminal::new(Size::new(20, 10)), ScreenConfig::default())
            .unwrap();
    screen.set_character(Pos::new(1, 1), &Cell::new('x'));
    screen.refresh(RefreshKind::Automatic).unwrap();
    assert_eq!(screen.terminal_mut().ops(), &[]);
    // The draw still reached the back buffer for the eventual start.
    assert_eq!(screen.back_buffer().get(1, 1).unwrap().character(), 'x');
}

#[test]
fn cursor_sits_on_the_left_half_of_wide_glyphs() {
    let mut screen = started_screen(Size::new(20, 10));
    screen.set_character(Pos::new(4, 2), &Cell::new('中'));
    screen.set_cursor(Some(Pos::new(6, 2)));
    screen.refresh(RefreshKind::Automatic).unwrap();
    // The logical cursor at column 6 follows the double-width glyph
    // in columns 4-5... so the hardware cursor stays at column 6.
    assert_eq!(screen.terminal_mut().cursor(), Pos::new(6, 2));

    screen.set_cursor(Some(Pos::new(5, 2)));
    screen.refresh(RefreshKind::Automatic).unwrap();
    // Column 5 is the right half of the glyph; the hardware cursor
    // must not split it.
    assert_eq!(screen.terminal_mut().cursor(), Pos::new(4, 2));
}

#[test]
fn virtual_screen_is_transparent_when_large_enough() {
    let inner = TerminalScreen::new(
        VirtualTerminal::new(Size::new(100, 30)),
        ScreenConfig::default(),
    )
    .unwrap();
    let mut screen = VirtualScreen::new(
        inner,
        VirtualScreenConfig::default().with_minimum_size(Size::new(80, 24)),
    );
    screen.start().unwrap();
    assert_eq!(screen.size(), Size::new(100, 30));
    assert!(!screen.is_viewport_active());

    screen.set_character(Pos::new(90, 29), &Cell::new('x'));
    screen.refresh(RefreshKind::Automatic).unwrap();
    let device = screen.inner_mut().terminal_mut();
    assert_eq!(device.buffer().get(90, 29).unwrap().character(), 'x');
}

#[test]
fn virtual_screen_scrolls_a_small_terminal() {
    let inner = TerminalScreen::new(
        VirtualTerminal::new(Size::new(40, 10)),
        ScreenConfig::default(),
    )
    .unwrap();
    let mut screen = VirtualScreen::new(
        inner,
        VirtualScreenConfig::default().with_minimum_size(Size::new(80, 24)),
    );
    screen.start().unwrap();
    assert_eq!(screen.size(), Size::new(80, 24));
    assert!(screen.is_viewport_active());

    screen.set_character(Pos::new(0, 0), &Cell::new('a'));
    screen.set_character(Pos::new(60, 20), &Cell::new('z'));
    screen.set_cursor(None);
    screen.refresh(RefreshKind::Automatic).unwrap();

    {
        let device = screen.inner_mut().terminal_mut();
        assert_eq!(device.buffer().get(0, 0).unwrap().character(), 'a');
        // The right column and bottom row hold the scroll indicators.
        let indicator = device.buffer().get(39, 0).unwrap().character();
        assert!(indicator == '░' || indicator == '█');
        let indicator = device.buffer().get(0, 9).unwrap().character();
        assert!(indicator == '░' || indicator == '█');
    }

    // Scroll the viewport to bring the far cell into view.
    screen.scroll_viewport(60, 20);
    screen.refresh(RefreshKind::Automatic).unwrap();
    let viewport = screen.viewport_origin();
    assert_eq!(viewport, Pos::new(80 - 39, 24 - 9));
    let device = screen.inner_mut().terminal_mut();
    let shown = device
        .buffer()
        .get(60 - viewport.col, 20 - viewport.row)
        .unwrap()
        .character();
    assert_eq!(shown, 'z');
}

#[test]
fn virtual_screen_swallows_scroll_chords() {
    let inner = TerminalScreen::new(
        VirtualTerminal::new(Size::new(40, 10)),
        ScreenConfig::default(),
    )
    .unwrap();
    let mut screen = VirtualScreen::new(
        inner,
        VirtualScreenConfig::default().with_minimum_size(Size::new(80, 24)),
    );
    screen.start().unwrap();
    screen.refresh(RefreshKind::Automatic).unwrap();

    let feeder = screen
        .inner_mut()
        .terminal_mut()
        .input_feeder();
    // Alt+Down (ESC ESC [ B), then a plain keystroke.
    feeder.feed(b"\x1b\x1b[Bq");
    feeder.close();

    let event = screen.read_input().unwrap();
    assert_eq!(event, vtkeys::KeyCode::Char('q').into());
    assert_eq!(screen.viewport_origin(), Pos::new(0, 1));
}
