//! Interactive compositor demo.
//!
//! Draws a box with a moving marker. Arrow keys move the marker,
//! clicking teleports it, 'q' or Escape quits. Shrink the window
//! below 80x24 to see the virtual screen's viewport scrolling
//! (Alt+arrows).

#[cfg(not(unix))]
fn main() {
    eprintln!("this demo drives a unix terminal");
}

#[cfg(unix)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::time::Duration;

    use vtdev::{AnsiTerminal, DeviceConfig, MouseCaptureMode};
    use vtgrid::{Cell, Color, Pos, Rect, Size, StyleAttrs};
    use vtkeys::{InputEvent, KeyCode, MouseAction};
    use vtscreen::{
        RefreshKind, ScreenConfig, TerminalScreen, VirtualScreen, VirtualScreenConfig,
    };

    let log = std::fs::File::create("vtscreen-demo.log")?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(move || log.try_clone().expect("clone log file"))
        .init();

    let config = DeviceConfig::default()
        .with_mouse_capture_mode(MouseCaptureMode::ClickAutodetect)
        .with_input_timeout_units(2);
    let terminal = AnsiTerminal::open_tty(config)?;
    let inner = TerminalScreen::new(terminal, ScreenConfig::default())?;
    let mut screen = VirtualScreen::new(
        inner,
        VirtualScreenConfig::default().with_minimum_size(Size::new(80, 24)),
    );
    screen.start()?;

    let mut marker = Pos::new(40, 12);
    let mut last_event = String::from("(none yet)");

    loop {
        let _ = screen.do_resize_if_necessary();
        let size = screen.size();
        marker = Pos::new(
            marker.col.min(size.cols.saturating_sub(2)).max(1),
            marker.row.min(size.rows.saturating_sub(2)).max(1),
        );

        screen.clear();
        {
            let mut graphics = screen.new_text_graphics();
            graphics.set_foreground(Color::CYAN);
            graphics.draw_rectangle(Rect::new(Pos::new(0, 0), size), '░');
            graphics.set_foreground(Color::Default);
            graphics.put_string(
                Pos::new(2, 1),
                "arrows move the marker, click teleports it, q quits",
            );
            graphics.put_string(Pos::new(2, 2), &format!("last event: {last_event}"));
        }
        screen.set_character(
            marker,
            &Cell::new('◆')
                .with_foreground(Color::YELLOW)
                .with_attr(StyleAttrs::BOLD),
        );
        screen.set_cursor(Some(marker));
        screen.refresh(RefreshKind::Automatic)?;

        let Some(event) = screen.read_input_with_timeout(Duration::from_millis(250))? else {
            continue;
        };
        last_event = format!("{event:?}");
        match event {
            InputEvent::Key(key) => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Up => marker.row = marker.row.saturating_sub(1),
                KeyCode::Down => marker.row += 1,
                KeyCode::Left => marker.col = marker.col.saturating_sub(1),
                KeyCode::Right => marker.col += 1,
                _ => {}
            },
            InputEvent::Mouse(mouse) if mouse.action == MouseAction::Down => {
                marker = mouse.pos;
            }
            InputEvent::Eof => break,
            _ => {}
        }
    }

    screen.dispose()?;
    Ok(())
}
