//! Terminal Backend Contract
//!
//! The toolkit never talks to a physical terminal directly. A backend
//! supplies two halves, mirroring how a real terminal stack splits its
//! input stream from its output surface:
//!
//! - [`Screen`]: absolute-coordinate cell writes, flush, size, teardown.
//! - [`InputSource`]: a blocking stream of [`RawEvent`]s.
//!
//! Out-of-bounds writes are the backend's responsibility. A backend that
//! can no longer deliver input reports [`RawEvent::Fatal`], which
//! terminates the router and ends the session.
//!
//! The [`headless`] submodule provides in-memory implementations for
//! tests and automation.

use async_trait::async_trait;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::style::Attribute;

/// A key identifier, independent of any concrete terminal library.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// A printable character.
    Char(char),
    /// Enter / return.
    Enter,
    /// Escape.
    Esc,
    /// Tab.
    Tab,
    /// Backspace.
    Backspace,
    /// Delete.
    Delete,
    /// Arrow up.
    Up,
    /// Arrow down.
    Down,
    /// Arrow left.
    Left,
    /// Arrow right.
    Right,
    /// Home.
    Home,
    /// End.
    End,
    /// Page up.
    PageUp,
    /// Page down.
    PageDown,
    /// Function key.
    F(u8),
}

bitflags! {
    /// Modifier keys held during a key event.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// Shift.
        const SHIFT = 0b001;
        /// Control.
        const CTRL = 0b010;
        /// Alt / meta.
        const ALT = 0b100;
    }
}

/// A keyboard event from the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    /// Which key.
    pub key: Key,
    /// Held modifiers.
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// A plain, unmodified key press.
    #[must_use]
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::empty(),
        }
    }
}

/// Which mouse button (or wheel direction) produced a mouse event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    /// Left button.
    Left,
    /// Right button.
    Right,
    /// Middle button.
    Middle,
    /// Wheel scrolled up.
    WheelUp,
    /// Wheel scrolled down.
    WheelDown,
}

/// A mouse event. Coordinates are absolute screen cells as delivered by
/// the backend; the router translates them into a clickable region's
/// local frame before delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MouseEvent {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Button.
    pub button: MouseButton,
}

/// A raw input event from the terminal backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawEvent {
    /// Keyboard input.
    Key(KeyEvent),
    /// Mouse input.
    Mouse(MouseEvent),
    /// The terminal was resized.
    Resize {
        /// New width.
        width: i32,
        /// New height.
        height: i32,
    },
    /// The backend hit an unrecoverable condition; the router terminates.
    Fatal(String),
}

impl RawEvent {
    /// Convenience constructor for a left mouse click.
    #[must_use]
    pub fn left_click(x: i32, y: i32) -> Self {
        Self::Mouse(MouseEvent {
            x,
            y,
            button: MouseButton::Left,
        })
    }

    /// Convenience constructor for a plain key press.
    #[must_use]
    pub fn key(key: Key) -> Self {
        Self::Key(KeyEvent::plain(key))
    }
}

/// The output half of a terminal backend.
///
/// All coordinates are absolute screen cells. The screen is queried for
/// its size once at session startup.
pub trait Screen: Send + 'static {
    /// Width and height in cells.
    fn size(&self) -> (i32, i32);

    /// Paint a single cell. Out-of-bounds behavior is backend-defined.
    fn write_cell(&mut self, x: i32, y: i32, glyph: char, fg: Attribute, bg: Attribute);

    /// Commit pending cell writes to the physical display.
    fn flush(&mut self);

    /// Tear the backend down. Called exactly once at session shutdown.
    fn close(&mut self);
}

/// The input half of a terminal backend: a blocking event stream.
#[async_trait]
pub trait InputSource: Send + 'static {
    /// The next raw event. Blocks until one is available; yields
    /// [`RawEvent::Fatal`] when the backend cannot continue.
    async fn next_event(&mut self) -> RawEvent;
}

pub mod headless {
    //! In-memory backend halves for tests and automation.

    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::sync::mpsc;

    use super::{InputSource, RawEvent, Screen};
    use crate::style::Attribute;

    /// One recorded cell of a [`HeadlessScreen`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Cell {
        /// The painted glyph.
        pub glyph: char,
        /// Foreground attribute.
        pub fg: Attribute,
        /// Background attribute.
        pub bg: Attribute,
    }

    impl Default for Cell {
        fn default() -> Self {
            Self {
                glyph: ' ',
                fg: Attribute::DEFAULT,
                bg: Attribute::DEFAULT,
            }
        }
    }

    /// The shared cell grid behind a [`HeadlessScreen`], for assertions.
    #[derive(Clone, Debug)]
    pub struct Grid {
        width: i32,
        height: i32,
        cells: Vec<Cell>,
        flushes: u32,
        closed: bool,
    }

    impl Grid {
        fn new(width: i32, height: i32) -> Self {
            let len = usize::try_from(width * height).unwrap_or(0);
            Self {
                width,
                height,
                cells: vec![Cell::default(); len],
                flushes: 0,
                closed: false,
            }
        }

        /// The cell at `(x, y)`, or `None` when out of bounds.
        #[must_use]
        pub fn cell(&self, x: i32, y: i32) -> Option<Cell> {
            if x < 0 || x >= self.width || y < 0 || y >= self.height {
                return None;
            }
            let idx = usize::try_from(y * self.width + x).ok()?;
            self.cells.get(idx).copied()
        }

        /// The glyph at `(x, y)`, space when never painted.
        #[must_use]
        pub fn glyph(&self, x: i32, y: i32) -> char {
            self.cell(x, y).map_or(' ', |c| c.glyph)
        }

        /// Row `y` rendered as a string.
        #[must_use]
        pub fn row(&self, y: i32) -> String {
            (0..self.width).map(|x| self.glyph(x, y)).collect()
        }

        /// How many times the screen was flushed.
        #[must_use]
        pub fn flushes(&self) -> u32 {
            self.flushes
        }

        /// Whether the screen was closed.
        #[must_use]
        pub fn closed(&self) -> bool {
            self.closed
        }
    }

    /// A [`Screen`] that paints into a shared in-memory grid.
    pub struct HeadlessScreen {
        grid: Arc<Mutex<Grid>>,
    }

    impl HeadlessScreen {
        /// Create a screen of the given size, returning the shared grid
        /// handle for test assertions.
        #[must_use]
        pub fn new(width: i32, height: i32) -> (Self, Arc<Mutex<Grid>>) {
            let grid = Arc::new(Mutex::new(Grid::new(width, height)));
            (Self { grid: grid.clone() }, grid)
        }
    }

    impl Screen for HeadlessScreen {
        fn size(&self) -> (i32, i32) {
            let grid = self.grid.lock();
            (grid.width, grid.height)
        }

        fn write_cell(&mut self, x: i32, y: i32, glyph: char, fg: Attribute, bg: Attribute) {
            let mut grid = self.grid.lock();
            if x < 0 || x >= grid.width || y < 0 || y >= grid.height {
                return;
            }
            let Ok(idx) = usize::try_from(y * grid.width + x) else {
                return;
            };
            grid.cells[idx] = Cell { glyph, fg, bg };
        }

        fn flush(&mut self) {
            self.grid.lock().flushes += 1;
        }

        fn close(&mut self) {
            self.grid.lock().closed = true;
        }
    }

    /// An [`InputSource`] fed by a channel from the test.
    ///
    /// When the feeding side is dropped the source reports a fatal
    /// condition, mirroring a backend whose input stream died.
    pub struct ScriptedInput {
        rx: mpsc::Receiver<RawEvent>,
    }

    impl ScriptedInput {
        /// Create an input source and the sender that scripts it.
        #[must_use]
        pub fn new() -> (Self, mpsc::Sender<RawEvent>) {
            let (tx, rx) = mpsc::channel(64);
            (Self { rx }, tx)
        }
    }

    #[async_trait]
    impl InputSource for ScriptedInput {
        async fn next_event(&mut self) -> RawEvent {
            self.rx
                .recv()
                .await
                .unwrap_or_else(|| RawEvent::Fatal("input stream closed".to_string()))
        }
    }
}
