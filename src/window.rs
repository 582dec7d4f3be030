//! Backend-neutral view of the window manager
//!
//! The keeper only needs three things from a desktop: a title lookup, a
//! window's position, and the "always on top" switch.

/// Top-left corner of a window in root (screen) coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A desktop that can list its top-level windows by title
pub trait WindowManager {
    type Window: TargetWindow;

    /// All managed windows whose title contains `needle`, in client-list order
    fn windows_with_title(&self, needle: &str) -> anyhow::Result<Vec<Self::Window>>;
}

/// A single top-level window the keeper can watch
pub trait TargetWindow {
    /// Current position. Fails once the window has been destroyed.
    fn position(&self) -> anyhow::Result<Position>;

    fn set_always_on_top(&self, enabled: bool) -> anyhow::Result<()>;
}

/// Case-sensitive substring match shared by all backends
pub fn title_matches(title: &str, needle: &str) -> bool {
    title.contains(needle)
}
