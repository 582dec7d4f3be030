//! Find the target window, then re-assert "always on top" every time it moves

use anyhow::Context;

use crate::window::{Position, TargetWindow, WindowManager};

/// Title substring identifying the window to keep on top
pub const TARGET_TITLE: &str = "mpv";

/// Why the monitor loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Reading the position failed, so the window is gone
    WindowClosed,
}

/// Wait for the target window and keep it on top until it closes
pub fn run<M: WindowManager>(manager: &M) -> anyhow::Result<()> {
    let window = find_window(manager, TARGET_TITLE)?;
    let exit = monitor(&window)?;
    log::info!("Stopped watching {:?}: {:?}", TARGET_TITLE, exit);
    Ok(())
}

/// Look the window up until one matches and return the first match.
///
/// An empty result is retried forever. Errors from the backend itself are
/// returned to the caller.
pub fn find_window<M: WindowManager>(manager: &M, needle: &str) -> anyhow::Result<M::Window> {
    let mut lookups: u64 = 0;
    loop {
        let windows = manager
            .windows_with_title(needle)
            .context("Failed to list windows")?;
        lookups += 1;

        if let Some(window) = windows.into_iter().next() {
            log::info!("Found window matching {:?} after {} lookups", needle, lookups);
            return Ok(window);
        }

        if lookups == 1 {
            log::debug!("No window matching {:?} yet, waiting for it", needle);
        }
    }
}

/// Poll the window position and toggle "always on top" off and on after
/// every move. Returns once the position can no longer be read.
pub fn monitor<W: TargetWindow>(window: &W) -> anyhow::Result<Exit> {
    let Some(mut last) = read_position(window) else {
        return Ok(Exit::WindowClosed);
    };
    log::debug!("Initial position {:?}", last);

    loop {
        let Some(current) = read_position(window) else {
            return Ok(Exit::WindowClosed);
        };

        if current != last {
            log::debug!("Window moved from {:?} to {:?}", last, current);
            last = current;
            restack(window)?;
        }
    }
}

fn read_position<W: TargetWindow>(window: &W) -> Option<Position> {
    match window.position() {
        Ok(position) => Some(position),
        Err(e) => {
            log::debug!("Position unavailable, assuming window closed: {:#}", e);
            None
        }
    }
}

/// Drop and re-apply the hint so the window manager raises the window again
fn restack<W: TargetWindow>(window: &W) -> anyhow::Result<()> {
    window
        .set_always_on_top(false)
        .context("Failed to clear always-on-top")?;
    window
        .set_always_on_top(true)
        .context("Failed to set always-on-top")?;
    log::debug!("Re-applied always-on-top");
    Ok(())
}
