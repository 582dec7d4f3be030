//! X11 window backend speaking EWMH through x11rb
//!
//! Windows are discovered through `_NET_CLIENT_LIST` on the root window and
//! pinned with `_NET_WM_STATE_ABOVE` client messages, so any EWMH-compliant
//! window manager (and XWayland clients under a Wayland compositor) works.

use std::sync::Arc;

use anyhow::Context;
use x11rb::{
    connection::Connection,
    protocol::xproto::{Atom, AtomEnum, ClientMessageEvent, ConnectionExt as _, EventMask, Window},
    rust_connection::RustConnection,
};

use crate::window::{Position, TargetWindow, WindowManager, title_matches};

/// `_NET_WM_STATE` actions
const NET_WM_STATE_REMOVE: u32 = 0;
const NET_WM_STATE_ADD: u32 = 1;

/// Source indication for requests coming from a normal application
const SOURCE_APPLICATION: u32 = 1;

x11rb::atom_manager! {
    pub Atoms: AtomsCookie {
        _NET_CLIENT_LIST,
        _NET_WM_NAME,
        _NET_WM_STATE,
        _NET_WM_STATE_ABOVE,
        UTF8_STRING,
    }
}

struct X11HelperInner {
    conn: RustConnection,
    root: Window,
    atoms: Atoms,
}

#[derive(Clone)]
pub struct X11Helper {
    inner: Arc<X11HelperInner>,
}

impl X11Helper {
    /// Connect to the display named by `$DISPLAY`
    pub fn connect() -> anyhow::Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("Failed to open X display")?;
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .with_context(|| format!("X display has no screen {}", screen_num))?;
        let atoms = Atoms::new(&conn)?
            .reply()
            .context("Failed to intern EWMH atoms")?;

        log::debug!("Connected to X display, screen {} root {:#x}", screen_num, root);

        Ok(Self {
            inner: Arc::new(X11HelperInner { conn, root, atoms }),
        })
    }

    /// Managed top-level windows in `_NET_CLIENT_LIST` order
    pub fn client_list(&self) -> anyhow::Result<Vec<Window>> {
        let inner = &self.inner;
        let reply = inner
            .conn
            .get_property(
                false,
                inner.root,
                inner.atoms._NET_CLIENT_LIST,
                AtomEnum::WINDOW,
                0,
                u32::MAX,
            )?
            .reply()
            .context("Failed to read _NET_CLIENT_LIST")?;

        Ok(reply
            .value32()
            .map(|windows| windows.collect())
            .unwrap_or_default())
    }

    /// Window title, preferring the UTF-8 `_NET_WM_NAME` over legacy `WM_NAME`
    pub fn window_title(&self, window: Window) -> anyhow::Result<String> {
        let inner = &self.inner;
        let reply = inner
            .conn
            .get_property(
                false,
                window,
                inner.atoms._NET_WM_NAME,
                inner.atoms.UTF8_STRING,
                0,
                u32::MAX,
            )?
            .reply()?;
        if !reply.value.is_empty() {
            return Ok(decode_utf8(&reply.value));
        }

        let reply = inner
            .conn
            .get_property(false, window, AtomEnum::WM_NAME, AtomEnum::STRING, 0, u32::MAX)?
            .reply()?;
        Ok(decode_latin1(&reply.value))
    }

    fn window_position(&self, window: Window) -> anyhow::Result<Position> {
        let reply = self
            .inner
            .conn
            .translate_coordinates(window, self.inner.root, 0, 0)?
            .reply()
            .with_context(|| format!("Failed to read position of window {:#x}", window))?;
        Ok(Position::new(reply.dst_x.into(), reply.dst_y.into()))
    }

    fn set_above(&self, window: Window, enabled: bool) -> anyhow::Result<()> {
        let inner = &self.inner;
        let event = wm_state_message(
            window,
            inner.atoms._NET_WM_STATE,
            inner.atoms._NET_WM_STATE_ABOVE,
            enabled,
        );
        inner.conn.send_event(
            false,
            inner.root,
            EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY,
            event,
        )?;
        inner.conn.flush()?;
        Ok(())
    }
}

impl WindowManager for X11Helper {
    type Window = X11Window;

    fn windows_with_title(&self, needle: &str) -> anyhow::Result<Vec<X11Window>> {
        let mut matches = Vec::new();
        for id in self.client_list()? {
            // Clients can be destroyed between listing and reading the title
            let title = match self.window_title(id) {
                Ok(title) => title,
                Err(e) => {
                    log::trace!("Skipping window {:#x}: {:#}", id, e);
                    continue;
                }
            };
            if title_matches(&title, needle) {
                log::trace!("Window {:#x} {:?} matches {:?}", id, title, needle);
                matches.push(X11Window {
                    helper: self.clone(),
                    id,
                });
            }
        }
        Ok(matches)
    }
}

/// Handle to one client window on the display
pub struct X11Window {
    helper: X11Helper,
    id: Window,
}

impl TargetWindow for X11Window {
    fn position(&self) -> anyhow::Result<Position> {
        self.helper.window_position(self.id)
    }

    fn set_always_on_top(&self, enabled: bool) -> anyhow::Result<()> {
        log::trace!("Setting _NET_WM_STATE_ABOVE={} on {:#x}", enabled, self.id);
        self.helper.set_above(self.id, enabled)
    }
}

/// Build the EWMH request asking the window manager to add or remove the
/// "above" state on `window`
fn wm_state_message(window: Window, wm_state: Atom, above: Atom, enabled: bool) -> ClientMessageEvent {
    let action = if enabled {
        NET_WM_STATE_ADD
    } else {
        NET_WM_STATE_REMOVE
    };
    ClientMessageEvent::new(32, window, wm_state, [action, above, 0, SOURCE_APPLICATION, 0])
}

fn decode_utf8(value: &[u8]) -> String {
    String::from_utf8_lossy(value).into_owned()
}

/// `STRING` properties are ISO 8859-1
fn decode_latin1(value: &[u8]) -> String {
    value.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wm_state_message_add() {
        let event = wm_state_message(0x1a00004, 300, 301, true);
        assert_eq!(event.format, 32);
        assert_eq!(event.window, 0x1a00004);
        assert_eq!(event.type_, 300);
        assert_eq!(event.data.as_data32(), [NET_WM_STATE_ADD, 301, 0, SOURCE_APPLICATION, 0]);
    }

    #[test]
    fn test_wm_state_message_remove() {
        let event = wm_state_message(0x1a00004, 300, 301, false);
        assert_eq!(event.data.as_data32()[0], NET_WM_STATE_REMOVE);
        assert_eq!(event.data.as_data32()[1], 301);
    }

    #[test]
    fn test_decode_titles() {
        assert_eq!(decode_utf8("clip.webm - mpv".as_bytes()), "clip.webm - mpv");
        assert_eq!(decode_utf8(b"bad \xff mpv"), "bad \u{fffd} mpv");
        assert_eq!(decode_latin1(b"caf\xe9 - mpv"), "café - mpv");
    }

    #[test]
    fn test_connect_and_list_clients() {
        // Only meaningful when a display is available
        if let Ok(helper) = X11Helper::connect() {
            assert!(helper.client_list().is_ok());
        }
    }
}
