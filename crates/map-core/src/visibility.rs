//! Display modes of a rendered entity and the pure transition table between
//! them.
//!
//! Transitions never touch the registry or the surface; the controller applies
//! whatever a [`Transition`] describes.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Root-set entity on the surface, not hovered.
    ParentIdle,
    /// Root-set entity under the pointer.
    ParentHover,
    /// Root-set entity clicked; faded so its children show through.
    ParentSelected,
    /// Child whose parent is not selected.
    ChildHidden,
    /// Child revealed by its selected parent.
    ChildVisibleIdle,
    /// Revealed child under the pointer.
    ChildVisibleHover,
}

impl DisplayMode {
    pub const ALL: [DisplayMode; 6] = [
        DisplayMode::ParentIdle,
        DisplayMode::ParentHover,
        DisplayMode::ParentSelected,
        DisplayMode::ChildHidden,
        DisplayMode::ChildVisibleIdle,
        DisplayMode::ChildVisibleHover,
    ];

    pub fn is_parent(self) -> bool {
        matches!(
            self,
            DisplayMode::ParentIdle | DisplayMode::ParentHover | DisplayMode::ParentSelected
        )
    }

    /// Hidden children ignore pointer events altogether.
    pub fn is_interactive(self) -> bool {
        self != DisplayMode::ChildHidden
    }

    /// Whether an unpinned popup should follow the pointer over this layer.
    pub fn tracks_pointer(self) -> bool {
        !matches!(self, DisplayMode::ChildHidden | DisplayMode::ParentSelected)
    }

    pub fn paint(self) -> Paint {
        match self {
            DisplayMode::ParentIdle => Paint::fill("#0000ff", 0.35).to_front(),
            DisplayMode::ParentHover => Paint::fill("#ff0000", 0.3),
            DisplayMode::ParentSelected => Paint {
                fill_color: "#0000ff",
                fill_opacity: 0.0,
                color: "#cc0000",
                opacity: 0.3,
                bring_to_front: false,
            },
            DisplayMode::ChildHidden => Paint::fill("#0000ff", 0.0),
            DisplayMode::ChildVisibleIdle => Paint::fill("#669900", 0.5).to_front(),
            DisplayMode::ChildVisibleHover => Paint::fill("#cc3300", 0.45),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DisplayMode::ParentIdle => "parent_idle",
            DisplayMode::ParentHover => "parent_hover",
            DisplayMode::ParentSelected => "parent_selected",
            DisplayMode::ChildHidden => "child_hidden",
            DisplayMode::ChildVisibleIdle => "child_visible_idle",
            DisplayMode::ChildVisibleHover => "child_visible_hover",
        }
    }
}

/// Polygon style for one display mode.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paint {
    pub fill_color: &'static str,
    pub fill_opacity: f32,
    /// Stroke colour.
    pub color: &'static str,
    /// Stroke opacity.
    pub opacity: f32,
    #[serde(skip)]
    pub bring_to_front: bool,
}

impl Paint {
    const fn fill(fill_color: &'static str, fill_opacity: f32) -> Self {
        Self {
            fill_color,
            fill_opacity,
            color: "#3388ff",
            opacity: 0.0,
            bring_to_front: false,
        }
    }

    const fn to_front(mut self) -> Self {
        self.bring_to_front = true;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Click,
    HoverEnter,
    HoverLeave,
    PointerMove,
}

impl EventKind {
    pub fn label(self) -> &'static str {
        match self {
            EventKind::Click => "click",
            EventKind::HoverEnter => "hover_enter",
            EventKind::HoverLeave => "hover_leave",
            EventKind::PointerMove => "pointer_move",
        }
    }
}

/// What happens to the popup after a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PopupEffect {
    Keep,
    /// Open the name popup at the pointer.
    ShowName,
    /// Open the cached detail popup at the pointer.
    ShowDetail,
    /// Move the open popup to the pointer.
    Follow,
    Hide,
}

/// Mode applied to every registered direct child of a clicked parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cascade {
    Reveal,
    Hide,
}

impl Cascade {
    pub fn child_mode(self) -> DisplayMode {
        match self {
            Cascade::Reveal => DisplayMode::ChildVisibleIdle,
            Cascade::Hide => DisplayMode::ChildHidden,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub mode: DisplayMode,
    pub popup: PopupEffect,
    pub cascade: Option<Cascade>,
    pub toggles_lock: bool,
    /// Lock value once the event has been handled.
    pub locked_after: bool,
}

impl Transition {
    fn stay(mode: DisplayMode, locked: bool) -> Self {
        Self {
            mode,
            popup: PopupEffect::Keep,
            cascade: None,
            toggles_lock: false,
            locked_after: locked,
        }
    }

    fn to(mode: DisplayMode, popup: PopupEffect, locked: bool) -> Self {
        Self {
            mode,
            popup,
            ..Self::stay(mode, locked)
        }
    }

    fn click(mode: DisplayMode, cascade: Option<Cascade>, locked: bool) -> Self {
        let locked_after = !locked;
        Self {
            mode,
            popup: if locked_after {
                PopupEffect::ShowDetail
            } else {
                PopupEffect::ShowName
            },
            cascade,
            toggles_lock: true,
            locked_after,
        }
    }
}

/// Transition for `event` on a layer in `mode` while the session lock is `locked`.
pub fn transition(mode: DisplayMode, event: EventKind, locked: bool) -> Transition {
    use DisplayMode::*;

    let unless_locked = |effect| if locked { PopupEffect::Keep } else { effect };

    if !mode.is_interactive() {
        return Transition::stay(mode, locked);
    }

    match event {
        EventKind::HoverEnter => match mode {
            ParentIdle => Transition::to(ParentHover, unless_locked(PopupEffect::ShowName), locked),
            ChildVisibleIdle if !locked => {
                Transition::to(ChildVisibleHover, PopupEffect::ShowName, locked)
            }
            ParentHover | ChildVisibleHover => {
                Transition::to(mode, unless_locked(PopupEffect::ShowName), locked)
            }
            _ => Transition::stay(mode, locked),
        },
        EventKind::HoverLeave => {
            let next = match mode {
                ParentHover => ParentIdle,
                ChildVisibleHover => ChildVisibleIdle,
                other => other,
            };
            Transition::to(next, unless_locked(PopupEffect::Hide), locked)
        }
        EventKind::PointerMove => {
            if !locked && mode.tracks_pointer() {
                Transition::to(mode, PopupEffect::Follow, locked)
            } else {
                Transition::stay(mode, locked)
            }
        }
        EventKind::Click => match mode {
            ParentIdle | ParentHover => {
                Transition::click(ParentSelected, Some(Cascade::Reveal), locked)
            }
            ParentSelected => Transition::click(ParentIdle, Some(Cascade::Hide), locked),
            _ => Transition::click(mode, None, locked),
        },
    }
}
