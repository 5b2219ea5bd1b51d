//! Selection and placement state for the composited node.
//!
//! Only gesture *commits* reach this module: drag-end and resize/rotate-end.
//! Continuous motion stays inside the interactive widget that produced it.

use tracing::{debug, info};

use crate::processing::layout::scaled_span;

/// Smallest on-screen width/height a resize may produce.
pub const DEFAULT_MIN_SPAN: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformState {
    pub position: Vec2,
    pub scale: Vec2,
    /// Degrees, clockwise on screen.
    pub rotation: f32,
}

impl Default for TransformState {
    fn default() -> Self {
        Self {
            position: Vec2::new(0.0, 0.0),
            scale: Vec2::new(1.0, 1.0),
            rotation: 0.0,
        }
    }
}

/// At most one node is bound at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Unselected,
    Selected(NodeId),
}

/// What a pointer-down landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// Empty canvas area.
    Stage,
    Node(NodeId),
    /// A resize/rotate handle of the given node.
    Handle(NodeId),
}

/// Geometry reported at the end of a resize/rotate gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformCommit {
    /// Set when the handle also moved the anchor.
    pub position: Option<Vec2>,
    pub scale: Vec2,
    pub rotation: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied,
    /// Geometry violated the minimum span or was degenerate; prior state kept.
    Rejected,
    /// Nothing is selected, so there is no gesture to commit.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct TransformController {
    selection: Selection,
    state: TransformState,
    node_size: (u32, u32),
    min_span: f32,
    commits: u64,
}

impl TransformController {
    pub fn new(node_width: u32, node_height: u32) -> Self {
        Self::with_min_span(node_width, node_height, DEFAULT_MIN_SPAN)
    }

    pub fn with_min_span(node_width: u32, node_height: u32, min_span: f32) -> Self {
        Self {
            selection: Selection::Unselected,
            state: TransformState::default(),
            node_size: (node_width, node_height),
            min_span,
            commits: 0,
        }
    }

    pub const fn selection(&self) -> Selection {
        self.selection
    }

    pub const fn is_selected(&self) -> bool {
        matches!(self.selection, Selection::Selected(_))
    }

    pub const fn bound_node(&self) -> Option<NodeId> {
        match self.selection {
            Selection::Selected(id) => Some(id),
            Selection::Unselected => None,
        }
    }

    pub const fn state(&self) -> &TransformState {
        &self.state
    }

    pub const fn node_size(&self) -> (u32, u32) {
        self.node_size
    }

    /// Applied commits so far.
    pub const fn commits(&self) -> u64 {
        self.commits
    }

    /// Follow the intrinsic size of the node after a display-size change.
    pub fn set_node_size(&mut self, width: u32, height: u32) {
        self.node_size = (width, height);
    }

    /// Route a pointer-down. Returns `true` when the selection changed.
    pub fn pointer_down(&mut self, target: PointerTarget) -> bool {
        match target {
            PointerTarget::Stage => self.deselect(),
            PointerTarget::Node(id) => self.select(id),
            PointerTarget::Handle(_) => false,
        }
    }

    /// Bind `id`, replacing any other binding.
    pub fn select(&mut self, id: NodeId) -> bool {
        let next = Selection::Selected(id);
        if self.selection == next {
            return false;
        }
        debug!(node = id.0, "node selected");
        self.selection = next;
        true
    }

    pub fn deselect(&mut self) -> bool {
        if self.selection == Selection::Unselected {
            return false;
        }
        debug!("selection cleared");
        self.selection = Selection::Unselected;
        true
    }

    /// Drop the binding because the node went away.
    pub fn detach_node(&mut self) {
        if let Selection::Selected(id) = self.selection {
            info!(node = id.0, "bound node detached");
        }
        self.selection = Selection::Unselected;
    }

    pub fn commit_drag(&mut self, position: Vec2) -> CommitOutcome {
        if !self.is_selected() {
            return CommitOutcome::Ignored;
        }
        if !position.is_finite() {
            return CommitOutcome::Rejected;
        }
        self.state.position = position;
        self.commits += 1;
        CommitOutcome::Applied
    }

    pub fn commit_transform(&mut self, commit: TransformCommit) -> CommitOutcome {
        if !self.is_selected() {
            return CommitOutcome::Ignored;
        }
        if !self.accepts(&commit) {
            debug!(
                scale_x = commit.scale.x,
                scale_y = commit.scale.y,
                "transform commit rejected"
            );
            return CommitOutcome::Rejected;
        }
        if let Some(position) = commit.position {
            self.state.position = position;
        }
        self.state.scale = commit.scale;
        self.state.rotation = commit.rotation;
        self.commits += 1;
        CommitOutcome::Applied
    }

    /// Back to identity placement; selection is left alone.
    pub fn reset(&mut self) {
        self.state = TransformState::default();
    }

    fn accepts(&self, commit: &TransformCommit) -> bool {
        if !commit.scale.is_finite() || !commit.rotation.is_finite() {
            return false;
        }
        if commit.position.is_some_and(|p| !p.is_finite()) {
            return false;
        }
        // flipping is disabled on the handle
        if commit.scale.x < 0.0 || commit.scale.y < 0.0 {
            return false;
        }
        let (w, h) = scaled_span(self.node_size.0, self.node_size.1, commit.scale);
        w >= self.min_span && h >= self.min_span
    }
}
