//! Rendering of snapshots into mountable fragments.

pub mod markup;
pub mod surface;

pub use markup::{escape_html, format_amount, format_timestamp, Markup};
pub use surface::{DirectorySurface, MemorySurface, Surface};

/// An interactive hook attached to a rendered element, e.g. a button that
/// approves a request. Surfaces replace an anchor's bindings on every mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Value of the element's `data-action-target` attribute.
    pub target: String,
    pub action: String,
}

impl Binding {
    pub fn new(target: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            action: action.into(),
        }
    }
}

/// Output of a renderer: an HTML fragment plus its bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub html: String,
    pub bindings: Vec<Binding>,
}

/// Pure mapping from a snapshot to a fragment for one anchor.
/// The same snapshot must always produce byte-identical output.
pub trait Renderer<S>: Send + Sync {
    /// Name of the surface anchor this renderer fills.
    fn anchor(&self) -> &str;

    fn render(&self, snapshot: &S) -> Rendered;
}
