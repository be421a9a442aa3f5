//! Rendering constants

/// Page attributes a page may inherit from its ancestors in the page tree
pub const INHERITABLE_PAGE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against malformed (cyclic) page trees
pub const MAX_PAGE_TREE_DEPTH: usize = 64;

// =============================================================================
// Placeholder Box
// =============================================================================

/// Placeholder fill and border color (RGB, 0..1)
pub const PLACEHOLDER_COLOR: (f32, f32, f32) = (1.0, 1.0, 0.0);

/// Placeholder fill opacity
pub const PLACEHOLDER_FILL_OPACITY: f32 = 0.25;

/// Placeholder border opacity
pub const PLACEHOLDER_BORDER_OPACITY: f32 = 0.5;

/// Placeholder border line width in points
pub const PLACEHOLDER_BORDER_WIDTH: f32 = 1.0;

// =============================================================================
// Resource Names
// =============================================================================

/// Prefix for the placeholder graphics state resource
pub const PLACEHOLDER_GSTATE_PREFIX: &str = "SigGS";

/// Prefix for the signature image XObject resource
pub const SIGNATURE_XOBJECT_PREFIX: &str = "SigImg";

/// PDF version written for generated documents
pub const OUTPUT_PDF_VERSION: &str = "1.7";
