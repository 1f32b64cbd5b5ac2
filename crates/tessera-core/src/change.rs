//! Change tracking between geometry edits and buffer uploads
//!
//! Mutating mesh operations return a [`Dirty`] value instead of flipping a
//! shared flag. Callers fold those values into an [`UploadState`] owned by
//! whatever re-uploads the buffers, which clears it once the upload happened.

/// Whether an operation touched the mesh buffers
#[must_use = "fold this into an UploadState so the buffers get re-uploaded"]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dirty(bool);

impl Dirty {
    /// The buffers were left untouched
    pub const CLEAN: Self = Self(false);
    /// At least one buffer changed
    pub const CHANGED: Self = Self(true);

    /// Build from a plain flag
    pub fn from_changed(changed: bool) -> Self {
        Self(changed)
    }

    /// Did the operation change anything
    pub fn is_dirty(self) -> bool {
        self.0
    }

    /// Combine two results
    pub fn or(self, other: Dirty) -> Dirty {
        Dirty(self.0 || other.0)
    }
}

/// Pending-upload tracker owned by the buffer uploader
#[derive(Debug, Clone, Default)]
pub struct UploadState {
    dirty: bool,
    edits: u64,
}

impl UploadState {
    /// Create a clean state
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of an operation
    pub fn mark(&mut self, change: Dirty) {
        if change.is_dirty() {
            self.dirty = true;
            self.edits += 1;
        }
    }

    /// Buffers must be re-uploaded
    pub fn needs_upload(&self) -> bool {
        self.dirty
    }

    /// Number of changing edits recorded since creation
    pub fn edit_count(&self) -> u64 {
        self.edits
    }

    /// Called by the uploader: returns whether an upload was due and clears it
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
