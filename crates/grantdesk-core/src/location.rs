//! Addressable location
//!
//! The active project is deep-linkable through the location fragment,
//! encoded query-string style as `id=<project-id>`.

use grantdesk_model::ProjectId;
use parking_lot::Mutex;
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::form_urlencoded;

/// Fragment key carrying the project id
pub const FRAGMENT_KEY: &str = "id";

/// Read and replace the fragment of the current location
///
/// Replacement must not create a new history entry.
pub trait Location: Send + Sync + Debug {
    /// Current fragment without the leading `#`, if any
    fn fragment(&self) -> Option<String>;

    /// Replace the fragment in place
    fn replace_fragment(&self, fragment: &str);

    /// Remove the fragment
    fn clear_fragment(&self);
}

/// Extract the project id from a fragment such as `#id=austin-ab12c`
#[must_use]
pub fn fragment_project_id(fragment: &str) -> Option<ProjectId> {
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
    form_urlencoded::parse(fragment.as_bytes())
        .find(|(key, _)| key == FRAGMENT_KEY)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(ProjectId::from)
}

/// Fragment addressing a project, without the leading `#`
#[must_use]
pub fn fragment_for(id: &ProjectId) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair(FRAGMENT_KEY, id.as_str())
        .finish()
}

/// In-process location that counts replacements
#[derive(Debug, Default)]
pub struct MemoryLocation {
    fragment: Mutex<Option<String>>,
    replacements: AtomicUsize,
}

impl MemoryLocation {
    /// Location with no fragment
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Location opened with a fragment, with or without the leading `#`
    #[must_use]
    pub fn with_fragment(fragment: &str) -> Self {
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
        Self {
            fragment: Mutex::new(Some(fragment.to_string()).filter(|f| !f.is_empty())),
            replacements: AtomicUsize::new(0),
        }
    }

    /// Number of fragment writes so far
    #[inline]
    #[must_use]
    pub fn replacements(&self) -> usize {
        self.replacements.load(Ordering::SeqCst)
    }
}

impl Location for MemoryLocation {
    fn fragment(&self) -> Option<String> {
        self.fragment.lock().clone()
    }

    fn replace_fragment(&self, fragment: &str) {
        *self.fragment.lock() = Some(fragment.to_string());
        self.replacements.fetch_add(1, Ordering::SeqCst);
    }

    fn clear_fragment(&self) {
        if self.fragment.lock().take().is_some() {
            self.replacements.fetch_add(1, Ordering::SeqCst);
        }
    }
}
