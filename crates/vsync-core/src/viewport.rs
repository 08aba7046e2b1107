//! Viewport and volume identifiers

use std::fmt;
use serde::{Deserialize, Serialize};

/// Identifies one render target inside one rendering-engine instance.
///
/// Synchronizers only ever hold these ids; the live viewport is resolved
/// through the [`RenderingLayer`](crate::RenderingLayer) each time state is
/// read or written, so a torn-down viewport surfaces as an error instead of
/// a dangling handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewportRef {
    pub rendering_engine_id: String,
    pub viewport_id: String,
}

impl ViewportRef {
    pub fn new(rendering_engine_id: impl Into<String>, viewport_id: impl Into<String>) -> Self {
        Self {
            rendering_engine_id: rendering_engine_id.into(),
            viewport_id: viewport_id.into(),
        }
    }
}

impl fmt::Display for ViewportRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.rendering_engine_id, self.viewport_id)
    }
}

/// Identifier of a volume rendered by a viewport (e.g. the CT or PET volume
/// of a fusion viewport)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VolumeId(pub String);

impl VolumeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VolumeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_structural_equality() {
        let a = ViewportRef::new("engine", "CT_AXIAL");
        let b = ViewportRef::new("engine".to_string(), "CT_AXIAL".to_string());
        let other_engine = ViewportRef::new("engine-2", "CT_AXIAL");

        assert_eq!(a, b);
        assert_ne!(a, other_engine);

        let set: HashSet<_> = [a.clone(), b, other_engine].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_eq!(a.to_string(), "engine/CT_AXIAL");
    }

    #[test]
    fn test_ref_rejects_unknown_fields() {
        let ok: ViewportRef =
            serde_json::from_str(r#"{"rendering_engine_id":"e","viewport_id":"v"}"#).unwrap();
        assert_eq!(ok, ViewportRef::new("e", "v"));

        let bad = serde_json::from_str::<ViewportRef>(
            r#"{"rendering_engine_id":"e","viewport_id":"v","element":"div"}"#,
        );
        assert!(bad.is_err());
    }
}
