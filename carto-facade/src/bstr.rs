//! Length-prefixed byte container used at every boundary that crosses into
//! or out of the facade: point-cloud payloads, serialized map state.
//!
//! In the original C ABI this wrapped a `bstring` so that binary data with
//! embedded zero bytes could survive a NUL-terminated-string interface. A
//! Rust API has no such problem, but the type is kept — as `BString`, a thin
//! newtype over [`bytes::Bytes`] — so that the data model in `spec.md` §4.1
//! has a direct, cheaply-cloneable counterpart that callers can cache
//! (`latest_pointcloud_map`) without copying.

use bytes::Bytes;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BString(Bytes);

impl BString {
    pub fn empty() -> Self {
        BString(Bytes::new())
    }

    pub fn from_vec(bytes: Vec<u8>) -> Self {
        BString(Bytes::from(bytes))
    }

    pub fn from_static_str(s: &'static str) -> Self {
        BString(Bytes::from_static(s.as_bytes()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<&str> for BString {
    fn from(s: &str) -> Self {
        BString(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for BString {
    fn from(s: String) -> Self {
        BString(Bytes::from(s.into_bytes()))
    }
}

impl From<Vec<u8>> for BString {
    fn from(v: Vec<u8>) -> Self {
        BString::from_vec(v)
    }
}

impl From<&[u8]> for BString {
    fn from(v: &[u8]) -> Self {
        BString(Bytes::copy_from_slice(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_empty() {
        assert!(BString::empty().is_empty());
        assert_eq!(BString::empty().len(), 0);
    }

    #[test]
    fn clone_is_cheap_and_preserves_contents() {
        let original = BString::from_vec(vec![0u8, 1, 2, 0, 3]);
        let cloned = original.clone();
        assert_eq!(original.as_bytes(), cloned.as_bytes());
        // zero bytes must survive, unlike a NUL-terminated C string would.
        assert_eq!(cloned.as_bytes(), &[0u8, 1, 2, 0, 3]);
    }
}
