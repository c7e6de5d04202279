use bstr::BString;

/// A blob object: opaque file content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub data: BString,
}

impl Blob {
    /// A blob's payload is its content, verbatim.
    pub fn parse(payload: &[u8]) -> Self {
        Self {
            data: BString::from(payload),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
