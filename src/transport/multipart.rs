//! `multipart/form-data` request descriptions for file uploads.
//!
//! The form is kept as plain data so any [`Transport`](super::Transport) can
//! inspect it; [`UreqTransport`](super::UreqTransport) encodes it with
//! `ureq`'s multipart support.

/// One field of a multipart form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// The fields of a multipart form, in order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file field.
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        self.parts.push(FormPart {
            name: name.into(),
            file_name: Some(file_name.into()),
            content_type: Some(content_type.into()),
            data,
        });
        self
    }

    /// Iterates the parts in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = &FormPart> {
        self.parts.iter()
    }

    /// Finds a part by field name.
    pub fn part(&self, name: &str) -> Option<&FormPart> {
        self.parts.iter().find(|p| p.name == name)
    }
}
