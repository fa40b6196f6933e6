use thiserror::Error;
use wasm_bindgen::JsValue;

/// Every way a GPX read or write can fail.
///
/// Decoding fails only when the source cannot be read as XML or when the
/// root element is missing. Individual fields that do not parse are not
/// errors; they decode as absent.
#[derive(Debug, Error)]
pub enum GpxError {
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("failed to read GPX source: {0}")]
    Read(#[from] std::io::Error),

    #[error("document ended inside <{element}>")]
    UnexpectedEof { element: String },

    #[error("document has no root element")]
    MissingRoot,

    #[error("expected <gpx> root element, found <{found}>")]
    InvalidRoot { found: String },

    #[error("failed to write GPX: {0}")]
    Write(String),

    #[error("invalid document value: {0}")]
    Json(String),
}

impl GpxError {
    /// The source could not be read or is not well-formed XML.
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            Self::Xml(_) | Self::Read(_) | Self::UnexpectedEof { .. }
        )
    }

    /// The source is XML but not a GPX document.
    pub fn is_structure_error(&self) -> bool {
        matches!(self, Self::MissingRoot | Self::InvalidRoot { .. })
    }
}

impl From<quick_xml::events::attributes::AttrError> for GpxError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(e.into())
    }
}

impl From<serde_wasm_bindgen::Error> for GpxError {
    fn from(e: serde_wasm_bindgen::Error) -> Self {
        Self::Json(e.to_string())
    }
}

impl From<GpxError> for JsValue {
    fn from(e: GpxError) -> Self {
        js_sys::Error::new(&e.to_string()).into()
    }
}
