use std::fmt;
use std::path::Path;

use crate::error::MaskpackError;

/// The fixed class vocabulary of the detection dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MaskClass {
    /// Mask worn correctly.
    Good,
    /// Mask worn incorrectly.
    Bad,
    /// No mask.
    None,
}

impl MaskClass {
    pub const ALL: [MaskClass; 3] = [MaskClass::Good, MaskClass::Bad, MaskClass::None];

    /// Integer code stored in the cropped container.
    pub fn code(self) -> i8 {
        match self {
            MaskClass::Good => 0,
            MaskClass::Bad => 1,
            MaskClass::None => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MaskClass::Good => "good",
            MaskClass::Bad => "bad",
            MaskClass::None => "none",
        }
    }

    pub fn from_code(code: i8) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.code() == code)
    }

    /// Map an annotation class name, reporting `source` on failure.
    pub fn from_name(name: &str, source: &Path) -> Result<Self, MaskpackError> {
        match name {
            "good" => Ok(MaskClass::Good),
            "bad" => Ok(MaskClass::Bad),
            "none" => Ok(MaskClass::None),
            other => Err(MaskpackError::UnknownClassLabel {
                path: source.to_path_buf(),
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for MaskClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
