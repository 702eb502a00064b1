//! Saved dictionary images.
//!
//! An image is three bincode records written back to back: a header naming the format and its
//! version, the function dictionary, then the constant dictionary.  The two dictionaries are
//! always saved and loaded together.  Images are only guaranteed to load in the build that wrote
//! them, a version bump makes older images fail loudly instead of loading garbage.

use crate::runtime::data_structures::function_dictionary::{
    ConstantDictionary, FunctionDictionary,
};
use serde::{Deserialize, Serialize};

/// Marks the start of every image.
pub const IMAGE_MAGIC: [u8; 4] = *b"SLDI";

/// Current image format version.
pub const IMAGE_VERSION: u32 = 1;

/// Errors that can occur while writing or reading an image.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("serialization failed: {0}")]
    Serialize(String),
    #[error("deserialization failed: {0}")]
    Deserialize(String),
    #[error("data is not a dictionary image")]
    BadMagic,
    #[error("version mismatch: image v{found}, runtime v{expected}")]
    VersionMismatch { expected: u32, found: u32 },
}

#[derive(Serialize, Deserialize)]
struct ImageHeader {
    magic: [u8; 4],
    version: u32,
}

/// The function and constant dictionaries read back from an image.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DictionaryImage {
    pub functions: FunctionDictionary,
    pub constants: ConstantDictionary,
}

impl DictionaryImage {
    /// Write both dictionaries as one image.
    pub fn serialize(
        functions: &FunctionDictionary,
        constants: &ConstantDictionary,
    ) -> Result<Vec<u8>, ImageError> {
        let header = ImageHeader {
            magic: IMAGE_MAGIC,
            version: IMAGE_VERSION,
        };
        let mut bytes = Vec::new();

        bincode::serialize_into(&mut bytes, &header)
            .and_then(|_| bincode::serialize_into(&mut bytes, functions))
            .and_then(|_| bincode::serialize_into(&mut bytes, constants))
            .map_err(|e| ImageError::Serialize(e.to_string()))?;

        Ok(bytes)
    }

    /// Read an image, checking the header first.
    pub fn deserialize(bytes: &[u8]) -> Result<DictionaryImage, ImageError> {
        let mut reader = bytes;

        let header: ImageHeader = bincode::deserialize_from(&mut reader)
            .map_err(|e| ImageError::Deserialize(e.to_string()))?;

        if header.magic != IMAGE_MAGIC {
            return Err(ImageError::BadMagic);
        }

        if header.version != IMAGE_VERSION {
            return Err(ImageError::VersionMismatch {
                expected: IMAGE_VERSION,
                found: header.version,
            });
        }

        let functions = bincode::deserialize_from(&mut reader)
            .map_err(|e| ImageError::Deserialize(e.to_string()))?;
        let constants = bincode::deserialize_from(&mut reader)
            .map_err(|e| ImageError::Deserialize(e.to_string()))?;

        Ok(DictionaryImage {
            functions,
            constants,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::data_structures::function_dictionary::Functor;

    #[test]
    fn rejects_foreign_and_future_images() {
        let mut future = Vec::new();
        bincode::serialize_into(
            &mut future,
            &ImageHeader {
                magic: IMAGE_MAGIC,
                version: IMAGE_VERSION + 1,
            },
        )
        .unwrap();

        assert!(matches!(
            DictionaryImage::deserialize(&future),
            Err(ImageError::VersionMismatch { found, .. }) if found == IMAGE_VERSION + 1
        ));

        let mut foreign = Vec::new();
        bincode::serialize_into(&mut foreign, &ImageHeader { magic: *b"NOPE", version: 1 })
            .unwrap();

        assert!(matches!(DictionaryImage::deserialize(&foreign), Err(ImageError::BadMagic)));
        assert!(matches!(DictionaryImage::deserialize(&[1, 2]), Err(ImageError::Deserialize(_))));
    }

    #[test]
    fn truncated_image_fails() {
        let mut functions = FunctionDictionary::new();
        functions.define("f", Functor::new(vec!["a".into()], "put @@a".into()));

        let bytes = DictionaryImage::serialize(&functions, &ConstantDictionary::new()).unwrap();

        assert!(DictionaryImage::deserialize(&bytes[..bytes.len() - 1]).is_err());
    }
}
