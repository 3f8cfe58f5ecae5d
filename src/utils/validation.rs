use std::collections::HashMap;
use crate::core::JobDescriptor;
use crate::utils::ConfigurationError;

/// Rejects a concurrency limit below one
pub fn validate_concurrency(limit: usize) -> Result<(), ConfigurationError> {
    if limit == 0 {
        return Err(ConfigurationError::InvalidConcurrency(limit));
    }
    Ok(())
}

/// Structural checks on the descriptor list. Runs before any job starts.
///
/// File existence is not checked here: a missing input is a per-job failure.
/// Two outputs resolving to the same file (case-insensitively) are rejected,
/// since the jobs would overwrite each other.
pub fn validate_descriptors(descriptors: &[JobDescriptor]) -> Result<(), ConfigurationError> {
    let mut claimed: HashMap<String, usize> = HashMap::new();

    for (index, descriptor) in descriptors.iter().enumerate() {
        if descriptor.id.trim().is_empty() {
            return Err(ConfigurationError::malformed(index, "empty id"));
        }

        if descriptor.input_locator.trim().is_empty() {
            return Err(ConfigurationError::malformed(index, "empty input locator"));
        }

        if descriptor.options.outputs.is_empty() {
            return Err(ConfigurationError::malformed(index, "no output targets"));
        }

        for target in &descriptor.options.outputs {
            target
                .validate()
                .map_err(|e| ConfigurationError::malformed(index, e.to_string()))?;
        }

        if descriptor.options.resize.size == Some(0) {
            return Err(ConfigurationError::malformed(index, "resize size cannot be 0"));
        }

        for path in descriptor.output_paths() {
            let key = path.to_string_lossy().to_lowercase();
            if let Some(owner) = claimed.insert(key, index) {
                return Err(ConfigurationError::malformed(
                    index,
                    format!("output {} is also written by descriptor {}", path.display(), owner),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{JobOptions, OutputTarget};

    fn descriptor(id: &str, input: &str) -> JobDescriptor {
        JobDescriptor::new(id, input, "/out", JobOptions::default())
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        assert_eq!(validate_concurrency(0), Err(ConfigurationError::InvalidConcurrency(0)));
        assert!(validate_concurrency(1).is_ok());
    }

    #[test]
    fn empty_id_or_locator_is_malformed() {
        let list = vec![descriptor("a", "a.png"), descriptor(" ", "b.png")];
        assert_eq!(
            validate_descriptors(&list),
            Err(ConfigurationError::malformed(1, "empty id"))
        );

        let list = vec![descriptor("a", "")];
        assert_eq!(
            validate_descriptors(&list),
            Err(ConfigurationError::malformed(0, "empty input locator"))
        );
    }

    #[test]
    fn bad_output_options_are_malformed() {
        let mut d = descriptor("a", "a.png");
        d.options.outputs = vec![OutputTarget::Jpeg { quality: 0 }];
        assert!(matches!(
            validate_descriptors(&[d]),
            Err(ConfigurationError::MalformedDescriptor { index: 0, .. })
        ));

        let mut d = descriptor("a", "a.png");
        d.options.outputs.clear();
        assert!(validate_descriptors(&[d]).is_err());
    }

    #[test]
    fn shared_output_files_are_malformed() {
        let list = vec![descriptor("a.png", "/in/a.png"), descriptor("a.bmp", "/in/a.bmp")];
        assert_eq!(
            validate_descriptors(&list),
            Err(ConfigurationError::malformed(1, "output /out/a.tiff is also written by descriptor 0"))
        );

        let mut twice = descriptor("a", "a.png");
        twice.options.outputs = vec![OutputTarget::Jpeg { quality: 80 }, OutputTarget::Jpeg { quality: 60 }];
        assert!(matches!(
            validate_descriptors(&[twice]),
            Err(ConfigurationError::MalformedDescriptor { index: 0, .. })
        ));

        let renamed = vec![
            descriptor("a.png", "/in/a.png").with_output_stem("a_png"),
            descriptor("a.bmp", "/in/a.bmp").with_output_stem("a_bmp"),
        ];
        assert!(validate_descriptors(&renamed).is_ok());
    }

    #[test]
    fn empty_list_is_valid() {
        assert!(validate_descriptors(&[]).is_ok());
    }
}
