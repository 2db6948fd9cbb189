//! Declared image bundles

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImageBundleSpec {
    pub name: String,

    /// Image names, in bundle order
    #[serde(default)]
    pub images: Vec<String>,

    #[serde(default)]
    pub certified: bool,

    /// Local image files to upload before the bundle is saved
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uploads: Vec<String>,
}

impl ImageBundleSpec {
    /// Declared images followed by the file names of uploads not already listed
    pub fn image_names(&self) -> Vec<String> {
        let mut names = self.images.clone();
        for upload in &self.uploads {
            let file = std::path::Path::new(upload)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(upload)
                .to_string();
            if !names.contains(&file) {
                names.push(file);
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_names_include_uploads_once() {
        let bundle = ImageBundleSpec {
            name: "EOS-4.30".to_string(),
            images: vec!["EOS-4.30.1F.swi".to_string()],
            certified: false,
            uploads: vec![
                "/srv/images/EOS-4.30.1F.swi".to_string(),
                "/srv/images/TerminAttr-1.26.rpm".to_string(),
            ],
        };
        assert_eq!(bundle.image_names(), vec!["EOS-4.30.1F.swi", "TerminAttr-1.26.rpm"]);
    }
}
