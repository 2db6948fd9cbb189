//! Unit tests for the image bundle reconciler

#[cfg(test)]
mod tests {
    use crate::error::ControllerError;
    use crate::reconciler::ReconcilerOptions;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_creates_bundle_from_uploaded_images() {
        let mock = mock();
        mock.seed_image("EOS-4.30.1F.swi");
        mock.seed_image("TerminAttr-1.26.swix");

        let state = state(
            "imageBundles:\n  - name: EOS-4.30\n    images: [EOS-4.30.1F.swi, TerminAttr-1.26.swix]\n    certified: true\n",
        );
        let result = reconciler(&mock, ReconcilerOptions::default())
            .reconcile_image_bundles(&state)
            .await
            .unwrap();

        assert_eq!(result.list, vec!["EOS-4.30"]);
        assert_eq!(mock.calls_to("add_image_bundle"), vec!["add_image_bundle:EOS-4.30"]);
        let bundle = mock.image_bundle_by_name("EOS-4.30").unwrap();
        assert!(bundle.is_certified);
        assert_eq!(bundle.image_names(), vec!["EOS-4.30.1F.swi", "TerminAttr-1.26.swix"]);
    }

    #[tokio::test]
    async fn test_updates_bundle_when_images_differ() {
        let mock = mock();
        mock.seed_image("EOS-4.29.swi");
        mock.seed_image("EOS-4.30.1F.swi");
        mock.seed_image_bundle("EOS", &["EOS-4.29.swi"]);

        let state = state("imageBundles:\n  - name: EOS\n    images: [EOS-4.30.1F.swi]\n");
        let result = reconciler(&mock, ReconcilerOptions::default())
            .reconcile_image_bundles(&state)
            .await
            .unwrap();

        assert_eq!(mock.calls_to("update_image_bundle"), vec!["update_image_bundle:EOS"]);
        assert!(result.diff["EOS"].contains("+ EOS-4.30.1F.swi"));
        assert!(result.diff["EOS"].contains("- EOS-4.29.swi"));
    }

    #[tokio::test]
    async fn test_matching_bundle_is_untouched() {
        let mock = mock();
        mock.seed_image("EOS-4.30.1F.swi");
        mock.seed_image_bundle("EOS", &["EOS-4.30.1F.swi"]);

        let state = state("imageBundles:\n  - name: EOS\n    images: [EOS-4.30.1F.swi]\n");
        let result = reconciler(&mock, ReconcilerOptions::default())
            .reconcile_image_bundles(&state)
            .await
            .unwrap();

        assert!(!result.changed);
        assert!(mutating_calls(&mock).is_empty());
    }

    #[tokio::test]
    async fn test_reordered_images_are_not_an_update() {
        let mock = mock();
        mock.seed_image("EOS-4.30.1F.swi");
        mock.seed_image("TerminAttr-1.26.swix");
        mock.seed_image_bundle("EOS", &["EOS-4.30.1F.swi", "TerminAttr-1.26.swix"]);

        let state = state("imageBundles:\n  - name: EOS\n    images: [TerminAttr-1.26.swix, EOS-4.30.1F.swi]\n");
        let result = reconciler(&mock, ReconcilerOptions::default())
            .reconcile_image_bundles(&state)
            .await
            .unwrap();

        assert!(!result.changed);
        assert!(result.diff.is_empty());
        assert!(mock.calls_to("update_image_bundle").is_empty());
    }

    #[tokio::test]
    async fn test_local_images_are_uploaded_first() {
        let path = std::env::temp_dir().join(format!("cvp-image-{}.swi", std::process::id()));
        std::fs::write(&path, b"not really an image").unwrap();
        let file_name = path.file_name().unwrap().to_str().unwrap().to_string();

        let mock = mock();
        let state = state(&format!(
            "imageBundles:\n  - name: EOS\n    uploads: [\"{}\"]\n",
            path.display()
        ));
        let result = reconciler(&mock, ReconcilerOptions::default())
            .reconcile_image_bundles(&state)
            .await;
        std::fs::remove_file(&path).ok();
        let result = result.unwrap();

        assert_eq!(
            mock.calls_to("upload_image"),
            vec![format!("upload_image:{}", file_name)]
        );
        assert_eq!(result.list, vec![format!("upload:{}", file_name), "EOS".to_string()]);
        assert_eq!(mock.image_bundle_by_name("EOS").unwrap().image_names(), vec![file_name]);
    }

    #[tokio::test]
    async fn test_unknown_image_is_an_error() {
        let mock = mock();
        let state = state("imageBundles:\n  - name: EOS\n    images: [missing.swi]\n");

        let err = reconciler(&mock, ReconcilerOptions::default())
            .reconcile_image_bundles(&state)
            .await
            .unwrap_err();

        assert!(matches!(err, ControllerError::ImageNotFound(name) if name == "missing.swi"));
        assert!(mutating_calls(&mock).is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_tolerates_images_not_uploaded_yet() {
        let mock = mock();
        let state = state("imageBundles:\n  - name: EOS\n    uploads: [/var/images/EOS-4.31.swi]\n");

        let result = reconciler(&mock, dry_run())
            .reconcile_image_bundles(&state)
            .await
            .unwrap();

        assert_eq!(result.list, vec!["upload:EOS-4.31.swi", "EOS"]);
        assert!(mutating_calls(&mock).is_empty());
    }

    #[tokio::test]
    async fn test_absent_keeps_bundles_in_use() {
        let mock = mock();
        mock.seed_device("leaf1", "SN-1", "Undefined");
        mock.seed_image("EOS-4.30.1F.swi");
        mock.seed_image_bundle("in-use", &["EOS-4.30.1F.swi"]);
        mock.seed_image_bundle("unused", &["EOS-4.30.1F.swi"]);
        mock.attach_bundle_to_device("leaf1", "in-use");

        let state = state("state: absent\nimageBundles:\n  - name: in-use\n  - name: unused\n");
        let result = reconciler(&mock, ReconcilerOptions::default())
            .reconcile_image_bundles(&state)
            .await
            .unwrap();

        assert_eq!(result.list, vec!["unused"]);
        assert_eq!(mock.calls_to("delete_image_bundle"), vec!["delete_image_bundle:unused"]);
        assert_eq!(result.messages.len(), 1);
        assert!(result.messages[0].contains("leaf1"));
    }
}
