//! Unit tests for the container reconciler

#[cfg(test)]
mod tests {
    use crate::error::ControllerError;
    use crate::reconciler::ReconcilerOptions;
    use crate::test_utils::*;
    use cvp_state::ContainerMode;

    const TREE: &str = r#"
containers:
  Spines: { parentContainerName: DC1 }
  Leafs: { parentContainerName: DC1 }
  DC1: { parentContainerName: Tenant }
"#;

    #[tokio::test]
    async fn test_creates_parents_before_children() {
        let mock = mock();
        let state = state(TREE);

        let result = reconciler(&mock, ReconcilerOptions::default())
            .reconcile_containers(&state, &tree(&state))
            .await
            .unwrap();

        assert!(result.success, "{:?}", result);
        assert_eq!(
            mock.calls_to("add_container"),
            vec!["add_container:DC1", "add_container:Leafs", "add_container:Spines"]
        );
        assert_eq!(
            mock.container_by_name("Leafs").unwrap().parent_name.as_deref(),
            Some("DC1")
        );
        assert_eq!(result.list, vec!["DC1", "Leafs", "Spines"]);
    }

    #[tokio::test]
    async fn test_existing_containers_are_left_alone() {
        let mock = mock();
        mock.seed_container("DC1", "Tenant");
        mock.seed_container("Leafs", "DC1");
        let state = state(TREE);

        let result = reconciler(&mock, ReconcilerOptions::default())
            .reconcile_containers(&state, &tree(&state))
            .await
            .unwrap();

        assert_eq!(mock.calls_to("add_container"), vec!["add_container:Spines"]);
        assert_eq!(result.count, 1);
    }

    #[tokio::test]
    async fn test_missing_anchor_is_an_error() {
        let mock = mock();
        let state = state("containers:\n  DC1: { parentContainerName: Pod9 }\n");

        let err = reconciler(&mock, ReconcilerOptions::default())
            .reconcile_containers(&state, &tree(&state))
            .await
            .unwrap_err();

        assert!(matches!(err, ControllerError::ContainerNotFound(msg) if msg.contains("Pod9")));
        assert!(mutating_calls(&mock).is_empty());
    }

    #[tokio::test]
    async fn test_merge_mode_only_attaches() {
        let mock = mock();
        mock.seed_container("Leafs", "Tenant");
        mock.seed_configlet("base", "a\n");
        mock.seed_configlet("legacy", "b\n");
        mock.attach_to_container("Leafs", &["legacy"]);

        let state = state("containers:\n  Leafs: { parentContainerName: Tenant, configlets: [base] }\n");
        reconciler(&mock, ReconcilerOptions::default())
            .reconcile_containers(&state, &tree(&state))
            .await
            .unwrap();

        assert_eq!(mock.container_configlet_names("Leafs"), vec!["legacy", "base"]);
        assert!(mock.calls_to("remove_configlets_from_container").is_empty());
    }

    #[tokio::test]
    async fn test_override_mode_detaches_undeclared() {
        let mock = mock();
        mock.seed_container("Leafs", "Tenant");
        mock.seed_configlet("base", "a\n");
        mock.seed_configlet("legacy", "b\n");
        mock.attach_to_container("Leafs", &["legacy"]);

        let state = state("containers:\n  Leafs: { parentContainerName: Tenant, configlets: [base] }\n");
        let options = ReconcilerOptions {
            container_mode: ContainerMode::Override,
            ..Default::default()
        };
        let result = reconciler(&mock, options)
            .reconcile_containers(&state, &tree(&state))
            .await
            .unwrap();

        assert_eq!(mock.container_configlet_names("Leafs"), vec!["base"]);
        assert_eq!(
            mock.calls_to("remove_configlets_from_container"),
            vec!["remove_configlets_from_container:Leafs:legacy"]
        );
        assert_eq!(result.list, vec!["Leafs: +base", "Leafs: -legacy"]);
    }

    #[tokio::test]
    async fn test_listed_devices_are_moved_in() {
        let mock = mock();
        mock.seed_container("Leafs", "Tenant");
        mock.seed_device("leaf1", "SN-1", "Undefined");

        let state = state("containers:\n  Leafs: { parentContainerName: Tenant, devices: [leaf1] }\n");
        let result = reconciler(&mock, ReconcilerOptions::default())
            .reconcile_containers(&state, &tree(&state))
            .await
            .unwrap();

        assert_eq!(mock.device_by_hostname("leaf1").unwrap().parent_container_name, "Leafs");
        assert_eq!(result.task_ids.len(), 1);
        assert_eq!(result.list, vec!["leaf1 -> Leafs"]);
    }

    #[tokio::test]
    async fn test_container_image_bundle_reaches_member_devices() {
        let mock = mock();
        mock.seed_container("Leafs", "Tenant");
        mock.seed_device("leaf1", "SN-1", "Leafs");
        mock.seed_device("leaf2", "SN-2", "Leafs");
        mock.seed_image("EOS-4.30.1F.swi");
        mock.seed_image_bundle("EOS-4.30", &["EOS-4.30.1F.swi"]);
        mock.attach_bundle_to_device("leaf2", "EOS-4.30");

        let state = state("containers:\n  Leafs: { parentContainerName: Tenant, imageBundle: EOS-4.30 }\n");
        reconciler(&mock, ReconcilerOptions::default())
            .reconcile_containers(&state, &tree(&state))
            .await
            .unwrap();

        assert_eq!(
            mock.calls_to("apply_image_bundle_to_device"),
            vec!["apply_image_bundle_to_device:leaf1:EOS-4.30"]
        );
        assert_eq!(mock.device_bundle("leaf1").as_deref(), Some("EOS-4.30"));
    }

    #[tokio::test]
    async fn test_dry_run_plans_new_containers_and_their_configlets() {
        let mock = mock();
        mock.seed_configlet("base", "a\n");

        let state = state(
            "containers:\n  DC1: { parentContainerName: Tenant }\n  Leafs: { parentContainerName: DC1, configlets: [base] }\n",
        );
        let result = reconciler(&mock, dry_run())
            .reconcile_containers(&state, &tree(&state))
            .await
            .unwrap();

        assert!(mutating_calls(&mock).is_empty());
        assert_eq!(result.list, vec!["DC1", "Leafs", "Leafs: +base"]);
        assert!(mock.container_by_name("DC1").is_none());
    }

    #[tokio::test]
    async fn test_delete_mode_removes_children_first() {
        let mock = mock();
        mock.seed_container("DC1", "Tenant");
        mock.seed_container("Leafs", "DC1");
        mock.seed_container("Spines", "DC1");

        let state = state(TREE);
        let options = ReconcilerOptions {
            container_mode: ContainerMode::Delete,
            ..Default::default()
        };
        let result = reconciler(&mock, options)
            .reconcile_containers(&state, &tree(&state))
            .await
            .unwrap();

        assert!(result.success, "{:?}", result);
        assert_eq!(
            mock.calls_to("delete_container"),
            vec!["delete_container:Spines", "delete_container:Leafs", "delete_container:DC1"]
        );
        assert!(mock.container_by_name("DC1").is_none());
    }

    #[tokio::test]
    async fn test_parent_with_undeclared_child_is_not_deleted() {
        let mock = mock();
        mock.seed_container("DC1", "Tenant");
        mock.seed_container("Leafs", "DC1");
        mock.seed_container("Other", "DC1");

        let state = state("containers:\n  DC1: { parentContainerName: Tenant }\n  Leafs: { parentContainerName: DC1 }\n");
        let options = ReconcilerOptions {
            container_mode: ContainerMode::Delete,
            ..Default::default()
        };
        let result = reconciler(&mock, options)
            .reconcile_containers(&state, &tree(&state))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(mock.calls_to("delete_container"), vec!["delete_container:Leafs"]);
        assert_eq!(result.list, vec!["Leafs"]);
        assert!(result.messages[0].contains("Other"));
        assert!(mock.container_by_name("DC1").is_some());
    }

    #[tokio::test]
    async fn test_delete_mode_skips_containers_missing_from_cvp() {
        let mock = mock();
        mock.seed_container("DC1", "Tenant");

        let state = state(TREE);
        let options = ReconcilerOptions {
            container_mode: ContainerMode::Delete,
            ..Default::default()
        };
        let result = reconciler(&mock, options)
            .reconcile_containers(&state, &tree(&state))
            .await
            .unwrap();

        assert!(result.success, "{:?}", result);
        assert!(result.messages.is_empty());
        assert_eq!(mock.calls_to("delete_container"), vec!["delete_container:DC1"]);
        assert_eq!(result.list, vec!["DC1"]);
    }

    #[tokio::test]
    async fn test_containers_holding_devices_are_not_deleted() {
        let mock = mock();
        mock.seed_container("DC1", "Tenant");
        mock.seed_container("Leafs", "DC1");
        mock.seed_device("leaf1", "SN-1", "Leafs");

        let state = state(
            "state: absent\ncontainers:\n  DC1: { parentContainerName: Tenant }\n  Leafs: { parentContainerName: DC1 }\n",
        );
        let result = reconciler(&mock, ReconcilerOptions::default())
            .reconcile_containers(&state, &tree(&state))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(mock.calls_to("delete_container").is_empty());
        assert_eq!(result.messages.len(), 2);
        assert!(result.messages[0].contains("leaf1"));
        assert!(result.messages[1].contains("Leafs"));
    }
}
