//! Unit tests for the configlet reconciler

#[cfg(test)]
mod tests {
    use crate::reconciler::ReconcilerOptions;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_creates_missing_configlet() {
        let mock = mock();
        let state = state("configlets:\n  base: \"hostname base\\n\"\n");

        let result = reconciler(&mock, ReconcilerOptions::default())
            .reconcile_configlets(&state)
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.list, vec!["base"]);
        assert_eq!(mock.calls_to("add_configlet"), vec!["add_configlet:base"]);
        assert_eq!(mock.configlet_by_name("base").unwrap().config, "hostname base\n");
        assert!(result.diff["base"].contains("+hostname base"));
    }

    #[tokio::test]
    async fn test_updates_drifted_configlet_and_reports_tasks() {
        let mock = mock();
        mock.seed_device("leaf1", "SN-1", "Undefined");
        mock.seed_configlet("base", "hostname old\n");
        mock.attach_to_device("leaf1", &["base"]);

        let state = state("configlets:\n  base: \"hostname new\\n\"\n");
        let result = reconciler(&mock, ReconcilerOptions::default())
            .reconcile_configlets(&state)
            .await
            .unwrap();

        assert!(result.changed);
        assert_eq!(mock.calls_to("update_configlet"), vec!["update_configlet:base"]);
        assert_eq!(mock.configlet_by_name("base").unwrap().config, "hostname new\n");
        assert_eq!(result.task_ids.len(), 1);

        let diff = &result.diff["base"];
        assert!(diff.contains("-hostname old"));
        assert!(diff.contains("+hostname new"));
    }

    #[tokio::test]
    async fn test_whitespace_drift_is_not_a_change() {
        let mock = mock();
        mock.seed_configlet("base", "hostname base   \r\n\n");

        let state = state("configlets:\n  base: \"hostname base\\n\"\n");
        let result = reconciler(&mock, ReconcilerOptions::default())
            .reconcile_configlets(&state)
            .await
            .unwrap();

        assert!(!result.changed);
        assert!(result.diff.is_empty());
        assert!(mutating_calls(&mock).is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_reports_without_changing() {
        let mock = mock();
        mock.seed_configlet("base", "hostname old\n");

        let state = state("configlets:\n  base: \"hostname new\\n\"\n  ntp: \"ntp server 10.0.0.1\\n\"\n");
        let result = reconciler(&mock, dry_run())
            .reconcile_configlets(&state)
            .await
            .unwrap();

        assert!(result.changed);
        assert_eq!(result.list, vec!["base", "ntp"]);
        assert_eq!(result.diff.len(), 2);
        assert!(mutating_calls(&mock).is_empty());
        assert_eq!(mock.configlet_by_name("base").unwrap().config, "hostname old\n");
        assert!(mock.configlet_by_name("ntp").is_none());
    }

    #[tokio::test]
    async fn test_absent_keeps_configlets_still_in_use() {
        let mock = mock();
        mock.seed_container("Leafs", "Tenant");
        mock.seed_device("leaf1", "SN-1", "Undefined");
        mock.seed_configlet("on-device", "a\n");
        mock.seed_configlet("on-container", "b\n");
        mock.seed_configlet("unused", "c\n");
        mock.attach_to_device("leaf1", &["on-device"]);
        mock.attach_to_container("Leafs", &["on-container"]);

        let state = state(
            "state: absent\nconfiglets:\n  on-device: \"\"\n  on-container: \"\"\n  unused: \"\"\n  never-existed: \"\"\n",
        );
        let result = reconciler(&mock, ReconcilerOptions::default())
            .reconcile_configlets(&state)
            .await
            .unwrap();

        assert_eq!(result.list, vec!["unused"]);
        assert_eq!(mock.calls_to("delete_configlet"), vec!["delete_configlet:unused"]);
        assert!(mock.configlet_by_name("on-device").is_some());
        assert!(mock.configlet_by_name("on-container").is_some());
        assert_eq!(result.messages.len(), 2);
        assert!(result.messages.iter().any(|m| m.contains("leaf1")));
        assert!(result.messages.iter().any(|m| m.contains("Leafs")));
    }
}
