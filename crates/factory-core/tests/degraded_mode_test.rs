//! Degraded mode: every stand-in answers with the same interface as the real collaborator.

use std::path::Path;

use factory_core::{
    Block, Collaborators, EnvInfo, FactoryConfig, FallbackDataHubTab, FallbackHubWriter,
    HubWriter, LiveCollaborators, OfflineWorkflowClient, Origin, RenderContext, Secrets, Session,
    TabRenderer, WorkflowClient, WorkflowSettings,
};

#[tokio::test]
async fn offline_workflow_client_is_inert_for_arbitrary_settings() {
    let cases = [
        ("", None),
        ("http://localhost:5678", Some("")),
        ("https://automation.example.org/", Some("n8n_api_123")),
        ("ftp://[::1]:21", Some("\u{1F511}")),
    ];
    for (url, key) in cases {
        let client = OfflineWorkflowClient::new(&WorkflowSettings {
            base_url: url.to_string(),
            api_key: key.map(str::to_string),
        });
        assert!(!client.test_connection().await);
        let workflows = client.get_workflow_statistics().await.unwrap();
        assert_eq!((workflows.total_workflows, workflows.active_workflows), (0, 0));
        let executions = client.get_execution_statistics().await.unwrap();
        assert_eq!((executions.total_executions, executions.successful), (0, 0));
        assert!(executions.executions.is_empty());
        assert!(client.get_workflows().await.unwrap().is_empty());
    }
}

#[test]
fn fallback_hub_writer_rejects_everything() {
    let writer = FallbackHubWriter;
    for (title, content, category) in [
        ("", "", ""),
        ("Plan: Demo", "Request from user: build it", "Research"),
        ("File: main.rs", "```rs\nfn main() {}\n```", "Source Code"),
    ] {
        assert!(!writer.add_to_hub(title, content, category));
    }
}

#[test]
fn diagnostics_are_hidden_until_opted_in() {
    let search_path: Vec<_> = (0..8).map(|i| Path::new("/opt/mods").join(i.to_string())).collect();
    let env = EnvInfo::from_file(Path::new("/srv/factory/bin/factory-dashboard"), &search_path);
    let tab = FallbackDataHubTab::new("ai_factory_tabs", env);

    let closed = tab.render(&RenderContext::default());
    assert!(closed.has_error());
    assert!(closed
        .blocks
        .iter()
        .any(|b| matches!(b, Block::Toggle { .. })));
    assert!(!closed.blocks.iter().any(|b| matches!(b, Block::Json { .. })));

    let open = tab.render(&RenderContext {
        show_diagnostics: true,
    });
    let value = open
        .blocks
        .iter()
        .find_map(|b| match b {
            Block::Json { value } => Some(value.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(value["this_dir"], "/srv/factory/bin");
    assert_eq!(value["root_dir"], "/srv/factory");
    assert_eq!(value["search_path"].as_array().unwrap().len(), 5);
}

#[test]
fn unopenable_memory_store_degrades_to_unavailable_memory() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the data directory should be.
    let blocker = dir.path().join("data");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let config = FactoryConfig {
        data_dir: blocker,
        ..FactoryConfig::default()
    };
    let live = LiveCollaborators::new(config, Secrets::default());

    let memory = live.memory();
    assert!(matches!(memory.origin(), Origin::Fallback { .. }));
    let stats = memory.get().get_statistics().unwrap();
    assert_eq!(stats.total_executions, 0);
    assert_eq!(stats.success_rate_percent(), 0);
    assert!(!memory.get().add_knowledge("topic", "content"));
}

#[test]
fn session_without_api_key_has_unavailable_orchestrator() {
    let dir = tempfile::tempdir().unwrap();
    let config = FactoryConfig {
        data_dir: dir.path().to_path_buf(),
        ..FactoryConfig::default()
    };
    let live = LiveCollaborators::new(config, Secrets::default());
    let session = Session::new(None);

    let orchestrator = session.orchestrator(&live);
    assert!(!orchestrator.is_real());
    assert!(orchestrator
        .fallback_reason()
        .unwrap()
        .contains("API key"));

    session.set_api_key("sk-live");
    assert!(session.orchestrator(&live).is_real());
}
