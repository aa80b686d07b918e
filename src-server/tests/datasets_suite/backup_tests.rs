// FICHIER : src-server/tests/datasets_suite/backup_tests.rs

use crate::{init_test_env, init_test_env_with, load_request, save_request, T0};
use safd::api::ApiRequest;
use safd::utils::json::{json, Value};

fn create_backup() -> ApiRequest {
    ApiRequest::new("POST", "create_backup").with_body("{}")
}

fn restore(filename: &str) -> ApiRequest {
    ApiRequest::new("PUT", "restore_backup").with_json(&json!({ "filename": filename }))
}

#[tokio::test]
async fn save_snapshots_prior_content_verbatim() {
    let env = init_test_env().await;
    let first = json!([{"id": 1, "lng": 1.0, "lat": 2.0}]);
    env.call(save_request("hydrants", &first)).await;
    let before = std::fs::read_to_string(env.file("hydrants.json")).unwrap();

    env.clock.advance(5);
    env.call(save_request("hydrants", &json!([]))).await;

    let files = env.backup_files();
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("backup_hydrants_"));
    let copy = std::fs::read_to_string(env.file(&files[0])).unwrap();
    assert_eq!(copy, before);
}

#[tokio::test]
async fn create_backup_writes_bundle() {
    let env = init_test_env().await;
    let hydrants = json!([{"id": 1, "lng": 1.0, "lat": 2.0}]);
    env.call(save_request("hydrants", &hydrants)).await;

    let resp = env.call(create_backup()).await;
    assert_eq!(resp.body["success"], true);
    assert_eq!(resp.body["message"], "Backup created successfully");
    assert_eq!(resp.body["timestamp"], T0);
    let filename = resp.body["filename"].as_str().unwrap().to_string();
    assert!(filename.starts_with("backup_full_"));

    let bundle: Value =
        serde_json::from_str(&std::fs::read_to_string(env.file(&filename)).unwrap()).unwrap();
    assert_eq!(bundle["version"], "2.1");
    assert_eq!(bundle["created_by"], "127.0.0.1");
    assert_eq!(bundle["timestamp"], T0);
    assert_eq!(bundle["data"], json!({ "hydrants": hydrants }));
}

#[tokio::test]
async fn rotation_keeps_twenty_most_recent() {
    let env = init_test_env().await;

    let mut created = Vec::new();
    for _ in 0..25 {
        let resp = env.call(create_backup()).await;
        created.push(resp.body["filename"].as_str().unwrap().to_string());
        env.clock.advance(1);
    }

    let remaining: Vec<String> = env
        .backup_files()
        .into_iter()
        .filter(|n| n.starts_with("backup_full_"))
        .collect();
    assert_eq!(remaining.len(), 20);
    for name in &created[5..] {
        assert!(remaining.contains(name), "{name} manquant");
    }
    for name in &created[..5] {
        assert!(!remaining.contains(name), "{name} aurait dû être supprimé");
    }
}

#[tokio::test]
async fn rotation_within_one_second_keeps_twenty_most_recent() {
    let env = init_test_env().await;

    // Horloge figée : les 25 bundles partagent la même seconde
    let mut created = Vec::new();
    for _ in 0..25 {
        let resp = env.call(create_backup()).await;
        assert_eq!(resp.body["success"], true);
        created.push(resp.body["filename"].as_str().unwrap().to_string());
    }

    let remaining = env.backup_files();
    assert_eq!(remaining.len(), 20);
    for name in &created[5..] {
        assert!(remaining.contains(name), "{name} manquant");
    }
    for name in &created[..5] {
        assert!(!remaining.contains(name), "{name} aurait dû être supprimé");
    }

    let resp = env.call(ApiRequest::new("GET", "list_backups")).await;
    let backups = resp.body["backups"].as_array().unwrap();
    assert_eq!(backups[0]["filename"], created[24].as_str());
    assert_eq!(backups[19]["filename"], created[5].as_str());
}

#[tokio::test]
async fn rotation_does_not_touch_other_backups() {
    let env = init_test_env_with(2).await;
    env.call(save_request("settings", &json!({"a": 1}))).await;
    for i in 0..4 {
        env.clock.advance(1);
        env.call(save_request("settings", &json!({"a": i}))).await;
        env.call(create_backup()).await;
    }

    let files = env.backup_files();
    let fulls = files.iter().filter(|n| n.starts_with("backup_full_")).count();
    let singles = files
        .iter()
        .filter(|n| n.starts_with("backup_settings_"))
        .count();
    assert_eq!(fulls, 2);
    assert_eq!(singles, 4);
}

#[tokio::test]
async fn list_backups_newest_first() {
    let env = init_test_env().await;

    let t1 = env.call(create_backup()).await.body["filename"].clone();
    env.clock.advance(10);
    let t2 = env.call(create_backup()).await.body["filename"].clone();
    env.clock.advance(10);
    let t3 = env.call(create_backup()).await.body["filename"].clone();

    let resp = env.call(ApiRequest::new("GET", "list_backups")).await;
    assert_eq!(resp.body["success"], true);
    let backups = resp.body["backups"].as_array().unwrap();
    let names: Vec<&Value> = backups.iter().map(|b| &b["filename"]).collect();
    assert_eq!(names, vec![&t3, &t2, &t1]);

    assert_eq!(backups[0]["timestamp"], T0 + 20);
    assert_eq!(backups[2]["timestamp"], T0);
    assert!(backups[0]["size"].as_u64().unwrap() > 0);
    assert_eq!(backups[0]["date"].as_str().unwrap().len(), "2023-11-14 22:13:20".len());
}

#[tokio::test]
async fn same_second_backups_never_overwrite() {
    let env = init_test_env().await;
    let a = env.call(create_backup()).await.body["filename"].clone();
    let b = env.call(create_backup()).await.body["filename"].clone();
    assert_ne!(a, b);
    assert_eq!(env.backup_files().len(), 2);
}

#[tokio::test]
async fn restore_overwrites_and_keeps_pre_restore() {
    let env = init_test_env().await;
    let h = json!([{"id": 1, "lng": 1.0, "lat": 2.0}]);
    let m = json!([{"id": 9, "lng": 5.0, "lat": 6.0, "name": "Depot"}]);
    env.call(save_request("hydrants", &h)).await;
    env.call(save_request("markers", &m)).await;
    let backup = env.call(create_backup()).await.body["filename"]
        .as_str()
        .unwrap()
        .to_string();

    env.clock.advance(60);
    let h2 = json!([{"id": 2, "lng": 0.0, "lat": 0.0}]);
    env.call(save_request("hydrants", &h2)).await;
    env.call(ApiRequest::new("DELETE", "clear").with_dataset("markers"))
        .await;

    env.clock.advance(60);
    let resp = env.call(restore(&backup)).await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["success"], true);
    assert_eq!(resp.body["restored_from"], backup.as_str());
    assert_eq!(
        resp.body["results"],
        json!({"hydrants": "restored", "markers": "restored"})
    );

    assert_eq!(env.call(load_request("hydrants")).await.body["data"], h);
    assert_eq!(env.call(load_request("markers")).await.body["data"], m);

    let pre: Vec<String> = env
        .backup_files()
        .into_iter()
        .filter(|n| n.starts_with("backup_pre_restore_"))
        .collect();
    assert_eq!(pre.len(), 1);
    let bundle: Value =
        serde_json::from_str(&std::fs::read_to_string(env.file(&pre[0])).unwrap()).unwrap();
    assert_eq!(bundle["data"], json!({ "hydrants": h2 }));
}

#[tokio::test]
async fn restore_errors() {
    let env = init_test_env().await;

    let resp = env.call(ApiRequest::new("PUT", "restore_backup")).await;
    assert_eq!(resp.status, 400);

    let resp = env.call(restore("../hydrants.json")).await;
    assert_eq!(resp.status, 400);

    let resp = env.call(restore("backup_full_1999-01-01_00-00-00.json")).await;
    assert_eq!(resp.status, 404);
    assert!(resp.body.get("success").is_none());

    std::fs::write(env.file("backup_hand_made.json"), r#"{"version": "2.1"}"#).unwrap();
    let resp = env.call(restore("backup_hand_made.json")).await;
    assert_eq!(resp.status, 400);
    assert_eq!(
        resp.body["error"],
        "invalid backup format: missing data field"
    );

    // Aucun pre_restore pour une restauration refusée
    assert!(env
        .backup_files()
        .iter()
        .all(|n| !n.starts_with("backup_pre_restore_")));
}

#[tokio::test]
async fn restore_ignores_unknown_keys_and_reports_failures() {
    let env = init_test_env().await;
    std::fs::create_dir_all(&env.data_dir).unwrap();
    std::fs::write(
        env.file("backup_manual.json"),
        serde_json::to_string(&json!({
            "data": {
                "hydrants": [{"id": 1, "lng": 1, "lat": 1}],
                "weather": {"sunny": true},
                "settings": {"isAdmin": false}
            }
        }))
        .unwrap(),
    )
    .unwrap();
    // Un dossier à la place du fichier rend l'écriture impossible
    std::fs::create_dir(env.file("settings.json")).unwrap();

    let resp = env.call(restore("backup_manual.json")).await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["success"], false);
    assert_eq!(
        resp.body["results"],
        json!({"hydrants": "restored", "settings": "error"})
    );
}
