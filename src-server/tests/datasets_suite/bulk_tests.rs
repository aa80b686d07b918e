// FICHIER : src-server/tests/datasets_suite/bulk_tests.rs

use crate::{init_test_env, load_request, save_request, T0};
use safd::api::ApiRequest;
use safd::utils::json::{json, Value};

fn save_all(data: Value) -> ApiRequest {
    ApiRequest::new("POST", "save_all").with_json(&json!({ "data": data }))
}

#[tokio::test]
async fn save_all_writes_each_present_type() {
    let env = init_test_env().await;
    let resp = env
        .call(save_all(json!({
            "pois": [{"id": 1, "lng": 1, "lat": 1, "name": "Tankstelle", "category": "gas_station"}],
            "hydrants": [{"id": 1, "lng": 1, "lat": 1}],
            "settings": {"autoSaveEnabled": false}
        })))
        .await;

    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["success"], true);
    assert_eq!(resp.body["timestamp"], T0);
    let results = resp.body["results"].as_object().unwrap();
    let order: Vec<&str> = results.keys().map(String::as_str).collect();
    assert_eq!(order, vec!["hydrants", "settings", "pois"]);
    assert!(results.values().all(|v| v == "success"));

    let resp = env.call(load_request("settings")).await;
    assert_eq!(resp.body["data"], json!({"autoSaveEnabled": false}));
}

#[tokio::test]
async fn save_all_reports_partial_failure() {
    let env = init_test_env().await;
    // Écriture impossible pour les marqueurs
    std::fs::create_dir(env.file("custom_markers.json")).unwrap();

    let resp = env
        .call(save_all(json!({
            "hydrants": [{"id": 1, "lng": 1, "lat": 1}],
            "markers": [{"id": 1, "lng": 1, "lat": 1, "name": "M"}],
            "drawings": {"type": "Nope"}
        })))
        .await;

    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["success"], false);
    assert_eq!(
        resp.body["results"],
        json!({"hydrants": "success", "markers": "error", "drawings": "validation_error"})
    );
    assert!(env.file("hydrants.json").is_file());
    assert!(!env.file("drawings.json").exists());

    let log = std::fs::read_to_string(env.file("activity.log")).unwrap();
    assert!(log.contains("SUCCESS: SAVE_ALL - hydrants"));
    assert!(log.contains("ERROR: SAVE_ALL - markers - IP: 127.0.0.1 - File write failed"));
    assert!(log.contains("ERROR: SAVE_ALL - drawings - IP: 127.0.0.1 - Validation failed"));
}

#[tokio::test]
async fn save_all_without_data_is_empty_success() {
    let env = init_test_env().await;
    let resp = env
        .call(ApiRequest::new("POST", "save_all").with_json(&json!({"other": 1})))
        .await;
    assert_eq!(resp.body["success"], true);
    assert_eq!(resp.body["results"], json!({}));
}

#[tokio::test]
async fn save_all_snapshots_existing_files() {
    let env = init_test_env().await;
    env.call(save_request("hydrants", &json!([]))).await;
    env.clock.advance(1);
    env.call(save_all(json!({"hydrants": [{"id": 5, "lng": 0, "lat": 0}]})))
        .await;

    let files = env.backup_files();
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("backup_hydrants_"));
}

#[tokio::test]
async fn clear_absent_markers_is_noop() {
    let env = init_test_env().await;
    let resp = env
        .call(ApiRequest::new("DELETE", "clear").with_dataset("markers"))
        .await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, json!({"success": true, "message": "no data present"}));
    assert!(env.backup_files().is_empty());
}

#[tokio::test]
async fn clear_existing_type() {
    let env = init_test_env().await;
    env.call(save_request("markers", &json!([{"id": 1, "lng": 1, "lat": 1, "name": "A"}])))
        .await;

    let resp = env
        .call(ApiRequest::new("DELETE", "clear").with_dataset("markers"))
        .await;
    assert_eq!(resp.body["message"], "Markers cleared");
    assert!(!env.file("custom_markers.json").exists());

    let files = env.backup_files();
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("backup_markers_before_clear_"));

    // Après effacement, le défaut est de nouveau servi
    assert_eq!(env.call(load_request("markers")).await.body["data"], json!([]));
}

#[tokio::test]
async fn clear_all_bundles_then_deletes_present_types() {
    let env = init_test_env().await;
    let hydrants = json!([{"id": 1, "lng": 1, "lat": 1}]);
    let drawings = json!({"type": "FeatureCollection", "features": []});
    env.call(save_request("hydrants", &hydrants)).await;
    env.call(save_request("drawings", &drawings)).await;

    let resp = env.call(ApiRequest::new("DELETE", "clear_all")).await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["success"], true);
    assert_eq!(
        resp.body["results"],
        json!({"hydrants": "cleared", "drawings": "cleared"})
    );

    let backup = resp.body["backup_created"].as_str().unwrap();
    assert!(backup.starts_with("backup_before_clear_all_"));
    let bundle: Value =
        serde_json::from_str(&std::fs::read_to_string(env.file(backup)).unwrap()).unwrap();
    assert_eq!(
        bundle["data"],
        json!({"hydrants": hydrants, "drawings": drawings})
    );

    assert!(!env.file("hydrants.json").exists());
    assert!(!env.file("drawings.json").exists());
}

#[tokio::test]
async fn clear_all_keeps_corrupt_bytes_before_deleting() {
    let env = init_test_env().await;
    let corrupt = r#"[{"id":1, broken"#;
    std::fs::write(env.file("hydrants.json"), corrupt).unwrap();
    let settings = json!({"autoSaveEnabled": true});
    env.call(save_request("settings", &settings)).await;

    let resp = env.call(ApiRequest::new("DELETE", "clear_all")).await;
    assert_eq!(resp.body["success"], true);
    assert_eq!(
        resp.body["results"],
        json!({"hydrants": "cleared", "settings": "cleared"})
    );
    assert!(!env.file("hydrants.json").exists());

    // Le lot ne porte que les types lisibles ; le corrompu a sa copie brute
    let backup = resp.body["backup_created"].as_str().unwrap();
    let bundle: Value =
        serde_json::from_str(&std::fs::read_to_string(env.file(backup)).unwrap()).unwrap();
    assert_eq!(bundle["data"], json!({ "settings": settings }));

    let copies: Vec<String> = env
        .backup_files()
        .into_iter()
        .filter(|n| n.starts_with("backup_hydrants_before_clear_"))
        .collect();
    assert_eq!(copies.len(), 1);
    assert_eq!(std::fs::read_to_string(env.file(&copies[0])).unwrap(), corrupt);
}

#[tokio::test]
async fn clear_all_on_empty_store() {
    let env = init_test_env().await;
    let resp = env.call(ApiRequest::new("DELETE", "clear_all")).await;
    assert_eq!(resp.body["success"], true);
    assert_eq!(resp.body["results"], json!({}));
    assert!(resp.body["backup_created"].is_string());
}

#[tokio::test]
async fn concurrent_saves_are_serialized() {
    let env = init_test_env().await;

    let mut handles = Vec::new();
    for i in 0..10 {
        let engine = env.engine.clone();
        handles.push(tokio::spawn(async move {
            let req = save_request("hydrants", &json!([{"id": i, "lng": 0, "lat": 0}]));
            engine.handle(&req).await
        }));
    }
    for h in handles {
        assert!(h.await.unwrap().is_success());
    }

    // Chaque écriture sauf la première copie l'état précédent, sans écrasement
    let copies = env
        .backup_files()
        .into_iter()
        .filter(|n| n.starts_with("backup_hydrants_"))
        .count();
    assert_eq!(copies, 9);

    let data = env.call(load_request("hydrants")).await.body["data"].clone();
    assert_eq!(data.as_array().unwrap().len(), 1);
}
