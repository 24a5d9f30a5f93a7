//! HTTP client tests against a fake Proxmox API.

mod common;

use std::time::Duration;

use axum::http::{Method, StatusCode};
use pve_client::{
    ClientError, ContentType, CreatePoolRequest, LvmStorage, ModifyStorageRequest, NfsStorage,
    NodeApi, PoolApi, StorageApi, StorageKind, UpdatePoolRequest, cancellable,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use common::FakeProxmox;

// =============================================================================
// Pools
// =============================================================================

#[tokio::test]
async fn test_create_pool_sends_token_and_body() {
    let server = FakeProxmox::spawn().await;
    server.respond(Method::POST, "/pools", json!(null));
    let client = server.client();

    client
        .create_pool(CreatePoolRequest {
            id: "p1".to_string(),
            comment: Some("notes".to_string()),
        })
        .await
        .unwrap();

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::POST);
    assert_eq!(requests[0].path, "/pools");
    assert_eq!(
        requests[0].authorization.as_deref(),
        Some("PVEAPIToken=root@pam!test=s3cret")
    );
    assert_eq!(
        requests[0].body,
        Some(json!({"poolid": "p1", "comment": "notes"}))
    );

    server.shutdown();
}

#[tokio::test]
async fn test_update_pool_remove_members() {
    let server = FakeProxmox::spawn().await;
    server.respond(Method::PUT, "/pools/p1", json!(null));
    let client = server.client();

    client
        .update_pool(
            "p1",
            UpdatePoolRequest {
                comment: None,
                delete: true,
                vms: vec![100],
                storage: vec!["tank".to_string()],
            },
        )
        .await
        .unwrap();

    let requests = server.requests();
    assert_eq!(
        requests[0].body,
        Some(json!({"vms": "100", "storage": "tank", "delete": 1}))
    );

    server.shutdown();
}

#[tokio::test]
async fn test_get_pool_with_members() {
    let server = FakeProxmox::spawn().await;
    server.respond(
        Method::GET,
        "/pools/p1",
        json!({
            "comment": "notes",
            "members": [
                {"id": "qemu/100", "type": "qemu", "vmid": 100, "node": "pve1"},
                {"id": "storage/pve1/tank", "type": "storage", "storage": "tank", "node": "pve1"}
            ]
        }),
    );
    let client = server.client();

    let pool = client.get_pool("p1").await.unwrap().unwrap();
    assert_eq!(pool.id, "p1");
    assert_eq!(pool.comment.as_deref(), Some("notes"));
    assert_eq!(pool.members.len(), 2);
    assert_eq!(pool.members[0].vmid, Some(100));
    assert_eq!(pool.members[1].storage.as_deref(), Some("tank"));

    server.shutdown();
}

#[tokio::test]
async fn test_get_missing_pool_is_none() {
    let server = FakeProxmox::spawn().await;
    server.respond_raw(
        Method::GET,
        "/pools/gone",
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"data": null, "message": "pool 'gone' does not exist\n"}).to_string(),
    );
    let client = server.client();

    assert!(client.get_pool("gone").await.unwrap().is_none());

    server.shutdown();
}

#[tokio::test]
async fn test_permission_error_is_surfaced() {
    let server = FakeProxmox::spawn().await;
    server.respond_raw(
        Method::DELETE,
        "/pools/p1",
        StatusCode::FORBIDDEN,
        json!({"data": null, "message": "Permission check failed"}).to_string(),
    );
    let client = server.client();

    let err = client.delete_pool("p1").await.unwrap_err();
    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "Permission check failed");
        }
        other => panic!("unexpected error: {:?}", other),
    }

    server.shutdown();
}

// =============================================================================
// Storage
// =============================================================================

#[tokio::test]
async fn test_list_storage_by_kind() {
    let server = FakeProxmox::spawn().await;
    server.respond(
        Method::GET,
        "/storage?type=lvm",
        json!([
            {"storage": "a", "type": "lvm", "vgname": "vg0", "nodes": "pve1", "content": "images"},
            {"storage": "b", "type": "lvm", "vgname": "vg1", "content": "images,rootdir"}
        ]),
    );
    let client = server.client();

    let classes: Vec<LvmStorage> = pve_client::list(&client).await.unwrap();
    assert_eq!(classes.len(), 2);
    assert_eq!(classes[0].nodes, Some(vec!["pve1".to_string()]));
    assert_eq!(classes[1].nodes, None);
    assert_eq!(
        classes[1].content,
        vec![ContentType::Images, ContentType::Rootdir]
    );

    server.shutdown();
}

#[tokio::test]
async fn test_get_storage_of_other_kind_is_none() {
    let server = FakeProxmox::spawn().await;
    server.respond(
        Method::GET,
        "/storage/shared",
        json!({"storage": "shared", "type": "nfs", "server": "nas", "export": "/pve"}),
    );
    let client = server.client();

    let as_lvm = client
        .get_storage(StorageKind::Lvm, "shared")
        .await
        .unwrap();
    assert!(as_lvm.is_none());

    let as_nfs: Option<NfsStorage> = pve_client::get(&client, "shared").await.unwrap();
    assert_eq!(as_nfs.unwrap().server, "nas");

    server.shutdown();
}

#[tokio::test]
async fn test_modify_storage_body() {
    let server = FakeProxmox::spawn().await;
    server.respond(Method::PUT, "/storage/nfs1", json!(null));
    let client = server.client();

    pve_client::modify::<_, NfsStorage>(
        &client,
        "nfs1",
        ModifyStorageRequest {
            nodes: vec!["pve1".to_string(), "pve2".to_string()],
            content: vec![ContentType::Iso, ContentType::Backup],
        },
    )
    .await
    .unwrap();

    assert_eq!(
        server.requests()[0].body,
        Some(json!({"nodes": "pve1,pve2", "content": "iso,backup"}))
    );

    server.shutdown();
}

#[tokio::test]
async fn test_describe_local_storage() {
    let server = FakeProxmox::spawn().await;
    server.respond(
        Method::GET,
        "/storage",
        json!([
            {"storage": "local", "type": "dir", "path": "/var/lib/vz", "content": "iso"},
            {"storage": "nfs1", "type": "nfs", "server": "nas", "export": "/pve", "shared": 1}
        ]),
    );
    server.respond(
        Method::GET,
        "/cluster/resources?type=storage",
        json!([
            {"storage": "local", "node": "pve1", "maxdisk": 1024, "shared": 0},
            {"storage": "nfs1", "node": "pve1", "maxdisk": 4096, "shared": 1}
        ]),
    );
    let client = server.client();

    let local = client.describe_local_storage().await.unwrap();
    assert_eq!(local.len(), 1);
    assert_eq!(local[0].id, "local");
    assert_eq!(local[0].size, 1024);
    assert_eq!(local[0].nodes, vec!["pve1"]);

    server.shutdown();
}

// =============================================================================
// Nodes and cancellation
// =============================================================================

#[tokio::test]
async fn test_list_node_names() {
    let server = FakeProxmox::spawn().await;
    server.respond(
        Method::GET,
        "/nodes",
        json!([{"node": "pve1", "status": "online"}, {"node": "pve2", "status": "offline"}]),
    );
    let client = server.client();

    assert_eq!(client.list_node_names().await.unwrap(), vec!["pve1", "pve2"]);

    server.shutdown();
}

#[tokio::test]
async fn test_cancellation_aborts_in_flight_request() {
    let server = FakeProxmox::spawn().await;
    server.respond_slowly(Method::DELETE, "/storage/slow", Duration::from_secs(30));
    let client = server.client();

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let result = cancellable(&token, client.delete_storage(StorageKind::Lvm, "slow")).await;
    assert!(matches!(result, Err(ClientError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(5));

    server.shutdown();
}
