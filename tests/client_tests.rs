//! Storage client tests

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{ScriptedBackend, client_with};
use greenfield_client_sdk::storage::HASH_PREFIX;
use greenfield_client_sdk::{ConnectionState, StorageError};

mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize_ends_ready() {
        let backend = ScriptedBackend::new();
        let client = client_with(&backend);

        assert!(client.initialize("0xABC").await);
        assert_eq!(client.state(), ConnectionState::Ready);
        assert_eq!(backend.calls.connect.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_initialize_ends_failed() {
        let backend = ScriptedBackend::refusing();
        let client = client_with(&backend);

        assert!(!client.initialize("0xABC").await);
        assert_eq!(client.state(), ConnectionState::Failed);
        assert!(client.last_error().unwrap().contains("scripted refusal"));
    }

    #[tokio::test]
    async fn test_malformed_identity_never_connects() {
        let backend = ScriptedBackend::new();
        let client = client_with(&backend);

        assert!(!client.initialize("").await);
        assert_eq!(client.state(), ConnectionState::Failed);
        assert_eq!(backend.calls.connect.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_recover_after_failure() {
        let backend = ScriptedBackend::refusing();
        let client = client_with(&backend);
        assert!(!client.initialize("0xABC").await);

        backend.fail_connect.store(false, Ordering::SeqCst);
        assert!(client.initialize("0xABC").await);
        assert_eq!(client.state(), ConnectionState::Ready);
        assert!(client.last_error().is_none());
    }

    #[tokio::test]
    async fn test_identity_round_trip() {
        let backend = ScriptedBackend::new();
        let client = client_with(&backend);
        client.initialize("0xABC").await;

        let account = client.get_account_info().await.unwrap().unwrap();
        assert_eq!(account.address, "0xABC");
        assert_eq!(account.balance, "0.1234");
    }

    #[tokio::test]
    async fn test_concurrent_initialize_leaves_consistent_state() {
        let backend = ScriptedBackend::new();
        let client = std::sync::Arc::new(client_with(&backend));

        let first = {
            let client = client.clone();
            tokio::spawn(async move { client.initialize("0xAAA").await })
        };
        let second = {
            let client = client.clone();
            tokio::spawn(async move { client.initialize("0xBBB").await })
        };
        assert!(first.await.unwrap());
        assert!(second.await.unwrap());

        assert_eq!(client.state(), ConnectionState::Ready);
        let identity = client.identity().unwrap();
        let account = client.get_account_info().await.unwrap().unwrap();
        assert_eq!(account.address, identity.address());
    }

    #[tokio::test]
    async fn test_cancelled_initialize_ends_failed() {
        let backend = ScriptedBackend::new();
        backend.delay_next_connect(Duration::from_millis(500));
        let client = client_with(&backend);

        let cancelled =
            tokio::time::timeout(Duration::from_millis(50), client.initialize("0xABC")).await;
        assert!(cancelled.is_err());
        assert_eq!(backend.calls.connect.load(Ordering::SeqCst), 1);
        assert_eq!(client.state(), ConnectionState::Failed);
        assert!(client.identity().is_none());
        assert!(client.last_error().is_some());

        assert!(client.initialize("0xABC").await);
        assert_eq!(client.state(), ConnectionState::Ready);
    }

    #[tokio::test]
    async fn test_aborted_initialize_task_ends_failed() {
        let backend = ScriptedBackend::new();
        backend.delay_next_connect(Duration::from_millis(500));
        let client = std::sync::Arc::new(client_with(&backend));

        let task = {
            let client = client.clone();
            tokio::spawn(async move { client.initialize("0xABC").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(client.state(), ConnectionState::Initializing);

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert_eq!(client.state(), ConnectionState::Failed);
        assert!(client.identity().is_none());
    }

    #[tokio::test]
    async fn test_operation_failure_keeps_ready() {
        let backend = ScriptedBackend::new();
        let client = client_with(&backend);
        client.initialize("0xABC").await;

        backend.fail_operations.store(true, Ordering::SeqCst);
        client.list_objects(None).await.unwrap();
        client.get_balance().await.unwrap();
        assert_eq!(client.state(), ConnectionState::Ready);
    }
}

mod guard_tests {
    use super::*;

    #[tokio::test]
    async fn test_no_transport_call_before_ready() {
        let backend = ScriptedBackend::new();
        let client = client_with(&backend);

        let results = [
            client.upload_file(b"x", "x.txt", None).await.err(),
            client.download_file("gf_x").await.err(),
            client.list_objects(None).await.err(),
            client.create_bucket("b").await.err(),
            client.ensure_bucket_exists().await.err(),
            client.get_balance().await.err(),
            client.query_balance().await.err(),
            client.get_account_info().await.err(),
        ];
        for result in results {
            assert_eq!(result, Some(StorageError::NotInitialized));
        }
        assert_eq!(backend.calls.remote_calls(), 0);
    }

    #[tokio::test]
    async fn test_no_transport_call_after_failed_initialize() {
        let backend = ScriptedBackend::refusing();
        let client = client_with(&backend);
        client.initialize("0xABC").await;

        assert!(matches!(
            client.list_objects(None).await,
            Err(StorageError::NotInitialized)
        ));
        assert_eq!(backend.calls.remote_calls(), 0);
    }
}

mod upload_tests {
    use super::*;

    #[tokio::test]
    async fn test_generated_name_url() {
        let backend = ScriptedBackend::new();
        let client = client_with(&backend);
        client.initialize("0xABC").await;

        let result = client.upload_file(b"png", "photo.png", None).await.unwrap();
        assert!(result.success);

        let token = result.hash.as_deref().unwrap().strip_prefix(HASH_PREFIX).unwrap();
        assert_eq!(token.len(), 32);

        let url = result.url.unwrap();
        let generated = url.strip_prefix("https://sp.test/assets/").unwrap();
        assert!(generated.ends_with("photo.png"));
        assert_ne!(generated, "photo.png");
    }

    #[tokio::test]
    async fn test_same_name_same_hash() {
        let backend = ScriptedBackend::new();
        let client = client_with(&backend);
        client.initialize("0xABC").await;

        let first = client
            .upload_file(b"content", "a.txt", Some("fixed.txt"))
            .await
            .unwrap();
        let second = client
            .upload_file(b"content", "a.txt", Some("fixed.txt"))
            .await
            .unwrap();
        assert_eq!(first.hash, second.hash);
        assert_eq!(first.url.as_deref(), Some("https://sp.test/assets/fixed.txt"));
    }

    #[tokio::test]
    async fn test_omitted_name_is_unique() {
        let backend = ScriptedBackend::new();
        let client = client_with(&backend);
        client.initialize("0xABC").await;

        let first = client.upload_file(b"same", "same.txt", None).await.unwrap();
        let second = client.upload_file(b"same", "same.txt", None).await.unwrap();
        assert_ne!(first.url, second.url);
        assert_ne!(first.hash, second.hash);
    }

    #[tokio::test]
    async fn test_transport_failure_in_result() {
        let backend = ScriptedBackend::new();
        let client = client_with(&backend);
        client.initialize("0xABC").await;
        backend.fail_operations.store(true, Ordering::SeqCst);

        let result = client.upload_file(b"x", "x.txt", None).await.unwrap();
        assert!(!result.success);
        assert!(result.hash.is_none());
        assert!(result.url.is_none());
        assert!(result.error.unwrap().contains("scripted failure"));
    }
}

mod query_tests {
    use super::*;

    #[tokio::test]
    async fn test_download_unknown_hash_is_absent() {
        let backend = ScriptedBackend::new();
        let client = client_with(&backend);
        client.initialize("0xABC").await;

        assert_eq!(client.download_file("unknown-hash").await, Ok(None));
    }

    #[tokio::test]
    async fn test_download_transport_failure_is_absent() {
        let backend = ScriptedBackend::new();
        let client = client_with(&backend);
        client.initialize("0xABC").await;
        backend.fail_operations.store(true, Ordering::SeqCst);

        assert_eq!(client.download_file("gf_abc").await, Ok(None));
    }

    #[tokio::test]
    async fn test_list_objects() {
        let backend = ScriptedBackend::new();
        let client = client_with(&backend);
        client.initialize("0xABC").await;

        let objects = client.list_objects(None).await.unwrap();
        assert_eq!(objects, vec!["assets/example1.jpg", "assets/example2.png"]);

        let objects = client.list_objects(Some("media")).await.unwrap();
        assert_eq!(objects[0], "media/example1.jpg");
    }

    #[tokio::test]
    async fn test_list_objects_failure_is_empty() {
        let backend = ScriptedBackend::new();
        let client = client_with(&backend);
        client.initialize("0xABC").await;
        backend.fail_operations.store(true, Ordering::SeqCst);

        assert_eq!(client.list_objects(None).await, Ok(Vec::new()));
    }

    #[tokio::test]
    async fn test_bucket_operations_failure_is_false() {
        let backend = ScriptedBackend::new();
        let client = client_with(&backend);
        client.initialize("0xABC").await;

        assert_eq!(client.create_bucket("media").await, Ok(true));
        assert_eq!(client.ensure_bucket_exists().await, Ok(true));
        assert_eq!(backend.calls.exists.load(Ordering::SeqCst), 1);

        backend.fail_operations.store(true, Ordering::SeqCst);
        assert_eq!(client.create_bucket("media").await, Ok(false));
        assert_eq!(client.ensure_bucket_exists().await, Ok(false));
    }

    #[tokio::test]
    async fn test_balance_and_account_failures() {
        let backend = ScriptedBackend::new();
        let client = client_with(&backend);
        client.initialize("0xABC").await;
        assert_eq!(client.get_balance().await, Ok("0.1234".to_string()));

        backend.fail_operations.store(true, Ordering::SeqCst);
        assert_eq!(client.get_balance().await, Ok("0".to_string()));
        assert_eq!(client.get_account_info().await, Ok(None));
        assert!(matches!(
            client.query_balance().await,
            Err(StorageError::NetworkError(_))
        ));
    }
}
