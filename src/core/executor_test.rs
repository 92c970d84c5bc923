use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing_test::traced_test;

use super::CorrelationRegistry;
use super::CorrelationToken;
use super::Dispatcher;
use super::Request;
use super::RequestExecutor;
use super::Response;
use super::ResponseMode;
use crate::test_utils::response;
use crate::test_utils::TEST_PREFIX;
use crate::test_utils::TEST_RESPONSE_TOPIC;
use crate::Error;
use crate::MockTransport;
use crate::OutboundMessage;
use crate::RequestError;
use crate::TransportError;

fn executor(
    transport: MockTransport,
    registry: Arc<CorrelationRegistry>,
) -> RequestExecutor {
    RequestExecutor::new(
        Arc::new(transport),
        registry,
        TEST_PREFIX,
        TEST_RESPONSE_TOPIC.to_string(),
        None,
    )
}

/// Transport whose device answers synchronously from inside `publish`,
/// i.e. before the publish call even returns to the executor.
fn answering_transport(
    registry: Arc<CorrelationRegistry>,
    answers: &'static [(&'static str, &'static str)],
) -> MockTransport {
    let dispatcher = Dispatcher::new(registry, TEST_RESPONSE_TOPIC.to_string());
    let mut transport = MockTransport::new();
    transport
        .expect_publish()
        .times(1)
        .returning(move |message: OutboundMessage| {
            let token = CorrelationToken::from(message.properties.correlation_data.unwrap());
            for (code, payload) in answers {
                dispatcher.dispatch(response(&token, code, payload));
            }
            Ok(())
        });
    transport
}

#[tokio::test]
#[traced_test]
async fn test_request_is_registered_before_publish() {
    let registry = Arc::new(CorrelationRegistry::new());
    let observed = registry.clone();
    let mut transport = MockTransport::new();
    transport
        .expect_publish()
        .times(1)
        .returning(move |message: OutboundMessage| {
            assert_eq!(message.topic, format!("{TEST_PREFIX}/settings/a/b"));
            assert_eq!(
                message.properties.response_topic.as_deref(),
                Some(TEST_RESPONSE_TOPIC)
            );
            assert!(message.properties.correlation_data.is_some());
            assert!(!message.retain);
            assert_eq!(observed.len(), 1);
            Err(TransportError::Publish {
                topic: message.topic,
                reason: "stop here".to_string(),
            })
        });

    let result = executor(transport, registry.clone())
        .execute(Request::new("/a/b", ResponseMode::Leaf))
        .await;

    assert!(matches!(result, Err(Error::Transport(TransportError::Publish { .. }))));
    assert!(registry.is_empty(), "failed publish must not leave an entry behind");
}

#[tokio::test]
#[traced_test]
async fn test_response_arriving_before_publish_returns_is_not_lost() {
    let registry = Arc::new(CorrelationRegistry::new());
    let transport = answering_transport(registry.clone(), &[("Ok", "17")]);

    let result = executor(transport, registry.clone())
        .execute(Request::new("/gain", ResponseMode::Leaf))
        .await
        .unwrap();

    assert_eq!(result, Response::Leaf(Bytes::from_static(b"17")));
    assert!(registry.is_empty());
}

#[tokio::test]
#[traced_test]
async fn test_leaf_mode_rejects_multiple_parts() {
    let registry = Arc::new(CorrelationRegistry::new());
    let transport = answering_transport(registry.clone(), &[("Continue", "/a"), ("Continue", "/b"), ("Ok", "")]);

    let result = executor(transport, registry)
        .execute(Request::new("", ResponseMode::Leaf))
        .await;

    match result {
        Err(Error::Request(RequestError::NotALeaf { parts })) => {
            assert_eq!(parts, vec!["/a".to_string(), "/b".to_string()]);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
#[traced_test]
async fn test_leaf_mode_rejects_zero_parts() {
    let registry = Arc::new(CorrelationRegistry::new());
    let transport = answering_transport(registry.clone(), &[("Ok", "")]);

    let result = executor(transport, registry)
        .execute(Request::new("/x", ResponseMode::Leaf))
        .await;

    assert!(matches!(
        result,
        Err(Error::Request(RequestError::NotALeaf { parts })) if parts.is_empty()
    ));
}

#[tokio::test]
#[traced_test]
async fn test_multipart_mode_returns_parts_unmodified() {
    let registry = Arc::new(CorrelationRegistry::new());
    let transport = answering_transport(registry.clone(), &[("Continue", "/z"), ("Continue", "/a"), ("Ok", "")]);

    let result = executor(transport, registry)
        .execute(Request::new("", ResponseMode::Multipart))
        .await
        .unwrap();

    assert_eq!(
        result,
        Response::Parts(vec![Bytes::from_static(b"/z"), Bytes::from_static(b"/a")])
    );
}

#[tokio::test]
#[traced_test]
async fn test_multipart_mode_rejects_empty_response() {
    let registry = Arc::new(CorrelationRegistry::new());
    let transport = answering_transport(registry.clone(), &[("Ok", "")]);

    let result = executor(transport, registry)
        .execute(Request::new("/empty", ResponseMode::Multipart))
        .await;

    assert!(matches!(result, Err(Error::Request(RequestError::EmptyResponse))));
}

#[tokio::test]
#[traced_test]
async fn test_device_error_surfaces_as_protocol_error() {
    let registry = Arc::new(CorrelationRegistry::new());
    let transport = answering_transport(registry.clone(), &[("Error", "Absent")]);

    let result = executor(transport, registry)
        .execute(Request::new("/nope", ResponseMode::Leaf))
        .await;

    match result {
        Err(Error::Request(RequestError::Protocol { code, message })) => {
            assert_eq!(code, "Error");
            assert_eq!(message, "Absent");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
#[traced_test]
async fn test_fire_and_forget_does_not_register() {
    let registry = Arc::new(CorrelationRegistry::new());
    let mut transport = MockTransport::new();
    transport
        .expect_publish()
        .times(1)
        .returning(|message: OutboundMessage| {
            assert_eq!(message.topic, format!("{TEST_PREFIX}/settings"));
            assert!(message.properties.response_topic.is_none());
            assert!(message.properties.correlation_data.is_none());
            Ok(())
        });

    let result = executor(transport, registry.clone())
        .execute(Request::new("", ResponseMode::None))
        .await
        .unwrap();

    assert_eq!(result, Response::None);
    assert!(registry.is_empty());
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_timeout_removes_registry_entry() {
    let registry = Arc::new(CorrelationRegistry::new());
    let mut transport = MockTransport::new();
    transport.expect_publish().times(1).returning(|_| Ok(()));

    let result = executor(transport, registry.clone())
        .execute(Request::new("/slow", ResponseMode::Leaf).timeout(Duration::from_millis(250)))
        .await;

    assert!(matches!(
        result,
        Err(Error::Request(RequestError::Timeout(d))) if d == Duration::from_millis(250)
    ));
    assert!(registry.is_empty());
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_default_timeout_applies_without_override() {
    let registry = Arc::new(CorrelationRegistry::new());
    let mut transport = MockTransport::new();
    transport.expect_publish().times(1).returning(|_| Ok(()));
    let executor = RequestExecutor::new(
        Arc::new(transport),
        registry,
        TEST_PREFIX,
        TEST_RESPONSE_TOPIC.to_string(),
        Some(Duration::from_secs(2)),
    );

    let result = executor.execute(Request::new("/slow", ResponseMode::Leaf)).await;
    assert!(matches!(result, Err(Error::Request(RequestError::Timeout(_)))));
}

#[tokio::test]
async fn test_invalid_paths_are_rejected_before_publish() {
    let registry = Arc::new(CorrelationRegistry::new());
    let executor = executor(MockTransport::new(), registry.clone());

    for path in ["relative", "/a/+", "/a/#"] {
        let result = executor.execute(Request::new(path, ResponseMode::Leaf)).await;
        assert!(matches!(result, Err(Error::InvalidPath(_))), "{path}");
    }
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_closed_registry_rejects_new_requests() {
    let registry = Arc::new(CorrelationRegistry::new());
    registry.drain();
    let executor = executor(MockTransport::new(), registry);

    let result = executor.execute(Request::new("/a", ResponseMode::Leaf)).await;
    assert!(matches!(result, Err(Error::Request(RequestError::Cancelled))));
}
