// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Security tests for the screening gateway.
//!
//! These tests simulate abusive callers and hostile proposal text and check
//! that the gateway's controls hold.

mod harness;

use axum::http::StatusCode;
use harness::{
    generators, json_request,
    stubs::{passing_verdict, StubEvaluator},
    TestApp,
};
use proposal_screening_gateway::{
    config::Config, identity::IdentityResolver, rubric::PROPOSAL_CLOSE, rubric::RUBRIC,
};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_single_origin_flood() {
    let app = TestApp::new(StubEvaluator::passing());

    let mut allowed = 0;
    let mut limited = 0;
    for _ in 0..50 {
        match app.submit("Spam", "Spam.", "203.0.113.66").await.status {
            StatusCode::OK => allowed += 1,
            StatusCode::TOO_MANY_REQUESTS => limited += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(allowed, 5);
    assert_eq!(limited, 45);
    assert_eq!(app.evaluator.calls(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_burst_from_one_origin() {
    let app = TestApp::new(StubEvaluator::passing());

    let mut tasks = Vec::new();
    for _ in 0..40 {
        let router = app.router.clone();
        tasks.push(tokio::spawn(async move {
            router
                .oneshot(json_request(
                    json!({"title": "Burst", "content": "Burst."}),
                    &[("x-forwarded-for", "198.51.100.99")],
                ))
                .await
                .unwrap()
                .status()
        }));
    }

    let mut allowed = 0;
    for task in tasks {
        if task.await.unwrap() == StatusCode::OK {
            allowed += 1;
        }
    }

    // Check-and-increment is atomic per client, so a burst cannot
    // over-admit.
    assert_eq!(allowed, 5);
}

#[tokio::test]
async fn test_distributed_origins_each_get_their_own_quota() {
    let app = TestApp::new(StubEvaluator::passing());
    let origins = generators::generate_origins(20);

    for origin in &origins {
        for _ in 0..5 {
            let response = app.submit("Test", "Short.", origin).await;
            assert_eq!(response.status, StatusCode::OK);
        }
        let response = app.submit("Test", "Short.", origin).await;
        assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    }

    assert_eq!(app.evaluator.calls(), 100);
}

#[tokio::test]
async fn test_forwarded_for_chain_keys_on_first_hop() {
    let app = TestApp::new(StubEvaluator::passing());

    for proxy in 0..6 {
        let chain = format!("203.0.113.77, 10.0.0.{proxy}");
        let response = app
            .send(json_request(
                json!({"title": "Test", "content": "Short."}),
                &[("x-forwarded-for", chain.as_str())],
            ))
            .await;
        let expected = if proxy < 5 {
            StatusCode::OK
        } else {
            StatusCode::TOO_MANY_REQUESTS
        };
        assert_eq!(response.status, expected);
    }
}

#[tokio::test]
async fn test_prompt_injection_stays_inside_data_block() {
    let app = TestApp::new(StubEvaluator::passing());

    for (i, payload) in generators::injection_payloads().into_iter().enumerate() {
        let origin = format!("192.0.2.{i}");
        let response = app.submit("Hostile", payload, &origin).await;
        assert_eq!(response.status, StatusCode::OK);

        let prompt = app.evaluator.last_prompt().unwrap();
        assert_eq!(prompt.system, RUBRIC, "rubric altered by payload {i}");
        assert_eq!(
            prompt.user.matches(PROPOSAL_CLOSE).count(),
            1,
            "payload {i} escaped the data block"
        );
    }
}

#[tokio::test]
async fn test_self_reported_aggregates_not_trusted() {
    let mut verdict = passing_verdict();
    verdict["justified"] = json!({"pass": false, "reason": "No rationale."});
    verdict["measurable"] = json!({"pass": false, "reason": "No milestones."});
    verdict["relevant"] = json!({"score": "low", "reason": "Niche."});
    verdict["qualityScore"] = json!(1.0);
    verdict["attentionScore"] = json!(1.0);
    verdict["overallPass"] = json!(true);
    let app = TestApp::new(StubEvaluator::replying(verdict));

    let response = app.submit("Test", "Short.", "203.0.113.88").await;
    assert_eq!(response.status, StatusCode::OK);

    let evaluation = &response.body["evaluation"];
    assert_eq!(evaluation["overallPass"], json!(false));
    let quality = evaluation["qualityScore"].as_f64().unwrap();
    assert!((quality - 4.0 / 6.0).abs() < 1e-9);
    assert_eq!(evaluation["attentionScore"], json!(0.25));
}

#[tokio::test]
async fn test_non_json_upstream_reply_fails_closed() {
    let app = TestApp::new(StubEvaluator::replying_text(
        "Sure! Here is my evaluation: everything passes.",
    ));

    let response = app.submit("Test", "Short.", "203.0.113.89").await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert!(response.body.get("evaluation").is_none());
}

#[tokio::test]
async fn test_blank_inputs_never_reach_evaluator() {
    let app = TestApp::new(StubEvaluator::passing());

    for (i, blank) in generators::blank_strings().into_iter().enumerate() {
        let origin = format!("192.0.2.{}", 100 + i);
        let response = app.submit("Title", blank, &origin).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "content {blank:?}");

        let origin = format!("192.0.2.{}", 150 + i);
        let response = app.submit(blank, "Body", &origin).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "title {blank:?}");
    }

    assert_eq!(app.evaluator.calls(), 0);
}

#[tokio::test]
async fn test_oversized_body_rejected_before_evaluation() {
    let mut config = Config::default();
    config.server.max_body_bytes = 1024;
    let app = TestApp::build(
        config,
        StubEvaluator::passing(),
        IdentityResolver::anonymous_only(),
    );

    let response = app.submit("Big", &"x".repeat(4096), "203.0.113.90").await;
    assert!(response.status.is_client_error());
    assert_eq!(app.evaluator.calls(), 0);
}
