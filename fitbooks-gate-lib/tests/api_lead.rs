mod helpers;

use fitbooks_gate_lib::api::handle_request;
use fitbooks_gate_lib::security::{CaptchaPolicy, CaptchaVerification};
use fitbooks_gate_lib::upstream::{LeadReceipt, UpstreamError};
use helpers::*;
use http::{Method, StatusCode};
use std::time::Duration;

const VALID_LEAD: &str = r#"{
    "name": "  Jordan Rivera ",
    "email": " Jordan@Studio.FIT ",
    "captchaToken": "tok-123",
    "businessType": "Yoga studio",
    "pageUri": "https://fitbooks.ca/pricing",
    "pageName": "Pricing"
}"#;

fn forwarded() -> [(&'static str, &'static str); 1] {
    [("x-forwarded-for", "203.0.113.7, 10.0.0.2")]
}

#[tokio::test]
async fn accepted_lead_is_delivered() -> TestResult {
    let captcha = FakeCaptcha::passing();
    let sink = FakeSink::new_contact();
    let state = bare_state()
        .with_captcha(captcha.clone())
        .with_lead_sink(sink.clone());

    let req = request(Method::POST, "/api/lead", VALID_LEAD, &forwarded())?;
    let resp = handle_request(&state, req, peer()).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, "x-ratelimit-limit"), Some("6"));
    assert_eq!(header(&resp, "x-ratelimit-remaining"), Some("5"));
    assert!(header(&resp, "retry-after").is_none());
    assert_eq!(header(&resp, "content-type"), Some("application/json"));

    let body = body_json(resp).await?;
    assert_eq!(body["ok"], true);
    assert_eq!(body["code"], "lead_submitted");
    assert_eq!(body["existingContact"], false);

    let leads = sink.submitted();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].name, "Jordan Rivera");
    assert_eq!(leads[0].email, "jordan@studio.fit");
    assert_eq!(leads[0].business_type.as_deref(), Some("Yoga studio"));
    assert_eq!(leads[0].message, None);
    assert_eq!(leads[0].page_name.as_deref(), Some("Pricing"));

    let calls = captcha.calls.lock().map(|c| c.clone()).unwrap_or_default();
    assert_eq!(
        calls,
        vec![("tok-123".to_string(), Some("203.0.113.7".to_string()))]
    );
    Ok(())
}

#[tokio::test]
async fn existing_contact_is_reported() -> TestResult {
    let state = bare_state()
        .with_captcha(FakeCaptcha::passing())
        .with_lead_sink(FakeSink::with(Ok(LeadReceipt {
            existing_contact: true,
        })));

    let resp = handle_request(&state, post_json("/api/lead", VALID_LEAD)?, peer()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await?;
    assert_eq!(body["code"], "lead_already_exists");
    assert_eq!(body["existingContact"], true);
    Ok(())
}

#[tokio::test]
async fn unknown_client_is_not_sent_to_captcha() -> TestResult {
    let captcha = FakeCaptcha::passing();
    let state = bare_state()
        .with_captcha(captcha.clone())
        .with_lead_sink(FakeSink::new_contact());

    let resp = handle_request(&state, post_json("/api/lead", VALID_LEAD)?, peer()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let calls = captcha.calls.lock().map(|c| c.clone()).unwrap_or_default();
    assert_eq!(calls, vec![("tok-123".to_string(), None)]);
    Ok(())
}

#[tokio::test]
async fn optional_fields_are_truncated() -> TestResult {
    let sink = FakeSink::new_contact();
    let state = bare_state()
        .with_captcha(FakeCaptcha::passing())
        .with_lead_sink(sink.clone());

    let long_message = "x".repeat(2_500);
    let body = serde_json::json!({
        "name": "N".repeat(100),
        "email": "a@b.co",
        "captchaToken": "t",
        "message": long_message,
        "hutk": "h".repeat(300),
    })
    .to_string();

    let resp = handle_request(&state, post_json("/api/lead", &body)?, peer()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let leads = sink.submitted();
    assert_eq!(leads[0].name.chars().count(), 80);
    assert_eq!(leads[0].message.as_ref().map(|m| m.len()), Some(2_000));
    assert_eq!(leads[0].hutk.as_ref().map(|h| h.len()), Some(200));
    Ok(())
}

#[tokio::test]
async fn invalid_fields_are_rejected_before_captcha() -> TestResult {
    let captcha = FakeCaptcha::passing();
    let state = bare_state()
        .with_captcha(captcha.clone())
        .with_lead_sink(FakeSink::new_contact());

    for body in [
        r#"{"name":"Jo","email":"not-an-email","captchaToken":"t"}"#,
        r#"{"name":"  ","email":"jo@studio.fit","captchaToken":"t"}"#,
        r#"{"email":"jo@studio.fit","captchaToken":"t"}"#,
        r#"{"name":"Jo","email":42,"captchaToken":"t"}"#,
    ] {
        let resp = handle_request(&state, post_json("/api/lead", body)?, peer()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {body}");
        assert!(header(&resp, "x-ratelimit-remaining").is_some());
        assert_eq!(body_json(resp).await?["code"], "invalid_request");
    }
    assert_eq!(captcha.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn missing_captcha_token_is_rejected() -> TestResult {
    let state = bare_state().with_captcha(FakeCaptcha::passing());
    let body = r#"{"name":"Jo","email":"jo@studio.fit","captchaToken":"   "}"#;

    let resp = handle_request(&state, post_json("/api/lead", body)?, peer()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await?["code"], "captcha_required");
    Ok(())
}

#[tokio::test]
async fn missing_upstreams_are_misconfiguration() -> TestResult {
    let resp = handle_request(&bare_state(), post_json("/api/lead", VALID_LEAD)?, peer()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp).await?["code"], "server_misconfigured");

    let no_sink = bare_state().with_captcha(FakeCaptcha::passing());
    let resp = handle_request(&no_sink, post_json("/api/lead", VALID_LEAD)?, peer()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp).await?["code"], "server_misconfigured");
    Ok(())
}

#[tokio::test]
async fn failed_captcha_is_rejected() -> TestResult {
    let sink = FakeSink::new_contact();
    let state = bare_state()
        .with_captcha(FakeCaptcha::with(Ok(CaptchaVerification::failed())))
        .with_lead_sink(sink.clone());

    let resp = handle_request(&state, post_json("/api/lead", VALID_LEAD)?, peer()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await?["code"], "captcha_failed");
    assert!(sink.submitted().is_empty());
    Ok(())
}

#[tokio::test]
async fn captcha_policy_rejects_foreign_hostname() -> TestResult {
    let verification = CaptchaVerification {
        success: true,
        hostname: Some("evil.example".to_string()),
        ..CaptchaVerification::default()
    };
    let state = bare_state()
        .with_captcha(FakeCaptcha::with(Ok(verification)))
        .with_captcha_policy(CaptchaPolicy::new(
            Duration::from_secs(300),
            &["fitbooks.ca".to_string()],
            None,
        ))
        .with_lead_sink(FakeSink::new_contact());

    let resp = handle_request(&state, post_json("/api/lead", VALID_LEAD)?, peer()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await?["code"], "captcha_failed");
    Ok(())
}

#[tokio::test]
async fn upstream_failures_map_to_server_and_crm_errors() -> TestResult {
    let unreachable = bare_state()
        .with_captcha(FakeCaptcha::with(Err(UpstreamError::Timeout)))
        .with_lead_sink(FakeSink::new_contact());
    let resp = handle_request(&unreachable, post_json("/api/lead", VALID_LEAD)?, peer()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp).await?["code"], "server_error");

    let crm_down = bare_state()
        .with_captcha(FakeCaptcha::passing())
        .with_lead_sink(FakeSink::with(Err(UpstreamError::Status(503))));
    let resp = handle_request(&crm_down, post_json("/api/lead", VALID_LEAD)?, peer()).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(resp).await?["code"], "crm_unavailable");
    Ok(())
}

#[tokio::test]
async fn malformed_bodies_are_rejected() -> TestResult {
    let state = bare_state();

    let resp = handle_request(&state, post_json("/api/lead", "{not json")?, peer()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await?["code"], "invalid_json");

    let oversized = format!(r#"{{"message":"{}"}}"#, "x".repeat(11_000));
    let resp = handle_request(&state, post_json("/api/lead", &oversized)?, peer()).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(resp).await?["code"], "payload_too_large");
    Ok(())
}

#[tokio::test]
async fn seventh_attempt_is_rate_limited() -> TestResult {
    let captcha = FakeCaptcha::passing();
    let state = bare_state()
        .with_captcha(captcha.clone())
        .with_lead_sink(FakeSink::new_contact());

    for _ in 0..6 {
        let req = request(Method::POST, "/api/lead", VALID_LEAD, &forwarded())?;
        assert_eq!(
            handle_request(&state, req, peer()).await.status(),
            StatusCode::OK
        );
    }

    let req = request(Method::POST, "/api/lead", VALID_LEAD, &forwarded())?;
    let resp = handle_request(&state, req, peer()).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&resp, "x-ratelimit-remaining"), Some("0"));
    assert_eq!(header(&resp, "retry-after"), Some("900"));
    assert_eq!(
        body_json(resp).await?,
        serde_json::json!({"ok": false, "code": "rate_limited"})
    );
    assert_eq!(captcha.call_count(), 6);

    // Another client is unaffected.
    let req = request(
        Method::POST,
        "/api/lead",
        VALID_LEAD,
        &[("x-real-ip", "198.51.100.9")],
    )?;
    assert_eq!(
        handle_request(&state, req, peer()).await.status(),
        StatusCode::OK
    );
    Ok(())
}

#[tokio::test]
async fn wrong_method_and_unknown_path() -> TestResult {
    let state = bare_state();

    let resp = handle_request(&state, request(Method::GET, "/api/lead", "", &[])?, peer()).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(header(&resp, "allow"), Some("POST"));
    assert_eq!(body_json(resp).await?["code"], "method_not_allowed");

    let resp = handle_request(&state, post_json("/api/unknown", "{}")?, peer()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await?["code"], "not_found");
    Ok(())
}
