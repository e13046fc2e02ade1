//! HTTP surface integration tests against the in-memory directory.

mod common;

use common::*;

fn unit_courses(body: &serde_json::Value, index: usize) -> Vec<i64> {
    body["items"][index]["courses"]
        .as_array()
        .expect("courses array")
        .iter()
        .map(|course| course["course_id"].as_i64().expect("numeric id"))
        .collect()
}

#[tokio::test]
async fn health_check_returns_200() {
    let app = TestApp::spawn().await;

    let response = app
        .client()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-request-id"));

    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "scope-service-test");
    assert_eq!(body["checks"]["directory"], "up");
}

#[tokio::test]
async fn health_check_reports_unavailable_directory() {
    let app = TestApp::spawn().await;
    app.directory.set_unavailable(true);

    let response = app
        .client()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 503);
}

#[tokio::test]
async fn metrics_are_exported_in_prometheus_format() {
    let app = TestApp::spawn().await;
    app.get_as("/scope", COORDINATOR, None).await;
    app.get_as("/students/700", COORDINATOR, None).await;

    let body = app
        .client()
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .expect("Failed to execute request")
        .text()
        .await
        .expect("Failed to read body");

    assert!(body.contains("http_requests_total"), "{body}");
    assert!(body.contains("access_decisions_total"), "{body}");
    assert!(body.contains("outcome=\"allowed\""), "{body}");
}

#[tokio::test]
async fn missing_identity_is_unauthorized() {
    let app = TestApp::spawn().await;

    let response = app
        .client()
        .get(format!("{}/scope", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn unknown_user_is_unauthorized() {
    let app = TestApp::spawn().await;

    let (status, _) = app.get_json("/scope", UNKNOWN_USER).await;

    assert_eq!(status, 401);
}

#[tokio::test]
async fn corrupt_role_code_is_a_server_error() {
    let app = TestApp::spawn().await;

    let (status, _) = app.get_json("/scope", CORRUPT_ROLE_USER).await;

    assert_eq!(status, 500);
}

#[tokio::test]
async fn scope_endpoint_returns_resolved_sets() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get_json("/scope", COORDINATOR).await;

    assert_eq!(status, 200);
    assert_eq!(body["scope"]["role"], "COORDINATION");
    assert_eq!(body["scope"]["courses"], serde_json::json!([7, 9]));
    assert_eq!(body["scope"]["units"], serde_json::json!([5]));
    assert!(body["entitlements"]
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e["resource"] == "student_list" && e["action"] == "list"));
}

#[tokio::test]
async fn mismatched_role_selector_is_forbidden() {
    let app = TestApp::spawn().await;

    let response = app.get_as("/scope", STUDENT, Some("ADMIN")).await;

    assert_eq!(response.status(), 403);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "role-not-entitled");
}

#[tokio::test]
async fn unparsable_role_selector_is_a_bad_request() {
    let app = TestApp::spawn().await;

    let response = app.get_as("/scope", STUDENT, Some("janitor")).await;

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn student_reads_own_record() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get_json("/students/me", STUDENT).await;
    assert_eq!(status, 200);
    assert_eq!(body["student_id"], 700);
    assert_eq!(body["campus_id"], 1);
    assert_eq!(body["classification"], "regular");

    let (status, body) = app.get_json("/students/700", STUDENT).await;
    assert_eq!(status, 200);
    assert_eq!(body["course_id"], 7);
}

#[tokio::test]
async fn student_requesting_foreign_ids_sees_self_only() {
    let app = TestApp::spawn().await;

    for path in ["/students/701", "/students/999999"] {
        let (status, body) = app.get_json(path, STUDENT).await;
        assert_eq!(status, 403, "{path}");
        assert_eq!(body["error"], "self-only", "{path}");
    }
}

#[tokio::test]
async fn students_me_is_for_students_only() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get_json("/students/me", COORDINATOR).await;

    assert_eq!(status, 403);
    assert_eq!(body["error"], "role-not-entitled");
}

#[tokio::test]
async fn coordinator_reads_students_in_scope_only() {
    let app = TestApp::spawn().await;

    let (status, _) = app.get_json("/students/700", COORDINATOR).await;
    assert_eq!(status, 200);

    let (status, body) = app.get_json("/students/800", COORDINATOR).await;
    assert_eq!(status, 403);
    assert_eq!(body["error"], "scope-not-satisfied");

    let (status, _) = app.get_json("/students/999999", COORDINATOR).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn admin_gets_not_found_for_missing_students() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get_json("/students/999999", ADMIN).await;

    assert_eq!(status, 404);
    assert_eq!(body["error"], "student 999999 not found");
}

#[tokio::test]
async fn student_list_is_filtered_by_scope() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get_json("/students", COORDINATOR).await;
    assert_eq!(status, 200);
    assert_eq!(ids(&body, "student_id"), vec![700, 701, 900]);
    assert_eq!(body["filter"]["by"], "courses");

    let (_, body) = app.get_json("/students", PROFESSOR).await;
    assert_eq!(ids(&body, "student_id"), vec![700, 900]);

    let (_, body) = app.get_json("/students", RECTOR).await;
    assert_eq!(ids(&body, "student_id"), vec![700, 701, 800, 900, 2000]);

    let (_, body) = app.get_json("/students", ADMIN).await;
    assert_eq!(ids(&body, "student_id").len(), 6);
}

#[tokio::test]
async fn empty_scope_lists_nothing() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get_json("/students", UNAFFILIATED_PROFESSOR).await;

    assert_eq!(status, 200);
    assert!(ids(&body, "student_id").is_empty());
    assert_eq!(body["filter"]["by"], "nothing");
    assert!(!app.directory.calls().contains(&"list_students"));
}

#[tokio::test]
async fn students_cannot_list() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get_json("/students", STUDENT).await;

    assert_eq!(status, 403);
    assert_eq!(body["error"], "role-not-entitled");
}

#[tokio::test]
async fn list_pagination_is_validated_and_applied() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get_json("/students?limit=1&offset=1", COORDINATOR).await;
    assert_eq!(status, 200);
    assert_eq!(ids(&body, "student_id"), vec![701]);
    assert_eq!(body["limit"], 1);
    assert_eq!(body["offset"], 1);

    for query in ["limit=0", "limit=2001", "offset=-1"] {
        let (status, _) = app
            .get_json(&format!("/students?{}", query), COORDINATOR)
            .await;
        assert_eq!(status, 400, "{query}");
    }
}

#[tokio::test]
async fn course_list_requires_reports_and_follows_scope() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get_json("/courses", DEPARTMENT_HEAD).await;
    assert_eq!(status, 200);
    assert_eq!(ids(&body, "course_id"), vec![7, 8, 9]);

    let (_, body) = app.get_json("/courses", PRO_RECTOR).await;
    assert_eq!(ids(&body, "course_id"), vec![30]);

    let (status, _) = app.get_json("/courses", PROFESSOR).await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn course_disciplines_respect_professor_affiliations() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get_json("/courses/7/disciplines", PROFESSOR).await;
    assert_eq!(status, 200);
    assert_eq!(ids(&body, "discipline_id"), vec![10]);

    let (status, _) = app.get_json("/courses/8/disciplines", PROFESSOR).await;
    assert_eq!(status, 403);

    let (status, body) = app.get_json("/courses/9/disciplines", COORDINATOR).await;
    assert_eq!(status, 200);
    assert_eq!(ids(&body, "discipline_id"), vec![11]);

    let (status, _) = app.get_json("/courses/424242/disciplines", COORDINATOR).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn unit_list_attaches_visible_courses() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get_json("/units", RECTOR).await;
    assert_eq!(status, 200);
    assert_eq!(ids(&body, "unit_id"), vec![5, 6]);
    assert_eq!(body["filter"]["by"], "campuses");
    assert_eq!(body["items"][0]["unit_name"], "Exact Sciences");
    assert_eq!(unit_courses(&body, 0), vec![7, 8, 9]);
    assert_eq!(unit_courses(&body, 1), vec![20]);

    let (_, body) = app.get_json("/units", COORDINATOR).await;
    assert_eq!(ids(&body, "unit_id"), vec![5]);
    assert_eq!(unit_courses(&body, 0), vec![7, 9]);

    let (_, body) = app.get_json("/units", PRO_RECTOR).await;
    assert_eq!(ids(&body, "unit_id"), vec![8]);
    assert_eq!(unit_courses(&body, 0), vec![30]);

    let (_, body) = app.get_json("/units", ADMIN).await;
    assert_eq!(ids(&body, "unit_id"), vec![5, 6, 8]);
}

#[tokio::test]
async fn unit_list_can_omit_courses() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .get_json("/units?include_courses=false", DEPARTMENT_HEAD)
        .await;

    assert_eq!(status, 200);
    assert_eq!(ids(&body, "unit_id"), vec![5]);
    assert!(body["items"][0].get("courses").is_none());
    assert!(!app.directory.calls().contains(&"list_unit_courses"));
}

#[tokio::test]
async fn unit_list_requires_reports() {
    let app = TestApp::spawn().await;

    for user_id in [PROFESSOR, STUDENT] {
        let (status, body) = app.get_json("/units", user_id).await;
        assert_eq!(status, 403, "{user_id}");
        assert_eq!(body["error"], "role-not-entitled", "{user_id}");
    }

    let (status, body) = app.get_json("/units", UNAFFILIATED_RECTOR).await;
    assert_eq!(status, 200);
    assert!(ids(&body, "unit_id").is_empty());
    assert_eq!(body["filter"]["by"], "nothing");
}

#[tokio::test]
async fn unit_courses_check_the_unit_then_filter_courses() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get_json("/units/5/courses", COORDINATOR).await;
    assert_eq!(status, 200);
    assert_eq!(ids(&body, "course_id"), vec![7, 9]);

    let (_, body) = app.get_json("/units/5/courses", DEPARTMENT_HEAD).await;
    assert_eq!(ids(&body, "course_id"), vec![7, 8, 9]);

    let (status, body) = app.get_json("/units/6/courses", COORDINATOR).await;
    assert_eq!(status, 403);
    assert_eq!(body["error"], "scope-not-satisfied");

    let (status, _) = app.get_json("/units/8/courses", RECTOR).await;
    assert_eq!(status, 403);

    let (status, _) = app.get_json("/units/424242/courses", COORDINATOR).await;
    assert_eq!(status, 404);

    let (status, body) = app.get_json("/units/5/courses?limit=1&offset=1", RECTOR).await;
    assert_eq!(status, 200);
    assert_eq!(ids(&body, "course_id"), vec![8]);
}

#[tokio::test]
async fn discipline_list_follows_scope() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get_json("/disciplines", RECTOR).await;
    assert_eq!(status, 200);
    assert_eq!(ids(&body, "discipline_id"), vec![10, 11, 12, 99]);

    let (_, body) = app.get_json("/disciplines", COORDINATOR).await;
    assert_eq!(ids(&body, "discipline_id"), vec![10, 11]);
}

#[tokio::test]
async fn unavailable_directory_is_a_503() {
    let app = TestApp::spawn().await;
    app.directory.set_unavailable(true);

    let (status, body) = app.get_json("/students/700", COORDINATOR).await;

    assert_eq!(status, 503);
    assert_eq!(body["error"], "Service unavailable");
}

#[tokio::test]
async fn unaffiliated_rector_reads_nothing() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get_json("/courses", UNAFFILIATED_RECTOR).await;
    assert_eq!(status, 200);
    assert!(ids(&body, "course_id").is_empty());

    let (status, body) = app.get_json("/students/700", UNAFFILIATED_RECTOR).await;
    assert_eq!(status, 403);
    assert_eq!(body["error"], "scope-not-satisfied");
}
