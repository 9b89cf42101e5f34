use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use waypoint::api::create_router;
use waypoint::db::Database;
use waypoint::models::*;
use waypoint::status::StatusEngine;

fn setup() -> TestServer {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    let app = create_router(StatusEngine::new(db));
    TestServer::new(app).expect("Failed to create test server")
}

async fn create_test_project(server: &TestServer) -> Project {
    server
        .post("/api/v1/projects")
        .json(&CreateProjectInput {
            name: "Test Project".to_string(),
            description: None,
            requires_verification: false,
        })
        .await
        .json::<Project>()
}

async fn create_test_feature(server: &TestServer, project_id: Option<uuid::Uuid>) -> Feature {
    server
        .post("/api/v1/features")
        .json(&CreateFeatureInput {
            project_id,
            title: "Test Feature".to_string(),
            description: None,
            requires_verification: false,
        })
        .await
        .json::<Feature>()
}

async fn create_test_task(server: &TestServer, feature_id: Option<uuid::Uuid>) -> Task {
    server
        .post("/api/v1/tasks")
        .json(&CreateTaskInput {
            feature_id,
            title: "Test Task".to_string(),
            description: None,
            requires_verification: false,
        })
        .await
        .json::<Task>()
}

async fn transition(server: &TestServer, id: uuid::Uuid, status: &str) -> Value {
    let response = server
        .post(&format!("/api/v1/entities/{id}/status"))
        .json(&json!({ "status": status }))
        .await;
    response.assert_status_ok();
    response.json()
}

mod health {
    use super::*;

    #[tokio::test]
    async fn reports_ok() {
        let server = setup();
        let response = server.get("/api/v1/health").await;
        response.assert_status_ok();
    }
}

mod projects {
    use super::*;

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let server = setup();
        let created = create_test_project(&server).await;

        let response = server.get(&format!("/api/v1/projects/{}", created.id)).await;
        response.assert_status_ok();
        let fetched: Project = response.json();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.status, ProjectStatus::Planning);
    }

    #[tokio::test]
    async fn get_unknown_project_is_404() {
        let server = setup();
        let response = server
            .get(&format!("/api/v1/projects/{}", uuid::Uuid::new_v4()))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_project_returns_no_content() {
        let server = setup();
        let project = create_test_project(&server).await;

        server
            .delete(&format!("/api/v1/projects/{}", project.id))
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .get(&format!("/api/v1/projects/{}", project.id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn lists_features_of_a_project() {
        let server = setup();
        let project = create_test_project(&server).await;
        create_test_feature(&server, Some(project.id)).await;
        create_test_feature(&server, None).await;

        let response = server
            .get(&format!("/api/v1/projects/{}/features", project.id))
            .await;
        response.assert_status_ok();
        let features: Vec<Feature> = response.json();
        assert_eq!(features.len(), 1);
    }
}

mod features_and_tasks {
    use super::*;

    #[tokio::test]
    async fn create_feature_under_unknown_project_is_rejected() {
        let server = setup();
        let response = server
            .post("/api/v1/features")
            .json(&CreateFeatureInput {
                project_id: Some(uuid::Uuid::new_v4()),
                title: "Orphan".to_string(),
                description: None,
                requires_verification: false,
            })
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn lists_tasks_of_a_feature() {
        let server = setup();
        let feature = create_test_feature(&server, None).await;
        create_test_task(&server, Some(feature.id)).await;
        create_test_task(&server, Some(feature.id)).await;

        let response = server
            .get(&format!("/api/v1/features/{}/tasks", feature.id))
            .await;
        response.assert_status_ok();
        let tasks: Vec<Task> = response.json();
        assert_eq!(tasks.len(), 2);
    }

    #[tokio::test]
    async fn lists_dependencies_of_a_task() {
        let server = setup();
        let a = create_test_task(&server, None).await;
        let b = create_test_task(&server, None).await;

        server
            .post("/api/v1/dependencies")
            .json(&CreateDependencyInput {
                from_task_id: a.id,
                to_task_id: b.id,
                dep_type: DependencyType::Blocks,
            })
            .await
            .assert_status(StatusCode::CREATED);

        let response = server.get(&format!("/api/v1/tasks/{}/dependencies", b.id)).await;
        response.assert_status_ok();
        let deps: Vec<Dependency> = response.json();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].from_task_id, a.id);
    }
}

mod status_endpoint {
    use super::*;

    #[tokio::test]
    async fn get_status_resolves_any_entity_kind() {
        let server = setup();
        let feature = create_test_feature(&server, None).await;

        let response = server
            .get(&format!("/api/v1/entities/{}/status", feature.id))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["entity_type"], "feature");
        assert_eq!(body["status"], "planning");
    }

    #[tokio::test]
    async fn transition_succeeds_and_returns_the_outcome() {
        let server = setup();
        let task = create_test_task(&server, None).await;

        let body = transition(&server, task.id, "in_progress").await;
        assert_eq!(body["status"], "in_progress");
        assert_eq!(body["entity_type"], "task");
        assert!(body["cascade"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn illegal_transition_is_422_with_error_code() {
        let server = setup();
        let task = create_test_task(&server, None).await;

        let response = server
            .post(&format!("/api/v1/entities/{}/status", task.id))
            .json(&json!({ "status": "completed" }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["error_code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_entity_is_404_with_error_code() {
        let server = setup();

        let response = server
            .post(&format!("/api/v1/entities/{}/status", uuid::Uuid::new_v4()))
            .json(&json!({ "status": "in_progress" }))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["error_code"], "RESOURCE_NOT_FOUND");
    }

    #[tokio::test]
    async fn blocked_completion_reports_the_unmet_criteria() {
        let server = setup();
        let task = server
            .post("/api/v1/tasks")
            .json(&CreateTaskInput {
                feature_id: None,
                title: "Gated".to_string(),
                description: None,
                requires_verification: true,
            })
            .await
            .json::<Task>();

        server
            .put(&format!("/api/v1/entities/{}/verification", task.id))
            .json(&json!({
                "criteria": [{ "criteria": "load test passes", "pass": false }]
            }))
            .await
            .assert_status_ok();

        transition(&server, task.id, "in_progress").await;
        transition(&server, task.id, "testing").await;

        let response = server
            .post(&format!("/api/v1/entities/{}/status", task.id))
            .json(&json!({ "status": "completed" }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = response.json();
        assert_eq!(body["error_code"], "VALIDATION_ERROR");
        assert!(body["error_detail"]
            .as_str()
            .unwrap()
            .contains("load test passes"));

        // Flip the criterion through the API and complete.
        server
            .put(&format!("/api/v1/entities/{}/verification", task.id))
            .json(&json!({
                "criteria": [{ "criteria": "load test passes", "pass": true }]
            }))
            .await
            .assert_status_ok();

        let body = transition(&server, task.id, "completed").await;
        assert_eq!(body["status"], "completed");
    }

    #[tokio::test]
    async fn completing_the_last_task_cascades_in_the_response() {
        let server = setup();
        let project = create_test_project(&server).await;
        let feature = create_test_feature(&server, Some(project.id)).await;
        let task = create_test_task(&server, Some(feature.id)).await;

        transition(&server, project.id, "in_development").await;
        transition(&server, feature.id, "in_development").await;
        transition(&server, task.id, "in_progress").await;
        let body = transition(&server, task.id, "completed").await;

        let cascade = body["cascade"].as_array().unwrap();
        assert_eq!(cascade.len(), 2);
        assert_eq!(cascade[0]["entity_type"], "feature");
        assert_eq!(cascade[0]["changed"], true);
        assert_eq!(cascade[1]["entity_type"], "project");
        assert_eq!(cascade[1]["changed"], true);

        let status: Value = server
            .get(&format!("/api/v1/entities/{}/status", project.id))
            .await
            .json();
        assert_eq!(status["status"], "completed");
    }

    #[tokio::test]
    async fn verification_block_is_readable_back() {
        let server = setup();
        let task = create_test_task(&server, None).await;

        server
            .put(&format!("/api/v1/entities/{}/verification", task.id))
            .json(&json!({
                "criteria": [{ "criteria": "reviewed", "pass": true }]
            }))
            .await
            .assert_status_ok();

        let response = server
            .get(&format!("/api/v1/entities/{}/verification", task.id))
            .await;
        response.assert_status_ok();
        let blocks: Vec<VerificationBlock> = response.json();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].is_satisfied());
    }
}
