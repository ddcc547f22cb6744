//! Engine-level tests against an in-memory transport: dependency ordering,
//! cycle detection, fail-fast creation, and repository CRUD semantics.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use testdata::{
    Binding, DataRegistry, Entity, EntityError, EntityFactory, EntityResult, FieldNamingPolicy,
    HttpMethod, HttpResponse, HttpTransport, JsonCodec, Repository, Session,
};

#[derive(Default)]
struct MockState {
    objects: HashMap<String, Value>,
    calls: Vec<String>,
    next_id: u64,
    failing_calls: HashSet<String>,
}

/// In-memory stand-in for the remote service: sequential identifiers, a
/// call log for ordering assertions, and per-call failure injection.
#[derive(Default)]
struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn fail_on(&self, call: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_calls
            .insert(call.to_string());
    }

    fn object(&self, path: &str) -> Option<Value> {
        self.state.lock().unwrap().objects.get(path).cloned()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> EntityResult<HttpResponse> {
        let mut state = self.state.lock().unwrap();
        let call = format!("{} {}", method, path);
        state.calls.push(call.clone());

        if state.failing_calls.contains(&call) {
            return Ok(HttpResponse {
                status: 500,
                body: Some(json!({"message": "injected failure"})),
            });
        }

        match method {
            HttpMethod::Post => {
                state.next_id += 1;
                let id = format!("{}-{}", path, state.next_id);
                let mut object = body.cloned().unwrap_or_else(|| json!({}));
                object["id"] = Value::String(id.clone());
                state.objects.insert(format!("{}/{}", path, id), object.clone());
                Ok(HttpResponse {
                    status: 200,
                    body: Some(object),
                })
            }
            HttpMethod::Get => match state.objects.get(path) {
                Some(object) => Ok(HttpResponse {
                    status: 200,
                    body: Some(object.clone()),
                }),
                None => Ok(HttpResponse {
                    status: 404,
                    body: None,
                }),
            },
            HttpMethod::Put => {
                let patch = body.cloned().unwrap_or_else(|| json!({}));
                match state.objects.get_mut(path) {
                    Some(object) => {
                        if let (Some(target), Some(source)) =
                            (object.as_object_mut(), patch.as_object())
                        {
                            for (key, value) in source {
                                target.insert(key.clone(), value.clone());
                            }
                        }
                        Ok(HttpResponse {
                            status: 200,
                            body: Some(object.clone()),
                        })
                    }
                    None => Ok(HttpResponse {
                        status: 404,
                        body: None,
                    }),
                }
            }
            HttpMethod::Delete => {
                if state.objects.remove(path).is_some() {
                    Ok(HttpResponse {
                        status: 200,
                        body: None,
                    })
                } else {
                    Ok(HttpResponse {
                        status: 404,
                        body: None,
                    })
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct Project {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl Entity for Project {
    const KIND: &'static str = "project";

    fn identifier(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_identifier(&mut self, id: String) {
        self.id = Some(id);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct Task {
    #[serde(skip)]
    project: Option<Project>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_id: Option<String>,
}

impl Entity for Task {
    const KIND: &'static str = "task";

    fn identifier(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_identifier(&mut self, id: String) {
        self.id = Some(id);
    }

    fn dependency_bindings(&mut self) -> Vec<Binding<'_>> {
        let Self {
            project,
            project_id,
            ..
        } = self;
        project
            .as_mut()
            .map(|node| Binding::new("project_id", node, project_id))
            .into_iter()
            .collect()
    }
}

struct ProjectFactory;

impl EntityFactory<Project> for ProjectFactory {
    fn build_default(&self) -> Project {
        Project {
            id: None,
            name: Some("Default Project".to_string()),
        }
    }
}

fn setup() -> (Arc<MockTransport>, Arc<DataRegistry>) {
    let transport = Arc::new(MockTransport::default());
    let registry = Arc::new(DataRegistry::new());
    let codec = JsonCodec::new(FieldNamingPolicy::LowerCaseWithUnderscores);
    registry.register_repository(Repository::<Project>::new(
        transport.clone(),
        "projects",
        codec,
    ));
    registry.register_repository(Repository::<Task>::new(transport.clone(), "tasks", codec));
    (transport, registry)
}

fn default_task() -> Task {
    Task {
        project: Some(Project {
            id: None,
            name: Some("Parent".to_string()),
        }),
        title: Some("Do the thing".to_string()),
        ..Task::default()
    }
}

#[tokio::test]
async fn test_dependency_created_before_dependent() {
    let (transport, registry) = setup();
    let session = Session::new(registry);

    let mut task = default_task();
    session.create_with_dependencies(&mut task).await.unwrap();

    let creates: Vec<String> = transport
        .calls()
        .into_iter()
        .filter(|call| call.starts_with("POST"))
        .collect();
    assert_eq!(creates, ["POST projects", "POST tasks"]);

    let project_id = task.project.as_ref().unwrap().id.clone().unwrap();
    assert_eq!(task.project_id.as_deref(), Some(project_id.as_str()));
    assert!(task.id.is_some());
    assert!(session.is_tracked("project", &project_id));
    assert!(session.is_tracked("task", task.id.as_deref().unwrap()));
}

#[tokio::test]
async fn test_pre_supplied_dependency_is_not_recreated() {
    let (transport, registry) = setup();
    let session = Session::new(registry);

    let mut task = default_task();
    task.project.as_mut().unwrap().id = Some("existing-project".to_string());
    session.create_with_dependencies(&mut task).await.unwrap();

    let creates: Vec<String> = transport
        .calls()
        .into_iter()
        .filter(|call| call.starts_with("POST"))
        .collect();
    assert_eq!(creates, ["POST tasks"]);
    assert_eq!(task.project_id.as_deref(), Some("existing-project"));
    assert!(!session.is_tracked("project", "existing-project"));
}

#[tokio::test]
async fn test_failed_create_keeps_earlier_entities_tracked() {
    let (transport, registry) = setup();
    let session = Session::new(registry);
    transport.fail_on("POST tasks");

    let mut task = default_task();
    let error = session
        .create_with_dependencies(&mut task)
        .await
        .err()
        .unwrap();
    assert!(matches!(error, EntityError::RemoteWrite { kind: "task", .. }));

    // The project was created before the failure and must still be torn down.
    let project_id = task.project.as_ref().unwrap().id.clone().unwrap();
    assert!(session.is_tracked("project", &project_id));

    let before = transport.calls().len();
    let report = session.finish().await;
    assert!(report.is_clean());
    assert_eq!(report.deleted, 1);
    assert_eq!(
        transport.calls()[before..],
        [format!("DELETE projects/{}", project_id)]
    );
}

#[tokio::test]
async fn test_already_created_entity_is_a_no_op() {
    let (transport, registry) = setup();
    let session = Session::new(registry);

    let mut project = Project {
        id: Some("projects-99".to_string()),
        name: None,
    };
    session
        .create_with_dependencies(&mut project)
        .await
        .unwrap();
    assert!(transport.calls().is_empty());
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct Alpha {
    #[serde(skip)]
    beta: Option<Box<Beta>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    beta_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct Beta {
    #[serde(skip)]
    alpha: Option<Box<Alpha>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alpha_id: Option<String>,
}

impl Entity for Alpha {
    const KIND: &'static str = "alpha";

    fn identifier(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_identifier(&mut self, id: String) {
        self.id = Some(id);
    }

    fn dependency_bindings(&mut self) -> Vec<Binding<'_>> {
        let Self { beta, beta_id, .. } = self;
        beta.as_mut()
            .map(|node| Binding::new("beta_id", node.as_mut(), beta_id))
            .into_iter()
            .collect()
    }
}

impl Entity for Beta {
    const KIND: &'static str = "beta";

    fn identifier(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_identifier(&mut self, id: String) {
        self.id = Some(id);
    }

    fn dependency_bindings(&mut self) -> Vec<Binding<'_>> {
        let Self { alpha, alpha_id, .. } = self;
        alpha
            .as_mut()
            .map(|node| Binding::new("alpha_id", node.as_mut(), alpha_id))
            .into_iter()
            .collect()
    }
}

#[tokio::test]
async fn test_dependency_cycle_is_detected() {
    let transport = Arc::new(MockTransport::default());
    let registry = Arc::new(DataRegistry::new());
    let codec = JsonCodec::default();
    registry.register_repository(Repository::<Alpha>::new(transport.clone(), "alphas", codec));
    registry.register_repository(Repository::<Beta>::new(transport.clone(), "betas", codec));
    let session = Session::new(registry);

    let mut alpha = Alpha {
        beta: Some(Box::new(Beta {
            alpha: Some(Box::new(Alpha::default())),
            ..Beta::default()
        })),
        ..Alpha::default()
    };

    let error = session
        .create_with_dependencies(&mut alpha)
        .await
        .err()
        .unwrap();
    match error {
        EntityError::DependencyCycle { path } => {
            assert_eq!(path, "alpha -> beta -> alpha");
        }
        other => panic!("expected DependencyCycle, got {:?}", other),
    }
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_delete_dependencies_and_self_walks_post_order() {
    let (transport, registry) = setup();
    let session = Session::new(registry);

    let mut task = default_task();
    session.create_with_dependencies(&mut task).await.unwrap();
    let task_id = task.id.clone().unwrap();
    let project_id = task.project.as_ref().unwrap().id.clone().unwrap();

    let before = transport.calls().len();
    session.delete_dependencies_and_self(&mut task).await;

    assert_eq!(
        transport.calls()[before..],
        [
            format!("DELETE tasks/{}", task_id),
            format!("DELETE projects/{}", project_id),
        ]
    );
    assert!(!session.is_tracked("task", &task_id));
    assert!(!session.is_tracked("project", &project_id));

    // Nothing left for the teardown drain.
    let report = session.finish().await;
    assert_eq!(report.deleted, 0);
}

#[tokio::test]
async fn test_delete_walk_spares_pre_supplied_dependencies() {
    let (transport, registry) = setup();
    let session = Session::new(registry);

    let mut task = default_task();
    task.project.as_mut().unwrap().id = Some("existing-project".to_string());
    session.create_with_dependencies(&mut task).await.unwrap();

    let before = transport.calls().len();
    session.delete_dependencies_and_self(&mut task).await;

    let cleanup: Vec<String> = transport.calls()[before..].to_vec();
    assert_eq!(cleanup, [format!("DELETE tasks/{}", task.id.clone().unwrap())]);
}

#[tokio::test]
async fn test_repository_create_rejects_assigned_identifier() {
    let (_transport, registry) = setup();
    let repository = registry.repository::<Project>().unwrap();

    let mut project = Project {
        id: Some("projects-1".to_string()),
        name: None,
    };
    let error = repository.create(&mut project).await.err().unwrap();
    assert!(matches!(
        error,
        EntityError::IdentifierAssigned { kind: "project", .. }
    ));
}

#[tokio::test]
async fn test_repository_update_requires_identifier() {
    let (_transport, registry) = setup();
    let repository = registry.repository::<Project>().unwrap();

    let error = repository.update(&Project::default()).await.err().unwrap();
    assert!(matches!(
        error,
        EntityError::MissingIdentifier { kind: "project" }
    ));
}

#[tokio::test]
async fn test_repository_get_maps_missing_resource_to_not_found() {
    let (_transport, registry) = setup();
    let repository = registry.repository::<Project>().unwrap();

    let error = repository.get("projects-404").await.err().unwrap();
    assert!(matches!(error, EntityError::NotFound { kind: "project", .. }));
}

#[tokio::test]
async fn test_repository_round_trip_through_mock() {
    let (transport, registry) = setup();
    let session = Session::new(registry);

    let mut project = Project {
        id: None,
        name: Some("Round Trip".to_string()),
    };
    session.create(&mut project).await.unwrap();
    let id = project.id.clone().unwrap();

    project.name = Some("Renamed".to_string());
    let updated = session.update(&project).await.unwrap();
    assert_eq!(updated.name.as_deref(), Some("Renamed"));

    let fetched: Project = session.get(&id).await.unwrap();
    assert_eq!(fetched.name.as_deref(), Some("Renamed"));

    let report = session.finish().await;
    assert!(report.is_clean());
    assert_eq!(report.deleted, 1);
    assert!(transport.object(&format!("projects/{}", id)).is_none());
}

#[tokio::test]
async fn test_repository_registration_is_idempotent() {
    let transport = Arc::new(MockTransport::default());
    let registry = DataRegistry::new();
    let codec = JsonCodec::default();

    registry.register_repository(Repository::<Project>::new(
        transport.clone(),
        "projects",
        codec,
    ));
    registry.register_repository(Repository::<Project>::new(
        transport.clone(),
        "legacy_projects",
        codec,
    ));

    let repository = registry.repository::<Project>().unwrap();
    assert_eq!(repository.collection(), "legacy_projects");
}

#[tokio::test]
async fn test_unregistered_repository_lookup_fails() {
    let registry = Arc::new(DataRegistry::new());
    let session = Session::new(registry);

    let mut project = Project::default();
    let error = session.create(&mut project).await.err().unwrap();
    assert!(matches!(
        error,
        EntityError::UnregisteredKind { kind: "project" }
    ));
}

#[tokio::test]
async fn test_factory_registry_lookup() {
    let registry = DataRegistry::new();
    registry.register_factory(ProjectFactory);

    let project = registry.factory::<Project>().unwrap().build_default();
    assert!(project.id.is_none());
    assert_eq!(project.name.as_deref(), Some("Default Project"));
}
