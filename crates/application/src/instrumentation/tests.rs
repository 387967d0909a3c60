use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hrdesk_core::{AppError, AppResult, RoleId, UserIdentity};
use hrdesk_domain::{OperationKey, OperationKind, PermissionSet};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use super::{
    AuditInterceptor, AuditSettings, Next, OperationCall, OperationInterceptor, OperationPipeline,
    TimingInterceptor,
};
use crate::audit_ports::{AuditRepository, NewAuditLogEntry};
use crate::operation_dispatcher::{BatchCall, OperationDispatcher};
use crate::operation_registry::{
    OperationAccess, OperationDescriptor, OperationHandler, OperationRegistry,
};
use crate::RequestContext;

#[derive(Default)]
struct FakeAuditRepository {
    entries: Mutex<Vec<NewAuditLogEntry>>,
    fail: bool,
    stall: bool,
}

#[async_trait]
impl AuditRepository for FakeAuditRepository {
    async fn append_entry(&self, entry: NewAuditLogEntry) -> AppResult<()> {
        if self.stall {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        if self.fail {
            return Err(AppError::Internal("audit sink offline".to_owned()));
        }

        self.entries.lock().await.push(entry);
        Ok(())
    }
}

enum FakeBehaviour {
    Echo,
    RejectInput,
    RaiseForbidden,
}

struct FakeHandler {
    behaviour: FakeBehaviour,
    invocations: Arc<Mutex<Vec<Option<String>>>>,
}

#[async_trait]
impl OperationHandler for FakeHandler {
    async fn handle(&self, call: &OperationCall<'_>, input: Value) -> AppResult<Value> {
        self.invocations
            .lock()
            .await
            .push(call.context.subject().map(str::to_owned));

        match self.behaviour {
            FakeBehaviour::Echo => Ok(json!({ "saved": input })),
            FakeBehaviour::RejectInput => {
                Err(AppError::Validation("title must not be empty".to_owned()))
            }
            FakeBehaviour::RaiseForbidden => {
                Err(AppError::Forbidden("only owners may archive".to_owned()))
            }
        }
    }
}

struct Fixture {
    dispatcher: OperationDispatcher,
    audit: Arc<FakeAuditRepository>,
    invocations: Arc<Mutex<Vec<Option<String>>>>,
}

fn fixture(audit: FakeAuditRepository) -> AppResult<Fixture> {
    let invocations = Arc::new(Mutex::new(Vec::new()));
    let handler = |behaviour| -> Arc<dyn OperationHandler> {
        Arc::new(FakeHandler {
            behaviour,
            invocations: invocations.clone(),
        })
    };

    let posts = OperationRegistry::new()
        .with_operation(
            "create",
            OperationDescriptor::protected(
                OperationKind::Mutation,
                "You cannot create posts",
                handler(FakeBehaviour::Echo),
            ),
        )?
        .with_operation(
            "delete",
            OperationDescriptor::protected(
                OperationKind::Mutation,
                "You cannot delete posts",
                handler(FakeBehaviour::Echo),
            ),
        )?
        .with_operation(
            "publish",
            OperationDescriptor::protected(
                OperationKind::Mutation,
                "You cannot publish posts",
                handler(FakeBehaviour::RejectInput),
            ),
        )?
        .with_operation(
            "archive",
            OperationDescriptor::protected(
                OperationKind::Mutation,
                "You cannot archive posts",
                handler(FakeBehaviour::RaiseForbidden),
            ),
        )?
        .with_operation(
            "all",
            OperationDescriptor::protected(
                OperationKind::Query,
                "You cannot list posts",
                handler(FakeBehaviour::Echo),
            ),
        )?;
    let registry = OperationRegistry::new()
        .with_group("posts", posts)?
        .with_operation(
            "status",
            OperationDescriptor::public(OperationKind::Query, handler(FakeBehaviour::Echo)),
        )?;

    let audit = Arc::new(audit);
    let pipeline = OperationPipeline::standard(
        TimingInterceptor::new(),
        AuditInterceptor::new(
            audit.clone(),
            AuditSettings {
                write_timeout: Duration::from_millis(50),
                max_chars: 40,
            },
        ),
    );

    Ok(Fixture {
        dispatcher: OperationDispatcher::new(Arc::new(registry), pipeline),
        audit,
        invocations,
    })
}

fn editor() -> RequestContext {
    let permissions = ["create", "publish", "archive", "all"]
        .into_iter()
        .filter_map(|action| OperationKey::new("posts", action).ok())
        .collect::<PermissionSet>();

    RequestContext::authenticated(UserIdentity::new("42", RoleId::new(), None), permissions)
}

#[tokio::test]
async fn successful_mutation_writes_exactly_one_entry() {
    let Ok(fixture) = fixture(FakeAuditRepository::default()) else {
        panic!("fixture should build");
    };

    let result = fixture
        .dispatcher
        .dispatch(&editor(), "posts.create", json!({ "title": "Hello" }))
        .await;

    assert!(matches!(&result, Ok(value) if value == &json!({ "saved": { "title": "Hello" } })));
    let entries = fixture.audit.entries.lock().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "posts.create");
    assert_eq!(entries[0].entity, "posts");
    assert_eq!(entries[0].user_id.as_deref(), Some("42"));
    assert!(entries[0].payload.contains("Hello"));
    assert_eq!(entries[0].request, json!({ "title": "Hello" }).to_string());
}

#[tokio::test]
async fn failing_audit_write_does_not_change_the_result() {
    let Ok(fixture) = fixture(FakeAuditRepository {
        fail: true,
        ..FakeAuditRepository::default()
    }) else {
        panic!("fixture should build");
    };

    let result = fixture
        .dispatcher
        .dispatch(&editor(), "posts.create", json!({ "title": "Hello" }))
        .await;

    assert!(matches!(result, Ok(value) if value["saved"]["title"] == "Hello"));
    assert!(fixture.audit.entries.lock().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn stalled_audit_write_times_out_and_result_is_returned() {
    let Ok(fixture) = fixture(FakeAuditRepository {
        stall: true,
        ..FakeAuditRepository::default()
    }) else {
        panic!("fixture should build");
    };

    let result = fixture
        .dispatcher
        .dispatch(&editor(), "posts.create", json!({}))
        .await;

    assert!(result.is_ok());
    assert!(fixture.audit.entries.lock().await.is_empty());
}

#[tokio::test]
async fn handler_validation_failure_is_audited_with_error_response() {
    let Ok(fixture) = fixture(FakeAuditRepository::default()) else {
        panic!("fixture should build");
    };

    let result = fixture
        .dispatcher
        .dispatch(&editor(), "posts.publish", json!({ "title": "" }))
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    let entries = fixture.audit.entries.lock().await;
    assert_eq!(entries.len(), 1);
    assert!(entries[0].response.contains("error"));
}

#[tokio::test]
async fn queries_and_rejections_are_not_audited() {
    let Ok(fixture) = fixture(FakeAuditRepository::default()) else {
        panic!("fixture should build");
    };
    let editor = editor();

    let query = fixture.dispatcher.dispatch(&editor, "posts.all", Value::Null).await;
    let guarded = fixture
        .dispatcher
        .dispatch(&editor, "posts.delete", json!({ "id": 1 }))
        .await;
    let raised = fixture
        .dispatcher
        .dispatch(&editor, "posts.archive", json!({ "id": 1 }))
        .await;

    assert!(query.is_ok());
    assert!(matches!(
        guarded,
        Err(AppError::Forbidden(message)) if message == "You cannot delete posts"
    ));
    assert!(matches!(
        raised,
        Err(AppError::Forbidden(message)) if message == "only owners may archive"
    ));
    assert!(fixture.audit.entries.lock().await.is_empty());
}

#[tokio::test]
async fn guard_runs_before_the_handler() {
    let Ok(fixture) = fixture(FakeAuditRepository::default()) else {
        panic!("fixture should build");
    };

    let anonymous = fixture
        .dispatcher
        .dispatch(&RequestContext::anonymous(), "posts.create", json!({}))
        .await;
    let forbidden = fixture
        .dispatcher
        .dispatch(&editor(), "posts.delete", json!({}))
        .await;

    assert!(matches!(anonymous, Err(AppError::Unauthorized(_))));
    assert!(matches!(forbidden, Err(AppError::Forbidden(_))));
    assert!(fixture.invocations.lock().await.is_empty());
}

#[tokio::test]
async fn public_operation_runs_without_session() {
    let Ok(fixture) = fixture(FakeAuditRepository::default()) else {
        panic!("fixture should build");
    };

    let result = fixture
        .dispatcher
        .dispatch(&RequestContext::anonymous(), "status", Value::Null)
        .await;

    assert!(result.is_ok());
    assert_eq!(*fixture.invocations.lock().await, vec![None]);
}

#[tokio::test]
async fn unknown_operation_hides_existence_from_anonymous_callers() {
    let Ok(fixture) = fixture(FakeAuditRepository::default()) else {
        panic!("fixture should build");
    };

    let anonymous = fixture
        .dispatcher
        .dispatch(&RequestContext::anonymous(), "posts.ghost", Value::Null)
        .await;
    let authenticated = fixture
        .dispatcher
        .dispatch(&editor(), "posts.ghost", Value::Null)
        .await;
    let malformed = fixture
        .dispatcher
        .dispatch(&editor(), "posts..create", Value::Null)
        .await;

    assert!(matches!(anonymous, Err(AppError::Unauthorized(_))));
    assert!(matches!(authenticated, Err(AppError::NotFound(_))));
    assert!(matches!(malformed, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn audit_fields_are_truncated_on_char_boundaries() {
    let Ok(fixture) = fixture(FakeAuditRepository::default()) else {
        panic!("fixture should build");
    };
    let long_title = "é".repeat(200);

    let result = fixture
        .dispatcher
        .dispatch(&editor(), "posts.create", json!({ "title": long_title }))
        .await;

    assert!(result.is_ok());
    let entries = fixture.audit.entries.lock().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].payload.chars().count(), 40);
    assert_eq!(entries[0].response.chars().count(), 40);
}

#[tokio::test]
async fn batch_shares_one_context_and_keeps_order() {
    let Ok(fixture) = fixture(FakeAuditRepository::default()) else {
        panic!("fixture should build");
    };

    let results = fixture
        .dispatcher
        .dispatch_batch(
            &editor(),
            vec![
                BatchCall {
                    operation: "posts.create".to_owned(),
                    input: json!({ "title": "a" }),
                },
                BatchCall {
                    operation: "posts.delete".to_owned(),
                    input: Value::Null,
                },
                BatchCall {
                    operation: "posts.all".to_owned(),
                    input: Value::Null,
                },
            ],
        )
        .await;

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(AppError::Forbidden(_))));
    assert!(results[2].is_ok());
    assert_eq!(fixture.audit.entries.lock().await.len(), 1);
}

struct RecordingInterceptor {
    label: &'static str,
    events: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl OperationInterceptor for RecordingInterceptor {
    async fn intercept(
        &self,
        call: &OperationCall<'_>,
        input: Value,
        next: Next<'_>,
    ) -> AppResult<Value> {
        self.events.lock().await.push(format!("{}:start", self.label));
        let result = next.run(call, input).await;
        self.events.lock().await.push(format!("{}:end", self.label));
        result
    }
}

#[tokio::test]
async fn outer_links_wrap_the_guard_and_inner_links() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let recorder = |label| -> Arc<dyn OperationInterceptor> {
        Arc::new(RecordingInterceptor {
            label,
            events: events.clone(),
        })
    };
    let pipeline = OperationPipeline::new(vec![recorder("outer")], vec![recorder("inner")]);

    let invocations = Arc::new(Mutex::new(Vec::new()));
    let handler = FakeHandler {
        behaviour: FakeBehaviour::Echo,
        invocations: invocations.clone(),
    };
    let access = OperationAccess::Protected {
        denial_message: "You cannot touch posts".to_owned(),
    };
    let registry = OperationRegistry::new();
    let context = editor();

    for (action, expected) in [
        ("delete", vec!["outer:start", "outer:end"]),
        (
            "create",
            vec!["outer:start", "inner:start", "inner:end", "outer:end"],
        ),
    ] {
        events.lock().await.clear();
        let Ok(key) = OperationKey::new("posts", action) else {
            panic!("key should be valid");
        };
        let call = OperationCall {
            context: &context,
            key: &key,
            kind: OperationKind::Mutation,
            access: &access,
            registry: &registry,
        };

        let _ = pipeline.invoke(&call, &handler, Value::Null).await;

        assert_eq!(*events.lock().await, expected);
    }

    assert_eq!(invocations.lock().await.len(), 1);
}
