use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Notify;

use dashkit_auth::{AccessControl, Action, Principal, RbacConfig, RoleRules, Rule};
use dashkit_client::{ApiClient, ApiRequest, FilePart, Method, Payload, QueryCache, TransportError};
use dashkit_core::{ConfigError, Entity, NotificationVariant, RecordingNotifier};
use dashkit_forms::{
    FieldRule, FieldValue, FormLifecycle, FormLifecycleBuilder, FormPhase, FormValues, FormatterPipeline,
    ObjectSchema, SaveKind, SubmitOutcome, attachment, checked_keys,
};

struct FakeApi {
    response: Result<Value, TransportError>,
    blocking: bool,
    entered: Notify,
    release: Notify,
    calls: Mutex<Vec<ApiRequest>>,
}

impl FakeApi {
    fn new(response: Result<Value, TransportError>) -> Arc<Self> {
        Arc::new(Self {
            response,
            blocking: false,
            entered: Notify::new(),
            release: Notify::new(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn ok(body: Value) -> Arc<Self> {
        Self::new(Ok(body))
    }

    /// Holds every request until `release` is notified.
    fn blocking(body: Value) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(body),
            blocking: true,
            entered: Notify::new(),
            release: Notify::new(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApiClient for FakeApi {
    async fn send(&self, request: ApiRequest) -> Result<Value, TransportError> {
        self.calls.lock().unwrap().push(request);
        if self.blocking {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.response.clone()
    }
}

fn access() -> Arc<AccessControl> {
    let config = RbacConfig::new()
        .with_resources(["users", "posts"])
        .with_role(
            "admin",
            RoleRules::from([(Action::CREATE, Rule::all()), (Action::UPDATE, Rule::all())]),
        )
        .with_role("editor", RoleRules::from([(Action::UPDATE, Rule::only(["users"]))]))
        .with_role("viewer", RoleRules::from([(Action::READ, Rule::all())]));
    Arc::new(AccessControl::new(config).unwrap())
}

fn builder(api: &Arc<FakeApi>) -> FormLifecycleBuilder {
    dashkit_observability::init();
    FormLifecycle::builder(api.clone(), access(), "/users").principal(Principal::from_role("admin"))
}

fn user_schema() -> ObjectSchema {
    ObjectSchema::new()
        .field("name", [FieldRule::Required, FieldRule::MinLength(2)])
        .field("avatar", [])
}

fn values(v: Value) -> FormValues {
    v.as_object()
        .unwrap()
        .iter()
        .map(|(k, v)| (k.clone(), FieldValue::Json(v.clone())))
        .collect()
}

fn entity(v: Value) -> Entity {
    v.as_object().cloned().unwrap()
}

#[tokio::test]
async fn create_posts_to_the_endpoint() {
    let api = FakeApi::ok(json!({"message": "User created", "data": {"id": 1, "name": "Ada"}}));
    let notifier = Arc::new(RecordingNotifier::new());
    let saved = Arc::new(Mutex::new(Vec::new()));
    let sink = saved.clone();

    let form = builder(&api)
        .schema(user_schema())
        .notifier(notifier.clone())
        .on_success(move |entity, kind| sink.lock().unwrap().push((entity.clone(), kind)))
        .build()
        .unwrap();
    assert!(form.is_create());

    let outcome = form.submit(values(json!({"name": "Ada"}))).await;

    let created = entity(json!({"id": 1, "name": "Ada"}));
    assert_eq!(
        outcome,
        SubmitOutcome::Saved {
            entity: created.clone(),
            kind: SaveKind::Add
        }
    );

    let calls = api.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, Method::Post);
    assert_eq!(calls[0].path, "/users");
    assert_eq!(calls[0].body, Some(Payload::Json(json!({"name": "Ada"}))));

    let state = form.state();
    assert_eq!(state.item, Some(created.clone()));
    assert!(!state.is_create);
    assert!(!state.loading);
    assert_eq!(state.phase, FormPhase::Succeeded);
    assert_eq!(*saved.lock().unwrap(), vec![(created, SaveKind::Add)]);
    assert_eq!(notifier.titles(), vec!["User created"]);
}

#[tokio::test]
async fn edit_patches_the_item_url() {
    let api = FakeApi::ok(json!({"id": 7, "name": "New", "updated_at": "2024-05-01"}));
    let notifier = Arc::new(RecordingNotifier::new());
    let form = builder(&api)
        .item(entity(json!({"id": 7, "name": "Old"})))
        .schema(user_schema())
        .notifier(notifier.clone())
        .build()
        .unwrap();
    assert!(!form.is_create());

    let outcome = form.submit(values(json!({"name": "New"}))).await;

    assert!(matches!(outcome, SubmitOutcome::Saved { kind: SaveKind::Edit, .. }));
    let calls = api.calls();
    assert_eq!(calls[0].method, Method::Patch);
    assert_eq!(calls[0].path, "/users/7");
    assert_eq!(
        form.state().item.unwrap()["updated_at"],
        json!("2024-05-01"),
        "bare response body becomes the item"
    );
    assert_eq!(notifier.titles(), vec!["Updated successfully"]);
}

#[tokio::test]
async fn second_submit_while_loading_is_rejected() {
    let api = FakeApi::blocking(json!({"data": {"id": 1, "name": "Ada"}}));
    let form = builder(&api).schema(user_schema()).build().unwrap();

    let first = tokio::spawn({
        let form = form.clone();
        async move { form.submit(values(json!({"name": "Ada"}))).await }
    });

    api.entered.notified().await;
    assert!(form.loading());
    assert_eq!(form.submit(values(json!({"name": "Ada"}))).await, SubmitOutcome::Busy);

    api.release.notify_one();
    let outcome = first.await.unwrap();

    assert!(matches!(outcome, SubmitOutcome::Saved { .. }));
    assert_eq!(api.calls().len(), 1);
    assert!(!form.loading());
}

#[tokio::test]
async fn dropped_submit_clears_loading() {
    let api = FakeApi::blocking(json!({"id": 1}));
    let form = builder(&api).schema(user_schema()).build().unwrap();

    let result = tokio::time::timeout(
        Duration::from_millis(20),
        form.submit(values(json!({"name": "Ada"}))),
    )
    .await;

    assert!(result.is_err());
    assert!(!form.loading());
    assert_eq!(form.state().phase, FormPhase::Idle);
}

#[tokio::test]
async fn null_formatter_result_omits_the_field() {
    let api = FakeApi::ok(json!({"data": {"id": 1}}));
    let form = builder(&api)
        .schema(user_schema())
        .formatters(FormatterPipeline::new().with("avatar", attachment()))
        .build()
        .unwrap();

    form.submit(values(json!({"name": "Ada", "avatar": null}))).await;

    let body = api.calls()[0].body.clone().unwrap();
    assert!(!body.contains("avatar"));
    assert!(body.contains("name"));
    assert!(!body.is_multipart());
}

#[tokio::test]
async fn file_values_are_sent_as_multipart() {
    let api = FakeApi::ok(json!({"data": {"id": 1}}));
    let form = builder(&api)
        .schema(user_schema())
        .formatters(FormatterPipeline::new().with("avatar", attachment()))
        .build()
        .unwrap();

    let mut input = values(json!({"name": "Ada"}));
    input.insert(
        "avatar".into(),
        FilePart::new("me.png", vec![0x89, 0x50]).with_content_type("image/png").into(),
    );
    form.submit(input).await;

    let body = api.calls()[0].body.clone().unwrap();
    assert!(body.is_multipart());
    assert_eq!(body.parts("name")[0].as_text(), Some("Ada"));
    assert_eq!(body.parts("avatar").len(), 1);
}

#[tokio::test]
async fn server_message_list_becomes_root_error() {
    let api = FakeApi::new(Err(TransportError::Status {
        status: 422,
        body: json!({"message": ["Name taken", "Email taken"]}),
    }));
    let notifier = Arc::new(RecordingNotifier::new());
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = errors.clone();

    let form = builder(&api)
        .schema(user_schema())
        .notifier(notifier.clone())
        .on_error(move |err| sink.lock().unwrap().push(err.clone()))
        .build()
        .unwrap();

    let outcome = form.submit(values(json!({"name": "Ada"}))).await;

    let SubmitOutcome::Failed(root) = outcome else {
        panic!("expected failure");
    };
    assert_eq!(root.markup.matches(r#"<li style="list-style: circle">"#).count(), 2);

    let state = form.state();
    assert_eq!(state.root_error, Some(root));
    assert!(state.field_errors.is_empty());
    assert!(!state.loading);
    assert_eq!(state.phase, FormPhase::Failed);
    assert!(state.is_create);

    assert_eq!(errors.lock().unwrap().len(), 1);
    let toast = notifier.notifications().pop().unwrap();
    assert_eq!(toast.title, "Name taken");
    assert_eq!(toast.variant, NotificationVariant::Destructive);
}

#[tokio::test]
async fn transport_message_is_used_without_server_message() {
    let api = FakeApi::new(Err(TransportError::Network("connection refused".into())));
    let form = builder(&api).schema(user_schema()).build().unwrap();

    let outcome = form.submit(values(json!({"name": "Ada"}))).await;

    assert!(matches!(outcome, SubmitOutcome::Failed(ref root) if root.markup == "network error: connection refused"));
    assert!(!form.loading());
}

#[tokio::test]
async fn formatter_error_fails_without_request() {
    let api = FakeApi::ok(json!({"id": 1}));
    let form = builder(&api)
        .schema(ObjectSchema::new().field("grants", [FieldRule::Required]))
        .formatters(FormatterPipeline::new().with("grants", checked_keys("permissions")))
        .build()
        .unwrap();

    let outcome = form.submit(values(json!({"grants": "not an object"}))).await;

    assert!(matches!(outcome, SubmitOutcome::Failed(_)));
    assert!(api.calls().is_empty());
    assert!(!form.loading());
    assert!(form.state().root_error.unwrap().markup.contains("grants"));
}

#[tokio::test]
async fn invalid_values_never_reach_the_network() {
    let api = FakeApi::ok(json!({"id": 1}));
    let form = builder(&api).schema(user_schema()).build().unwrap();

    let outcome = form.submit(values(json!({"name": "A"}))).await;

    let SubmitOutcome::Invalid(errors) = outcome else {
        panic!("expected validation failure");
    };
    assert!(errors.contains_key("name"));
    assert!(api.calls().is_empty());

    let state = form.state();
    assert_eq!(state.field_errors, errors);
    assert!(!state.loading);
    assert_eq!(state.phase, FormPhase::Idle);

    // the next attempt starts from clean errors
    form.submit(values(json!({"name": "Ada"}))).await;
    assert!(form.state().field_errors.is_empty());
}

#[tokio::test]
async fn visibility_follows_principal_and_mode() {
    let api = FakeApi::ok(json!({"id": 1}));
    let form = builder(&api)
        .schema(user_schema())
        .principal(Principal::from_role("viewer"))
        .build()
        .unwrap();

    assert!(!form.is_visible());
    assert_eq!(form.submit(values(json!({"name": "Ada"}))).await, SubmitOutcome::Hidden);
    assert!(api.calls().is_empty());

    form.set_principal(Some(Principal::from_role("editor")));
    assert!(!form.is_visible(), "editors cannot create users");

    form.set_item(Some(entity(json!({"id": 3, "name": "Bo"}))));
    assert!(form.is_visible(), "editors can update users");

    form.set_principal(None);
    assert!(!form.is_visible());
}

#[tokio::test]
async fn reset_after_save_returns_to_create_mode() {
    let api = FakeApi::ok(json!({"data": {"id": 5, "name": "Ada"}}));
    let form = builder(&api)
        .schema(user_schema())
        .reset_after_save(true)
        .build()
        .unwrap();

    let outcome = form.submit(values(json!({"name": "Ada"}))).await;

    assert!(matches!(outcome, SubmitOutcome::Saved { kind: SaveKind::Add, .. }));
    let state = form.state();
    assert_eq!(state.item, None);
    assert!(state.is_create);
}

#[tokio::test]
async fn cache_is_invalidated_after_create_only() {
    let api = FakeApi::ok(json!({"data": {"id": 5, "name": "Ada"}}));
    let cache = QueryCache::new();
    let mut users = cache.subscribe("users");

    let form = builder(&api)
        .schema(user_schema())
        .cache(cache.clone(), "users")
        .build()
        .unwrap();

    form.submit(values(json!({"name": "Ada"}))).await;
    users.changed().await.unwrap();
    assert_eq!(cache.generation("users"), 1);

    // now editing the created item
    assert!(!form.is_create());
    form.submit(values(json!({"name": "Ada L."}))).await;
    assert_eq!(api.calls()[1].path, "/users/5");
    assert_eq!(cache.generation("users"), 1);
}

#[tokio::test]
async fn missing_schema_and_item_is_a_config_error() {
    let api = FakeApi::ok(Value::Null);
    let err = FormLifecycle::builder(api, access(), "/users").build().unwrap_err();
    assert_eq!(err, ConfigError::MissingSchema);
}

#[tokio::test]
async fn item_shape_is_used_without_schema() {
    let api = FakeApi::ok(json!({"data": {"id": 2, "name": "Bo", "extra": true}}));
    let form = builder(&api)
        .item(entity(json!({"id": 2, "name": "Al"})))
        .build()
        .unwrap();

    let outcome = form.submit(values(json!({"name": 42, "extra": true}))).await;

    assert!(matches!(outcome, SubmitOutcome::Saved { .. }));
    assert_eq!(
        api.calls()[0].body,
        Some(Payload::Json(json!({"name": 42, "extra": true})))
    );
}

#[tokio::test]
async fn binding_registers_submits_and_resets() {
    let api = FakeApi::ok(json!({"data": {"id": 9, "name": "Cy", "email": "cy@example.com"}}));
    let form = builder(&api)
        .item(entity(json!({"id": 9, "name": "Cy", "email": "cy@example.com"})))
        .schema(user_schema())
        .build()
        .unwrap();
    let binding = form.binding();

    assert_eq!(binding.register("name"), FieldValue::from("Cy"));
    assert_eq!(binding.register("nickname"), FieldValue::null());
    assert!(!binding.is_create());

    binding.set_value("name", "C");
    let outcome = binding.submit().await;
    assert!(matches!(outcome, SubmitOutcome::Invalid(_)));
    assert!(binding.errors().contains_key("name"));

    binding.reset();
    assert_eq!(binding.value("name"), Some(FieldValue::from("Cy")));
    assert!(binding.errors().is_empty());
    assert_eq!(binding.root_error(), None);

    binding.set_value("name", "Cyrus");
    let outcome = binding.submit().await;
    assert!(matches!(outcome, SubmitOutcome::Saved { kind: SaveKind::Edit, .. }));
    assert!(!binding.loading());
    assert_eq!(api.calls()[0].body, Some(Payload::Json(json!({"name": "Cyrus"}))));
    assert_eq!(binding.values().len(), 2);
}
